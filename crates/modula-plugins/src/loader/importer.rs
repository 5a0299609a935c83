use crate::errors::{Result, StoreError};
use core::ffi::{c_char, c_void};
use libloading::Library;
use modula_abi::ffi::{
    CreateWidgetFn, DestroyWidgetFn, PluginEntryFn, MODULA_ABI_VERSION, PLUGIN_ENTRY_SYMBOL,
};
use modula_abi::PluginMetadata;
use std::ffi::CStr;
use std::path::Path;
use std::sync::Arc;

/// A live widget created by a plugin. Dropping it releases the plugin-side object.
pub trait WidgetInstance: Send {
    fn class_name(&self) -> &str;
}

/// Factory half of a registration-table row.
pub trait WidgetFactory: Send + Sync {
    fn create(&self) -> Result<Box<dyn WidgetInstance>>;
}

/// One declared {capability-tag, factory} pair.
pub struct Declaration {
    pub capability: String,
    pub class_name: String,
    pub factory: Arc<dyn WidgetFactory>,
}

/// What a module exposes once imported.
pub struct ImportedModule {
    /// `None` when the module exports no info block.
    pub info: Option<PluginMetadata>,
    pub declarations: Vec<Declaration>,
}

/// Turns a library path into an [`ImportedModule`].
pub trait ModuleImporter {
    fn import(&self, library: &Path) -> Result<ImportedModule>;
}

/// Loads `cdylib` plugins through the `modula-abi` entry point.
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeImporter;

fn load_err(path: &Path, reason: impl Into<String>) -> StoreError {
    StoreError::Load {
        path: path.to_path_buf(),
        reason: reason.into(),
    }
}

unsafe fn read_c_str(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    Some(unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned())
}

impl ModuleImporter for NativeImporter {
    fn import(&self, path: &Path) -> Result<ImportedModule> {
        let lib = unsafe { Library::new(path) }.map_err(|e| load_err(path, e.to_string()))?;
        let lib = Arc::new(lib);

        let entry: PluginEntryFn = unsafe {
            *lib.get::<PluginEntryFn>(PLUGIN_ENTRY_SYMBOL.as_bytes())
                .map_err(|e| load_err(path, format!("missing symbol {PLUGIN_ENTRY_SYMBOL}: {e}")))?
        };

        let api_ptr = unsafe { entry() };
        if api_ptr.is_null() {
            return Err(load_err(path, "plugin entry returned null"));
        }
        let api = unsafe { &*api_ptr };
        if api.info.abi_version != MODULA_ABI_VERSION {
            return Err(load_err(
                path,
                format!(
                    "ABI mismatch: host={} plugin={}",
                    MODULA_ABI_VERSION, api.info.abi_version
                ),
            ));
        }

        let info = match unsafe { read_c_str(api.info.info_json) } {
            None => None,
            Some(json) => Some(
                serde_json::from_str::<PluginMetadata>(&json)
                    .map_err(|e| load_err(path, format!("invalid info block: {e}")))?,
            ),
        };

        let decls = if api.widgets.is_null() || api.widgets_len == 0 {
            &[][..]
        } else {
            unsafe { std::slice::from_raw_parts(api.widgets, api.widgets_len) }
        };

        let mut declarations = Vec::with_capacity(decls.len());
        for d in decls {
            let (Some(capability), Some(class_name)) =
                (unsafe { read_c_str(d.capability) }, unsafe { read_c_str(d.class_name) })
            else {
                return Err(load_err(path, "declaration with null capability or class name"));
            };
            declarations.push(Declaration {
                capability,
                class_name: class_name.clone(),
                factory: Arc::new(NativeFactory {
                    lib: Arc::clone(&lib),
                    class_name,
                    create: d.create,
                    destroy: d.destroy,
                }),
            });
        }

        Ok(ImportedModule { info, declarations })
    }
}

struct NativeFactory {
    lib: Arc<Library>,
    class_name: String,
    create: CreateWidgetFn,
    destroy: DestroyWidgetFn,
}

impl WidgetFactory for NativeFactory {
    fn create(&self) -> Result<Box<dyn WidgetInstance>> {
        let ptr = unsafe { (self.create)() };
        if ptr.is_null() {
            return Err(StoreError::Msg(format!(
                "plugin failed to create `{}`",
                self.class_name
            )));
        }
        Ok(Box::new(NativeWidget {
            _lib: Arc::clone(&self.lib),
            class_name: self.class_name.clone(),
            ptr,
            destroy: self.destroy,
        }))
    }
}

/// Keeps its library loaded until the plugin object is destroyed.
pub struct NativeWidget {
    _lib: Arc<Library>,
    class_name: String,
    ptr: *mut c_void,
    destroy: DestroyWidgetFn,
}

impl NativeWidget {
    pub fn as_raw(&self) -> *mut c_void {
        self.ptr
    }
}

impl WidgetInstance for NativeWidget {
    fn class_name(&self) -> &str {
        &self.class_name
    }
}

impl Drop for NativeWidget {
    fn drop(&mut self) {
        if !self.ptr.is_null() {
            unsafe { (self.destroy)(self.ptr) };
            self.ptr = std::ptr::null_mut();
        }
    }
}

// SAFETY: the plugin object is only touched through `destroy`, from whichever
// thread owns the handle.
unsafe impl Send for NativeWidget {}
