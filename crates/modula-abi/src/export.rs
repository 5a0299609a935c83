//! Plugin-side helpers: build the static [`PluginApi`] a library hands to the host.

use std::ffi::CString;

use crate::ffi::{
    CAPABILITY_WIDGET, CreateWidgetFn, DestroyWidgetFn, MODULA_ABI_VERSION, PluginApi, PluginInfo,
    WidgetDecl,
};
use crate::metadata::PluginMetadata;

/// One registration-table row before it is lowered to C strings.
pub struct WidgetExport {
    pub capability: String,
    pub class_name: String,
    pub create: CreateWidgetFn,
    pub destroy: DestroyWidgetFn,
}

impl WidgetExport {
    pub fn widget(class_name: &str, create: CreateWidgetFn, destroy: DestroyWidgetFn) -> Self {
        Self {
            capability: CAPABILITY_WIDGET.to_string(),
            class_name: class_name.to_string(),
            create,
            destroy,
        }
    }
}

/// Owns every allocation the exported `PluginApi` points into.
pub struct ExportedApi {
    _strings: Vec<CString>,
    _decls: Vec<WidgetDecl>,
    api: PluginApi,
}

// SAFETY: all pointers reference heap data owned by `self` and never mutated after `new`.
unsafe impl Send for ExportedApi {}
unsafe impl Sync for ExportedApi {}

fn c_string(s: &str) -> CString {
    // Interior NULs cannot be represented; drop them rather than fail the export.
    CString::new(s.replace('\0', "")).unwrap_or_default()
}

impl ExportedApi {
    pub fn new(info: &PluginMetadata, widgets: Vec<WidgetExport>) -> Self {
        let mut strings = Vec::with_capacity(1 + widgets.len() * 2);
        let info_json = serde_json::to_string(info).map(|s| c_string(&s)).ok();
        let info_ptr = match &info_json {
            Some(s) => s.as_ptr(),
            None => std::ptr::null(),
        };
        strings.extend(info_json);

        let mut decls = Vec::with_capacity(widgets.len());
        for w in widgets {
            let cap = c_string(&w.capability);
            let class = c_string(&w.class_name);
            decls.push(WidgetDecl {
                capability: cap.as_ptr(),
                class_name: class.as_ptr(),
                create: w.create,
                destroy: w.destroy,
            });
            strings.push(cap);
            strings.push(class);
        }

        // CString heap buffers and the Vec buffer do not move when the owners move.
        let api = PluginApi {
            info: PluginInfo {
                abi_version: MODULA_ABI_VERSION,
                info_json: info_ptr,
            },
            widgets: decls.as_ptr(),
            widgets_len: decls.len(),
        };

        Self {
            _strings: strings,
            _decls: decls,
            api,
        }
    }

    pub fn api(&self) -> *const PluginApi {
        &self.api as *const PluginApi
    }
}

/// Export `modula_plugin_entry_v1` from a `cdylib`.
///
/// The version reported to the host is the crate's own `CARGO_PKG_VERSION`, so the
/// `version = "x.y.z"` line in the plugin's `Cargo.toml` is the only copy to bump.
///
/// ```ignore
/// modula_abi::export_plugin! {
///     name: "Demo panel",
///     description: "Shows a greeting",
///     update_url: "https://cdn.example.com/package/demo/info.json",
///     widgets: ["DemoPanel" => (demo_create, demo_destroy)],
/// }
/// ```
#[macro_export]
macro_rules! export_plugin {
    (
        name: $name:expr,
        $(description: $desc:expr,)?
        $(update_url: $url:expr,)?
        widgets: [ $( $class:literal => ($create:path, $destroy:path) ),* $(,)? ] $(,)?
    ) => {
        #[unsafe(no_mangle)]
        pub extern "C" fn modula_plugin_entry_v1() -> *const $crate::ffi::PluginApi {
            static API: ::std::sync::OnceLock<$crate::export::ExportedApi> =
                ::std::sync::OnceLock::new();
            API.get_or_init(|| {
                #[allow(unused_mut)]
                let mut info = $crate::metadata::PluginMetadata::new($name);
                info.version = env!("CARGO_PKG_VERSION").to_string();
                info.plugin_name = env!("CARGO_CRATE_NAME").to_string();
                $( info.description = ($desc).to_string(); )?
                $( info.update_url = ($url).to_string(); )?
                $crate::export::ExportedApi::new(
                    &info,
                    vec![ $( $crate::export::WidgetExport::widget($class, $create, $destroy) ),* ],
                )
            })
            .api()
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::ffi::c_void;
    use std::ffi::CStr;

    unsafe extern "C" fn create() -> *mut c_void {
        Box::into_raw(Box::new(7u32)).cast()
    }

    unsafe extern "C" fn destroy(p: *mut c_void) {
        if !p.is_null() {
            drop(unsafe { Box::from_raw(p.cast::<u32>()) });
        }
    }

    #[test]
    fn exported_table_round_trips_through_c_strings() {
        let mut info = PluginMetadata::new("Demo");
        info.version = "1.2.3".into();
        let exported = ExportedApi::new(&info, vec![WidgetExport::widget("DemoPanel", create, destroy)]);
        let api = unsafe { &*exported.api() };

        assert_eq!(api.info.abi_version, MODULA_ABI_VERSION);
        let json = unsafe { CStr::from_ptr(api.info.info_json) }.to_str().unwrap();
        let back: PluginMetadata = serde_json::from_str(json).unwrap();
        assert_eq!(back.version, "1.2.3");

        assert_eq!(api.widgets_len, 1);
        let decl = unsafe { &*api.widgets };
        let class = unsafe { CStr::from_ptr(decl.class_name) }.to_str().unwrap();
        let cap = unsafe { CStr::from_ptr(decl.capability) }.to_str().unwrap();
        assert_eq!(class, "DemoPanel");
        assert_eq!(cap, CAPABILITY_WIDGET);

        let w = unsafe { (decl.create)() };
        assert_eq!(unsafe { *w.cast::<u32>() }, 7);
        unsafe { (decl.destroy)(w) };
    }
}
