use core::ffi::{c_char, c_void};

/// Bump this when you break the ABI. Host checks it at load time.
pub const MODULA_ABI_VERSION: u32 = 1;

pub const PLUGIN_ENTRY_SYMBOL: &str = "modula_plugin_entry_v1";

/// Capability tag of declarations the host can mount as dockable widgets.
pub const CAPABILITY_WIDGET: &str = "widget";

#[repr(C)]
pub struct PluginInfo {
    pub abi_version: u32,
    /// NUL-terminated UTF-8 JSON of [`crate::metadata::PluginMetadata`], or null.
    pub info_json: *const c_char,
}

// ---------- Function pointer types (C ABI) ----------

/// Returns an opaque widget instance owned by the plugin (null on failure).
pub type CreateWidgetFn = unsafe extern "C" fn() -> *mut c_void;
/// Releases an instance returned by the matching [`CreateWidgetFn`].
pub type DestroyWidgetFn = unsafe extern "C" fn(widget: *mut c_void);

/// One row of the registration table: {capability-tag, factory}.
#[repr(C)]
pub struct WidgetDecl {
    pub capability: *const c_char, // "widget"
    pub class_name: *const c_char, // "DemoPanel"
    pub create: CreateWidgetFn,
    pub destroy: DestroyWidgetFn,
}

#[repr(C)]
pub struct PluginApi {
    pub info: PluginInfo,
    pub widgets: *const WidgetDecl,
    pub widgets_len: usize,
}

/// Plugin must export `modula_plugin_entry_v1` returning a pointer to a `PluginApi`
/// that stays valid for as long as the library is loaded.
pub type PluginEntryFn = unsafe extern "C" fn() -> *const PluginApi;
