//! Modula ABI crate: the contract shared by the host shell and plugin libraries.
//!
//! Plugins are `cdylib`s exporting [`ffi::PLUGIN_ENTRY_SYMBOL`]. The easiest way
//! to produce one is the [`export_plugin!`] macro.

pub mod export;
pub mod ffi;
pub mod metadata;

pub use metadata::*;
