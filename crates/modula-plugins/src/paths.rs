use crate::errors::{Result, StoreError};
use dirs::data_dir;
use std::path::{Component, Path, PathBuf};

/// File name of the pending-update manifest inside the cache dir.
pub const MANIFEST_FILE: &str = "update_info.json";

/// Per-plugin metadata file name.
pub const INFO_FILE: &str = "info.json";

/// Entry-point file that marks a folder as a package plugin.
pub const PACKAGE_ENTRY_FILE: &str = "plugin.json";

/// Extension of loadable plugin libraries on this platform ("so" | "dll" | "dylib").
pub const NATIVE_EXTENSION: &str = std::env::consts::DLL_EXTENSION;

/// ~/.local/share/Modula   (or platform-equivalent)
pub fn modula_home() -> PathBuf {
    data_dir()
        .unwrap_or_else(|| PathBuf::from("~/.local/share"))
        .join("Modula")
}

/// ~/.local/share/Modula/plugins
pub fn plugins_dir() -> PathBuf {
    modula_home().join("plugins")
}

/// ~/.local/share/Modula/cache  (downloaded update archives + manifest)
pub fn cache_dir() -> PathBuf {
    modula_home().join("cache")
}

/// ~/.local/share/Modula/logs
pub fn logs_dir() -> PathBuf {
    modula_home().join("logs")
}

/// ~/.local/share/Modula/config.toml
pub fn config_path() -> PathBuf {
    modula_home().join("config.toml")
}

/// <cache>/update_info.json
pub fn manifest_path(cache: &Path) -> PathBuf {
    cache.join(MANIFEST_FILE)
}

/// True if `path` has the platform native-library extension.
pub fn is_native_library(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(NATIVE_EXTENSION))
}

/// `<plugin>.<ext>`: the stable file name a built plugin is installed under.
pub fn canonical_file_name(plugin_name: &str) -> String {
    format!("{plugin_name}.{NATIVE_EXTENSION}")
}

/// `<plugin>_<version>.zip`: archive name used for uploads and the update cache.
pub fn archive_file_name(plugin_name: &str, version: &str) -> String {
    format!("{plugin_name}_{version}.zip")
}

/// A plugin name must be a single plain path component before it names a file or folder.
pub fn plain_plugin_name(plugin_name: &str) -> Result<&str> {
    let mut comps = Path::new(plugin_name).components();
    match (comps.next(), comps.next()) {
        (Some(Component::Normal(_)), None) => Ok(plugin_name),
        _ => Err(StoreError::InvalidPluginName(plugin_name.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plugin_names_must_be_single_components() {
        assert_eq!(plain_plugin_name("demo").unwrap(), "demo");
        for bad in ["../demo", "a/b", "", "..", "/abs"] {
            assert!(
                matches!(plain_plugin_name(bad), Err(StoreError::InvalidPluginName(_))),
                "{bad:?} should be rejected"
            );
        }
    }
}
