//! Discover installed plugins and register the widget classes they declare.
//!
//! Two strategies run on every pass, flat files first:
//! - `<root>/<name>.<ext>`: a native library imported on its own.
//! - `<root>/<name>/plugin.json`: a package folder whose entry point names its library.

mod importer;
mod registry;

pub use importer::{
    Declaration, ImportedModule, ModuleImporter, NativeImporter, NativeWidget, WidgetFactory,
    WidgetInstance,
};
pub use registry::{InstalledPlugin, PluginRegistry};

use crate::errors::{Result, StoreError};
use crate::paths::{is_native_library, NATIVE_EXTENSION, PACKAGE_ENTRY_FILE};
use modula_abi::ffi::CAPABILITY_WIDGET;
use modula_abi::PluginMetadata;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

/// Contents of a package's `plugin.json`.
#[derive(Debug, Default, Deserialize)]
struct PackageEntry {
    /// Library path relative to the package folder.
    #[serde(default)]
    library: Option<String>,
}

pub struct PluginLoader<I: ModuleImporter = NativeImporter> {
    importer: I,
}

impl PluginLoader<NativeImporter> {
    pub fn new() -> Self {
        Self::with_importer(NativeImporter)
    }
}

impl Default for PluginLoader<NativeImporter> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: ModuleImporter> PluginLoader<I> {
    pub fn with_importer(importer: I) -> Self {
        Self { importer }
    }

    /// One full load pass. Never fails: broken plugins are logged, recorded in
    /// [`PluginRegistry::failures`], and skipped.
    pub fn load_all(&self, plugins_root: &Path) -> PluginRegistry {
        let mut registry = PluginRegistry::new();

        let (files, packages) = match scan(plugins_root) {
            Ok(found) => found,
            Err(e) => {
                error!(root = %plugins_root.display(), "cannot read plugins directory: {e}");
                registry.record_failure(e);
                return registry;
            }
        };

        for path in files {
            let name = stem(&path);
            let result = self
                .importer
                .import(&path)
                .and_then(|m| self.register(&mut registry, &name, &path, m));
            self.settle(&mut registry, &path, result);
        }

        for dir in packages {
            let name = stem(&dir);
            let result = package_library(&dir, &name)
                .and_then(|lib| self.importer.import(&lib))
                .and_then(|m| self.register(&mut registry, &name, &dir, m));
            self.settle(&mut registry, &dir, result);
        }

        info!(
            classes = registry.len(),
            failed = registry.failures().len(),
            "plugin load pass finished"
        );
        registry
    }

    fn settle(&self, registry: &mut PluginRegistry, path: &Path, result: Result<usize>) {
        match result {
            Ok(n) => debug!(plugin = %path.display(), classes = n, "plugin loaded"),
            Err(e) => {
                error!(plugin = %path.display(), "skipping plugin: {e}");
                registry.record_failure(e);
            }
        }
    }

    fn register(
        &self,
        registry: &mut PluginRegistry,
        plugin_name: &str,
        source: &Path,
        module: ImportedModule,
    ) -> Result<usize> {
        let mut info = module
            .info
            .unwrap_or_else(|| PluginMetadata::new(plugin_name));
        if info.plugin_name.is_empty() {
            info.plugin_name = plugin_name.to_string();
        }
        let alias = if info.name.trim().is_empty() {
            plugin_name.to_string()
        } else {
            info.name.clone()
        };

        let classes = module
            .declarations
            .into_iter()
            .filter(|d| d.capability == CAPABILITY_WIDGET)
            .map(|d| {
                InstalledPlugin::new(d.class_name, plugin_name, alias.clone(), info.clone(), source, d.factory)
            })
            .collect::<Vec<_>>();

        registry.register_all(classes)
    }
}

/// Sorted flat-library files and package folders directly under `root`.
fn scan(root: &Path) -> Result<(Vec<PathBuf>, Vec<PathBuf>)> {
    let mut files = Vec::new();
    let mut packages = Vec::new();
    for entry in fs::read_dir(root)? {
        let path = entry?.path();
        if path.is_file() && is_native_library(&path) {
            files.push(path);
        } else if path.is_dir() && path.join(PACKAGE_ENTRY_FILE).is_file() {
            packages.push(path);
        }
    }
    files.sort();
    packages.sort();
    Ok((files, packages))
}

fn stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Resolve the library a package's entry point refers to.
fn package_library(dir: &Path, name: &str) -> Result<PathBuf> {
    let entry_path = dir.join(PACKAGE_ENTRY_FILE);
    let text = fs::read_to_string(&entry_path)?;
    let entry: PackageEntry = if text.trim().is_empty() {
        PackageEntry::default()
    } else {
        serde_json::from_str(&text).map_err(|e| StoreError::Load {
            path: entry_path.clone(),
            reason: format!("invalid {PACKAGE_ENTRY_FILE}: {e}"),
        })?
    };
    let lib = entry
        .library
        .unwrap_or_else(|| format!("{name}.{NATIVE_EXTENSION}"));
    Ok(dir.join(lib))
}
