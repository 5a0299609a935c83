use super::importer::{WidgetFactory, WidgetInstance};
use crate::errors::{Result, StoreError};
use modula_abi::PluginMetadata;
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::sync::Arc;

/// A registered widget class. Immutable for the life of the process.
#[derive(Clone)]
pub struct InstalledPlugin {
    pub class_name: String,
    /// Canonical plugin (file stem or folder) name.
    pub plugin_name: String,
    pub alias: String,
    pub info: PluginMetadata,
    /// Library or package folder the class came from.
    pub source: PathBuf,
    factory: Arc<dyn WidgetFactory>,
}

impl InstalledPlugin {
    pub fn new(
        class_name: impl Into<String>,
        plugin_name: impl Into<String>,
        alias: impl Into<String>,
        info: PluginMetadata,
        source: impl Into<PathBuf>,
        factory: Arc<dyn WidgetFactory>,
    ) -> Self {
        Self {
            class_name: class_name.into(),
            plugin_name: plugin_name.into(),
            alias: alias.into(),
            info,
            source: source.into(),
            factory,
        }
    }

    /// Create a new widget instance of this class.
    pub fn instantiate(&self) -> Result<Box<dyn WidgetInstance>> {
        self.factory.create()
    }
}

impl std::fmt::Debug for InstalledPlugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstalledPlugin")
            .field("class_name", &self.class_name)
            .field("plugin_name", &self.plugin_name)
            .field("alias", &self.alias)
            .field("version", &self.info.version)
            .field("source", &self.source)
            .finish()
    }
}

/// Class name -> installed plugin, built by one load pass.
#[derive(Debug, Default)]
pub struct PluginRegistry {
    plugins: BTreeMap<String, InstalledPlugin>,
    failures: Vec<StoreError>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register all classes of one plugin, or none of them.
    ///
    /// A class name already owned by another registration is a `Conflict`.
    pub fn register_all(&mut self, classes: Vec<InstalledPlugin>) -> Result<usize> {
        let mut seen = BTreeSet::new();
        for c in &classes {
            if let Some(existing) = self.plugins.get(&c.class_name) {
                return Err(StoreError::Conflict {
                    class: c.class_name.clone(),
                    plugin: c.plugin_name.clone(),
                    existing: existing.plugin_name.clone(),
                });
            }
            if !seen.insert(c.class_name.as_str()) {
                return Err(StoreError::Conflict {
                    class: c.class_name.clone(),
                    plugin: c.plugin_name.clone(),
                    existing: c.plugin_name.clone(),
                });
            }
        }
        let n = classes.len();
        for c in classes {
            self.plugins.insert(c.class_name.clone(), c);
        }
        Ok(n)
    }

    pub(crate) fn record_failure(&mut self, err: StoreError) {
        self.failures.push(err);
    }

    /// Errors from plugins that were skipped during the load pass.
    pub fn failures(&self) -> &[StoreError] {
        &self.failures
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    pub fn get_plugin(&self, name: &str) -> Option<&InstalledPlugin> {
        self.plugins.get(name)
    }

    pub fn get_plugin_names(&self) -> Vec<&str> {
        self.plugins.keys().map(String::as_str).collect()
    }

    /// Alias of a class, or the name itself if unknown.
    pub fn get_plugin_alias(&self, name: &str) -> String {
        self.plugins
            .get(name)
            .map(|p| p.alias.clone())
            .unwrap_or_else(|| name.to_string())
    }

    pub fn get_plugin_name_by_alias(&self, alias: &str) -> Option<&str> {
        self.plugins
            .values()
            .find(|p| p.alias == alias)
            .map(|p| p.class_name.as_str())
    }

    /// One metadata record per plugin (not per class).
    pub fn get_plugin_info_list(&self) -> Vec<PluginMetadata> {
        let mut seen = BTreeSet::new();
        self.plugins
            .values()
            .filter(|p| seen.insert(p.plugin_name.as_str()))
            .map(|p| p.info.clone())
            .collect()
    }

    /// Canonical plugin name -> version, for dependency resolution.
    pub fn installed_versions(&self) -> BTreeMap<String, String> {
        self.plugins
            .values()
            .map(|p| (p.plugin_name.clone(), p.info.version.clone()))
            .collect()
    }
}
