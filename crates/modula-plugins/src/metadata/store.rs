use crate::errors::{Result, StoreError};
use crate::paths::INFO_FILE;
use crate::version::increment_patch;
use modula_abi::PluginMetadata;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Local `info.json` records, one per plugin folder under `root`.
#[derive(Debug, Clone)]
pub struct VersionStore {
    root: PathBuf,
}

impl VersionStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// <root>/<plugin>/info.json
    pub fn info_path(&self, plugin_name: &str) -> PathBuf {
        self.root.join(plugin_name).join(INFO_FILE)
    }

    /// Read the record, creating a `0.0.0` one on first use.
    pub fn load_or_create(&self, plugin_name: &str) -> Result<PluginMetadata> {
        let path = self.info_path(plugin_name);
        if path.exists() {
            let bytes = fs::read(&path)?;
            let meta: PluginMetadata =
                serde_json::from_slice(&bytes).map_err(|e| StoreError::CorruptMetadata {
                    path: path.clone(),
                    reason: e.to_string(),
                })?;
            debug!(plugin = plugin_name, version = %meta.version, "loaded plugin info");
            return Ok(meta);
        }

        let meta = PluginMetadata::new(plugin_name);
        self.persist(plugin_name, &meta)?;
        info!(plugin = plugin_name, path = %path.display(), "created plugin info");
        Ok(meta)
    }

    /// Next version a publish of this plugin would carry.
    pub fn next_version(&self, plugin_name: &str) -> Result<String> {
        let meta = self.load_or_create(plugin_name)?;
        increment_patch(&meta.version)
    }

    /// Overwrite the record (temp file + rename).
    pub fn persist(&self, plugin_name: &str, meta: &PluginMetadata) -> Result<()> {
        let path = self.info_path(plugin_name);
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(meta)?)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }
}
