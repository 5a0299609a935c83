//! Plugin metadata record, shared by the on-disk `info.json`, the remote update
//! endpoint, and the info block a plugin library exports.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Keys an update-check response must carry to be usable.
pub const REQUIRED_REMOTE_KEYS: [&str; 5] =
    ["version", "download_url", "name", "description", "plugin_name"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginMetadata {
    /// Display alias shown in menus.
    pub name: String,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub release_notes: String,
    /// Empty until the plugin has been published at least once.
    #[serde(default)]
    pub download_url: String,
    /// Empty means update checks are not configured for this plugin.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub update_url: String,
    /// Canonical (file/folder) name; present in the remote variant.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub plugin_name: String,
    /// plugin name -> version requirement (e.g. ">=1.0").
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub dependencies: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_app_version: Option<String>,
    /// Lowercase hex sha256 of the archive at `download_url`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
}

fn default_version() -> String {
    "0.0.0".to_string()
}

impl PluginMetadata {
    /// Fresh record with version `0.0.0` and every other field empty.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: default_version(),
            description: String::new(),
            author: String::new(),
            release_notes: String::new(),
            download_url: String::new(),
            update_url: String::new(),
            plugin_name: String::new(),
            dependencies: BTreeMap::new(),
            min_app_version: None,
            sha256: None,
        }
    }

    /// Canonical name if the record carries one, else the alias.
    pub fn canonical_name(&self) -> &str {
        if self.plugin_name.is_empty() {
            &self.name
        } else {
            &self.plugin_name
        }
    }

    pub fn is_published(&self) -> bool {
        !self.download_url.is_empty()
    }
}

/// Names of required remote keys missing from `value` (empty when valid).
pub fn missing_remote_keys(value: &serde_json::Value) -> Vec<&'static str> {
    REQUIRED_REMOTE_KEYS
        .iter()
        .copied()
        .filter(|k| value.get(k).is_none())
        .collect()
}
