//! Pending-update manifest: plugin name -> downloaded archive awaiting install.
//!
//! Two on-disk shapes are accepted:
//! - update:  `{ "<plugin>": "<archive path>", ... }`
//! - install: `{ "install_plugins": [ { "<plugin>": "<archive path>" }, ... ] }`

mod verify;

pub use verify::{sha256_file, verify_sha256};

use crate::errors::{Result, StoreError};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};

const INSTALL_KEY: &str = "install_plugins";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ManifestKind {
    /// Written by the update dialog.
    #[default]
    Update,
    /// Written by the online-install path.
    Install,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingManifest {
    pub kind: ManifestKind,
    pub entries: Vec<(String, PathBuf)>,
}

impl PendingManifest {
    pub fn new(kind: ManifestKind) -> Self {
        Self {
            kind,
            entries: Vec::new(),
        }
    }

    pub fn push(&mut self, plugin_name: impl Into<String>, archive: impl Into<PathBuf>) {
        self.entries.push((plugin_name.into(), archive.into()));
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `Ok(None)` when no manifest file exists.
    pub fn read(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let bytes = fs::read(path)?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Some(Self::default()));
        }
        let value: Value = serde_json::from_slice(&bytes)?;
        Self::from_json(&value).map(Some)
    }

    pub fn from_json(value: &Value) -> Result<Self> {
        let obj = value
            .as_object()
            .ok_or_else(|| StoreError::Msg("update manifest is not a JSON object".into()))?;

        if let Some(list) = obj.get(INSTALL_KEY) {
            let items = list
                .as_array()
                .ok_or_else(|| StoreError::Msg(format!("`{INSTALL_KEY}` is not a list")))?;
            let mut m = Self::new(ManifestKind::Install);
            for item in items {
                let single = item.as_object().ok_or_else(|| {
                    StoreError::Msg(format!("`{INSTALL_KEY}` entries must be objects"))
                })?;
                for (name, path) in single {
                    m.push(name.clone(), path_of(name, path)?);
                }
            }
            return Ok(m);
        }

        let mut m = Self::new(ManifestKind::Update);
        for (name, path) in obj {
            m.push(name.clone(), path_of(name, path)?);
        }
        Ok(m)
    }

    pub fn to_json(&self) -> Value {
        match self.kind {
            ManifestKind::Update => Value::Object(
                self.entries
                    .iter()
                    .map(|(n, p)| (n.clone(), Value::String(p.to_string_lossy().into_owned())))
                    .collect::<Map<_, _>>(),
            ),
            ManifestKind::Install => {
                let list = self
                    .entries
                    .iter()
                    .map(|(n, p)| {
                        let mut single = Map::new();
                        single.insert(n.clone(), Value::String(p.to_string_lossy().into_owned()));
                        Value::Object(single)
                    })
                    .collect::<Vec<_>>();
                let mut root = Map::new();
                root.insert(INSTALL_KEY.to_string(), Value::Array(list));
                Value::Object(root)
            }
        }
    }

    /// Overwrite whatever manifest was there before.
    pub fn write(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        fs::write(path, serde_json::to_vec_pretty(&self.to_json())?)?;
        Ok(())
    }

    /// Reset the file to an empty record.
    pub fn truncate(path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        fs::write(path, b"{}")?;
        Ok(())
    }
}

fn path_of(name: &str, v: &Value) -> Result<PathBuf> {
    v.as_str()
        .map(PathBuf::from)
        .ok_or_else(|| StoreError::Msg(format!("archive path for `{name}` is not a string")))
}
