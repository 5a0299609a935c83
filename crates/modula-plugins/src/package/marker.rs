use crate::errors::{Result, StoreError};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Where a plugin declares its version, e.g. `version = "{version}"` in `Cargo.toml`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionMarker {
    /// Relative to the plugin source dir.
    pub file: PathBuf,
    /// Must contain `{version}`.
    pub pattern: String,
}

impl Default for VersionMarker {
    fn default() -> Self {
        Self {
            file: PathBuf::from("Cargo.toml"),
            pattern: r#"version = "{version}""#.into(),
        }
    }
}

/// Original contents of a rewritten file, used to undo a failed publish.
#[derive(Debug)]
pub struct MarkerBackup {
    path: PathBuf,
    original: String,
}

impl MarkerBackup {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn restore(self) -> Result<()> {
        fs::write(&self.path, self.original)?;
        debug!(path = %self.path.display(), "restored version marker");
        Ok(())
    }
}

impl VersionMarker {
    pub fn render(&self, version: &str) -> String {
        self.pattern.replace("{version}", version)
    }

    /// Replace the first `old` marker with `new`.
    pub fn rewrite(&self, source_dir: &Path, old: &str, new: &str) -> Result<MarkerBackup> {
        let path = source_dir.join(&self.file);
        let original = fs::read_to_string(&path)?;
        let old_marker = self.render(old);
        if !original.contains(&old_marker) {
            return Err(StoreError::VersionMarkerNotFound {
                path,
                marker: old_marker,
            });
        }
        let updated = original.replacen(&old_marker, &self.render(new), 1);
        fs::write(&path, updated)?;
        debug!(path = %path.display(), old, new, "rewrote version marker");
        Ok(MarkerBackup { path, original })
    }
}
