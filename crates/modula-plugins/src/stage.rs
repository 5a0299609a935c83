//! Download selected updates into the cache dir and record them in the
//! pending-update manifest for the next startup.

use crate::errors::{Result, StoreError};
use crate::manifest::{verify_sha256, ManifestKind, PendingManifest};
use crate::net::{self, download_to_path};
use crate::paths::{archive_file_name, manifest_path, plain_plugin_name};
use crate::version::{normalize, satisfies};
use modula_abi::PluginMetadata;
use reqwest::blocking::Client;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, info, warn};

use crate::types::StageProgress;

pub struct Stager {
    cache_dir: PathBuf,
    client: Client,
}

impl Stager {
    pub fn new(cache_dir: impl Into<PathBuf>, download_timeout: Duration) -> Result<Self> {
        Ok(Self::with_client(cache_dir, net::client(download_timeout)?))
    }

    pub fn with_client(cache_dir: impl Into<PathBuf>, client: Client) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            client,
        }
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    pub fn manifest_path(&self) -> PathBuf {
        manifest_path(&self.cache_dir)
    }

    /// Download each selected update and overwrite the manifest with what succeeded.
    ///
    /// Returns `true` if at least one plugin was staged (a restart will apply it).
    pub fn stage<F>(&self, selected: &[PluginMetadata], mut on_progress: F) -> Result<bool>
    where
        F: FnMut(StageProgress),
    {
        let mut manifest = PendingManifest::new(ManifestKind::Update);
        let total = selected.len();

        for (i, meta) in selected.iter().enumerate() {
            match self.download_one(meta) {
                Ok((name, path)) => manifest.push(name, path),
                Err(e) => error!(plugin = meta.canonical_name(), "failed to download update: {e}"),
            }
            on_progress(StageProgress { done: i + 1, total });
        }

        self.finish(manifest)
    }

    /// Online-install path: like [`Stager::stage`], but each entry's `dependencies`
    /// must be satisfied by `installed` (name -> version) or by another selected entry.
    pub fn stage_install<F>(
        &self,
        selected: &[PluginMetadata],
        installed: &BTreeMap<String, String>,
        mut on_progress: F,
    ) -> Result<bool>
    where
        F: FnMut(StageProgress),
    {
        let mut available = installed.clone();
        for meta in selected {
            available.insert(meta.canonical_name().to_string(), meta.version.clone());
        }

        let mut manifest = PendingManifest::new(ManifestKind::Install);
        let total = selected.len();

        for (i, meta) in selected.iter().enumerate() {
            let unmet = unmet_dependencies(meta, &available);
            if !unmet.is_empty() {
                warn!(
                    plugin = meta.canonical_name(),
                    "skipping install, unmet dependencies: {}",
                    unmet.join(", ")
                );
            } else {
                match self.download_one(meta) {
                    Ok((name, path)) => manifest.push(name, path),
                    Err(e) => error!(plugin = meta.canonical_name(), "failed to download plugin: {e}"),
                }
            }
            on_progress(StageProgress { done: i + 1, total });
        }

        self.finish(manifest)
    }

    fn finish(&self, manifest: PendingManifest) -> Result<bool> {
        let path = self.manifest_path();
        manifest.write(&path)?;
        info!(
            staged = manifest.entries.len(),
            path = %path.display(),
            "wrote pending update manifest"
        );
        Ok(!manifest.is_empty())
    }

    fn download_one(&self, meta: &PluginMetadata) -> Result<(String, PathBuf)> {
        let name = plain_plugin_name(meta.canonical_name())?.to_string();
        if meta.download_url.is_empty() {
            return Err(StoreError::Network(format!("`{name}` has no download_url")));
        }
        let version = normalize(&meta.version)?;
        let dest = self.cache_dir.join(archive_file_name(&name, &version));

        info!(plugin = %name, url = %meta.download_url, "downloading update");
        download_to_path(&self.client, &meta.download_url, &dest)?;

        if let Some(sum) = meta.sha256.as_deref().filter(|s| !s.is_empty()) {
            if let Err(e) = verify_sha256(sum, &dest) {
                let _ = std::fs::remove_file(&dest);
                return Err(e);
            }
        }

        let dest = dest.canonicalize().unwrap_or(dest);
        Ok((name, dest))
    }
}

/// Human-readable list of requirements in `meta.dependencies` that `available` does not meet.
pub fn unmet_dependencies(meta: &PluginMetadata, available: &BTreeMap<String, String>) -> Vec<String> {
    meta.dependencies
        .iter()
        .filter_map(|(dep, req)| match available.get(dep) {
            None => Some(format!("{dep} {req} (missing)")),
            Some(have) => match satisfies(have, req) {
                Ok(true) => None,
                Ok(false) => Some(format!("{dep} {req} (have {have})")),
                Err(e) => Some(format!("{dep} {req} ({e})")),
            },
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_deps(deps: &[(&str, &str)]) -> PluginMetadata {
        let mut m = PluginMetadata::new("ui");
        for (k, v) in deps {
            m.dependencies.insert(k.to_string(), v.to_string());
        }
        m
    }

    #[test]
    fn dependencies_resolve_against_available_versions() {
        let available: BTreeMap<String, String> =
            [("core".to_string(), "1.2".to_string())].into_iter().collect();

        assert!(unmet_dependencies(&with_deps(&[("core", ">=1.0")]), &available).is_empty());

        let unmet = unmet_dependencies(&with_deps(&[("core", ">=2.0"), ("net", "*")]), &available);
        assert_eq!(unmet.len(), 2);
        assert!(unmet[0].contains("have 1.2"));
        assert!(unmet[1].contains("missing"));
    }
}
