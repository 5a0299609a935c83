use super::builder::ArtifactBuilder;
use super::marker::VersionMarker;
use super::storage::ObjectStore;
use crate::errors::Result;
use crate::manifest::sha256_file;
use crate::metadata::VersionStore;
use crate::paths::{archive_file_name, INFO_FILE};
use crate::version::{increment_patch, normalize};
use modula_abi::PluginMetadata;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

/// Default key prefix for published plugins.
pub const DEFAULT_STORAGE_DIR: &str = "package";

/// Bumps, builds and uploads one plugin release.
pub struct Publisher<S: ObjectStore> {
    versions: VersionStore,
    builder: ArtifactBuilder,
    marker: VersionMarker,
    store: S,
    dir: String,
}

impl<S: ObjectStore> Publisher<S> {
    pub fn new(versions: VersionStore, builder: ArtifactBuilder, store: S) -> Self {
        Self {
            versions,
            builder,
            marker: VersionMarker::default(),
            store,
            dir: DEFAULT_STORAGE_DIR.to_string(),
        }
    }

    pub fn with_marker(mut self, marker: VersionMarker) -> Self {
        self.marker = marker;
        self
    }

    pub fn with_dir(mut self, dir: impl Into<String>) -> Self {
        self.dir = dir.into().trim_matches('/').to_string();
        self
    }

    pub fn versions(&self) -> &VersionStore {
        &self.versions
    }

    /// `<dir>/<plugin>/<file>`
    pub fn object_key(&self, plugin_name: &str, file: &str) -> String {
        if self.dir.is_empty() {
            format!("{plugin_name}/{file}")
        } else {
            format!("{}/{plugin_name}/{file}", self.dir)
        }
    }

    /// Full publish: bump the version marker, build, upload, persist.
    ///
    /// On any failure after the marker rewrite the source file is restored, so a
    /// retry starts from the same version.
    pub fn publish(
        &self,
        plugin_name: &str,
        source_dir: &Path,
        release_notes: &str,
    ) -> Result<PluginMetadata> {
        let meta = self.versions.load_or_create(plugin_name)?;
        let next = increment_patch(&meta.version)?;
        info!(plugin = plugin_name, from = %meta.version, to = %next, "publishing");

        let backup = self.marker.rewrite(source_dir, &meta.version, &next)?;

        let result = self
            .builder
            .build(plugin_name, source_dir, &next)
            .and_then(|archive| self.upload_release(plugin_name, meta, &next, release_notes, &archive));

        if result.is_err() {
            let path = backup.path().to_path_buf();
            if let Err(e) = backup.restore() {
                warn!(path = %path.display(), "failed to restore version marker: {e}");
            }
        }
        result
    }

    /// Upload an already built archive and its metadata, then persist locally.
    pub fn upload_release(
        &self,
        plugin_name: &str,
        mut meta: PluginMetadata,
        version: &str,
        release_notes: &str,
        archive: &Path,
    ) -> Result<PluginMetadata> {
        let version = normalize(version)?;
        let zip_key = self.object_key(plugin_name, &archive_file_name(plugin_name, &version));
        self.store.put_file(&zip_key, archive)?;

        meta.version = version;
        meta.release_notes = release_notes.to_string();
        meta.download_url = self.store.public_url(&zip_key);
        meta.plugin_name = plugin_name.to_string();
        meta.sha256 = Some(sha256_file(archive)?);

        let staged_info = archive.with_file_name(INFO_FILE);
        fs::write(&staged_info, serde_json::to_vec_pretty(&meta)?)?;
        self.store
            .put_file(&self.object_key(plugin_name, INFO_FILE), &staged_info)?;

        self.versions.persist(plugin_name, &meta)?;
        info!(
            plugin = plugin_name,
            version = %meta.version,
            url = %meta.download_url,
            "published"
        );
        Ok(meta)
    }
}
