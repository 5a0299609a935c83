use super::layout::{contains_cjk, detect_layout};
use super::unzip::{entry_names, extract_flat, unzip_into};
use crate::errors::{Result, StoreError};
use crate::manifest::PendingManifest;
use crate::paths::{is_native_library, plain_plugin_name};
use crate::types::{ApplyReport, InstallOutcome, Layout};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use zip::ZipArchive;

/// Installs staged archives into the plugins directory. Runs once at startup,
/// before the loader.
#[derive(Debug, Clone)]
pub struct Applier {
    plugins_root: PathBuf,
    manifest_path: PathBuf,
}

impl Applier {
    pub fn new(plugins_root: impl Into<PathBuf>, manifest_path: impl Into<PathBuf>) -> Self {
        Self {
            plugins_root: plugins_root.into(),
            manifest_path: manifest_path.into(),
        }
    }

    pub fn plugins_root(&self) -> &Path {
        &self.plugins_root
    }

    /// Install every pending entry once, then reset the manifest to `{}`.
    ///
    /// Failed entries are reported and dropped; they are never retried.
    pub fn apply_pending(&self) -> Result<ApplyReport> {
        let manifest = match PendingManifest::read(&self.manifest_path) {
            Ok(None) => return Ok(ApplyReport::default()),
            Ok(Some(m)) => m,
            Err(e) => {
                warn!(
                    path = %self.manifest_path.display(),
                    "discarding unreadable update manifest: {e}"
                );
                PendingManifest::truncate(&self.manifest_path)?;
                return Ok(ApplyReport::default());
            }
        };

        let mut report = ApplyReport::default();
        for (plugin_name, archive) in &manifest.entries {
            let result = self.install(plugin_name, archive).map_err(|e| e.to_string());
            match &result {
                Ok(layout) => info!(plugin = %plugin_name, ?layout, "plugin update installed"),
                Err(e) => error!(plugin = %plugin_name, archive = %archive.display(), "plugin update failed: {e}"),
            }
            report.outcomes.push(InstallOutcome {
                plugin_name: plugin_name.clone(),
                archive: archive.clone(),
                result,
            });
        }

        PendingManifest::truncate(&self.manifest_path)?;
        Ok(report)
    }

    /// Extract one archive according to its layout.
    pub fn install(&self, plugin_name: &str, archive_path: &Path) -> Result<Layout> {
        let file = fs::File::open(archive_path)?;
        let mut archive = ZipArchive::new(file)?;
        let names = entry_names(&mut archive)?;

        if let Some(bad) = names.iter().find(|n| contains_cjk(n)) {
            return Err(StoreError::ArchiveRejected(format!(
                "entry `{bad}` contains CJK characters"
            )));
        }

        let layout = detect_layout(&names).ok_or_else(|| {
            StoreError::ArchiveRejected(format!(
                "{} matches no known plugin layout",
                archive_path.display()
            ))
        })?;

        match layout {
            Layout::Flat => {
                extract_flat(&mut archive, &self.plugins_root, is_native_library)?;
            }
            Layout::Package => {
                let dest = self.plugins_root.join(plain_plugin_name(plugin_name)?);
                unzip_into(&mut archive, &dest)?;
            }
            Layout::Folder => {
                unzip_into(&mut archive, &self.plugins_root)?;
            }
        }
        Ok(layout)
    }
}
