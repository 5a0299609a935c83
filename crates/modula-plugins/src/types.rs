use modula_abi::PluginMetadata;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Per-row outcome of an update check (what the version dialog shows).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CheckStatus {
    NotConfigured,
    CheckFailed,
    InvalidUpdateInfo,
    AlreadyLatest,
    NewVersionAvailable,
    /// Newer version exists but needs a newer host (`min_app_version`).
    RequiresNewerApp(String),
}

impl CheckStatus {
    pub fn label(&self) -> &'static str {
        match self {
            CheckStatus::NotConfigured => "not configured",
            CheckStatus::CheckFailed => "check failed",
            CheckStatus::InvalidUpdateInfo => "invalid update info",
            CheckStatus::AlreadyLatest => "already latest",
            CheckStatus::NewVersionAvailable => "new version available",
            CheckStatus::RequiresNewerApp(_) => "requires newer app",
        }
    }
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckStatus::RequiresNewerApp(min) => write!(f, "{} (>= {min})", self.label()),
            other => f.write_str(other.label()),
        }
    }
}

/// One checked plugin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateCheck {
    pub name: String,
    pub current_version: String,
    pub latest_version: Option<String>,
    pub status: CheckStatus,
    /// Validated remote record; present whenever `latest_version` is.
    pub remote: Option<PluginMetadata>,
}

impl UpdateCheck {
    pub fn has_update(&self) -> bool {
        self.status == CheckStatus::NewVersionAvailable
    }
}

/// Emitted once per plugin processed by the stager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageProgress {
    pub done: usize,
    pub total: usize,
}

/// Archive layouts the applier recognizes, in dispatch order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// A: native libraries, extracted flat into the plugins root.
    Flat,
    /// B: top-level `plugin.json`, extracted into `<root>/<plugin>/`.
    Package,
    /// C: first entry lives in a folder, extracted into the root as-is.
    Folder,
}

#[derive(Debug, Clone)]
pub struct InstallOutcome {
    pub plugin_name: String,
    pub archive: PathBuf,
    pub result: Result<Layout, String>,
}

/// Result of one startup apply pass.
#[derive(Debug, Clone, Default)]
pub struct ApplyReport {
    pub outcomes: Vec<InstallOutcome>,
}

impl ApplyReport {
    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn failures(&self) -> impl Iterator<Item = &InstallOutcome> {
        self.outcomes.iter().filter(|o| o.result.is_err())
    }
}

impl fmt::Display for ApplyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for o in &self.outcomes {
            match &o.result {
                Ok(_) => writeln!(f, "plugin {} updated successfully", o.plugin_name)?,
                Err(e) => writeln!(f, "plugin {} update failed: {e}", o.plugin_name)?,
            }
        }
        Ok(())
    }
}
