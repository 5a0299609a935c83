use crate::types::UpdateCheck;
use modula_abi::PluginMetadata;
use std::sync::{Arc, PoisonError, RwLock};

/// Lightweight in-memory state shared between the host loop and its views.
#[derive(Clone, Default)]
pub struct PluginsState {
    inner: Arc<RwLock<Inner>>,
}

#[derive(Default)]
struct Inner {
    checks: Vec<UpdateCheck>,
    restart_required: bool,
}

impl PluginsState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the results of the last check pass.
    pub fn set_checks(&self, rows: Vec<UpdateCheck>) {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .checks = rows;
    }

    pub fn checks(&self) -> Vec<UpdateCheck> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .checks
            .clone()
    }

    /// Remote records of every plugin with a newer compatible version.
    ///
    /// `names` narrows the selection to those plugins (display or canonical name).
    pub fn updatable(&self, names: &[String]) -> Vec<PluginMetadata> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .checks
            .iter()
            .filter(|row| row.has_update())
            .filter_map(|row| row.remote.clone())
            .filter(|remote| {
                names.is_empty()
                    || names
                        .iter()
                        .any(|n| n == &remote.name || n == remote.canonical_name())
            })
            .collect()
    }

    pub fn mark_restart_required(&self) {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .restart_required = true;
    }

    /// True once an update has been staged in this session.
    pub fn restart_required(&self) -> bool {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .restart_required
    }
}
