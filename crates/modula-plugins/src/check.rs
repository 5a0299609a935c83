//! Poll each plugin's `update_url` and classify the answer.

use crate::errors::{Result, StoreError};
use crate::net::{self, get_json};
use crate::types::{CheckStatus, UpdateCheck};
use crate::version::{is_newer, normalize};
use modula_abi::metadata::missing_remote_keys;
use modula_abi::PluginMetadata;
use reqwest::blocking::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

pub struct UpdateChecker {
    client: Client,
    app_version: String,
}

impl UpdateChecker {
    /// `app_version` is the running host version, compared with `min_app_version`.
    pub fn new(timeout: Duration, app_version: impl Into<String>) -> Result<Self> {
        Ok(Self::with_client(net::client(timeout)?, app_version))
    }

    pub fn with_client(client: Client, app_version: impl Into<String>) -> Self {
        Self {
            client,
            app_version: app_version.into(),
        }
    }

    /// Check every plugin in order; one unreachable server never affects the others.
    pub fn check_all(&self, plugins: &[PluginMetadata]) -> Vec<UpdateCheck> {
        plugins.iter().map(|p| self.check(p)).collect()
    }

    pub fn check(&self, local: &PluginMetadata) -> UpdateCheck {
        if local.update_url.trim().is_empty() {
            return classify(local, None, &self.app_version);
        }
        let fetched = get_json(&self.client, &local.update_url);
        if let Err(e) = &fetched {
            warn!(plugin = %local.name, url = %local.update_url, "update check failed: {e}");
        }
        classify(local, Some(fetched.ok()), &self.app_version)
    }

    /// Fetch and validate a remote record directly (online install by URL).
    pub fn fetch_remote(&self, url: &str) -> Result<PluginMetadata> {
        let value = get_json(&self.client, url)?;
        let missing = missing_remote_keys(&value);
        if !missing.is_empty() {
            return Err(StoreError::InvalidUpdateInfo(format!(
                "{url}: missing {}",
                missing.join(", ")
            )));
        }
        let remote: PluginMetadata = serde_json::from_value(value)
            .map_err(|e| StoreError::InvalidUpdateInfo(format!("{url}: {e}")))?;
        normalize(&remote.version)
            .map_err(|e| StoreError::InvalidUpdateInfo(format!("{url}: {e}")))?;
        Ok(remote)
    }
}

/// Pure classification of one check.
///
/// `response` is `None` when no update URL is configured and `Some(None)` when
/// the request failed.
pub fn classify(
    local: &PluginMetadata,
    response: Option<Option<Value>>,
    app_version: &str,
) -> UpdateCheck {
    let mut row = UpdateCheck {
        name: local.name.clone(),
        current_version: local.version.clone(),
        latest_version: None,
        status: CheckStatus::NotConfigured,
        remote: None,
    };

    let value = match response {
        None => return row,
        Some(None) => {
            row.status = CheckStatus::CheckFailed;
            return row;
        }
        Some(Some(v)) => v,
    };

    let missing = missing_remote_keys(&value);
    if !missing.is_empty() {
        debug!(plugin = %local.name, ?missing, "update info is missing keys");
        row.status = CheckStatus::InvalidUpdateInfo;
        return row;
    }

    let remote: PluginMetadata = match serde_json::from_value(value) {
        Ok(r) => r,
        Err(e) => {
            debug!(plugin = %local.name, "update info does not deserialize: {e}");
            row.status = CheckStatus::InvalidUpdateInfo;
            return row;
        }
    };

    let newer = match is_newer(&remote.version, &local.version) {
        Ok(n) => n,
        Err(e) => {
            debug!(plugin = %local.name, "cannot compare versions: {e}");
            row.status = CheckStatus::InvalidUpdateInfo;
            return row;
        }
    };

    row.latest_version = Some(normalize(&remote.version).unwrap_or_else(|_| remote.version.clone()));
    row.status = if !newer {
        CheckStatus::AlreadyLatest
    } else {
        match remote.min_app_version.as_deref() {
            Some(min) if is_newer(min, app_version).unwrap_or(false) => {
                CheckStatus::RequiresNewerApp(min.to_string())
            }
            _ => CheckStatus::NewVersionAvailable,
        }
    };
    row.remote = Some(remote);
    row
}
