use anyhow::{Context, Result};
use modula_plugins::net::{DEFAULT_CHECK_TIMEOUT, DEFAULT_DOWNLOAD_TIMEOUT};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const ENV_PLUGINS_DIR: &str = "MODULA_PLUGINS_DIR";
const ENV_CACHE_DIR: &str = "MODULA_CACHE_DIR";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    pub paths: PathsConfig,
    pub log: LogConfig,
    pub update: UpdateConfig,
    /// Widget class name -> enabled. Classes not listed are enabled.
    pub plugins: BTreeMap<String, bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plugins_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub file_level: String,
    pub ui_level: String,
    pub console_level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            file_level: "debug".into(),
            ui_level: "info".into(),
            console_level: "warn".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateConfig {
    pub check_timeout_secs: u64,
    pub download_timeout_secs: u64,
}

impl Default for UpdateConfig {
    fn default() -> Self {
        Self {
            check_timeout_secs: DEFAULT_CHECK_TIMEOUT.as_secs(),
            download_timeout_secs: DEFAULT_DOWNLOAD_TIMEOUT.as_secs(),
        }
    }
}

impl UpdateConfig {
    pub fn check_timeout(&self) -> Duration {
        Duration::from_secs(self.check_timeout_secs.max(1))
    }

    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs.max(1))
    }
}

impl HostConfig {
    /// Load `path` if it exists (defaults otherwise), then apply env overrides.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = Self::read(path)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// The file as written, without env overrides. Use this for read-modify-save.
    pub fn read(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text =
            fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("parsing {}", path.display()))
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(dir) = var(ENV_PLUGINS_DIR) {
            self.paths.plugins_dir = Some(PathBuf::from(dir));
        }
        if let Some(dir) = var(ENV_CACHE_DIR) {
            self.paths.cache_dir = Some(PathBuf::from(dir));
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let text = toml::to_string_pretty(self).context("serializing config")?;
        fs::write(path, text).with_context(|| format!("writing {}", path.display()))?;
        Ok(())
    }

    pub fn plugins_dir(&self) -> PathBuf {
        self.paths
            .plugins_dir
            .clone()
            .unwrap_or_else(modula_plugins::plugins_dir)
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.paths
            .cache_dir
            .clone()
            .unwrap_or_else(modula_plugins::cache_dir)
    }

    pub fn is_enabled(&self, class_name: &str) -> bool {
        self.plugins.get(class_name).copied().unwrap_or(true)
    }
}
