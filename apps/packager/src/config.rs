use anyhow::{Context, Result};
use modula_plugins::package::{BuildTarget, VersionMarker, DEFAULT_STORAGE_DIR};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PackagerConfig {
    pub storage: StorageConfig,
    pub build: BuildConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Object store endpoint; objects are PUT to `<endpoint>/<bucket>/<key>`.
    pub endpoint: String,
    pub bucket: String,
    /// Public prefix the uploaded keys are reachable under.
    pub base_url: String,
    pub dir: String,
    /// Env var holding the bearer token, if the store needs one.
    pub token_env: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            bucket: String::new(),
            base_url: String::new(),
            dir: DEFAULT_STORAGE_DIR.into(),
            token_env: "MODULA_STORAGE_TOKEN".into(),
        }
    }
}

impl StorageConfig {
    pub fn token(&self) -> Option<String> {
        if self.token_env.is_empty() {
            return None;
        }
        std::env::var(&self.token_env).ok().filter(|t| !t.is_empty())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Plugin sources live in `<source_root>/<plugin>`.
    pub source_root: PathBuf,
    /// `info.json` records live in `<info_root>/<plugin>/info.json`.
    pub info_root: PathBuf,
    pub out_dir: PathBuf,
    pub program: String,
    pub args: Vec<String>,
    pub artifact: String,
    pub marker_file: PathBuf,
    pub marker_pattern: String,
}

impl Default for BuildConfig {
    fn default() -> Self {
        let target = BuildTarget::default();
        let marker = VersionMarker::default();
        Self {
            source_root: PathBuf::from("plugins"),
            info_root: PathBuf::from("package"),
            out_dir: PathBuf::from("target/plugins"),
            program: target.program,
            args: target.args,
            artifact: target.artifact,
            marker_file: marker.file,
            marker_pattern: marker.pattern,
        }
    }
}

impl BuildConfig {
    pub fn target(&self) -> BuildTarget {
        BuildTarget {
            program: self.program.clone(),
            args: self.args.clone(),
            artifact: self.artifact.clone(),
        }
    }

    pub fn marker(&self) -> VersionMarker {
        VersionMarker {
            file: self.marker_file.clone(),
            pattern: self.marker_pattern.clone(),
        }
    }

    pub fn source_dir(&self, plugin_name: &str) -> PathBuf {
        self.source_root.join(plugin_name)
    }
}

impl PackagerConfig {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("parsing {}", path.display()))
    }
}
