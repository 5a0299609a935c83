use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0}")]
    Msg(String),

    #[error("build failed: {0}")]
    Build(String),

    #[error("version marker `{marker}` not found in {}", path.display())]
    VersionMarkerNotFound { path: PathBuf, marker: String },

    #[error("upload of `{key}` failed: {reason}")]
    Upload { key: String, reason: String },

    #[error("metadata file {} is corrupt: {reason}", path.display())]
    CorruptMetadata { path: PathBuf, reason: String },

    #[error("malformed version `{0}`")]
    MalformedVersion(String),

    #[error("failed to load plugin {}: {reason}", path.display())]
    Load { path: PathBuf, reason: String },

    #[error("class `{class}` from `{plugin}` is already registered by `{existing}`")]
    Conflict {
        class: String,
        plugin: String,
        existing: String,
    },

    #[error("invalid update info: {0}")]
    InvalidUpdateInfo(String),

    #[error("`{0}` is not a valid plugin name")]
    InvalidPluginName(String),

    #[error("archive rejected: {0}")]
    ArchiveRejected(String),

    #[error("network failure: {0}")]
    Network(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Network error: {0}")]
    Net(#[from] reqwest::Error),

    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Serde error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;
