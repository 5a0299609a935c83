//! Developer side: build a plugin, bump its version, upload it.

mod builder;
mod marker;
mod publisher;
mod storage;

pub use builder::{zip_single_file, ArtifactBuilder, BuildTarget};
pub use marker::{MarkerBackup, VersionMarker};
pub use publisher::{Publisher, DEFAULT_STORAGE_DIR};
pub use storage::{HttpObjectStore, ObjectStore};
