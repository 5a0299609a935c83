//! modula-plugins
//!
//! Blocking I/O core of Modula's plugin lifecycle.
//! - Builds, versions and publishes plugin archives (`package`, `metadata`).
//! - Loads installed plugins through the `modula-abi` entry point (`loader`).
//! - Checks for, downloads and stages updates (`check`, `stage`, `worker`).
//! - Applies staged archives on the next start (`install`).
//!
//! Hosts keep the network-bound parts on [`worker::UpdateWorker`].

pub mod check;
pub mod errors;
pub mod install;
pub mod loader;
pub mod manifest;
pub mod metadata;
pub mod net;
pub mod package;
pub mod paths;
pub mod stage;
pub mod state;
pub mod types;
pub mod version;
pub mod worker;

pub use check::UpdateChecker;
pub use errors::{Result, StoreError};
pub use install::Applier;
pub use loader::{InstalledPlugin, PluginLoader, PluginRegistry};
pub use manifest::{ManifestKind, PendingManifest};
pub use metadata::VersionStore;
pub use package::{ArtifactBuilder, BuildTarget, HttpObjectStore, ObjectStore, Publisher, VersionMarker};
pub use paths::*;
pub use stage::Stager;
pub use state::PluginsState;
pub use types::*;
pub use worker::{Job, UpdateWorker, WorkerEvent};

pub use modula_abi::PluginMetadata;
