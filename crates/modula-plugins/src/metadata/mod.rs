mod store;

pub use store::VersionStore;
