mod apply;
mod layout;
mod unzip;

pub use apply::Applier;
pub use layout::{contains_cjk, detect_layout};
pub use unzip::{entry_names, unzip_into};
