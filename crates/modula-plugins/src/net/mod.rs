mod download;
mod fetch;

pub use download::download_to_path;
pub use fetch::get_json;

use crate::errors::Result;
use reqwest::blocking::Client;
use std::time::Duration;

/// Bound on a single update-check request.
pub const DEFAULT_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

/// Bound on a single archive download.
pub const DEFAULT_DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(600);

/// Blocking client with rustls and a whole-request timeout.
pub fn client(timeout: Duration) -> Result<Client> {
    Ok(Client::builder()
        .timeout(timeout)
        .user_agent(concat!("modula/", env!("CARGO_PKG_VERSION")))
        .build()?)
}
