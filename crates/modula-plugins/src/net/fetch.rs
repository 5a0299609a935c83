use crate::errors::{Result, StoreError};
use reqwest::blocking::Client;
use serde_json::Value;

/// GET `url` and parse the body as JSON. Any non-2xx status is a `Network` error.
pub fn get_json(client: &Client, url: &str) -> Result<Value> {
    let resp = client
        .get(url)
        .send()
        .map_err(|e| StoreError::Network(format!("GET {url}: {e}")))?;
    let status = resp.status();
    if !status.is_success() {
        return Err(StoreError::Network(format!("GET {url}: {status}")));
    }
    let body = resp
        .text()
        .map_err(|e| StoreError::Network(format!("reading {url}: {e}")))?;
    serde_json::from_str(&body)
        .map_err(|e| StoreError::Network(format!("invalid JSON from {url}: {e}")))
}
