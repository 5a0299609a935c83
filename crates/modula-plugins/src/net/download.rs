use crate::errors::{Result, StoreError};
use reqwest::blocking::Client;
use std::fs;
use std::io::{Read, Write};
use std::path::Path;

/// Blocking download into `dest`. Caller keeps this off the UI thread.
///
/// A partially written file is removed on failure.
pub fn download_to_path(client: &Client, url: &str, dest: &Path) -> Result<()> {
    let result = fetch_into(client, url, dest);
    if result.is_err() && dest.exists() {
        let _ = fs::remove_file(dest);
    }
    result
}

fn fetch_into(client: &Client, url: &str, dest: &Path) -> Result<()> {
    let mut resp = client
        .get(url)
        .send()
        .map_err(|e| StoreError::Network(format!("GET {url}: {e}")))?;
    if !resp.status().is_success() {
        return Err(StoreError::Network(format!(
            "download of {url} failed: {}",
            resp.status()
        )));
    }

    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut out = fs::File::create(dest)?;
    let mut buf = [0u8; 128 * 1024];

    loop {
        let n = resp
            .read(&mut buf)
            .map_err(|e| StoreError::Network(format!("reading {url}: {e}")))?;
        if n == 0 {
            break;
        }
        out.write_all(&buf[..n])?;
    }
    out.flush()?;

    Ok(())
}
