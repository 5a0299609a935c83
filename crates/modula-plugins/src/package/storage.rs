use crate::errors::{Result, StoreError};
use reqwest::blocking::Client;
use std::fs;
use std::path::Path;
use tracing::info;

/// Destination for published artifacts.
pub trait ObjectStore {
    /// Upload `path` under `key`. Success means the object is publicly reachable.
    fn put_file(&self, key: &str, path: &Path) -> Result<()>;

    /// Public URL of `key`.
    fn public_url(&self, key: &str) -> String;
}

/// S3-style bucket that accepts `PUT <endpoint>/<bucket>/<key>`.
#[derive(Debug, Clone)]
pub struct HttpObjectStore {
    client: Client,
    endpoint: String,
    bucket: String,
    base_url: String,
    token: Option<String>,
}

impl HttpObjectStore {
    pub fn new(
        client: Client,
        endpoint: impl Into<String>,
        bucket: impl Into<String>,
        base_url: impl Into<String>,
        token: Option<String>,
    ) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            bucket: bucket.into(),
            base_url: base_url.into(),
            token,
        }
    }

    fn object_url(&self, key: &str) -> String {
        format!(
            "{}/{}/{}",
            self.endpoint.trim_end_matches('/'),
            self.bucket.trim_matches('/'),
            key.trim_start_matches('/')
        )
    }
}

impl ObjectStore for HttpObjectStore {
    fn put_file(&self, key: &str, path: &Path) -> Result<()> {
        let body = fs::read(path)?;
        let url = self.object_url(key);
        let content_type = if key.ends_with(".json") {
            "application/json"
        } else {
            "application/zip"
        };

        let mut req = self
            .client
            .put(&url)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(body);
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }

        let resp = req.send().map_err(|e| StoreError::Upload {
            key: key.to_string(),
            reason: e.to_string(),
        })?;
        if !resp.status().is_success() {
            return Err(StoreError::Upload {
                key: key.to_string(),
                reason: format!("server answered {}", resp.status()),
            });
        }
        info!(key, url = %url, "uploaded object");
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            key.trim_start_matches('/')
        )
    }
}
