//! HTTP object storage client.
//!
//! Uploads with an authenticated `PUT <upload_endpoint>/<path>` and reads
//! back from the public CDN URL. Objects are written `public-read`, since
//! clients download bundles straight from the CDN.

use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::{debug, info};

use crate::error::StorageError;
use crate::storage_traits::{BlobStore, StorageResult};

/// HTTP object storage configuration
#[derive(Debug, Clone)]
pub struct HttpBlobConfig {
    /// Base URL uploads are sent to (e.g. "https://objects.example.com/bucket")
    pub upload_endpoint: String,
    /// Base URL objects are served from (e.g. "https://cdn.example.com")
    pub public_base: String,
    /// Bearer token for uploads
    pub token: Option<String>,
}

impl HttpBlobConfig {
    pub fn new(upload_endpoint: impl Into<String>, public_base: impl Into<String>) -> Self {
        Self {
            upload_endpoint: upload_endpoint.into().trim_end_matches('/').to_string(),
            public_base: public_base.into().trim_end_matches('/').to_string(),
            token: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }
}

/// Blob store speaking plain HTTP to an object gateway.
pub struct HttpBlobStore {
    config: HttpBlobConfig,
    http_client: reqwest::Client,
}

impl HttpBlobStore {
    pub fn new(config: HttpBlobConfig) -> StorageResult<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("bundlecast/", env!("CARGO_PKG_VERSION")))
            .build()?;
        info!(
            upload_endpoint = %config.upload_endpoint,
            public_base = %config.public_base,
            "HTTP blob store configured"
        );
        Ok(Self {
            config,
            http_client,
        })
    }

    fn upload_url(&self, path: &str) -> String {
        format!("{}/{}", self.config.upload_endpoint, path)
    }
}

#[async_trait]
impl BlobStore for HttpBlobStore {
    async fn put(&self, path: &str, data: &[u8], content_type: &str) -> StorageResult<String> {
        let mut request = self
            .http_client
            .put(self.upload_url(path))
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .header("x-amz-acl", "public-read")
            .body(data.to_vec());
        if let Some(token) = &self.config.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(StorageError::Backend(format!(
                "upload of {} failed (status: {})",
                path,
                response.status()
            )));
        }

        debug!(path, bytes = data.len(), "blob uploaded");
        Ok(self.public_url(path))
    }

    async fn get(&self, url: &str) -> StorageResult<Vec<u8>> {
        let response = self.http_client.get(url).send().await?;
        match response.status() {
            status if status.is_success() => Ok(response.bytes().await?.to_vec()),
            StatusCode::NOT_FOUND => Err(StorageError::NotFound {
                location: url.to_string(),
            }),
            status => Err(StorageError::Backend(format!(
                "Failed to fetch {} (status: {})",
                url, status
            ))),
        }
    }

    fn public_url(&self, path: &str) -> String {
        format!("{}/{}", self.config.public_base, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_are_joined_without_double_slashes() {
        let store = HttpBlobStore::new(HttpBlobConfig::new(
            "https://objects.test/bucket/",
            "https://cdn.test/",
        ))
        .unwrap();
        assert_eq!(
            store.upload_url("main/abc.js"),
            "https://objects.test/bucket/main/abc.js"
        );
        assert_eq!(store.public_url("main/abc.js"), "https://cdn.test/main/abc.js");
    }

    #[test]
    fn token_is_optional() {
        let config = HttpBlobConfig::new("https://objects.test", "https://cdn.test");
        assert!(config.token.is_none());
        assert_eq!(config.with_token("secret").token.as_deref(), Some("secret"));
    }
}
