//! Daemon configuration: command-line flags with environment fallbacks.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use bundlecast_state::{
    BlobStore, CloudConfig, FileManifestDocument, FsBlobStore, HttpBlobConfig, HttpBlobStore,
    ManifestStore, SerializedManifestStore, SharedObjectManifestStore, StorageError,
    SurrealHandle, SurrealManifestDocument,
};
use clap::{Parser, ValueEnum};

pub const DEFAULT_MAX_BODY_BYTES: usize = 64 * 1024 * 1024;

/// Where the manifest lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ManifestBackend {
    /// JSON file on local disk, serialized access.
    File,
    /// In-process SurrealDB, serialized access. Lost on restart.
    SurrealMemory,
    /// SurrealDB over WebSocket, configured from `SURREALDB_*` variables.
    SurrealCloud,
    /// `updates.json` in the blob store, unsynchronized.
    SharedObject,
}

/// Where module bundles are uploaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BlobBackend {
    Fs,
    Http,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("API token is not set (pass --api-token or set API_TOKEN)")]
    MissingApiToken,

    #[error("--blob-endpoint is required with --blob-backend http")]
    MissingBlobEndpoint,

    #[error("--manifest-backend surreal-cloud needs SurrealDB credentials: {0}")]
    MissingCloudConfig(String),

    #[error("failed to open store: {0}")]
    Store(#[from] StorageError),
}

#[derive(Debug, Clone, Parser)]
#[command(name = "bundlecastd")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Hot-swappable module update server", long_about = None)]
pub struct Config {
    /// Address to listen on
    #[arg(long, env = "BUNDLECAST_LISTEN", default_value = "0.0.0.0:8787")]
    pub listen: SocketAddr,

    /// Bearer token required for push and delete
    #[arg(long, env = "API_TOKEN", hide_env_values = true)]
    pub api_token: Option<String>,

    #[arg(
        long,
        env = "BUNDLECAST_MANIFEST_BACKEND",
        value_enum,
        default_value_t = ManifestBackend::File
    )]
    pub manifest_backend: ManifestBackend,

    /// Manifest file for the `file` backend
    #[arg(long, env = "BUNDLECAST_MANIFEST_PATH", default_value = "./data/updates.json")]
    pub manifest_path: PathBuf,

    #[arg(long, env = "BUNDLECAST_BLOB_BACKEND", value_enum, default_value_t = BlobBackend::Fs)]
    pub blob_backend: BlobBackend,

    /// Root directory for the `fs` blob backend
    #[arg(long, env = "BUNDLECAST_BLOB_ROOT", default_value = "./data/blobs")]
    pub blob_root: PathBuf,

    /// Upload base URL for the `http` blob backend
    #[arg(long, env = "BUNDLECAST_BLOB_ENDPOINT")]
    pub blob_endpoint: Option<String>,

    /// Bearer token for the `http` blob backend
    #[arg(long, env = "BUNDLECAST_BLOB_TOKEN", hide_env_values = true)]
    pub blob_token: Option<String>,

    /// Public URL prefix that uploaded objects are served from
    #[arg(long, env = "BUNDLECAST_PUBLIC_URL", default_value = "http://localhost:8787/blobs")]
    pub public_url: String,

    /// Largest accepted request body, in bytes
    #[arg(long, env = "BUNDLECAST_MAX_BODY_BYTES", default_value_t = DEFAULT_MAX_BODY_BYTES)]
    pub max_body_bytes: usize,

    /// Emit JSON log lines
    #[arg(long)]
    pub json: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Config {
    /// The API token, or a fatal error when it is absent or empty.
    pub fn api_token(&self) -> Result<&str, ConfigError> {
        self.api_token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or(ConfigError::MissingApiToken)
    }

    /// Open the configured blob and manifest stores.
    pub async fn open_stores(
        &self,
    ) -> Result<(Arc<dyn ManifestStore>, Arc<dyn BlobStore>), ConfigError> {
        let blobs = self.open_blob_store()?;

        let manifests: Arc<dyn ManifestStore> = match self.manifest_backend {
            ManifestBackend::File => Arc::new(SerializedManifestStore::new(
                FileManifestDocument::new(self.manifest_path.clone()),
            )),
            ManifestBackend::SurrealMemory => {
                let handle = Arc::new(SurrealHandle::setup_db().await?);
                Arc::new(SerializedManifestStore::new(SurrealManifestDocument::new(
                    handle,
                )))
            }
            ManifestBackend::SurrealCloud => {
                let cloud = CloudConfig::from_env().map_err(ConfigError::MissingCloudConfig)?;
                let handle = Arc::new(SurrealHandle::setup_cloud(cloud).await?);
                Arc::new(SerializedManifestStore::new(SurrealManifestDocument::new(
                    handle,
                )))
            }
            ManifestBackend::SharedObject => {
                Arc::new(SharedObjectManifestStore::new(blobs.clone()))
            }
        };

        Ok((manifests, blobs))
    }

    fn open_blob_store(&self) -> Result<Arc<dyn BlobStore>, ConfigError> {
        match self.blob_backend {
            BlobBackend::Fs => Ok(Arc::new(FsBlobStore::new(
                &self.blob_root,
                self.public_url.clone(),
            )?)),
            BlobBackend::Http => {
                let endpoint = self
                    .blob_endpoint
                    .clone()
                    .ok_or(ConfigError::MissingBlobEndpoint)?;
                let mut config = HttpBlobConfig::new(endpoint, self.public_url.clone());
                if let Some(token) = &self.blob_token {
                    config = config.with_token(token.clone());
                }
                Ok(Arc::new(HttpBlobStore::new(config)?))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bundlecast_state::Consistency;

    fn parse(args: &[&str]) -> Config {
        Config::try_parse_from(std::iter::once("bundlecastd").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn defaults() {
        let config = parse(&["--api-token", "secret"]);
        assert_eq!(config.listen, "0.0.0.0:8787".parse().unwrap());
        assert_eq!(config.manifest_backend, ManifestBackend::File);
        assert_eq!(config.blob_backend, BlobBackend::Fs);
        assert_eq!(config.max_body_bytes, DEFAULT_MAX_BODY_BYTES);
        assert_eq!(config.api_token().unwrap(), "secret");
    }

    #[test]
    fn missing_or_empty_token_is_fatal() {
        let mut config = parse(&[]);
        config.api_token = None;
        assert!(matches!(config.api_token(), Err(ConfigError::MissingApiToken)));

        config.api_token = Some(String::new());
        assert!(matches!(config.api_token(), Err(ConfigError::MissingApiToken)));
    }

    #[test]
    fn backends_parse_from_kebab_case() {
        let config = parse(&[
            "--manifest-backend",
            "shared-object",
            "--blob-backend",
            "http",
            "--blob-endpoint",
            "https://uploads.test",
        ]);
        assert_eq!(config.manifest_backend, ManifestBackend::SharedObject);
        assert_eq!(config.blob_backend, BlobBackend::Http);
    }

    #[tokio::test]
    async fn http_backend_needs_endpoint() {
        let mut config = parse(&["--blob-backend", "http"]);
        config.blob_endpoint = None;
        assert!(matches!(
            config.open_stores().await,
            Err(ConfigError::MissingBlobEndpoint)
        ));
    }

    #[tokio::test]
    async fn surreal_cloud_without_credentials_is_fatal() {
        for var in ["SURREALDB_ENDPOINT", "SURREALDB_USERNAME", "SURREALDB_PASSWORD"] {
            std::env::remove_var(var);
        }
        let dir = tempfile::tempdir().unwrap();
        let mut config = parse(&["--manifest-backend", "surreal-cloud"]);
        config.blob_root = dir.path().to_path_buf();

        match config.open_stores().await {
            Err(ConfigError::MissingCloudConfig(reason)) => {
                assert!(reason.contains("SURREALDB_ENDPOINT"), "{reason}");
            }
            Err(other) => panic!("expected missing cloud config, got {other}"),
            Ok(_) => panic!("surreal-cloud opened without credentials"),
        }
    }

    #[tokio::test]
    async fn opens_file_and_fs_stores() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = parse(&[]);
        config.manifest_path = dir.path().join("updates.json");
        config.blob_root = dir.path().join("blobs");

        let (manifests, blobs) = config.open_stores().await.unwrap();
        assert_eq!(manifests.consistency(), Consistency::Linearizable);
        assert!(manifests.get().await.unwrap().is_empty());
        assert_eq!(blobs.public_url("main/x.js"), "http://localhost:8787/blobs/main/x.js");
    }

    #[tokio::test]
    async fn shared_object_backend_is_last_writer_wins() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = parse(&["--manifest-backend", "shared-object"]);
        config.blob_root = dir.path().to_path_buf();

        let (manifests, _blobs) = config.open_stores().await.unwrap();
        assert_eq!(manifests.consistency(), Consistency::LastWriterWins);
    }
}
