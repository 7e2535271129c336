//! Storage trait definitions for Bundlecast
//!
//! These traits define the core storage abstractions:
//! - `BlobStore`: Object storage for published bundles (put by path, get by URL)
//! - `ManifestStore`: The ordered release history (get/prepend/remove)
//! - `ManifestDocument`: Whole-manifest persistence used by serialized stores
//!
//! All traits are async and backend-agnostic. In-memory fakes are provided
//! for testing via the `fakes` module.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::error::StorageError;
use crate::schema::{CommitRecord, Manifest};

/// Result type for storage operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;

// ---------------------------------------------------------------------------
// ContentDigest: dedup key for module payloads
// ---------------------------------------------------------------------------

/// Content digest (SHA-256 hex string).
///
/// The inner field is private to guarantee the string is always lowercase
/// hex produced by `from_bytes`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentDigest(String);

impl ContentDigest {
    /// Compute the SHA-256 digest of the given bytes.
    pub fn from_bytes(data: &[u8]) -> Self {
        use sha2::Digest;
        let mut hasher = Sha256::new();
        hasher.update(data);
        ContentDigest(hex::encode(hasher.finalize()))
    }

    /// Return the full hex string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short form (first 12 hex chars).
    pub fn short(&self) -> &str {
        &self.0[..12.min(self.0.len())]
    }
}

impl std::fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// BlobStore: published bundle storage
// ---------------------------------------------------------------------------

/// Object storage for script bundles and source maps.
///
/// Guarantees:
/// - `put` returns the public URL the object is served from; the same path
///   always yields the same URL (`public_url(path)`).
/// - `get(url)` returns the exact bytes previously stored at that URL, or
///   `StorageError::NotFound`.
/// - Content-addressed paths are never rewritten with different content, so
///   reading a freshly uploaded path is always safe.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store bytes at `path` and return the public URL.
    async fn put(&self, path: &str, data: &[u8], content_type: &str) -> StorageResult<String>;

    /// Fetch the bytes served at `url`.
    async fn get(&self, url: &str) -> StorageResult<Vec<u8>>;

    /// URL that `put(path, ..)` returns, without touching the store.
    fn public_url(&self, path: &str) -> String;
}

// ---------------------------------------------------------------------------
// ManifestStore: ordered release history
// ---------------------------------------------------------------------------

/// Concurrency guarantee a manifest store provides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Consistency {
    /// Every get/prepend/remove runs in one exclusive region: no lost
    /// updates, readers see either the pre- or post-mutation manifest.
    Linearizable,
    /// Unsynchronized read/mutate/write of a shared object. Concurrent
    /// mutations can silently overwrite each other.
    LastWriterWins,
}

/// Owner of the manifest.
///
/// Semantics:
/// - `get` returns the full manifest, newest first (possibly empty).
/// - `prepend` inserts at the head and persists before returning.
/// - `remove` deletes every record with the hash (zero or more), persists
///   before returning, and reports the count.
/// - I/O failures surface as `StorageError`; nothing is retried.
#[async_trait]
pub trait ManifestStore: Send + Sync {
    async fn get(&self) -> StorageResult<Manifest>;

    async fn prepend(&self, record: CommitRecord) -> StorageResult<()>;

    async fn remove(&self, commit_hash: &str) -> StorageResult<usize>;

    /// Which concurrency contract this store provides.
    fn consistency(&self) -> Consistency;
}

/// Whole-document persistence for the manifest.
///
/// Implementations need not be synchronized; `SerializedManifestStore`
/// serializes all access to a document.
#[async_trait]
pub trait ManifestDocument: Send + Sync {
    /// Load the persisted manifest. A document that was never written is an
    /// empty manifest.
    async fn load(&self) -> StorageResult<Manifest>;

    /// Replace the persisted manifest.
    async fn save(&self, manifest: &Manifest) -> StorageResult<()>;
}
