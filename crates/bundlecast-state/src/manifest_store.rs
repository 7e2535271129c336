//! Manifest store variants.
//!
//! - [`SerializedManifestStore`]: every operation runs inside one exclusive
//!   region over a [`ManifestDocument`]. Linearizable.
//! - [`SharedObjectManifestStore`]: read-entire-object / mutate /
//!   write-entire-object against a [`BlobStore`] with no synchronization.
//!   Concurrent publishes and deletes can lose each other's writes; this is
//!   a known weakness reported through [`Consistency::LastWriterWins`].

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, instrument};

use crate::error::StorageError;
use crate::schema::{CommitRecord, Manifest};
use crate::storage_traits::{
    BlobStore, Consistency, ManifestDocument, ManifestStore, StorageResult,
};

/// Object path used by the shared-object variant.
pub const DEFAULT_MANIFEST_OBJECT: &str = "updates.json";

// ---------------------------------------------------------------------------
// SerializedManifestStore
// ---------------------------------------------------------------------------

/// Manifest store whose read-then-mutate sequences never interleave.
///
/// Each operation takes the region lock, loads the document, and (for
/// mutations) saves the new manifest before releasing it. A failed save
/// leaves the persisted manifest as it was.
pub struct SerializedManifestStore {
    document: Box<dyn ManifestDocument>,
    region: Mutex<()>,
}

impl SerializedManifestStore {
    pub fn new(document: impl ManifestDocument + 'static) -> Self {
        Self {
            document: Box::new(document),
            region: Mutex::new(()),
        }
    }
}

#[async_trait]
impl ManifestStore for SerializedManifestStore {
    async fn get(&self) -> StorageResult<Manifest> {
        let _region = self.region.lock().await;
        self.document.load().await
    }

    #[instrument(skip(self, record), fields(commit = %record.commit_hash))]
    async fn prepend(&self, record: CommitRecord) -> StorageResult<()> {
        let _region = self.region.lock().await;
        let mut manifest = self.document.load().await?;
        manifest.prepend(record);
        self.document.save(&manifest).await?;
        debug!(records = manifest.len(), "manifest head advanced");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn remove(&self, commit_hash: &str) -> StorageResult<usize> {
        let _region = self.region.lock().await;
        let mut manifest = self.document.load().await?;
        let removed = manifest.remove(commit_hash);
        self.document.save(&manifest).await?;
        debug!(removed, records = manifest.len(), "manifest records removed");
        Ok(removed)
    }

    fn consistency(&self) -> Consistency {
        Consistency::Linearizable
    }
}

// ---------------------------------------------------------------------------
// SharedObjectManifestStore
// ---------------------------------------------------------------------------

/// Manifest kept as a single JSON object in blob storage.
///
/// No exclusive region: two concurrent mutations both read the same
/// manifest and the later write wins, dropping the other's change.
pub struct SharedObjectManifestStore {
    blobs: Arc<dyn BlobStore>,
    object_path: String,
}

impl SharedObjectManifestStore {
    pub fn new(blobs: Arc<dyn BlobStore>) -> Self {
        Self::with_object_path(blobs, DEFAULT_MANIFEST_OBJECT)
    }

    pub fn with_object_path(blobs: Arc<dyn BlobStore>, object_path: impl Into<String>) -> Self {
        Self {
            blobs,
            object_path: object_path.into(),
        }
    }

    async fn write(&self, manifest: &Manifest) -> StorageResult<()> {
        let body = serde_json::to_vec(manifest)?;
        self.blobs
            .put(&self.object_path, &body, "application/json")
            .await?;
        Ok(())
    }
}

#[async_trait]
impl ManifestStore for SharedObjectManifestStore {
    async fn get(&self) -> StorageResult<Manifest> {
        let url = self.blobs.public_url(&self.object_path);
        match self.blobs.get(&url).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(StorageError::NotFound { .. }) => Ok(Manifest::new()),
            Err(e) => Err(e),
        }
    }

    #[instrument(skip(self, record), fields(commit = %record.commit_hash))]
    async fn prepend(&self, record: CommitRecord) -> StorageResult<()> {
        let mut manifest = self.get().await?;
        manifest.prepend(record);
        self.write(&manifest).await
    }

    #[instrument(skip(self))]
    async fn remove(&self, commit_hash: &str) -> StorageResult<usize> {
        let mut manifest = self.get().await?;
        let removed = manifest.remove(commit_hash);
        self.write(&manifest).await?;
        Ok(removed)
    }

    fn consistency(&self) -> Consistency {
        Consistency::LastWriterWins
    }
}
