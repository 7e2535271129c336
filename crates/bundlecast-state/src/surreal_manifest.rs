use std::sync::Arc;

use async_trait::async_trait;

use crate::schema::Manifest;
use crate::storage_traits::{ManifestDocument, StorageResult};
use crate::SurrealHandle;

/// SurrealDB-backed implementation of the ManifestDocument trait.
#[derive(Clone)]
pub struct SurrealManifestDocument {
    handle: Arc<SurrealHandle>,
}

impl SurrealManifestDocument {
    pub fn new(handle: Arc<SurrealHandle>) -> Self {
        Self { handle }
    }
}

#[async_trait]
impl ManifestDocument for SurrealManifestDocument {
    async fn load(&self) -> StorageResult<Manifest> {
        self.handle.load_manifest().await
    }

    async fn save(&self, manifest: &Manifest) -> StorageResult<()> {
        self.handle.save_manifest(manifest).await
    }
}
