//! Filesystem backends: a blob store serving objects under a public base
//! URL, and a JSON manifest document.
//!
//! Both write atomically (temp file in the target directory, then rename),
//! so a reader never observes a half-written object or manifest.

use std::io::Write;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::StorageError;
use crate::schema::Manifest;
use crate::storage_traits::{BlobStore, ManifestDocument, StorageResult};

async fn write_atomic(target: PathBuf, data: Vec<u8>) -> StorageResult<()> {
    tokio::task::spawn_blocking(move || -> StorageResult<()> {
        let dir = target.parent().ok_or_else(|| StorageError::InvalidPath {
            path: target.display().to_string(),
        })?;
        std::fs::create_dir_all(dir)?;
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(&data)?;
        tmp.persist(&target).map_err(|e| e.error)?;
        Ok(())
    })
    .await
    .map_err(|e| StorageError::Backend(format!("blocking write task failed: {e}")))?
}

/// Reject anything that could escape the store root.
fn relative_object_path(path: &str) -> StorageResult<PathBuf> {
    let candidate = Path::new(path);
    let valid = !path.is_empty()
        && candidate
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
    if !valid {
        return Err(StorageError::InvalidPath {
            path: path.to_string(),
        });
    }
    Ok(candidate.to_path_buf())
}

// ---------------------------------------------------------------------------
// FsBlobStore
// ---------------------------------------------------------------------------

/// Filesystem-backed blob store.
///
/// Layout: `<root>/<path>`; objects are reported at
/// `<public_base>/<path>`. Whatever serves `root` over HTTP must use the
/// same base.
pub struct FsBlobStore {
    root: PathBuf,
    public_base: String,
}

impl FsBlobStore {
    /// Create a store rooted at `root`. Creates the directory if needed.
    pub fn new(root: impl AsRef<Path>, public_base: impl Into<String>) -> StorageResult<Self> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            public_base: public_base.into().trim_end_matches('/').to_string(),
        })
    }

    fn object_path(&self, path: &str) -> StorageResult<PathBuf> {
        Ok(self.root.join(relative_object_path(path)?))
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn put(&self, path: &str, data: &[u8], content_type: &str) -> StorageResult<String> {
        let target = self.object_path(path)?;
        write_atomic(target, data.to_vec()).await?;
        debug!(path, content_type, bytes = data.len(), "blob written");
        Ok(self.public_url(path))
    }

    async fn get(&self, url: &str) -> StorageResult<Vec<u8>> {
        let path = url
            .strip_prefix(&self.public_base)
            .and_then(|p| p.strip_prefix('/'))
            .ok_or_else(|| StorageError::InvalidPath {
                path: url.to_string(),
            })?;
        let target = self.object_path(path)?;
        tokio::fs::read(&target).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StorageError::NotFound {
                    location: url.to_string(),
                }
            } else {
                StorageError::Io(e)
            }
        })
    }

    fn public_url(&self, path: &str) -> String {
        format!("{}/{}", self.public_base, path)
    }
}

// ---------------------------------------------------------------------------
// FileManifestDocument
// ---------------------------------------------------------------------------

/// Manifest persisted as a JSON array in a single file.
pub struct FileManifestDocument {
    path: PathBuf,
}

impl FileManifestDocument {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ManifestDocument for FileManifestDocument {
    async fn load(&self) -> StorageResult<Manifest> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Manifest::new()),
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    async fn save(&self, manifest: &Manifest) -> StorageResult<()> {
        let body = serde_json::to_vec_pretty(manifest)?;
        write_atomic(self.path.clone(), body).await
    }
}
