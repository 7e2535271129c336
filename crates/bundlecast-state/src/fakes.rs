//! In-memory fakes for storage traits (testing only)
//!
//! Provides `MemoryBlobStore`, `MemoryManifestDocument`, and
//! `MemoryManifestStore` that satisfy the trait contracts without any
//! external dependencies. Each fake can be told to fail so callers can
//! exercise their upstream-error paths.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::StorageError;
use crate::schema::{CommitRecord, Manifest, ModuleArtifact, ModuleSet, UpdateType};
use crate::storage_traits::*;

/// URL prefix the in-memory blob store serves objects under.
pub const MEMORY_BLOB_BASE: &str = "memory://blobs";

/// Build a fully populated stable record for tests.
pub fn sample_record(commit_hash: &str, core_hash: &str) -> CommitRecord {
    CommitRecord {
        commit_hash: commit_hash.to_string(),
        update_type: UpdateType::Stable,
        core_hash: core_hash.to_string(),
        darwin_core_cdn_url: format!("https://cdn.test/core/{commit_hash}.zip"),
        modules: ModuleSet::from_fn(|m| ModuleArtifact {
            hash: format!("{m}-{commit_hash}"),
            cdn_url: format!("{MEMORY_BLOB_BASE}/{m}/{commit_hash}.js"),
            map_cdn_url: format!("{MEMORY_BLOB_BASE}/{m}/{commit_hash}.js.map"),
        }),
    }
}

// ---------------------------------------------------------------------------
// MemoryBlobStore
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct StoredObject {
    data: Vec<u8>,
    content_type: String,
}

/// In-memory blob store backed by a `HashMap<path, object>`.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    objects: Mutex<HashMap<String, StoredObject>>,
    puts: AtomicUsize,
    gets: AtomicUsize,
    put_budget: Mutex<Option<usize>>,
    fail_gets: AtomicBool,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Let `n` more puts succeed, then fail every put after that.
    pub fn fail_puts_after(&self, n: usize) {
        *self.put_budget.lock().unwrap() = Some(n);
    }

    /// Make every `get` fail with a backend error.
    pub fn fail_gets(&self, fail: bool) {
        self.fail_gets.store(fail, Ordering::SeqCst);
    }

    /// Number of successful puts so far.
    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    /// Number of successful gets so far.
    pub fn get_count(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.objects.lock().unwrap().contains_key(path)
    }

    pub fn content_type(&self, path: &str) -> Option<String> {
        self.objects
            .lock()
            .unwrap()
            .get(path)
            .map(|o| o.content_type.clone())
    }

    /// Insert an object directly, bypassing put accounting.
    pub fn seed(&self, path: &str, data: &[u8], content_type: &str) {
        self.objects.lock().unwrap().insert(
            path.to_string(),
            StoredObject {
                data: data.to_vec(),
                content_type: content_type.to_string(),
            },
        );
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, path: &str, data: &[u8], content_type: &str) -> StorageResult<String> {
        {
            let mut budget = self.put_budget.lock().unwrap();
            if let Some(remaining) = budget.as_mut() {
                if *remaining == 0 {
                    return Err(StorageError::Backend(format!("injected put failure: {path}")));
                }
                *remaining -= 1;
            }
        }
        self.seed(path, data, content_type);
        self.puts.fetch_add(1, Ordering::SeqCst);
        Ok(self.public_url(path))
    }

    async fn get(&self, url: &str) -> StorageResult<Vec<u8>> {
        if self.fail_gets.load(Ordering::SeqCst) {
            return Err(StorageError::Backend(format!("injected get failure: {url}")));
        }
        let path = url
            .strip_prefix(MEMORY_BLOB_BASE)
            .and_then(|p| p.strip_prefix('/'))
            .ok_or_else(|| StorageError::InvalidPath {
                path: url.to_string(),
            })?;
        let data = {
            let objects = self.objects.lock().unwrap();
            let object = objects.get(path).ok_or_else(|| StorageError::NotFound {
                location: url.to_string(),
            })?;
            object.data.clone()
        };
        self.gets.fetch_add(1, Ordering::SeqCst);
        // Yield so concurrent read-modify-write callers interleave.
        tokio::task::yield_now().await;
        Ok(data)
    }

    fn public_url(&self, path: &str) -> String {
        format!("{MEMORY_BLOB_BASE}/{path}")
    }
}

// ---------------------------------------------------------------------------
// MemoryManifestDocument
// ---------------------------------------------------------------------------

/// In-memory manifest document. Clones share the same document, so a test
/// can keep a handle after moving one into a store.
#[derive(Debug, Clone, Default)]
pub struct MemoryManifestDocument {
    manifest: Arc<Mutex<Manifest>>,
    fail_loads: Arc<AtomicBool>,
    fail_saves: Arc<AtomicBool>,
}

impl MemoryManifestDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_manifest(manifest: Manifest) -> Self {
        let doc = Self::default();
        *doc.manifest.lock().unwrap() = manifest;
        doc
    }

    pub fn fail_loads(&self, fail: bool) {
        self.fail_loads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    /// Current persisted manifest, bypassing failure injection.
    pub fn snapshot(&self) -> Manifest {
        self.manifest.lock().unwrap().clone()
    }
}

#[async_trait]
impl ManifestDocument for MemoryManifestDocument {
    async fn load(&self) -> StorageResult<Manifest> {
        if self.fail_loads.load(Ordering::SeqCst) {
            return Err(StorageError::Backend("injected load failure".to_string()));
        }
        let snapshot = self.manifest.lock().unwrap().clone();
        // Yield so concurrent callers interleave between load and save.
        tokio::task::yield_now().await;
        Ok(snapshot)
    }

    async fn save(&self, manifest: &Manifest) -> StorageResult<()> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(StorageError::Backend("injected save failure".to_string()));
        }
        *self.manifest.lock().unwrap() = manifest.clone();
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MemoryManifestStore
// ---------------------------------------------------------------------------

/// In-memory manifest store backed by a single mutex-guarded manifest.
#[derive(Debug, Default)]
pub struct MemoryManifestStore {
    manifest: Mutex<Manifest>,
    fail_writes: AtomicBool,
}

impl MemoryManifestStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_manifest(manifest: Manifest) -> Self {
        Self {
            manifest: Mutex::new(manifest),
            fail_writes: AtomicBool::new(false),
        }
    }

    /// Make `prepend` and `remove` fail without touching the manifest.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_writable(&self) -> StorageResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Backend("injected write failure".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl ManifestStore for MemoryManifestStore {
    async fn get(&self) -> StorageResult<Manifest> {
        Ok(self.manifest.lock().unwrap().clone())
    }

    async fn prepend(&self, record: CommitRecord) -> StorageResult<()> {
        self.check_writable()?;
        self.manifest.lock().unwrap().prepend(record);
        Ok(())
    }

    async fn remove(&self, commit_hash: &str) -> StorageResult<usize> {
        self.check_writable()?;
        Ok(self.manifest.lock().unwrap().remove(commit_hash))
    }

    fn consistency(&self) -> Consistency {
        Consistency::Linearizable
    }
}
