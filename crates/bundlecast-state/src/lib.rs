//! Bundlecast-State: Manifest and Blob Storage
//!
//! This crate provides the persistence layer for Bundlecast. It owns the
//! release manifest data model and every backend that stores either the
//! manifest or the published module bundles.
//!
//! ## Layer 0 - Data/Persistence
//!
//! Focus: ordering, atomic whole-manifest writes, and an explicit
//! concurrency contract per store.
//!
//! ## Key Components
//!
//! - `CommitRecord` / `Manifest`: the release history, newest first
//! - `ManifestStore`: get/prepend/remove with a declared `Consistency`
//! - `SerializedManifestStore`: linearizable store over a `ManifestDocument`
//!   (`SurrealManifestDocument`, `FileManifestDocument`)
//! - `SharedObjectManifestStore`: unsynchronized `updates.json` in blob storage
//! - `BlobStore`: `FsBlobStore`, `HttpBlobStore`

mod error;
pub mod fakes;
pub mod fs;
mod handle;
pub mod http;
pub mod manifest_store;
mod schema;
pub mod storage_traits;
pub mod surreal_manifest;

pub use error::StorageError;
pub use fs::{FileManifestDocument, FsBlobStore};
pub use handle::{CloudConfig, SurrealHandle};
pub use http::{HttpBlobConfig, HttpBlobStore};
pub use manifest_store::{SerializedManifestStore, SharedObjectManifestStore};
pub use schema::{CommitRecord, Manifest, ModuleArtifact, ModuleName, ModuleSet, UpdateType};
pub use storage_traits::{
    BlobStore, Consistency, ContentDigest, ManifestDocument, ManifestStore, StorageResult,
};
pub use surreal_manifest::SurrealManifestDocument;
