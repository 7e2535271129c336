//! Publish pipeline.
//!
//! Turns one push (metadata plus five script/map payloads) into one new
//! manifest head. Each module is deduplicated against the current head by
//! content digest; only changed modules are uploaded. The manifest is
//! touched exactly once, after every module has settled.

use std::collections::HashMap;
use std::sync::Arc;

use bundlecast_state::{
    BlobStore, CommitRecord, ContentDigest, ManifestStore, ModuleArtifact, ModuleName,
    ModuleSet, UpdateType,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::domain::{PayloadError, Result, UpdateError};
use crate::metrics::METRICS;
use crate::obs;

/// Multipart part carrying the JSON metadata.
pub const METADATA_PART: &str = "metadata";

pub const SCRIPT_CONTENT_TYPE: &str = "application/javascript";
pub const MAP_CONTENT_TYPE: &str = "application/json";

/// Publisher-supplied release metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishMetadata {
    pub commit_hash: String,
    pub core_hash: String,
    #[serde(rename = "darwinCdnUrl")]
    pub darwin_cdn_url: String,
    pub update_type: UpdateType,
}

impl PublishMetadata {
    fn parse(bytes: &[u8]) -> std::result::Result<Self, PayloadError> {
        let metadata: PublishMetadata = serde_json::from_slice(bytes)
            .map_err(|e| PayloadError::InvalidMetadata(e.to_string()))?;
        if metadata.commit_hash.trim().is_empty() {
            return Err(PayloadError::InvalidMetadata(
                "commitHash must not be empty".to_string(),
            ));
        }
        Ok(metadata)
    }
}

/// New script and source map for one module.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ModulePayload {
    pub script: Vec<u8>,
    pub map: Vec<u8>,
}

/// A validated push: metadata and all five module payloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishRequest {
    pub metadata: PublishMetadata,
    pub modules: ModuleSet<ModulePayload>,
}

fn is_expected_part(name: &str) -> bool {
    name == METADATA_PART
        || ModuleName::ALL
            .iter()
            .any(|m| m.script_part() == name || m.map_part() == name)
}

impl PublishRequest {
    /// Assemble a request from named parts.
    ///
    /// The part set must be exactly `<module>.js` and `<module>.js.map` for
    /// every module plus `metadata`. Duplicate and unknown parts are
    /// reported first, in arrival order, then missing ones.
    pub fn from_parts<I, N>(parts: I) -> std::result::Result<Self, PayloadError>
    where
        I: IntoIterator<Item = (N, Vec<u8>)>,
        N: Into<String>,
    {
        let mut collected: HashMap<String, Vec<u8>> = HashMap::new();
        for (name, data) in parts {
            let name = name.into();
            if !is_expected_part(&name) {
                return Err(PayloadError::UnexpectedPart { part: name });
            }
            if collected.contains_key(&name) {
                return Err(PayloadError::DuplicatePart { part: name });
            }
            collected.insert(name, data);
        }

        let mut take = |part: String| {
            collected
                .remove(&part)
                .ok_or(PayloadError::MissingPart { part })
        };

        let modules = ModuleSet::try_from_fn(|m| {
            Ok::<_, PayloadError>(ModulePayload {
                script: take(m.script_part())?,
                map: take(m.map_part())?,
            })
        })?;
        let metadata = PublishMetadata::parse(&take(METADATA_PART.to_string())?)?;

        Ok(PublishRequest { metadata, modules })
    }
}

/// Blob path for a module script with the given digest.
pub fn script_path(module: ModuleName, digest: &ContentDigest) -> String {
    format!("{module}/{digest}.js")
}

/// Blob path for a module source map with the given digest.
pub fn map_path(module: ModuleName, digest: &ContentDigest) -> String {
    format!("{module}/{digest}.js.map")
}

/// Dedup, upload, then prepend.
#[derive(Clone)]
pub struct PublishPipeline {
    manifests: Arc<dyn ManifestStore>,
    blobs: Arc<dyn BlobStore>,
}

impl PublishPipeline {
    pub fn new(manifests: Arc<dyn ManifestStore>, blobs: Arc<dyn BlobStore>) -> Self {
        Self { manifests, blobs }
    }

    /// Publish one release and return the record now at the manifest head.
    ///
    /// A commit hash already present in the manifest is rejected before any
    /// upload. An upload failure leaves the manifest untouched; uploads that
    /// already completed stay in the blob store.
    #[instrument(skip(self, request), fields(commit = %request.metadata.commit_hash))]
    pub async fn publish(&self, request: PublishRequest) -> Result<CommitRecord> {
        let PublishRequest { metadata, modules } = request;

        let snapshot = self.manifests.get().await?;
        if snapshot.contains(&metadata.commit_hash) {
            let err = UpdateError::DuplicateCommit(metadata.commit_hash.clone());
            obs::emit_publish_rejected(&metadata.commit_hash, &err);
            return Err(err);
        }
        let previous = snapshot.head();

        let ModuleSet {
            uploaders,
            editors,
            main,
            config,
            selector,
        } = modules;

        let (uploaders, editors, main, config, selector) = tokio::try_join!(
            self.settle_module(ModuleName::Uploaders, uploaders, previous),
            self.settle_module(ModuleName::Editors, editors, previous),
            self.settle_module(ModuleName::Main, main, previous),
            self.settle_module(ModuleName::Config, config, previous),
            self.settle_module(ModuleName::Selector, selector, previous),
        )?;

        let record = CommitRecord {
            commit_hash: metadata.commit_hash,
            update_type: metadata.update_type,
            core_hash: metadata.core_hash,
            darwin_core_cdn_url: metadata.darwin_cdn_url,
            modules: ModuleSet {
                uploaders,
                editors,
                main,
                config,
                selector,
            },
        };

        self.manifests.prepend(record.clone()).await?;
        obs::emit_publish_completed(&record.commit_hash, record.update_type, &record.core_hash);
        Ok(record)
    }

    /// Reuse the previous head's artifact when the script is unchanged,
    /// otherwise upload script and map under content-addressed paths.
    async fn settle_module(
        &self,
        module: ModuleName,
        payload: ModulePayload,
        previous: Option<&CommitRecord>,
    ) -> Result<ModuleArtifact> {
        let digest = ContentDigest::from_bytes(&payload.script);

        if let Some(prev) = previous {
            let artifact = prev.module(module);
            if artifact.hash == digest.as_str() {
                debug!(module = %module, hash = digest.short(), "unchanged, reusing upload");
                obs::emit_module_reused(module, &prev.commit_hash);
                METRICS.inc_modules_reused();
                return Ok(artifact.clone());
            }
        }

        let cdn_url = self
            .blobs
            .put(&script_path(module, &digest), &payload.script, SCRIPT_CONTENT_TYPE)
            .await?;
        let map_cdn_url = self
            .blobs
            .put(&map_path(module, &digest), &payload.map, MAP_CONTENT_TYPE)
            .await?;

        obs::emit_module_uploaded(module, digest.as_str());
        METRICS.inc_modules_uploaded();

        Ok(ModuleArtifact {
            hash: digest.as_str().to_string(),
            cdn_url,
            map_cdn_url,
        })
    }
}
