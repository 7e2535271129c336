//! Update service API.
//!
//! The one entry point the HTTP boundary talks to: poll, publish and
//! retract over a shared manifest store and blob store.

use std::sync::Arc;

use bundlecast_state::{BlobStore, CommitRecord, Consistency, ManifestStore};
use tracing::{instrument, Instrument};

use crate::domain::{ClientState, Result};
use crate::metrics::METRICS;
use crate::obs::{self, poll_span};
use crate::poll::{assemble, PollResponse};
use crate::publish::{PublishPipeline, PublishRequest};
use crate::resolve::resolve;

/// Poll, publish and retract against one manifest and one blob store.
#[derive(Clone)]
pub struct UpdateService {
    manifests: Arc<dyn ManifestStore>,
    blobs: Arc<dyn BlobStore>,
    pipeline: PublishPipeline,
}

impl UpdateService {
    pub fn new(manifests: Arc<dyn ManifestStore>, blobs: Arc<dyn BlobStore>) -> Self {
        let pipeline = PublishPipeline::new(manifests.clone(), blobs.clone());
        Self {
            manifests,
            blobs,
            pipeline,
        }
    }

    /// Concurrency guarantee of the underlying manifest store.
    pub fn consistency(&self) -> Consistency {
        self.manifests.consistency()
    }

    /// Resolve updates for `client` and fetch every bundle it needs.
    pub async fn poll(&self, client: &ClientState) -> Result<PollResponse> {
        self.resolve_and_assemble(client)
            .instrument(poll_span(client))
            .await
    }

    async fn resolve_and_assemble(&self, client: &ClientState) -> Result<PollResponse> {
        let manifest = self.manifests.get().await?;
        let resolution = resolve(&manifest, client);
        obs::emit_poll_resolved(
            client.platform,
            resolution.module_update_count(),
            resolution.core.is_some(),
        );

        let response = assemble(self.blobs.as_ref(), resolution).await?;
        METRICS.inc_polls_served();
        METRICS.add_bundles_served(response.bundle_count() as u64);
        Ok(response)
    }

    /// Publish a release; returns the new manifest head.
    pub async fn publish(&self, request: PublishRequest) -> Result<CommitRecord> {
        self.pipeline.publish(request).await
    }

    /// Remove every record with `commit_hash`. Absent hashes succeed with
    /// a count of zero.
    #[instrument(skip(self))]
    pub async fn retract(&self, commit_hash: &str) -> Result<usize> {
        let removed = self.manifests.remove(commit_hash).await?;
        obs::emit_manifest_retracted(commit_hash, removed);
        METRICS.add_commits_retracted(removed as u64);
        Ok(removed)
    }
}
