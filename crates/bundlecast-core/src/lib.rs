//! Bundlecast Core Library
//!
//! Resolution engine, publish pipeline and poll assembly for hot-swappable
//! module updates. The storage layer lives in `bundlecast-state`; the HTTP
//! boundary in `bundlecastd`.

pub mod domain;
pub mod metrics;
pub mod obs;
pub mod poll;
pub mod publish;
pub mod resolve;
pub mod service;
pub mod telemetry;

pub use domain::{
    baseline_field, ChannelBits, ClientState, PayloadError, Platform, Result, UpdateError,
    ValidationError,
};

pub use poll::{assemble, BundleBlob, CoreBlob, PollResponse};
pub use publish::{ModulePayload, PublishMetadata, PublishPipeline, PublishRequest};
pub use resolve::{resolve, resolve_core, resolve_module, CoreUpdate, ModuleUpdate, Resolution};
pub use service::UpdateService;

pub use bundlecast_state::{
    CommitRecord, Consistency, Manifest, ModuleArtifact, ModuleName, ModuleSet, UpdateType,
};

pub use metrics::METRICS;
pub use obs::{
    emit_manifest_retracted, emit_module_reused, emit_module_uploaded, emit_poll_resolved,
    emit_publish_completed, emit_publish_rejected, poll_span,
};
pub use telemetry::init_tracing;

/// Bundlecast version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
