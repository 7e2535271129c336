//! Structured observability hooks for poll and publish lifecycle events.
//!
//! This module provides:
//! - Poll-scoped tracing spans via `poll_span`, attached with `Instrument`
//! - Emission functions for resolution, dedup, upload, publish and retract
//!
//! Events are emitted at `info!` level with an `event` field naming them;
//! filter with `RUST_LOG`.

use bundlecast_state::{ModuleName, UpdateType};
use tracing::{info, Span};

use crate::domain::{ClientState, Platform};

/// Span covering one poll. Attach it to the poll future with
/// [`tracing::Instrument::instrument`]; an entered guard must not be held
/// across `.await`.
///
/// ```ignore
/// async { /* ... */ }.instrument(poll_span(&client)).await
/// ```
pub fn poll_span(client: &ClientState) -> Span {
    tracing::info_span!(
        "bundlecast.poll",
        platform = %client.platform,
        update_bits = client.channels.mask(),
    )
}

/// Emit event: a poll was resolved.
pub fn emit_poll_resolved(platform: Platform, module_updates: usize, core_update: bool) {
    info!(
        event = "poll.resolved",
        platform = %platform,
        module_updates = module_updates,
        core_update = core_update,
    );
}

/// Emit event: a module's script matched the previous head and was reused.
pub fn emit_module_reused(module: ModuleName, from_commit: &str) {
    info!(event = "publish.module_reused", module = %module, from_commit = %from_commit);
}

/// Emit event: a module's script and map were uploaded.
pub fn emit_module_uploaded(module: ModuleName, hash: &str) {
    info!(event = "publish.module_uploaded", module = %module, hash = %hash);
}

/// Emit event: a new record is at the manifest head.
pub fn emit_publish_completed(commit_hash: &str, update_type: UpdateType, core_hash: &str) {
    info!(
        event = "publish.completed",
        commit = %commit_hash,
        update_type = %update_type,
        core_hash = %core_hash,
    );
}

/// Emit event: a publish was refused (warning level).
pub fn emit_publish_rejected(commit_hash: &str, reason: &dyn std::fmt::Display) {
    tracing::warn!(event = "publish.rejected", commit = %commit_hash, reason = %reason);
}

/// Emit event: records were removed from the manifest.
pub fn emit_manifest_retracted(commit_hash: &str, removed: usize) {
    info!(event = "manifest.retracted", commit = %commit_hash, removed = removed);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ChannelBits;
    use bundlecast_state::ModuleSet;

    #[test]
    fn poll_span_carries_client_fields() {
        let client = ClientState {
            platform: Platform::Darwin,
            module_baselines: ModuleSet::from_fn(|_| "c1".to_string()),
            core_baseline: "c1".to_string(),
            channels: ChannelBits::from_mask(3),
        };
        let span = poll_span(&client);
        span.in_scope(|| emit_poll_resolved(client.platform, 0, false));
    }
}
