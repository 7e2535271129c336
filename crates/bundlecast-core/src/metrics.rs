//! Global atomic counters for Bundlecast.
//!
//! Counters are incremented silently at the call site. Call
//! [`Metrics::flush`] to emit current values as a single
//! `tracing::info!` event (the daemon does so on shutdown).

use std::sync::atomic::{AtomicU64, Ordering};

/// Global metrics singleton.
pub static METRICS: Metrics = Metrics::new();

/// Lightweight atomic counters, no allocations and no locking.
pub struct Metrics {
    polls_served: AtomicU64,
    bundles_served: AtomicU64,
    modules_uploaded: AtomicU64,
    modules_reused: AtomicU64,
    commits_retracted: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            polls_served: AtomicU64::new(0),
            bundles_served: AtomicU64::new(0),
            modules_uploaded: AtomicU64::new(0),
            modules_reused: AtomicU64::new(0),
            commits_retracted: AtomicU64::new(0),
        }
    }

    pub fn inc_polls_served(&self) {
        self.polls_served.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "polls_served", "counter incremented");
    }

    pub fn add_bundles_served(&self, n: u64) {
        self.bundles_served.fetch_add(n, Ordering::Relaxed);
        tracing::trace!(metric = "bundles_served", n, "counter incremented");
    }

    pub fn inc_modules_uploaded(&self) {
        self.modules_uploaded.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "modules_uploaded", "counter incremented");
    }

    pub fn inc_modules_reused(&self) {
        self.modules_reused.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "modules_reused", "counter incremented");
    }

    pub fn add_commits_retracted(&self, n: u64) {
        self.commits_retracted.fetch_add(n, Ordering::Relaxed);
        tracing::trace!(metric = "commits_retracted", n, "counter incremented");
    }

    /// Emit all current counter values as a single `info!` event.
    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            polls_served = self.polls_served(),
            bundles_served = self.bundles_served(),
            modules_uploaded = self.modules_uploaded(),
            modules_reused = self.modules_reused(),
            commits_retracted = self.commits_retracted(),
        );
    }

    pub fn polls_served(&self) -> u64 {
        self.polls_served.load(Ordering::Relaxed)
    }

    pub fn bundles_served(&self) -> u64 {
        self.bundles_served.load(Ordering::Relaxed)
    }

    pub fn modules_uploaded(&self) -> u64 {
        self.modules_uploaded.load(Ordering::Relaxed)
    }

    pub fn modules_reused(&self) -> u64 {
        self.modules_reused.load(Ordering::Relaxed)
    }

    pub fn commits_retracted(&self) -> u64 {
        self.commits_retracted.load(Ordering::Relaxed)
    }

    /// Reset all counters to zero (useful in tests).
    pub fn reset(&self) {
        self.polls_served.store(0, Ordering::Relaxed);
        self.bundles_served.store(0, Ordering::Relaxed);
        self.modules_uploaded.store(0, Ordering::Relaxed);
        self.modules_reused.store(0, Ordering::Relaxed);
        self.commits_retracted.store(0, Ordering::Relaxed);
    }
}
