//! Resolution engine.
//!
//! Pure functions of a manifest snapshot and a client's state. Module
//! resolution is gated on core compatibility and channel bits; core
//! resolution is not gated at all and always offers the newest record.
//! The asymmetry is deliberate and must not be unified.

use bundlecast_state::{CommitRecord, Manifest, ModuleName, ModuleSet};
use serde::{Deserialize, Serialize};

use crate::domain::{ChannelBits, ClientState, Platform};

/// A newer build of one module the client should install.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleUpdate {
    pub commit_hash: String,
    pub hash: String,
    pub cdn_url: String,
    pub map_cdn_url: String,
}

impl ModuleUpdate {
    fn from_record(record: &CommitRecord, module: ModuleName) -> Self {
        let artifact = record.module(module);
        ModuleUpdate {
            commit_hash: record.commit_hash.clone(),
            hash: artifact.hash.clone(),
            cdn_url: artifact.cdn_url.clone(),
            map_cdn_url: artifact.map_cdn_url.clone(),
        }
    }
}

/// A full core replacement the client should download.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoreUpdate {
    pub commit_hash: String,
    pub cdn_url: String,
}

/// Every decision for one poll.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Resolution {
    pub modules: ModuleSet<Option<ModuleUpdate>>,
    pub core: Option<CoreUpdate>,
}

impl Resolution {
    /// Number of modules with an update.
    pub fn module_update_count(&self) -> usize {
        self.modules.iter().filter(|(_, u)| u.is_some()).count()
    }
}

/// Find the newest record that is newer than `baseline_hash`, shares its
/// core hash, and is admitted by `channels`.
///
/// Returns `None` when the baseline is not in the manifest (for example a
/// custom build), or when the scan reaches the baseline first.
pub fn resolve_module(
    baseline_hash: &str,
    module: ModuleName,
    manifest: &Manifest,
    channels: ChannelBits,
) -> Option<ModuleUpdate> {
    let baseline = manifest.find(baseline_hash)?;

    for record in manifest {
        if record.commit_hash == baseline_hash {
            return None;
        }
        if record.core_hash != baseline.core_hash {
            continue;
        }
        if channels.admits(record.update_type) {
            return Some(ModuleUpdate::from_record(record, module));
        }
    }

    None
}

/// Decide whether the client's core should be replaced.
///
/// Linux never gets one. Otherwise, if the baseline is known and is not the
/// newest record, the newest record is offered with no core-hash or
/// channel check.
pub fn resolve_core(
    core_baseline: &str,
    platform: Platform,
    manifest: &Manifest,
) -> Option<CoreUpdate> {
    if platform == Platform::Linux {
        return None;
    }
    manifest.find(core_baseline)?;

    let newest = manifest.head()?;
    if newest.commit_hash == core_baseline {
        return None;
    }
    Some(CoreUpdate {
        commit_hash: newest.commit_hash.clone(),
        cdn_url: newest.darwin_core_cdn_url.clone(),
    })
}

/// Run the five module decisions and the core decision for one client.
pub fn resolve(manifest: &Manifest, client: &ClientState) -> Resolution {
    Resolution {
        modules: ModuleSet::from_fn(|module| {
            resolve_module(
                client.module_baselines.get(module),
                module,
                manifest,
                client.channels,
            )
        }),
        core: resolve_core(&client.core_baseline, client.platform, manifest),
    }
}
