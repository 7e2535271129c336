//! Poll response assembly.
//!
//! Materializes a [`Resolution`] into the wire response by fetching the
//! script and source map of every module with an update and base64-encoding
//! them. All fetches run concurrently; any failure fails the whole response.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bundlecast_state::{BlobStore, ModuleName};
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};

use crate::domain::Result;
use crate::resolve::{CoreUpdate, ModuleUpdate, Resolution};

/// A module bundle ready for the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleBlob {
    pub commit_hash: String,
    pub encoded_blob: String,
    pub encoded_map_blob: String,
}

/// A core replacement; the client downloads it from `cdn_url` itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoreBlob {
    pub cdn_url: String,
    pub commit_hash: String,
}

impl From<CoreUpdate> for CoreBlob {
    fn from(update: CoreUpdate) -> Self {
        CoreBlob {
            cdn_url: update.cdn_url,
            commit_hash: update.commit_hash,
        }
    }
}

/// Body of a successful poll. Absent updates serialize as `null`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollResponse {
    pub uploaders: Option<BundleBlob>,
    pub editors: Option<BundleBlob>,
    pub main: Option<BundleBlob>,
    pub config: Option<BundleBlob>,
    pub selector: Option<BundleBlob>,
    pub core: Option<CoreBlob>,
}

impl PollResponse {
    pub fn bundle(&self, module: ModuleName) -> Option<&BundleBlob> {
        match module {
            ModuleName::Uploaders => self.uploaders.as_ref(),
            ModuleName::Editors => self.editors.as_ref(),
            ModuleName::Main => self.main.as_ref(),
            ModuleName::Config => self.config.as_ref(),
            ModuleName::Selector => self.selector.as_ref(),
        }
    }

    pub fn bundle_count(&self) -> usize {
        ModuleName::ALL
            .iter()
            .filter(|m| self.bundle(**m).is_some())
            .count()
    }
}

async fn fetch_bundle(blobs: &dyn BlobStore, update: &ModuleUpdate) -> Result<BundleBlob> {
    let (script, map) =
        tokio::try_join!(blobs.get(&update.cdn_url), blobs.get(&update.map_cdn_url))?;
    Ok(BundleBlob {
        commit_hash: update.commit_hash.clone(),
        encoded_blob: STANDARD.encode(script),
        encoded_map_blob: STANDARD.encode(map),
    })
}

/// Fetch every bundle `resolution` calls for and build the response.
pub async fn assemble(blobs: &dyn BlobStore, resolution: Resolution) -> Result<PollResponse> {
    let Resolution { modules, core } = resolution;

    let wanted = modules
        .iter()
        .filter_map(|(module, update)| update.as_ref().map(|u| (module, u)));
    let fetched = try_join_all(wanted.map(|(module, update)| async move {
        fetch_bundle(blobs, update)
            .await
            .map(|bundle| (module, bundle))
    }))
    .await?;

    let mut response = PollResponse {
        core: core.map(CoreBlob::from),
        ..PollResponse::default()
    };
    for (module, bundle) in fetched {
        let slot = match module {
            ModuleName::Uploaders => &mut response.uploaders,
            ModuleName::Editors => &mut response.editors,
            ModuleName::Main => &mut response.main,
            ModuleName::Config => &mut response.config,
            ModuleName::Selector => &mut response.selector,
        };
        *slot = Some(bundle);
    }
    Ok(response)
}
