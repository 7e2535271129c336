//! What a polling client tells us about itself.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use bundlecast_state::{ModuleName, ModuleSet};
use serde::{Deserialize, Serialize};

use super::channel::ChannelBits;
use super::error::ValidationError;

pub const PLATFORM_FIELD: &str = "platform";
pub const CORE_COMMIT_FIELD: &str = "core_commit";
pub const UPDATE_BITS_FIELD: &str = "update_bits";

/// Query field carrying the installed commit for `module`.
pub fn baseline_field(module: ModuleName) -> &'static str {
    match module {
        ModuleName::Uploaders => "uploaders_commit",
        ModuleName::Editors => "editors_commit",
        ModuleName::Main => "main_commit",
        ModuleName::Config => "config_commit",
        ModuleName::Selector => "selector_commit",
    }
}

fn is_known_field(key: &str) -> bool {
    key == PLATFORM_FIELD
        || key == CORE_COMMIT_FIELD
        || key == UPDATE_BITS_FIELD
        || ModuleName::ALL.iter().any(|m| baseline_field(*m) == key)
}

/// Client platform. Only darwin receives core replacements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Linux,
    Darwin,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Linux => "linux",
            Platform::Darwin => "darwin",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "linux" => Ok(Platform::Linux),
            "darwin" => Ok(Platform::Darwin),
            other => Err(ValidationError::UnknownPlatform {
                platform: other.to_string(),
            }),
        }
    }
}

fn require<'a>(
    fields: &'a HashMap<String, String>,
    field: &'static str,
) -> Result<&'a str, ValidationError> {
    fields
        .get(field)
        .map(String::as_str)
        .filter(|v| !v.is_empty())
        .ok_or(ValidationError::MissingField { field })
}

/// A poll request: installed commits per module, installed core commit,
/// platform, and channel opt-ins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientState {
    pub platform: Platform,
    pub module_baselines: ModuleSet<String>,
    pub core_baseline: String,
    pub channels: ChannelBits,
}

impl ClientState {
    /// Build from raw query pairs.
    ///
    /// Every known field is required, non-empty, and given once; unknown
    /// fields are ignored. Field problems are reported before the bitmask is
    /// decoded, so a request with both kinds of fault gets a field error.
    pub fn from_query_pairs<I, K, V>(pairs: I) -> Result<Self, ValidationError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut fields: HashMap<String, String> = HashMap::new();
        for (key, value) in pairs {
            let key = key.into();
            if !is_known_field(&key) {
                continue;
            }
            if fields.contains_key(&key) {
                return Err(ValidationError::DuplicateField { field: key });
            }
            fields.insert(key, value.into());
        }

        let platform: Platform = require(&fields, PLATFORM_FIELD)?.parse()?;
        let module_baselines =
            ModuleSet::try_from_fn(|m| require(&fields, baseline_field(m)).map(str::to_string))?;
        let core_baseline = require(&fields, CORE_COMMIT_FIELD)?.to_string();
        let channels = ChannelBits::parse(require(&fields, UPDATE_BITS_FIELD)?)?;

        Ok(ClientState {
            platform,
            module_baselines,
            core_baseline,
            channels,
        })
    }
}
