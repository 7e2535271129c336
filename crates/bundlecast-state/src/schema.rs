//! Manifest schema: commit records and the ordered manifest.
//!
//! The persisted JSON layout is the flat camelCase form
//! (`uploadersHash`, `uploadersCdnUrl`, `uploadersMapCdnUrl`, ...) so that
//! manifests written by earlier deployments load unchanged. In memory the
//! five module triples live in a [`ModuleSet`] keyed by [`ModuleName`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// UpdateType
// ---------------------------------------------------------------------------

/// Release channel a commit was published to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateType {
    Stable,
    Alpha,
    Beta,
}

impl UpdateType {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpdateType::Stable => "stable",
            UpdateType::Alpha => "alpha",
            UpdateType::Beta => "beta",
        }
    }
}

impl fmt::Display for UpdateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// ModuleName / ModuleSet
// ---------------------------------------------------------------------------

/// One of the five independently hot-updatable script bundles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleName {
    Uploaders,
    Editors,
    Main,
    Config,
    Selector,
}

impl ModuleName {
    /// Every module, in manifest field order.
    pub const ALL: [ModuleName; 5] = [
        ModuleName::Uploaders,
        ModuleName::Editors,
        ModuleName::Main,
        ModuleName::Config,
        ModuleName::Selector,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModuleName::Uploaders => "uploaders",
            ModuleName::Editors => "editors",
            ModuleName::Main => "main",
            ModuleName::Config => "config",
            ModuleName::Selector => "selector",
        }
    }

    /// Name of the push form part carrying this module's script.
    pub fn script_part(&self) -> String {
        format!("{}.js", self.as_str())
    }

    /// Name of the push form part carrying this module's source map.
    pub fn map_part(&self) -> String {
        format!("{}.js.map", self.as_str())
    }
}

impl fmt::Display for ModuleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModuleName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ModuleName::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| format!("unknown module: {s}"))
    }
}

/// A value for every module. Construction requires all five, so a
/// `ModuleSet` is never partially populated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleSet<T> {
    pub uploaders: T,
    pub editors: T,
    pub main: T,
    pub config: T,
    pub selector: T,
}

impl<T> ModuleSet<T> {
    /// Build a set by calling `f` once per module.
    pub fn from_fn(mut f: impl FnMut(ModuleName) -> T) -> Self {
        ModuleSet {
            uploaders: f(ModuleName::Uploaders),
            editors: f(ModuleName::Editors),
            main: f(ModuleName::Main),
            config: f(ModuleName::Config),
            selector: f(ModuleName::Selector),
        }
    }

    /// Fallible variant of [`ModuleSet::from_fn`]; stops at the first error.
    pub fn try_from_fn<E>(mut f: impl FnMut(ModuleName) -> Result<T, E>) -> Result<Self, E> {
        Ok(ModuleSet {
            uploaders: f(ModuleName::Uploaders)?,
            editors: f(ModuleName::Editors)?,
            main: f(ModuleName::Main)?,
            config: f(ModuleName::Config)?,
            selector: f(ModuleName::Selector)?,
        })
    }

    pub fn get(&self, name: ModuleName) -> &T {
        match name {
            ModuleName::Uploaders => &self.uploaders,
            ModuleName::Editors => &self.editors,
            ModuleName::Main => &self.main,
            ModuleName::Config => &self.config,
            ModuleName::Selector => &self.selector,
        }
    }

    pub fn map<U>(self, mut f: impl FnMut(ModuleName, T) -> U) -> ModuleSet<U> {
        ModuleSet {
            uploaders: f(ModuleName::Uploaders, self.uploaders),
            editors: f(ModuleName::Editors, self.editors),
            main: f(ModuleName::Main, self.main),
            config: f(ModuleName::Config, self.config),
            selector: f(ModuleName::Selector, self.selector),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (ModuleName, &T)> {
        ModuleName::ALL.into_iter().map(move |m| (m, self.get(m)))
    }
}

// ---------------------------------------------------------------------------
// CommitRecord
// ---------------------------------------------------------------------------

/// Location and content hash of one module's published bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleArtifact {
    /// Content digest of the script payload (dedup key)
    pub hash: String,
    pub cdn_url: String,
    pub map_cdn_url: String,
}

/// One published release. Created only by the publish pipeline and never
/// modified afterwards; stores hand out clones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "WireCommitRecord", into = "WireCommitRecord")]
pub struct CommitRecord {
    /// Publisher-supplied commit hash
    pub commit_hash: String,
    pub update_type: UpdateType,
    /// Compatibility group for the modules in this record
    pub core_hash: String,
    /// Platform core binary for darwin clients
    pub darwin_core_cdn_url: String,
    pub modules: ModuleSet<ModuleArtifact>,
}

impl CommitRecord {
    pub fn module(&self, name: ModuleName) -> &ModuleArtifact {
        self.modules.get(name)
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireCommitRecord {
    commit_hash: String,
    update_type: UpdateType,
    darwin_core_cdn_url: String,
    core_hash: String,
    uploaders_cdn_url: String,
    uploaders_map_cdn_url: String,
    uploaders_hash: String,
    editors_cdn_url: String,
    editors_map_cdn_url: String,
    editors_hash: String,
    main_cdn_url: String,
    main_map_cdn_url: String,
    main_hash: String,
    config_cdn_url: String,
    config_map_cdn_url: String,
    config_hash: String,
    selector_cdn_url: String,
    selector_map_cdn_url: String,
    selector_hash: String,
}

impl From<WireCommitRecord> for CommitRecord {
    fn from(w: WireCommitRecord) -> Self {
        CommitRecord {
            commit_hash: w.commit_hash,
            update_type: w.update_type,
            core_hash: w.core_hash,
            darwin_core_cdn_url: w.darwin_core_cdn_url,
            modules: ModuleSet {
                uploaders: ModuleArtifact {
                    hash: w.uploaders_hash,
                    cdn_url: w.uploaders_cdn_url,
                    map_cdn_url: w.uploaders_map_cdn_url,
                },
                editors: ModuleArtifact {
                    hash: w.editors_hash,
                    cdn_url: w.editors_cdn_url,
                    map_cdn_url: w.editors_map_cdn_url,
                },
                main: ModuleArtifact {
                    hash: w.main_hash,
                    cdn_url: w.main_cdn_url,
                    map_cdn_url: w.main_map_cdn_url,
                },
                config: ModuleArtifact {
                    hash: w.config_hash,
                    cdn_url: w.config_cdn_url,
                    map_cdn_url: w.config_map_cdn_url,
                },
                selector: ModuleArtifact {
                    hash: w.selector_hash,
                    cdn_url: w.selector_cdn_url,
                    map_cdn_url: w.selector_map_cdn_url,
                },
            },
        }
    }
}

impl From<CommitRecord> for WireCommitRecord {
    fn from(r: CommitRecord) -> Self {
        let ModuleSet {
            uploaders,
            editors,
            main,
            config,
            selector,
        } = r.modules;
        WireCommitRecord {
            commit_hash: r.commit_hash,
            update_type: r.update_type,
            darwin_core_cdn_url: r.darwin_core_cdn_url,
            core_hash: r.core_hash,
            uploaders_cdn_url: uploaders.cdn_url,
            uploaders_map_cdn_url: uploaders.map_cdn_url,
            uploaders_hash: uploaders.hash,
            editors_cdn_url: editors.cdn_url,
            editors_map_cdn_url: editors.map_cdn_url,
            editors_hash: editors.hash,
            main_cdn_url: main.cdn_url,
            main_map_cdn_url: main.map_cdn_url,
            main_hash: main.hash,
            config_cdn_url: config.cdn_url,
            config_map_cdn_url: config.map_cdn_url,
            config_hash: config.hash,
            selector_cdn_url: selector.cdn_url,
            selector_map_cdn_url: selector.map_cdn_url,
            selector_hash: selector.hash,
        }
    }
}

// ---------------------------------------------------------------------------
// Manifest
// ---------------------------------------------------------------------------

/// Ordered release history, newest publish first (index 0 is the head).
///
/// Only [`Manifest::prepend`] inserts and only [`Manifest::remove`]
/// deletes, so the order always equals publish order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Manifest(Vec<CommitRecord>);

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap records that are already in newest-first order.
    pub fn from_records(records: Vec<CommitRecord>) -> Self {
        Manifest(records)
    }

    pub fn records(&self) -> &[CommitRecord] {
        &self.0
    }

    pub fn into_records(self) -> Vec<CommitRecord> {
        self.0
    }

    /// Most recently published record.
    pub fn head(&self) -> Option<&CommitRecord> {
        self.0.first()
    }

    /// First (newest) record with the given commit hash.
    pub fn find(&self, commit_hash: &str) -> Option<&CommitRecord> {
        self.0.iter().find(|r| r.commit_hash == commit_hash)
    }

    pub fn contains(&self, commit_hash: &str) -> bool {
        self.find(commit_hash).is_some()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CommitRecord> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn prepend(&mut self, record: CommitRecord) {
        self.0.insert(0, record);
    }

    /// Remove every record with `commit_hash`, returning how many went.
    /// Survivors keep their relative order.
    pub fn remove(&mut self, commit_hash: &str) -> usize {
        let before = self.0.len();
        self.0.retain(|r| r.commit_hash != commit_hash);
        before - self.0.len()
    }
}

impl<'a> IntoIterator for &'a Manifest {
    type Item = &'a CommitRecord;
    type IntoIter = std::slice::Iter<'a, CommitRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(commit: &str) -> CommitRecord {
        CommitRecord {
            commit_hash: commit.to_string(),
            update_type: UpdateType::Stable,
            core_hash: "core".to_string(),
            darwin_core_cdn_url: format!("https://cdn.test/core/{commit}.zip"),
            modules: ModuleSet::from_fn(|m| ModuleArtifact {
                hash: format!("{m}-{commit}"),
                cdn_url: format!("https://cdn.test/{m}/{commit}.js"),
                map_cdn_url: format!("https://cdn.test/{m}/{commit}.js.map"),
            }),
        }
    }

    #[test]
    fn commit_record_uses_flat_camel_case_layout() {
        let value = serde_json::to_value(record("abc")).unwrap();
        assert_eq!(value["commitHash"], "abc");
        assert_eq!(value["updateType"], "stable");
        assert_eq!(value["darwinCoreCdnUrl"], "https://cdn.test/core/abc.zip");
        assert_eq!(value["mainHash"], "main-abc");
        assert_eq!(value["selectorMapCdnUrl"], "https://cdn.test/selector/abc.js.map");
        assert!(value.get("modules").is_none());
    }

    #[test]
    fn loads_manifest_written_by_earlier_deployments() {
        let mut raw = serde_json::Map::new();
        raw.insert("commitHash".into(), "c1".into());
        raw.insert("updateType".into(), "beta".into());
        raw.insert("darwinCoreCdnUrl".into(), "https://cdn.test/core.zip".into());
        raw.insert("coreHash".into(), "X".into());
        for m in ModuleName::ALL {
            raw.insert(format!("{m}CdnUrl"), format!("https://cdn.test/{m}.js").into());
            raw.insert(format!("{m}MapCdnUrl"), format!("https://cdn.test/{m}.js.map").into());
            raw.insert(format!("{m}Hash"), format!("{m}-hash").into());
        }
        let json = serde_json::Value::Array(vec![serde_json::Value::Object(raw)]);

        let manifest: Manifest = serde_json::from_value(json).unwrap();
        let head = manifest.head().unwrap();
        assert_eq!(head.update_type, UpdateType::Beta);
        assert_eq!(head.module(ModuleName::Config).hash, "config-hash");
        assert_eq!(
            head.module(ModuleName::Editors).map_cdn_url,
            "https://cdn.test/editors.js.map"
        );
    }

    #[test]
    fn record_missing_a_module_field_is_rejected() {
        let mut value = serde_json::to_value(record("abc")).unwrap();
        value.as_object_mut().unwrap().remove("editorsHash");
        assert!(serde_json::from_value::<CommitRecord>(value).is_err());
    }

    #[test]
    fn prepend_puts_newest_first() {
        let mut manifest = Manifest::new();
        manifest.prepend(record("a"));
        manifest.prepend(record("b"));
        let hashes: Vec<_> = manifest.iter().map(|r| r.commit_hash.as_str()).collect();
        assert_eq!(hashes, vec!["b", "a"]);
        assert_eq!(manifest.head().unwrap().commit_hash, "b");
    }

    #[test]
    fn remove_drops_every_match_and_keeps_order() {
        let mut manifest = Manifest::from_records(vec![
            record("c"),
            record("dup"),
            record("b"),
            record("dup"),
            record("a"),
        ]);
        assert_eq!(manifest.remove("dup"), 2);
        let hashes: Vec<_> = manifest.iter().map(|r| r.commit_hash.as_str()).collect();
        assert_eq!(hashes, vec!["c", "b", "a"]);
        assert_eq!(manifest.remove("missing"), 0);
    }

    #[test]
    fn module_names_and_parts() {
        assert_eq!(ModuleName::Main.script_part(), "main.js");
        assert_eq!(ModuleName::Selector.map_part(), "selector.js.map");
        assert_eq!("editors".parse::<ModuleName>().unwrap(), ModuleName::Editors);
        assert!("core".parse::<ModuleName>().is_err());
    }
}
