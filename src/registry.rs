//! Registry Adapter: resolves a `(name, range)` request to a concrete
//! [`PackageInfo`] by consulting the cache then a remote collaborator.
//!
//! Remote and decode failures are contained here and reshaped into `None`;
//! by the time a result reaches [`crate::mcts`] or [`crate::state`] there is
//! nothing left to propagate but "a candidate list, possibly empty".

use crate::cache::{DualTierCache, DurableStore};
use crate::error::Error;
use crate::range::{self, Range};
use crate::version::Version;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use tracing::warn;

/// A collaborator returning a registry's native document for one package.
/// Authentication is entirely the collaborator's concern.
pub trait RegistryCollaborator: Send + Sync {
    fn fetch_raw(&self, name: &str) -> crate::error::Result<Vec<u8>>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawVersionRecord {
    version: String,
    #[serde(default)]
    dependencies: HashMap<String, String>,
    #[serde(default)]
    dev_dependencies: HashMap<String, String>,
    #[serde(default)]
    peer_dependencies: HashMap<String, String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct RawPackageDocument {
    #[serde(default)]
    versions: HashMap<String, RawVersionRecord>,
}

/// `(name, resolved_version, runtime_deps, dev_deps, peer_deps)`.
/// `resolved_version` is always a concrete version with no operators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageInfo {
    pub name: String,
    pub resolved_version: Version,
    pub runtime_deps: HashMap<String, String>,
    pub dev_deps: HashMap<String, String>,
    pub peer_deps: HashMap<String, String>,
}

impl PackageInfo {
    pub fn deps_for(&self, dep_type: crate::constraint::DependencyType) -> &HashMap<String, String> {
        use crate::constraint::DependencyType::*;
        match dep_type {
            Runtime => &self.runtime_deps,
            Dev => &self.dev_deps,
            Peer => &self.peer_deps,
        }
    }
}

/// Object-safe facade over [`RegistryAdapter`], letting [`crate::mcts`] and
/// [`crate::resolver`] hold a single `&dyn RegistryLookup` instead of
/// threading the collaborator/durable-store type parameters through the
/// whole search tree.
pub trait RegistryLookup: Send + Sync {
    fn fetch(&self, name: &str, range_string: &str) -> Option<PackageInfo>;
    fn available_versions(&self, name: &str) -> Vec<Version>;
    fn package_at(&self, name: &str, version: &Version) -> Option<PackageInfo>;
}

impl<C: RegistryCollaborator, D: DurableStore> RegistryLookup for RegistryAdapter<C, D> {
    fn fetch(&self, name: &str, range_string: &str) -> Option<PackageInfo> {
        self.fetch(name, range_string)
    }

    fn available_versions(&self, name: &str) -> Vec<Version> {
        self.available_versions(name)
    }

    fn package_at(&self, name: &str, version: &Version) -> Option<PackageInfo> {
        self.package_at(name, version)
    }
}

pub struct RegistryAdapter<C: RegistryCollaborator, D: DurableStore> {
    collaborator: C,
    cache: DualTierCache<RawPackageDocument, D>,
}

impl<C: RegistryCollaborator, D: DurableStore> RegistryAdapter<C, D> {
    pub fn new(collaborator: C, durable: D, memory_enabled: bool) -> Self {
        Self {
            collaborator,
            cache: DualTierCache::new(durable, memory_enabled),
        }
    }

    pub fn load_cache(&self) {
        self.cache.load_all();
    }

    /// `fetch(name, range_string) -> PackageInfo | None`.
    pub fn fetch(&self, name: &str, range_string: &str) -> Option<PackageInfo> {
        let doc = self.get_document(name, range_string)?;
        let filtered = non_prerelease(&doc);
        if filtered.is_empty() {
            return None;
        }

        let chosen = if let Some(exact) = range::exact_version(range_string) {
            filtered
                .iter()
                .find(|(v, _)| **v == exact)
                .map(|(v, r)| (v.clone(), *r))
        } else {
            let parsed: Range = match range::parse(range_string) {
                Ok(r) => r,
                Err(e) => {
                    warn!(package = name, range_string, error = %e, "unparseable range string");
                    return None;
                }
            };
            let versions: Vec<Version> = filtered.iter().map(|(v, _)| v.clone()).collect();
            range::best_match(&parsed, &versions)
                .cloned()
                .and_then(|v| filtered.iter().find(|(fv, _)| *fv == v).map(|(v, r)| (v.clone(), *r)))
        };

        let (version, record) = chosen?;
        Some(PackageInfo {
            name: name.to_string(),
            resolved_version: version,
            runtime_deps: record.dependencies.clone(),
            dev_deps: record.dev_dependencies.clone(),
            peer_deps: record.peer_dependencies.clone(),
        })
    }

    /// All non-pre-release versions, newest-first. Triggers a fetch of
    /// `(name, "*")` on cache miss.
    pub fn available_versions(&self, name: &str) -> Vec<Version> {
        let Some(doc) = self.get_document(name, "*") else {
            return Vec::new();
        };
        let mut versions: Vec<Version> = non_prerelease(&doc).into_iter().map(|(v, _)| v).collect();
        versions.sort_by(|a, b| b.cmp(a));
        versions
    }

    /// The record for an exact version, or `None`.
    pub fn package_at(&self, name: &str, version: &Version) -> Option<PackageInfo> {
        let doc = self.get_document(name, "*")?;
        let record = non_prerelease(&doc)
            .into_iter()
            .find(|(v, _)| v == version)
            .map(|(_, r)| r)?;
        Some(PackageInfo {
            name: name.to_string(),
            resolved_version: version.clone(),
            runtime_deps: record.dependencies.clone(),
            dev_deps: record.dev_dependencies.clone(),
            peer_deps: record.peer_dependencies.clone(),
        })
    }

    fn get_document(&self, name: &str, tag: &str) -> Option<RawPackageDocument> {
        if let Some(doc) = self.cache.get(name, tag) {
            return Some(doc);
        }

        let bytes = match self.collaborator.fetch_raw(name) {
            Ok(b) => b,
            Err(Error::PackageNotFound(_)) => return None,
            Err(e) => {
                warn!(package = name, error = %e, "registry fetch failed");
                return None;
            }
        };

        let doc: RawPackageDocument = match serde_json::from_slice(&bytes) {
            Ok(d) => d,
            Err(e) => {
                warn!(package = name, error = %e, "registry payload failed to decode");
                return None;
            }
        };

        self.cache.put(name, tag, doc.clone());
        Some(doc)
    }
}

fn non_prerelease(doc: &RawPackageDocument) -> Vec<(Version, RawVersionRecordRef<'_>)> {
    doc.versions
        .iter()
        .filter(|(key, _)| !key.contains('-'))
        .filter_map(|(key, record)| Version::parse(key).map(|v| (v, record)))
        .collect()
}

type RawVersionRecordRef<'a> = &'a RawVersionRecord;

/// A local, file-backed [`RegistryCollaborator`]: one JSON document per
/// package at `<root>/<name>.json`, grounded on the teacher's
/// `FileRegistryClient::get_package` (same path-join, same "not found"
/// mapping). Useful for offline resolution against a vendored registry
/// mirror or for tests.
pub struct FileRegistryCollaborator {
    root: PathBuf,
}

impl FileRegistryCollaborator {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn package_path(&self, name: &str) -> PathBuf {
        self.root.join(format!("{}.json", name))
    }
}

impl RegistryCollaborator for FileRegistryCollaborator {
    fn fetch_raw(&self, name: &str) -> crate::error::Result<Vec<u8>> {
        let path = self.package_path(name);
        if !path.exists() {
            return Err(Error::PackageNotFound(name.to_string()));
        }
        Ok(fs::read(path)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::durable::FileDurableStore;

    struct StubCollaborator {
        docs: HashMap<String, Vec<u8>>,
    }

    impl RegistryCollaborator for StubCollaborator {
        fn fetch_raw(&self, name: &str) -> crate::error::Result<Vec<u8>> {
            self.docs
                .get(name)
                .cloned()
                .ok_or_else(|| Error::PackageNotFound(name.to_string()))
        }
    }

    fn lodash_doc() -> Vec<u8> {
        serde_json::json!({
            "versions": {
                "4.17.21": {"version": "4.17.21", "dependencies": {}},
                "4.17.20": {"version": "4.17.20", "dependencies": {}},
                "4.17.19": {"version": "4.17.19", "dependencies": {}},
                "5.0.0-beta.1": {"version": "5.0.0-beta.1", "dependencies": {}}
            }
        })
        .to_string()
        .into_bytes()
    }

    fn adapter() -> (RegistryAdapter<StubCollaborator, FileDurableStore>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let mut docs = HashMap::new();
        docs.insert("lodash".to_string(), lodash_doc());
        let adapter = RegistryAdapter::new(
            StubCollaborator { docs },
            FileDurableStore::new(dir.path()),
            true,
        );
        (adapter, dir)
    }

    #[test]
    fn fetch_picks_newest_satisfying_version() {
        let (adapter, _dir) = adapter();
        let info = adapter.fetch("lodash", "^4.17.0").unwrap();
        assert_eq!(info.resolved_version, Version::new(4, 17, 21));
    }

    #[test]
    fn fetch_exact_version_bypasses_best_match() {
        let (adapter, _dir) = adapter();
        let info = adapter.fetch("lodash", "4.17.19").unwrap();
        assert_eq!(info.resolved_version, Version::new(4, 17, 19));
    }

    #[test]
    fn prerelease_versions_are_excluded() {
        let (adapter, _dir) = adapter();
        let versions = adapter.available_versions("lodash");
        assert!(!versions.contains(&Version::new(5, 0, 0)));
        assert_eq!(versions.len(), 3);
        assert_eq!(versions[0], Version::new(4, 17, 21));
    }

    #[test]
    fn unknown_package_is_none_not_error() {
        let (adapter, _dir) = adapter();
        assert!(adapter.fetch("does-not-exist", "*").is_none());
    }

    #[test]
    fn package_at_returns_exact_record() {
        let (adapter, _dir) = adapter();
        let info = adapter.package_at("lodash", &Version::new(4, 17, 20)).unwrap();
        assert_eq!(info.resolved_version, Version::new(4, 17, 20));
    }

    #[test]
    fn file_collaborator_reads_one_json_document_per_package() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("lodash.json"), lodash_doc()).unwrap();
        let collaborator = FileRegistryCollaborator::new(dir.path());
        assert!(collaborator.fetch_raw("lodash").is_ok());
        assert!(matches!(
            collaborator.fetch_raw("missing"),
            Err(Error::PackageNotFound(_))
        ));
    }
}
