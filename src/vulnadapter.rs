//! Vulnerability Adapter: cache-first lookup of a package version's known
//! CVEs, rate-limited against the upstream vulnerability database.
//!
//! Failures here are always fail-open: a transport or decode error yields
//! the empty [`VulnerabilityList`], so a threshold check downstream passes
//! rather than blocking resolution on an unrelated outage.

use crate::cache::{DualTierCache, DurableStore};
use crate::range;
use crate::version::Version;
use crate::vulnerability::{CveItem, Severity, VulnerabilityList};
use serde::Deserialize;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::warn;

const INTERVAL_WITH_AUTH: Duration = Duration::from_millis(600);
const INTERVAL_WITHOUT_AUTH: Duration = Duration::from_secs(6);

/// A collaborator returning the upstream vulnerability database's native
/// response for a keyword search.
pub trait VulnerabilityCollaborator: Send + Sync {
    fn fetch_cves(&self, keyword: &str) -> crate::error::Result<Vec<u8>>;
}

#[derive(Debug, Deserialize)]
struct RawCveItem {
    id: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    severity: Option<String>,
    #[serde(default)]
    cvss: Option<f64>,
    #[serde(default)]
    published: Option<String>,
    #[serde(default)]
    modified: Option<String>,
    #[serde(default)]
    references: Vec<String>,
    /// The version range this advisory applies to, if the upstream source
    /// doesn't pre-filter by version itself.
    #[serde(default)]
    affected_range: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawCveResponse {
    #[serde(default)]
    items: Vec<RawCveItem>,
}

struct RateLimiter {
    last_request: Mutex<Option<Instant>>,
    interval: Duration,
}

impl RateLimiter {
    fn new(has_auth: bool) -> Self {
        Self {
            last_request: Mutex::new(None),
            interval: if has_auth {
                INTERVAL_WITH_AUTH
            } else {
                INTERVAL_WITHOUT_AUTH
            },
        }
    }

    fn wait(&self) {
        let mut guard = match self.last_request.lock() {
            Ok(g) => g,
            Err(_) => return,
        };
        let now = Instant::now();
        if let Some(last) = *guard {
            let elapsed = now.duration_since(last);
            if elapsed < self.interval {
                std::thread::sleep(self.interval - elapsed);
            }
        }
        *guard = Some(Instant::now());
    }
}

/// Object-safe facade over [`VulnerabilityAdapter`], mirroring
/// [`crate::registry::RegistryLookup`].
pub trait VulnerabilityLookup: Send + Sync {
    fn vulnerabilities(&self, name: &str, version: &Version) -> VulnerabilityList;
}

impl<C: VulnerabilityCollaborator, D: DurableStore> VulnerabilityLookup for VulnerabilityAdapter<C, D> {
    fn vulnerabilities(&self, name: &str, version: &Version) -> VulnerabilityList {
        self.vulnerabilities(name, version)
    }
}

pub struct VulnerabilityAdapter<C: VulnerabilityCollaborator, D: DurableStore> {
    collaborator: C,
    cache: DualTierCache<VulnerabilityList, D>,
    rate_limiter: RateLimiter,
    ecosystem_tag: String,
}

impl<C: VulnerabilityCollaborator, D: DurableStore> VulnerabilityAdapter<C, D> {
    pub fn new(
        collaborator: C,
        durable: D,
        memory_enabled: bool,
        ecosystem_tag: impl Into<String>,
        has_auth: bool,
    ) -> Self {
        Self {
            collaborator,
            cache: DualTierCache::new(durable, memory_enabled),
            rate_limiter: RateLimiter::new(has_auth),
            ecosystem_tag: ecosystem_tag.into(),
        }
    }

    pub fn load_cache(&self) {
        self.cache.load_all();
    }

    pub fn vulnerabilities(&self, name: &str, version: &Version) -> VulnerabilityList {
        let version_key = version.to_string();
        if let Some(list) = self.cache.get(name, &version_key) {
            return list;
        }

        self.rate_limiter.wait();
        let keyword = format!("{} {}", self.ecosystem_tag, name);
        let bytes = match self.collaborator.fetch_cves(&keyword) {
            Ok(b) => b,
            Err(e) => {
                warn!(package = name, %version, error = %e, "vulnerability fetch failed, treating as empty");
                return VulnerabilityList::empty();
            }
        };

        let raw: RawCveResponse = match serde_json::from_slice(&bytes) {
            Ok(r) => r,
            Err(e) => {
                warn!(package = name, %version, error = %e, "vulnerability payload failed to decode");
                return VulnerabilityList::empty();
            }
        };

        let items: Vec<CveItem> = raw
            .items
            .into_iter()
            .filter(|item| applies_to(item, version))
            .map(|item| {
                let severity = item
                    .severity
                    .as_deref()
                    .map(parse_severity)
                    .unwrap_or(Severity::Unknown);
                let severity = if severity == Severity::Unknown {
                    item.cvss.map(Severity::from_cvss).unwrap_or(Severity::Unknown)
                } else {
                    severity
                };
                CveItem {
                    id: item.id,
                    description: item.description,
                    severity,
                    cvss: item.cvss,
                    published: item.published,
                    modified: item.modified,
                    references: item.references,
                }
            })
            .collect();

        let list = VulnerabilityList::new(items);
        self.cache.put(name, &version_key, list.clone());
        list
    }
}

fn applies_to(item: &RawCveItem, version: &Version) -> bool {
    let Some(affected_range) = &item.affected_range else {
        return true;
    };
    match range::parse(affected_range) {
        Ok(r) => r.satisfies(version),
        Err(e) => {
            warn!(affected_range, error = %e, "unparseable affected_range, including advisory");
            true
        }
    }
}

/// HTTP-backed [`VulnerabilityCollaborator`], the vulnerability-side
/// counterpart of [`crate::registry_http::HttpRegistryCollaborator`]: same
/// blocking client, same status-code taxonomy, pointed at a keyword-search
/// endpoint instead of a per-package document.
pub struct HttpVulnerabilityCollaborator {
    base_url: String,
    client: reqwest::blocking::Client,
    api_token: Option<String>,
}

impl HttpVulnerabilityCollaborator {
    pub fn new(base_url: String, api_token: Option<String>) -> Self {
        Self {
            base_url,
            client: reqwest::blocking::Client::new(),
            api_token,
        }
    }

    fn format_auth_header(token: &str) -> String {
        if token.starts_with("dprslv_") {
            format!("Token {}", token)
        } else {
            format!("Bearer {}", token)
        }
    }
}

impl VulnerabilityCollaborator for HttpVulnerabilityCollaborator {
    fn fetch_cves(&self, keyword: &str) -> crate::error::Result<Vec<u8>> {
        let url = format!("{}/api/v1/advisories", self.base_url);
        let mut request = self.client.get(&url).query(&[("q", keyword)]);
        if let Some(token) = &self.api_token {
            request = request.header("Authorization", Self::format_auth_header(token));
        }

        let response = request.send().map_err(|e| crate::error::Error::Transport {
            collaborator: "vulnerability-db".to_string(),
            message: e.to_string(),
        })?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(crate::error::Error::Auth {
                collaborator: "vulnerability-db".to_string(),
            });
        }
        if !status.is_success() {
            return Err(crate::error::Error::Transport {
                collaborator: "vulnerability-db".to_string(),
                message: format!("HTTP {}", status.as_u16()),
            });
        }

        response.bytes().map(|b| b.to_vec()).map_err(|e| crate::error::Error::Transport {
            collaborator: "vulnerability-db".to_string(),
            message: e.to_string(),
        })
    }
}

fn parse_severity(s: &str) -> Severity {
    match s.to_ascii_uppercase().as_str() {
        "CRITICAL" => Severity::Critical,
        "HIGH" => Severity::High,
        "MEDIUM" => Severity::Medium,
        "LOW" => Severity::Low,
        "NONE" => Severity::None,
        _ => Severity::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::durable::FileDurableStore;
    use std::collections::HashMap;
    use std::sync::Mutex as StdMutex;

    struct StubCollaborator {
        responses: StdMutex<HashMap<String, Vec<u8>>>,
    }

    impl VulnerabilityCollaborator for StubCollaborator {
        fn fetch_cves(&self, keyword: &str) -> crate::error::Result<Vec<u8>> {
            Ok(self
                .responses
                .lock()
                .unwrap()
                .get(keyword)
                .cloned()
                .unwrap_or_else(|| b"{\"items\":[]}".to_vec()))
        }
    }

    fn adapter_with(
        responses: HashMap<String, Vec<u8>>,
    ) -> (VulnerabilityAdapter<StubCollaborator, FileDurableStore>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let adapter = VulnerabilityAdapter::new(
            StubCollaborator {
                responses: StdMutex::new(responses),
            },
            FileDurableStore::new(dir.path()),
            true,
            "npm",
            false,
        );
        (adapter, dir)
    }

    #[test]
    fn derives_severity_from_cvss_when_missing() {
        let body = serde_json::json!({
            "items": [
                {"id": "CVE-2024-1", "description": "x", "cvss": 9.8}
            ]
        })
        .to_string()
        .into_bytes();
        let mut responses = HashMap::new();
        responses.insert("npm lodash".to_string(), body);
        let (adapter, _dir) = adapter_with(responses);

        let list = adapter.vulnerabilities("lodash", &Version::new(4, 17, 21));
        assert_eq!(list.items.len(), 1);
        assert_eq!(list.items[0].severity, Severity::Critical);
    }

    #[test]
    fn filters_by_affected_range() {
        let body = serde_json::json!({
            "items": [
                {"id": "CVE-1", "description": "x", "severity": "HIGH", "affected_range": "<4.17.20"}
            ]
        })
        .to_string()
        .into_bytes();
        let mut responses = HashMap::new();
        responses.insert("npm lodash".to_string(), body);
        let (adapter, _dir) = adapter_with(responses);

        assert!(adapter
            .vulnerabilities("lodash", &Version::new(4, 17, 19))
            .items
            .iter()
            .any(|i| i.id == "CVE-1"));
        assert!(adapter
            .vulnerabilities("lodash", &Version::new(4, 17, 21))
            .items
            .is_empty());
    }

    #[test]
    fn decode_failure_is_fail_open() {
        let mut responses = HashMap::new();
        responses.insert("npm broken".to_string(), b"not json".to_vec());
        let (adapter, _dir) = adapter_with(responses);
        let list = adapter.vulnerabilities("broken", &Version::new(1, 0, 0));
        assert!(list.items.is_empty());
    }
}
