//! User and project configuration management
//!
//! Configuration is stored in TOML format at `~/.depresolve/config.toml`
//! (override the directory with `DEPRESOLVE_CONFIG_DIR`).
//!
//! # Examples
//!
//! ```no_run
//! use depresolve::Config;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load()?;
//! println!("max iterations: {}", config.resolver.max_iterations);
//! # Ok(())
//! # }
//! ```

use crate::constraint::DependencyType;
use crate::mcts::ResolverConfig;
use crate::vulnerability::VulnerabilityThreshold;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use tracing::warn;

/// User configuration file (`~/.depresolve/config.toml`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub resolver: ResolverSettings,

    #[serde(default)]
    pub cache: CacheSettings,

    #[serde(default)]
    pub registry: RegistrySettings,

    #[serde(default)]
    pub auth: AuthConfig,
}

/// TOML-friendly mirror of [`ResolverConfig`]: plain types only, with
/// `threshold` kept as its string encoding (`"HIGH"`, `"CUSTOM:0,1,5,10"`, ...)
/// since [`VulnerabilityThreshold`] itself isn't `Deserialize`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverSettings {
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    #[serde(default = "default_max_simulation_depth")]
    pub max_simulation_depth: u32,

    #[serde(default = "default_max_compare_versions")]
    pub max_compare_versions: usize,

    #[serde(default = "default_max_depth")]
    pub max_depth: u32,

    #[serde(default = "default_lambda")]
    pub lambda: f64,

    #[serde(default)]
    pub init_versions: bool,

    #[serde(default)]
    pub dependency_type: String,

    /// `None` disables vulnerability filtering entirely.
    #[serde(default)]
    pub threshold: Option<String>,

    /// Show the full rejected-candidate diagnostic trail in conflict
    /// output, rather than only the terminal summary.
    #[serde(default)]
    pub verbose_conflicts: bool,
}

fn default_max_iterations() -> u32 {
    1000
}

fn default_max_simulation_depth() -> u32 {
    100
}

fn default_max_compare_versions() -> usize {
    20
}

fn default_max_depth() -> u32 {
    5
}

fn default_lambda() -> f64 {
    2.0
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            max_simulation_depth: default_max_simulation_depth(),
            max_compare_versions: default_max_compare_versions(),
            max_depth: default_max_depth(),
            lambda: default_lambda(),
            init_versions: false,
            dependency_type: "runtime".to_string(),
            threshold: None,
            verbose_conflicts: false,
        }
    }
}

impl ResolverSettings {
    /// Build a search-ready [`ResolverConfig`]. An unrecognized
    /// `dependency_type` falls back to `Runtime`; a malformed `threshold`
    /// is dropped (treated as "no filtering") rather than failing config
    /// load outright — logged here as a warning, since this is the one
    /// place the string is actually parsed.
    pub fn to_resolver_config(&self, seed: Option<u64>) -> ResolverConfig {
        let dependency_type = match self.dependency_type.to_ascii_lowercase().as_str() {
            "dev" => DependencyType::Dev,
            "peer" => DependencyType::Peer,
            _ => DependencyType::Runtime,
        };
        let threshold = self.threshold.as_deref().and_then(|raw| {
            let parsed = VulnerabilityThreshold::parse(raw);
            if parsed.is_none() {
                warn!(threshold = raw, "unrecognized threshold encoding, disabling vulnerability filtering");
            }
            parsed
        });
        ResolverConfig {
            max_iterations: self.max_iterations,
            max_simulation_depth: self.max_simulation_depth,
            max_compare_versions: self.max_compare_versions,
            max_depth: self.max_depth,
            lambda: self.lambda,
            init_versions: self.init_versions,
            dependency_type,
            threshold,
            seed,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSettings {
    /// Enable the in-memory tier in front of the durable cache.
    #[serde(default = "default_true")]
    pub memory_enabled: bool,

    /// Directory holding the durable JSON cache. Defaults to
    /// `<config dir>/cache`.
    #[serde(default)]
    pub directory: Option<PathBuf>,
}

fn default_true() -> bool {
    true
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            memory_enabled: true,
            directory: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrySettings {
    /// Registry type: "file" or "http".
    #[serde(default = "default_registry_type")]
    pub registry_type: String,

    /// Registry URL (for the HTTP registry).
    #[serde(default = "default_registry_url")]
    pub url: String,

    /// Directory of `<name>.json` package documents (for the file
    /// registry). Defaults to `<config dir>/registry`.
    #[serde(default)]
    pub file_root: Option<PathBuf>,

    /// Vulnerability database URL. Defaults to `url` when unset, since a
    /// single host commonly serves both.
    #[serde(default)]
    pub vulnerability_url: Option<String>,

    /// Ecosystem tag used when querying the vulnerability database
    /// (e.g. "npm", "crates").
    #[serde(default = "default_ecosystem_tag")]
    pub ecosystem_tag: String,
}

fn default_registry_type() -> String {
    "file".to_string()
}

fn default_registry_url() -> String {
    "http://localhost:8787".to_string()
}

fn default_ecosystem_tag() -> String {
    "npm".to_string()
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            registry_type: default_registry_type(),
            url: default_registry_url(),
            file_root: None,
            vulnerability_url: None,
            ecosystem_tag: default_ecosystem_tag(),
        }
    }
}

impl RegistrySettings {
    pub fn vulnerability_url(&self) -> String {
        self.vulnerability_url.clone().unwrap_or_else(|| self.url.clone())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    /// API token for the HTTP registry and vulnerability collaborators.
    pub token: Option<String>,
}

impl AuthConfig {
    /// `dprslv_`-prefixed tokens use "Token <token>"; anything else is
    /// treated as a bearer/JWT session token.
    pub fn format_auth_header(token: &str) -> String {
        if token.starts_with("dprslv_") {
            format!("Token {}", token)
        } else {
            format!("Bearer {}", token)
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            resolver: ResolverSettings::default(),
            cache: CacheSettings::default(),
            registry: RegistrySettings::default(),
            auth: AuthConfig::default(),
        }
    }
}

impl Config {
    /// Uses `DEPRESOLVE_CONFIG_DIR` if set, otherwise `~/.depresolve`.
    pub fn default_dir() -> Result<PathBuf> {
        if let Ok(dir) = std::env::var("DEPRESOLVE_CONFIG_DIR") {
            return Ok(PathBuf::from(dir));
        }
        let home = std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .map_err(|_| Error::Other("could not find home directory".to_string()))?;
        Ok(PathBuf::from(home).join(".depresolve"))
    }

    pub fn default_path() -> Result<PathBuf> {
        Ok(Self::default_dir()?.join("config.toml"))
    }

    /// Directory backing the durable cache, honoring an explicit override.
    pub fn cache_dir(&self) -> Result<PathBuf> {
        match &self.cache.directory {
            Some(dir) => Ok(dir.clone()),
            None => Ok(Self::default_dir()?.join("cache")),
        }
    }

    /// Load config from file, or return the default if it doesn't exist.
    ///
    /// Environment overrides: `DEPRESOLVE_TOKEN` (auth.token),
    /// `DEPRESOLVE_CONFIG_DIR` (config/cache directory root).
    pub fn load() -> Result<Self> {
        let path = Self::default_path()?;

        let mut config = if !path.exists() {
            Self::default()
        } else {
            let content = fs::read_to_string(&path)?;
            toml::from_str(&content)?
        };

        if let Ok(token) = std::env::var("DEPRESOLVE_TOKEN") {
            if !token.is_empty() {
                config.auth.token = Some(token);
            }
        }

        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::default_path()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(&path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_spec_defaults() {
        let config = Config::default();
        assert_eq!(config.resolver.max_iterations, 1000);
        assert_eq!(config.resolver.lambda, 2.0);
        assert!(config.cache.memory_enabled);
    }

    #[test]
    fn to_resolver_config_parses_dependency_type_and_threshold() {
        let mut settings = ResolverSettings::default();
        settings.dependency_type = "peer".to_string();
        settings.threshold = Some("HIGH".to_string());
        let resolved = settings.to_resolver_config(Some(7));
        assert_eq!(resolved.dependency_type, DependencyType::Peer);
        assert_eq!(resolved.threshold, Some(VulnerabilityThreshold::HIGH));
        assert_eq!(resolved.seed, Some(7));
    }

    #[test]
    fn unrecognized_dependency_type_falls_back_to_runtime() {
        let mut settings = ResolverSettings::default();
        settings.dependency_type = "bogus".to_string();
        assert_eq!(settings.to_resolver_config(None).dependency_type, DependencyType::Runtime);
    }

    #[test]
    fn auth_header_distinguishes_api_tokens_from_bearer() {
        assert_eq!(AuthConfig::format_auth_header("dprslv_abc"), "Token dprslv_abc");
        assert_eq!(AuthConfig::format_auth_header("eyJhbGciOi"), "Bearer eyJhbGciOi");
    }
}
