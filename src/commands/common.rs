//! Shared plumbing for the resolve/graph/why commands: parsing `name@range`
//! root arguments and wiring up collaborators from the loaded [`Config`].

use anyhow::{Context, Result};
use depresolve::durable::FileDurableStore;
use depresolve::registry::{FileRegistryCollaborator, RegistryAdapter, RegistryLookup};
use depresolve::registry_http::HttpRegistryCollaborator;
use depresolve::vulnadapter::{HttpVulnerabilityCollaborator, VulnerabilityAdapter, VulnerabilityLookup};
use depresolve::Config;
use std::collections::HashMap;

/// Parse `["lodash@^4.17.0", "@babel/core@^7.0.0"]` into a roots map.
///
/// Splits on the *last* `@` so scoped package names (`@scope/pkg`), which
/// carry a leading `@` of their own, still round-trip correctly.
pub fn parse_roots(specs: &[String]) -> Result<HashMap<String, String>> {
    let mut roots = HashMap::new();
    for spec in specs {
        let (name, range) = spec
            .rsplit_once('@')
            .with_context(|| format!("'{}' is not in 'name@range' form", spec))?;
        if name.is_empty() || range.is_empty() {
            anyhow::bail!("'{}' is not in 'name@range' form", spec);
        }
        roots.insert(name.to_string(), range.to_string());
    }
    Ok(roots)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_and_scoped_package_names() {
        let roots = parse_roots(&[
            "lodash@^4.17.0".to_string(),
            "@babel/core@^7.0.0".to_string(),
        ])
        .unwrap();
        assert_eq!(roots.get("lodash"), Some(&"^4.17.0".to_string()));
        assert_eq!(roots.get("@babel/core"), Some(&"^7.0.0".to_string()));
    }

    #[test]
    fn rejects_a_spec_with_no_delimiter() {
        assert!(parse_roots(&["lodash".to_string()]).is_err());
    }
}

pub fn build_registry(config: &Config) -> Result<Box<dyn RegistryLookup>> {
    let durable = FileDurableStore::new(config.cache_dir()?.join("registry"));
    let lookup: Box<dyn RegistryLookup> = match config.registry.registry_type.as_str() {
        "http" => {
            let collaborator =
                HttpRegistryCollaborator::new(config.registry.url.clone(), config.auth.token.clone());
            let adapter = RegistryAdapter::new(collaborator, durable, config.cache.memory_enabled);
            adapter.load_cache();
            Box::new(adapter)
        }
        _ => {
            let root = config
                .registry
                .file_root
                .clone()
                .unwrap_or(Config::default_dir()?.join("registry"));
            let collaborator = FileRegistryCollaborator::new(root);
            let adapter = RegistryAdapter::new(collaborator, durable, config.cache.memory_enabled);
            adapter.load_cache();
            Box::new(adapter)
        }
    };
    Ok(lookup)
}

pub fn build_vulnerabilities(config: &Config) -> Result<Box<dyn VulnerabilityLookup>> {
    let durable = FileDurableStore::new(config.cache_dir()?.join("vulnerabilities"));
    let collaborator =
        HttpVulnerabilityCollaborator::new(config.registry.vulnerability_url(), config.auth.token.clone());
    let adapter = VulnerabilityAdapter::new(
        collaborator,
        durable,
        config.cache.memory_enabled,
        config.registry.ecosystem_tag.clone(),
        config.auth.token.is_some(),
    );
    adapter.load_cache();
    Ok(Box::new(adapter))
}
