//! `depresolve graph`: resolve the given roots, then walk the resolved
//! assignment out to `max_depth` and print it as a flat node/edge listing.
//! Rendering the graph for display is explicitly out of scope; this just
//! exposes the same projection [`depresolve::graph::build_dependency_graph`]
//! produces.

use super::common::{build_registry, build_vulnerabilities, parse_roots};
use anyhow::Result;
use depresolve::constraint::DependencyType;
use depresolve::graph::build_dependency_graph;
use depresolve::registry::{PackageInfo, RegistryLookup};
use depresolve::resolver::{self, Outcome};
use depresolve::{Config, Version};
use std::collections::{HashMap, HashSet, VecDeque};

pub fn run(roots: Vec<String>, dependency_type: Option<String>, max_depth: Option<u32>) -> Result<()> {
    let mut config = Config::load()?;
    if let Some(dependency_type) = dependency_type {
        config.resolver.dependency_type = dependency_type;
    }
    if let Some(max_depth) = max_depth {
        config.resolver.max_depth = max_depth;
    }

    let roots = parse_roots(&roots)?;
    let registry = build_registry(&config)?;
    let vulnerabilities = build_vulnerabilities(&config)?;
    let resolver_config = config.resolver.to_resolver_config(None);

    let assignment = match resolver::resolve(&roots, &resolver_config, registry.as_ref(), vulnerabilities.as_ref()) {
        Outcome::Success(assignment) => assignment,
        Outcome::PartialFailure(assignment, _) => assignment,
        Outcome::Failure(_) => {
            println!("Resolution failed; nothing to graph.");
            std::process::exit(1);
        }
    };

    let (package_infos, overflow) = expand_to_depth(
        &assignment,
        registry.as_ref(),
        resolver_config.dependency_type,
        resolver_config.max_depth,
    );
    let (nodes, edges) = build_dependency_graph(&package_infos, &roots, &overflow, resolver_config.dependency_type);

    for node in &nodes {
        let marker = if node.is_root { "*" } else { " " };
        let version = node
            .version
            .as_ref()
            .map(|v| v.to_string())
            .unwrap_or_else(|| node.label.clone());
        let status = if node.reached_max_depth {
            " (max depth reached)"
        } else if !node.is_found {
            " (not found)"
        } else {
            ""
        };
        println!("{} {} {}{}", marker, node.id, version, status);
    }
    println!();
    for edge in &edges {
        println!("{} -> {}", edge.from, edge.to);
    }

    Ok(())
}

/// BFS out from every resolved root, stopping expansion (but not inclusion)
/// of a package once `depth == max_depth`.
fn expand_to_depth(
    assignment: &HashMap<String, Version>,
    registry: &dyn RegistryLookup,
    dependency_type: DependencyType,
    max_depth: u32,
) -> (HashMap<String, PackageInfo>, HashSet<String>) {
    let mut package_infos = HashMap::new();
    let mut overflow = HashSet::new();
    let mut visited = HashSet::new();
    let mut queue: VecDeque<(String, u32)> = assignment.keys().map(|name| (name.clone(), 0)).collect();

    while let Some((name, depth)) = queue.pop_front() {
        if !visited.insert(name.clone()) {
            continue;
        }
        let Some(version) = assignment.get(&name) else {
            continue;
        };
        let Some(info) = registry.package_at(&name, version) else {
            continue;
        };

        if depth >= max_depth {
            overflow.insert(name.clone());
        } else {
            for dep_name in info.deps_for(dependency_type).keys() {
                if assignment.contains_key(dep_name) {
                    queue.push_back((dep_name.clone(), depth + 1));
                }
            }
        }
        package_infos.insert(name, info);
    }

    (package_infos, overflow)
}
