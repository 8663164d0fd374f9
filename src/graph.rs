//! A pure projection from resolved package metadata to a display graph,
//! consumed by an external visualization front end (out of core scope per
//! §1's Non-goals).

use crate::constraint::DependencyType;
use crate::registry::PackageInfo;
use crate::version::Version;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphNode {
    pub id: String,
    pub label: String,
    pub version: Option<Version>,
    pub is_root: bool,
    pub dep_count: usize,
    pub is_found: bool,
    pub reached_max_depth: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphEdge {
    pub from: String,
    pub to: String,
}

/// Project `package_infos` (every package the caller managed to fetch,
/// keyed by name) plus the root requirements into a node/edge list.
///
/// `max_depth_overflow` names packages whose own dependencies were never
/// traversed because the walk hit `max_depth`. If such a name is also a key
/// in `package_infos` its node is `is_found: true` (it was resolved, just
/// not expanded further); if not, it's a placeholder leaf the walk never
/// reached at all. Either way `reached_max_depth` lets the caller render
/// "not expanded" instead of silently dropping the edge.
pub fn build_dependency_graph(
    package_infos: &HashMap<String, PackageInfo>,
    roots: &HashMap<String, String>,
    max_depth_overflow: &HashSet<String>,
    dependency_type: DependencyType,
) -> (Vec<GraphNode>, Vec<GraphEdge>) {
    let mut unresolved_range: HashMap<String, String> = HashMap::new();
    for info in package_infos.values() {
        for (dep_name, dep_range) in info.deps_for(dependency_type) {
            if !package_infos.contains_key(dep_name) {
                unresolved_range
                    .entry(dep_name.clone())
                    .or_insert_with(|| dep_range.clone());
            }
        }
    }

    let mut names: Vec<String> = Vec::new();
    let mut seen = HashSet::new();
    for name in roots.keys().chain(package_infos.keys()).chain(unresolved_range.keys()) {
        if seen.insert(name.clone()) {
            names.push(name.clone());
        }
    }

    let nodes = names
        .into_iter()
        .map(|name| {
            let is_root = roots.contains_key(&name);
            match package_infos.get(&name) {
                Some(info) => GraphNode {
                    id: name.clone(),
                    label: name.clone(),
                    version: Some(info.resolved_version.clone()),
                    is_root,
                    dep_count: info.deps_for(dependency_type).len(),
                    is_found: true,
                    reached_max_depth: max_depth_overflow.contains(&name),
                },
                None => GraphNode {
                    id: name.clone(),
                    label: unresolved_range.get(&name).cloned().unwrap_or_else(|| name.clone()),
                    version: None,
                    is_root,
                    dep_count: 0,
                    is_found: false,
                    reached_max_depth: max_depth_overflow.contains(&name),
                },
            }
        })
        .collect();

    let edges = package_infos
        .iter()
        .flat_map(|(name, info)| {
            info.deps_for(dependency_type)
                .keys()
                .map(move |dep_name| GraphEdge {
                    from: name.clone(),
                    to: dep_name.clone(),
                })
        })
        .collect();

    (nodes, edges)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(name: &str, version: Version, deps: &[(&str, &str)]) -> PackageInfo {
        PackageInfo {
            name: name.to_string(),
            resolved_version: version,
            runtime_deps: deps.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
            dev_deps: HashMap::new(),
            peer_deps: HashMap::new(),
        }
    }

    #[test]
    fn resolved_dependency_becomes_a_found_node_with_an_edge() {
        let mut package_infos = HashMap::new();
        package_infos.insert("app".to_string(), info("app", Version::new(1, 0, 0), &[("lodash", "^4.17.0")]));
        package_infos.insert("lodash".to_string(), info("lodash", Version::new(4, 17, 21), &[]));
        let roots = HashMap::from([("app".to_string(), "^1.0.0".to_string())]);

        let (nodes, edges) = build_dependency_graph(&package_infos, &roots, &HashSet::new(), DependencyType::Runtime);

        let lodash = nodes.iter().find(|n| n.id == "lodash").unwrap();
        assert!(lodash.is_found);
        assert_eq!(lodash.version, Some(Version::new(4, 17, 21)));
        assert!(edges.contains(&GraphEdge {
            from: "app".to_string(),
            to: "lodash".to_string()
        }));
    }

    #[test]
    fn unfetched_dependency_is_a_placeholder_node() {
        let mut package_infos = HashMap::new();
        package_infos.insert("app".to_string(), info("app", Version::new(1, 0, 0), &[("deep", "^1.0.0")]));
        let roots = HashMap::from([("app".to_string(), "^1.0.0".to_string())]);
        let overflow = HashSet::from(["deep".to_string()]);

        let (nodes, _edges) = build_dependency_graph(&package_infos, &roots, &overflow, DependencyType::Runtime);

        let deep = nodes.iter().find(|n| n.id == "deep").unwrap();
        assert!(!deep.is_found);
        assert!(deep.reached_max_depth);
        assert_eq!(deep.version, None);
    }

    #[test]
    fn a_found_node_can_also_be_marked_as_overflow() {
        let mut package_infos = HashMap::new();
        package_infos.insert("deep".to_string(), info("deep", Version::new(1, 0, 0), &[("deeper", "^1.0.0")]));
        let overflow = HashSet::from(["deep".to_string()]);

        let (nodes, _edges) = build_dependency_graph(&package_infos, &HashMap::new(), &overflow, DependencyType::Runtime);

        let deep = nodes.iter().find(|n| n.id == "deep").unwrap();
        assert!(deep.is_found);
        assert!(deep.reached_max_depth);
    }

    #[test]
    fn root_flag_is_set_independent_of_fetch_status() {
        let package_infos = HashMap::new();
        let roots = HashMap::from([("ghost".to_string(), "^1.0.0".to_string())]);
        let (nodes, _) = build_dependency_graph(&package_infos, &roots, &HashSet::new(), DependencyType::Runtime);
        assert!(nodes.iter().any(|n| n.id == "ghost" && n.is_root && !n.is_found));
    }
}
