//! Top-level entry point: `resolve(roots, config) -> Outcome`. Seeds the
//! initial search state, runs the MCTS tree to completion, and extracts a
//! solution per §4.4.7.

use crate::constraint::PendingDependency;
use crate::mcts::{Mcts, ResolverConfig};
use crate::range;
use crate::registry::RegistryLookup;
use crate::state::ResolverState;
use crate::version::Version;
use crate::vulnadapter::VulnerabilityLookup;
use std::collections::HashMap;

pub use crate::mcts::ResolverConfig;

/// The partial-failure and failure payload: the last (up to 10) diagnostic
/// messages recorded during search, the best partial assignment found (if
/// any), and a one-line summary of how many terminal nodes were considered.
#[derive(Debug, Clone)]
pub struct Diagnostics {
    pub messages: Vec<String>,
    pub partial_assignment: Option<HashMap<String, Version>>,
    pub terminal_summary: String,
}

#[derive(Debug, Clone)]
pub enum Outcome {
    Success(HashMap<String, Version>),
    PartialFailure(HashMap<String, Version>, Diagnostics),
    Failure(Diagnostics),
}

/// Resolve `roots` (package name -> range string) against the given
/// collaborators, returning a structured [`Outcome`]. Never aborts the
/// process; every failure path is a returned value.
pub fn resolve(
    roots: &HashMap<String, String>,
    config: &ResolverConfig,
    registry: &dyn RegistryLookup,
    vulnerabilities: &dyn VulnerabilityLookup,
) -> Outcome {
    // `roots` is a HashMap, whose iteration order is not stable across
    // processes; sort by name so the initial `pending` FIFO order is a
    // deterministic function of the input alone.
    let mut sorted_roots: Vec<(&String, &String)> = roots.iter().collect();
    sorted_roots.sort_by(|a, b| a.0.cmp(b.0));
    let initial_pending = sorted_roots
        .into_iter()
        .map(|(name, raw_range)| PendingDependency::root(name.clone(), range::normalize(raw_range)))
        .collect();

    let state = ResolverState {
        resolved: HashMap::new(),
        pending: initial_pending,
        constraints: HashMap::new(),
    };

    let mut mcts = Mcts::new(state, registry, vulnerabilities, config);
    mcts.run();
    let (terminals, best_simulation, messages) = mcts.into_parts();
    extract_outcome(terminals, best_simulation, messages)
}

/// Solution extraction per §4.4.7, factored out of [`resolve`] so the
/// best-terminal/best-simulation-fallback/failure decision can be exercised
/// directly against hand-built inputs instead of a live search tree.
fn extract_outcome(
    terminals: Vec<(ResolverState, u64, f64)>,
    best_simulation: Option<(ResolverState, f64)>,
    messages: Vec<String>,
) -> Outcome {
    let mut best: Option<(ResolverState, f64)> = None;
    for (state, visits, reward_sum) in terminals.iter() {
        let avg = if *visits > 0 {
            reward_sum / *visits as f64
        } else {
            f64::NEG_INFINITY
        };
        let better = best.as_ref().map(|(_, b)| avg > *b).unwrap_or(true);
        if better {
            best = Some((state.clone(), avg));
        }
    }

    if let Some((ref state, _)) = best {
        if !state.violates_constraints() && state.pending.is_empty() {
            return Outcome::Success(state.resolved.clone());
        }
    }

    if let Some((state, _reward)) = best_simulation {
        return Outcome::Success(state.resolved);
    }

    let partial_assignment = best
        .map(|(state, _)| state.resolved)
        .filter(|m| !m.is_empty());
    let diagnostics = Diagnostics {
        messages,
        partial_assignment: partial_assignment.clone(),
        terminal_summary: format!("{} terminal node(s) considered", terminals.len()),
    };

    match partial_assignment {
        Some(assignment) => Outcome::PartialFailure(assignment, diagnostics),
        None => Outcome::Failure(diagnostics),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraint::{Constraint, DependencyType};
    use crate::registry::PackageInfo;
    use crate::vulnerability::{VulnerabilityList, VulnerabilityThreshold};
    use std::collections::HashMap as Map;

    struct StubRegistry {
        versions: Map<String, Vec<Version>>,
        deps: Map<(String, Version), Map<String, String>>,
    }

    impl RegistryLookup for StubRegistry {
        fn fetch(&self, name: &str, _range_string: &str) -> Option<PackageInfo> {
            self.available_versions(name)
                .into_iter()
                .next()
                .and_then(|v| self.package_at(name, &v))
        }

        fn available_versions(&self, name: &str) -> Vec<Version> {
            self.versions.get(name).cloned().unwrap_or_default()
        }

        fn package_at(&self, name: &str, version: &Version) -> Option<PackageInfo> {
            if !self.versions.get(name)?.contains(version) {
                return None;
            }
            let deps = self
                .deps
                .get(&(name.to_string(), version.clone()))
                .cloned()
                .unwrap_or_default();
            Some(PackageInfo {
                name: name.to_string(),
                resolved_version: version.clone(),
                runtime_deps: deps,
                dev_deps: Map::new(),
                peer_deps: Map::new(),
            })
        }
    }

    struct StubVulnerabilities {
        by_version: Map<(String, Version), VulnerabilityList>,
    }

    impl VulnerabilityLookup for StubVulnerabilities {
        fn vulnerabilities(&self, name: &str, version: &Version) -> VulnerabilityList {
            self.by_version
                .get(&(name.to_string(), version.clone()))
                .cloned()
                .unwrap_or_else(VulnerabilityList::empty)
        }
    }

    fn roots(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn scenario_a_trivial_success() {
        let registry = StubRegistry {
            versions: Map::from([(
                "lodash".to_string(),
                vec![Version::new(4, 17, 21), Version::new(4, 17, 20), Version::new(4, 17, 19)],
            )]),
            deps: Map::new(),
        };
        let vulns = StubVulnerabilities {
            by_version: Map::new(),
        };
        let config = ResolverConfig {
            seed: Some(1),
            max_iterations: 50,
            ..ResolverConfig::default()
        };
        let outcome = resolve(&roots(&[("lodash", "^4.17.0")]), &config, &registry, &vulns);
        match outcome {
            Outcome::Success(assignment) => {
                assert_eq!(assignment.get("lodash"), Some(&Version::new(4, 17, 21)));
            }
            other => panic!("expected Success, got {:?}", other),
        }
    }

    #[test]
    fn scenario_b_threshold_filter() {
        let registry = StubRegistry {
            versions: Map::from([(
                "lodash".to_string(),
                vec![Version::new(4, 17, 21), Version::new(4, 17, 20), Version::new(4, 17, 19)],
            )]),
            deps: Map::new(),
        };
        let high_cve = VulnerabilityList::new(vec![crate::vulnerability::CveItem {
            id: "CVE-x".to_string(),
            description: String::new(),
            severity: crate::vulnerability::Severity::High,
            cvss: None,
            published: None,
            modified: None,
            references: Vec::new(),
        }]);
        let vulns = StubVulnerabilities {
            by_version: Map::from([
                (("lodash".to_string(), Version::new(4, 17, 21)), high_cve.clone()),
                (("lodash".to_string(), Version::new(4, 17, 20)), high_cve),
            ]),
        };
        let config = ResolverConfig {
            seed: Some(2),
            max_iterations: 50,
            threshold: Some(VulnerabilityThreshold::HIGH),
            ..ResolverConfig::default()
        };
        let outcome = resolve(&roots(&[("lodash", "^4.17.0")]), &config, &registry, &vulns);
        match outcome {
            Outcome::Success(assignment) => {
                assert_eq!(assignment.get("lodash"), Some(&Version::new(4, 17, 19)));
            }
            other => panic!("expected Success, got {:?}", other),
        }
    }

    #[test]
    fn scenario_c_peer_conflict_fails_and_names_react() {
        let registry = StubRegistry {
            versions: Map::from([
                ("x".to_string(), vec![Version::new(1, 0, 0)]),
                ("y".to_string(), vec![Version::new(1, 0, 0)]),
                ("react".to_string(), vec![Version::new(18, 2, 0), Version::new(17, 0, 2)]),
            ]),
            deps: Map::from([
                (
                    ("x".to_string(), Version::new(1, 0, 0)),
                    Map::from([("react".to_string(), "^17.0.0".to_string())]),
                ),
                (
                    ("y".to_string(), Version::new(1, 0, 0)),
                    Map::from([("react".to_string(), "^18.0.0".to_string())]),
                ),
            ]),
        };
        let vulns = StubVulnerabilities {
            by_version: Map::new(),
        };
        let config = ResolverConfig {
            seed: Some(3),
            max_iterations: 200,
            dependency_type: DependencyType::Peer,
            ..ResolverConfig::default()
        };
        let outcome = resolve(
            &roots(&[("x", "^1.0.0"), ("y", "^1.0.0")]),
            &config,
            &registry,
            &vulns,
        );
        match outcome {
            Outcome::Failure(diag) | Outcome::PartialFailure(_, diag) => {
                assert!(diag.messages.iter().any(|m| m.contains("react")));
            }
            Outcome::Success(assignment) => {
                panic!("expected a conflict, got Success({:?})", assignment)
            }
        }
    }

    #[test]
    fn scenario_d_root_range_is_normalized_to_caret() {
        let registry = StubRegistry {
            versions: Map::from([(
                "pkg".to_string(),
                vec![Version::new(1, 3, 0), Version::new(1, 2, 3)],
            )]),
            deps: Map::new(),
        };
        let vulns = StubVulnerabilities {
            by_version: Map::new(),
        };
        let config = ResolverConfig {
            seed: Some(4),
            max_iterations: 50,
            init_versions: true,
            ..ResolverConfig::default()
        };
        let outcome = resolve(&roots(&[("pkg", "1.2.3")]), &config, &registry, &vulns);
        match outcome {
            Outcome::Success(assignment) => {
                assert_eq!(assignment.get("pkg"), Some(&Version::new(1, 3, 0)));
            }
            other => panic!("expected Success, got {:?}", other),
        }
    }

    #[test]
    fn scenario_e_best_simulation_fallback_when_best_terminal_violates() {
        // The tree's only terminal node is a peer conflict on "p" (reward 0
        // on every visit), while an earlier rollout resolved both packages
        // cleanly and is cached as the best-simulation fallback.
        let violating_terminal = ResolverState {
            resolved: Map::from([("p".to_string(), Version::new(2, 0, 0))]),
            pending: Default::default(),
            constraints: Map::from([(
                "p".to_string(),
                vec![Constraint::invalid("q", Version::new(1, 0, 0))],
            )]),
        };
        let terminals = vec![(violating_terminal, 5u64, 0.0f64)];

        let rollout_assignment = ResolverState {
            resolved: Map::from([
                ("p".to_string(), Version::new(1, 0, 0)),
                ("q".to_string(), Version::new(1, 0, 0)),
            ]),
            pending: Default::default(),
            constraints: Map::new(),
        };
        assert!(!rollout_assignment.violates_constraints());
        assert!(rollout_assignment.pending.is_empty());
        let best_simulation = Some((rollout_assignment.clone(), 0.75f64));

        let outcome = extract_outcome(terminals, best_simulation, Vec::new());
        match outcome {
            Outcome::Success(assignment) => assert_eq!(assignment, rollout_assignment.resolved),
            other => panic!("expected Success via best-simulation fallback, got {:?}", other),
        }
    }

    #[test]
    fn scenario_f_all_versions_rejected_by_threshold_fails() {
        let registry = StubRegistry {
            versions: Map::from([("pkg".to_string(), vec![Version::new(1, 0, 0), Version::new(2, 0, 0)])]),
            deps: Map::new(),
        };
        let critical = VulnerabilityList::new(vec![crate::vulnerability::CveItem {
            id: "CVE-crit".to_string(),
            description: String::new(),
            severity: crate::vulnerability::Severity::Critical,
            cvss: None,
            published: None,
            modified: None,
            references: Vec::new(),
        }]);
        let vulns = StubVulnerabilities {
            by_version: Map::from([
                (("pkg".to_string(), Version::new(1, 0, 0)), critical.clone()),
                (("pkg".to_string(), Version::new(2, 0, 0)), critical),
            ]),
        };
        let config = ResolverConfig {
            seed: Some(5),
            max_iterations: 50,
            threshold: Some(VulnerabilityThreshold::CRITICAL),
            ..ResolverConfig::default()
        };
        let outcome = resolve(&roots(&[("pkg", "*")]), &config, &registry, &vulns);
        match outcome {
            Outcome::Failure(diag) => {
                assert!(!diag.messages.is_empty());
            }
            other => panic!("expected Failure, got {:?}", other),
        }
    }
}
