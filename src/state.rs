//! The resolver's state model and its one transition, `step`.

use crate::constraint::{Constraint, DependencyType, PendingDependency};
use crate::range;
use crate::version::Version;
use std::collections::{HashMap, VecDeque};
use tracing::warn;

/// Owns the resolved assignment so far, the queue of still-pending
/// dependencies, and the constraints accumulated per package name.
///
/// Invariant: a name in `resolved` never also appears in `pending`.
#[derive(Debug, Clone, Default)]
pub struct ResolverState {
    pub resolved: HashMap<String, Version>,
    pub pending: VecDeque<PendingDependency>,
    pub constraints: HashMap<String, Vec<Constraint>>,
}

impl ResolverState {
    pub fn new(roots: impl IntoIterator<Item = PendingDependency>) -> Self {
        Self {
            resolved: HashMap::new(),
            pending: roots.into_iter().collect(),
            constraints: HashMap::new(),
        }
    }

    /// Terminal iff `pending` is empty or any constraint is `INVALID`.
    pub fn is_terminal(&self) -> bool {
        self.pending.is_empty() || self.violates_constraints()
    }

    pub fn violates_constraints(&self) -> bool {
        self.constraints
            .values()
            .any(|cs| cs.iter().any(Constraint::is_invalid))
    }
}

/// The result of a [`step`]: the new state, plus any constraint-conflict
/// diagnostic produced while getting there (the prior constraint list is
/// overwritten by the `INVALID` sentinel, so the detail has to be captured
/// here or it is lost).
pub struct StepOutcome {
    pub state: ResolverState,
    pub diagnostics: Vec<String>,
}

/// `step(state, name, version) -> state'`, used identically by expansion
/// and simulation. `deps` is the chosen version's dependency map for the
/// active [`DependencyType`], already fetched by the caller through the
/// Registry Adapter.
pub fn step(
    state: &ResolverState,
    name: &str,
    version: Version,
    deps: &HashMap<String, String>,
    dep_type: DependencyType,
) -> StepOutcome {
    let mut resolved = state.resolved.clone();
    resolved.insert(name.to_string(), version.clone());

    let mut pending = state.pending.clone();
    debug_assert!(
        pending.front().map(|p| p.package_name.as_str()) == Some(name),
        "step() called with a name that is not the head of pending"
    );
    pending.pop_front();

    let mut constraints = state.constraints.clone();
    let mut diagnostics = Vec::new();

    // `deps` is a HashMap, whose iteration order is not stable across
    // processes; sort by name so `pending`'s FIFO order is a deterministic
    // function of the input alone.
    let mut sorted_deps: Vec<(&String, &String)> = deps.iter().collect();
    sorted_deps.sort_by(|a, b| a.0.cmp(b.0));

    for (dep_name, dep_range_raw) in sorted_deps {
        let dep_range = range::normalize(dep_range_raw);

        let already_pending = pending.iter().any(|p| &p.package_name == dep_name);
        if !resolved.contains_key(dep_name) && !already_pending {
            pending.push_back(PendingDependency::new(
                dep_name.clone(),
                dep_range.clone(),
                Some(name.to_string()),
            ));
        }

        if dep_type == DependencyType::Peer {
            match resolved.get(dep_name) {
                None => {
                    constraints.entry(dep_name.clone()).or_default().push(
                        Constraint::new(dep_range.clone(), name.to_string(), Some(version.clone())),
                    );
                }
                Some(resolved_version) => {
                    let satisfied = match range::parse(&dep_range) {
                        Ok(r) => r.satisfies(resolved_version),
                        Err(e) => {
                            warn!(dep_name, dep_range, error = %e, "unparseable peer range treated as unsatisfied");
                            false
                        }
                    };
                    if !satisfied {
                        let existing = constraints.get(dep_name).cloned().unwrap_or_default();
                        let mut detail = format!(
                            "peer conflict on '{}': {}@{} requires {} {}",
                            dep_name, name, version, dep_name, dep_range
                        );
                        for c in &existing {
                            detail.push_str(&format!(
                                "; {}@{:?} requires {} {}",
                                c.required_by_package, c.required_by_version, dep_name, c.range
                            ));
                        }
                        diagnostics.push(detail);
                        constraints.insert(
                            dep_name.clone(),
                            vec![Constraint::invalid(name.to_string(), version.clone())],
                        );
                    }
                }
            }
        }
    }

    StepOutcome {
        state: ResolverState {
            resolved,
            pending,
            constraints,
        },
        diagnostics,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deps(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn resolved_and_pending_stay_disjoint() {
        let state = ResolverState::new([PendingDependency::root("lodash", "^4.17.0")]);
        let next = step(
            &state,
            "lodash",
            Version::new(4, 17, 21),
            &HashMap::new(),
            DependencyType::Runtime,
        )
        .state;
        assert!(next.pending.is_empty());
        assert!(next.resolved.contains_key("lodash"));
    }

    #[test]
    fn runtime_deps_are_enqueued_and_normalized() {
        let state = ResolverState::new([PendingDependency::root("app", "^1.0.0")]);
        let next = step(
            &state,
            "app",
            Version::new(1, 0, 0),
            &deps(&[("lodash", "4.17.0")]),
            DependencyType::Runtime,
        )
        .state;
        assert_eq!(next.pending.len(), 1);
        assert_eq!(next.pending[0].range_string, "^4.17.0");
    }

    #[test]
    fn peer_conflict_marks_constraint_invalid_and_names_both_requirers() {
        let mut state = ResolverState::new([]);
        state.resolved.insert("react".to_string(), Version::new(18, 2, 0));
        state.constraints.insert(
            "react".to_string(),
            vec![Constraint::new("^18.0.0", "y", Some(Version::new(1, 0, 0)))],
        );

        let outcome = step(
            &state,
            "x",
            Version::new(1, 0, 0),
            &deps(&[("react", "^17.0.0")]),
            DependencyType::Peer,
        );
        assert!(outcome.state.violates_constraints());
        assert!(outcome.state.is_terminal());
        assert_eq!(outcome.diagnostics.len(), 1);
        assert!(outcome.diagnostics[0].contains("react"));
        assert!(outcome.diagnostics[0].contains('y'));
        assert!(outcome.diagnostics[0].contains('x'));
    }

    #[test]
    fn peer_dependency_not_yet_resolved_accumulates_constraint() {
        let state = ResolverState::new([]);
        let next = step(
            &state,
            "x",
            Version::new(1, 0, 0),
            &deps(&[("react", "^17.0.0")]),
            DependencyType::Peer,
        )
        .state;
        assert_eq!(next.constraints["react"].len(), 1);
        assert!(!next.violates_constraints());
    }

    #[test]
    fn terminal_when_pending_empty() {
        let mut state = ResolverState::new([]);
        assert!(state.is_terminal());
        state.pending.push_back(PendingDependency::root("x", "*"));
        assert!(!state.is_terminal());
    }
}
