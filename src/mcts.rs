//! The MCTS decision engine: tree structure, UCB1 selection, expansion,
//! biased simulation, backpropagation, and the best-simulation fallback.
//!
//! The tree is an arena (`Vec<SearchNode>`) with parent *indices* rather
//! than reference-counted pointers, so the weak parent back-reference used
//! during backpropagation can never keep a freed parent alive — it simply
//! can't be freed while the arena lives.

use crate::constraint::{DependencyType, PendingDependency};
use crate::range;
use crate::registry::RegistryLookup;
use crate::state::{self, ResolverState};
use crate::version::Version;
use crate::vulnadapter::VulnerabilityLookup;
use crate::vulnerability::VulnerabilityThreshold;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;
use tracing::debug;

const UCB1_C: f64 = std::f64::consts::SQRT_2;
const MAX_DIAGNOSTICS: usize = 10;

/// Configuration per §4.4 of the core spec. `max_depth` bounds the
/// dependency-graph *visualization* walk in [`crate::graph`], not the
/// search itself, which is governed by `max_iterations` /
/// `max_simulation_depth`.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    pub max_iterations: u32,
    pub max_simulation_depth: u32,
    pub max_compare_versions: usize,
    pub max_depth: u32,
    pub lambda: f64,
    pub init_versions: bool,
    pub dependency_type: DependencyType,
    pub threshold: Option<VulnerabilityThreshold>,
    pub seed: Option<u64>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_iterations: 1000,
            max_simulation_depth: 100,
            max_compare_versions: 20,
            max_depth: 5,
            lambda: 2.0,
            init_versions: false,
            dependency_type: DependencyType::Runtime,
            threshold: None,
            seed: None,
        }
    }
}

struct SearchNode {
    state: ResolverState,
    parent: Option<usize>,
    children: Vec<usize>,
    visits: u64,
    reward_sum: f64,
    expanded: HashSet<(String, Version)>,
}

impl SearchNode {
    fn root(state: ResolverState) -> Self {
        Self {
            state,
            parent: None,
            children: Vec::new(),
            visits: 0,
            reward_sum: 0.0,
            expanded: HashSet::new(),
        }
    }
}

/// A fully-run search tree plus the bookkeeping needed for solution
/// extraction: the best complete assignment seen during any rollout, and
/// the last `MAX_DIAGNOSTICS` constraint/dead-end diagnostics recorded.
pub struct Mcts<'a> {
    nodes: Vec<SearchNode>,
    registry: &'a dyn RegistryLookup,
    vulnerabilities: &'a dyn VulnerabilityLookup,
    config: &'a ResolverConfig,
    rng: StdRng,
    best_simulation: Option<(ResolverState, f64)>,
    diagnostics: Vec<String>,
}

impl<'a> Mcts<'a> {
    pub fn new(
        root_state: ResolverState,
        registry: &'a dyn RegistryLookup,
        vulnerabilities: &'a dyn VulnerabilityLookup,
        config: &'a ResolverConfig,
    ) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            nodes: vec![SearchNode::root(root_state)],
            registry,
            vulnerabilities,
            config,
            rng,
            best_simulation: None,
            diagnostics: Vec::new(),
        }
    }

    pub fn run(&mut self) {
        for _ in 0..self.config.max_iterations {
            let selected = self.select(0);
            let expanded = self.expand(selected);
            let (final_state, reward) = self.simulate(expanded);
            self.backpropagate(expanded, reward);

            if reward != 0.0
                && self
                    .best_simulation
                    .as_ref()
                    .map(|(_, best)| reward > *best)
                    .unwrap_or(true)
            {
                self.best_simulation = Some((final_state, reward));
            }
        }
    }

    pub fn into_parts(self) -> (Vec<(ResolverState, u64, f64)>, Option<(ResolverState, f64)>, Vec<String>) {
        let terminals = self
            .nodes
            .into_iter()
            .filter(|n| n.state.is_terminal())
            .map(|n| (n.state, n.visits, n.reward_sum))
            .collect();
        (terminals, self.best_simulation, self.diagnostics)
    }

    fn select(&self, mut idx: usize) -> usize {
        loop {
            if self.nodes[idx].state.is_terminal() {
                return idx;
            }
            if !self.fully_expanded(idx) {
                return idx;
            }
            idx = self.best_child_ucb1(idx);
        }
    }

    fn fully_expanded(&self, idx: usize) -> bool {
        let node = &self.nodes[idx];
        !node.children.is_empty() && node.children.iter().all(|&c| self.nodes[c].visits > 0)
    }

    fn best_child_ucb1(&self, idx: usize) -> usize {
        let parent_visits = self.nodes[idx].visits.max(1) as f64;
        let mut best_idx = self.nodes[idx].children[0];
        let mut best_score = f64::NEG_INFINITY;
        for &child in &self.nodes[idx].children {
            let node = &self.nodes[child];
            let score = if node.visits == 0 {
                f64::INFINITY
            } else {
                let visits = node.visits as f64;
                node.reward_sum / visits + UCB1_C * (parent_visits.ln() / visits).sqrt()
            };
            if score > best_score {
                best_score = score;
                best_idx = child;
            }
        }
        best_idx
    }

    fn expand(&mut self, idx: usize) -> usize {
        if self.nodes[idx].state.is_terminal() {
            return idx;
        }
        let state = self.nodes[idx].state.clone();
        let Some(pending) = state.pending.front().cloned() else {
            return idx;
        };

        let candidates = self.candidates_for(&state, &pending);
        for version in candidates {
            let key = (pending.package_name.clone(), version.clone());
            if self.nodes[idx].expanded.contains(&key) {
                continue;
            }
            self.nodes[idx].expanded.insert(key);

            let Some(info) = self.registry.package_at(&pending.package_name, &version) else {
                continue;
            };
            let deps = info.deps_for(self.config.dependency_type).clone();
            let outcome = state::step(
                &state,
                &pending.package_name,
                version,
                &deps,
                self.config.dependency_type,
            );
            self.record_diagnostics(outcome.diagnostics);

            let child_idx = self.nodes.len();
            self.nodes.push(SearchNode {
                state: outcome.state,
                parent: Some(idx),
                children: Vec::new(),
                visits: 0,
                reward_sum: 0.0,
                expanded: HashSet::new(),
            });
            self.nodes[idx].children.push(child_idx);
            return child_idx;
        }

        self.record_diagnostics(vec![format!(
            "dead end: no candidate versions survived filtering for '{}'",
            pending.package_name
        )]);
        idx
    }

    fn simulate(&mut self, start_idx: usize) -> (ResolverState, f64) {
        let mut state = self.nodes[start_idx].state.clone();
        let mut depth = 0;

        while depth < self.config.max_simulation_depth {
            if state.is_terminal() {
                break;
            }
            let Some(pending) = state.pending.front().cloned() else {
                break;
            };
            let candidates = self.candidates_for(&state, &pending);
            if candidates.is_empty() {
                self.record_diagnostics(vec![format!(
                    "dead end: no candidate versions survived filtering for '{}'",
                    pending.package_name
                )]);
                return (state, 0.0);
            }

            let chosen = self.sample_softmax_over_rank(&candidates);
            let Some(info) = self.registry.package_at(&pending.package_name, &chosen) else {
                return (state, 0.0);
            };
            let deps = info.deps_for(self.config.dependency_type).clone();
            let outcome = state::step(
                &state,
                &pending.package_name,
                chosen,
                &deps,
                self.config.dependency_type,
            );
            self.record_diagnostics(outcome.diagnostics);
            state = outcome.state;
            depth += 1;
        }

        let reward = self.compute_reward(&state);
        (state, reward)
    }

    /// Candidates as described by §4.4.3, shared verbatim between
    /// expansion and simulation.
    fn candidates_for(&self, state: &ResolverState, pending: &PendingDependency) -> Vec<Version> {
        let mut versions = self.registry.available_versions(&pending.package_name);

        if self.config.dependency_type == DependencyType::Peer {
            let constraints = state.constraints.get(&pending.package_name);
            versions.retain(|v| {
                let satisfies_existing = constraints
                    .map(|cs| {
                        cs.iter().all(|c| {
                            if c.is_invalid() {
                                false
                            } else {
                                range::parse(&c.range).map(|r| r.satisfies(v)).unwrap_or(false)
                            }
                        })
                    })
                    .unwrap_or(true);
                if !satisfies_existing {
                    return false;
                }
                if self.config.init_versions && pending.required_by.is_none() {
                    return range::parse(&pending.range_string)
                        .map(|r| r.satisfies(v))
                        .unwrap_or(false);
                }
                true
            });
        }

        versions.truncate(self.config.max_compare_versions);

        if let Some(threshold) = &self.config.threshold {
            versions.retain(|v| {
                threshold.passes(&self.vulnerabilities.vulnerabilities(&pending.package_name, v))
            });
        }

        versions
    }

    /// Softmax-over-rank sampling: `p_i ∝ exp(lambda * rank_i)` where
    /// `rank_i = n - i` (newest has the highest rank), computed with the
    /// log-sum-exp trick so large `lambda` doesn't overflow.
    fn sample_softmax_over_rank(&mut self, candidates: &[Version]) -> Version {
        let n = candidates.len();
        let logits: Vec<f64> = (0..n)
            .map(|i| self.config.lambda * (n - i) as f64)
            .collect();
        let max_logit = logits.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let exp_shifted: Vec<f64> = logits.iter().map(|l| (l - max_logit).exp()).collect();
        let sum_exp: f64 = exp_shifted.iter().sum();

        let draw: f64 = self.rng.gen();
        let mut cumulative = 0.0;
        for (i, e) in exp_shifted.iter().enumerate() {
            cumulative += e / sum_exp;
            if draw < cumulative {
                return candidates[i].clone();
            }
        }
        candidates[n - 1].clone()
    }

    fn compute_reward(&self, state: &ResolverState) -> f64 {
        if state.violates_constraints() || !state.pending.is_empty() {
            return 0.0;
        }
        let mut sum = 0.0;
        let mut n = 0usize;
        for (name, version) in &state.resolved {
            let versions = self.registry.available_versions(name);
            if versions.is_empty() {
                continue;
            }
            if let Some(rank) = versions.iter().position(|v| v == version) {
                sum += 1.0 - rank as f64 / versions.len() as f64;
                n += 1;
            }
        }
        if n == 0 {
            0.0
        } else {
            sum / n as f64
        }
    }

    fn backpropagate(&mut self, mut idx: usize, reward: f64) {
        loop {
            self.nodes[idx].visits += 1;
            self.nodes[idx].reward_sum += reward;
            match self.nodes[idx].parent {
                Some(parent) => idx = parent,
                None => break,
            }
        }
    }

    fn record_diagnostics(&mut self, messages: Vec<String>) {
        for msg in messages {
            debug!(%msg, "resolver diagnostic");
            self.diagnostics.push(msg);
            if self.diagnostics.len() > MAX_DIAGNOSTICS {
                self.diagnostics.remove(0);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraint::PendingDependency;
    use crate::registry::PackageInfo;
    use std::collections::HashMap;

    struct StubRegistry {
        versions: HashMap<String, Vec<Version>>,
        deps: HashMap<(String, Version), HashMap<String, String>>,
    }

    impl RegistryLookup for StubRegistry {
        fn fetch(&self, name: &str, _range_string: &str) -> Option<PackageInfo> {
            self.available_versions(name).into_iter().next().and_then(|v| self.package_at(name, &v))
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
                dev_deps: HashMap::new(),
                peer_deps: HashMap::new(),
            })
        }
    }

    struct NoVulnerabilities;
    impl VulnerabilityLookup for NoVulnerabilities {
        fn vulnerabilities(&self, _name: &str, _version: &Version) -> crate::vulnerability::VulnerabilityList {
            crate::vulnerability::VulnerabilityList::empty()
        }
    }

    #[test]
    fn visits_and_children_only_grow() {
        let mut versions = HashMap::new();
        versions.insert(
            "lodash".to_string(),
            vec![Version::new(4, 17, 21), Version::new(4, 17, 20), Version::new(4, 17, 19)],
        );
        let registry = StubRegistry {
            versions,
            deps: HashMap::new(),
        };
        let vulns = NoVulnerabilities;
        let config = ResolverConfig {
            max_iterations: 20,
            seed: Some(42),
            ..ResolverConfig::default()
        };
        let state = ResolverState::new([PendingDependency::root("lodash", "^4.17.0")]);
        let mut mcts = Mcts::new(state, &registry, &vulns, &config);

        let mut last_visits = vec![0u64];
        let mut last_children = vec![0usize];
        for _ in 0..20 {
            let selected = mcts.select(0);
            let expanded = mcts.expand(selected);
            let (_, reward) = mcts.simulate(expanded);
            mcts.backpropagate(expanded, reward);

            let visits: Vec<u64> = mcts.nodes.iter().map(|n| n.visits).collect();
            let children: Vec<usize> = mcts.nodes.iter().map(|n| n.children.len()).collect();
            for (i, v) in visits.iter().enumerate() {
                if i < last_visits.len() {
                    assert!(*v >= last_visits[i]);
                }
            }
            for (i, c) in children.iter().enumerate() {
                if i < last_children.len() {
                    assert!(*c >= last_children[i]);
                }
            }
            last_visits = visits;
            last_children = children;
        }
    }

    #[test]
    fn resolves_trivially_with_no_dependencies() {
        let mut versions = HashMap::new();
        versions.insert(
            "lodash".to_string(),
            vec![Version::new(4, 17, 21), Version::new(4, 17, 20), Version::new(4, 17, 19)],
        );
        let registry = StubRegistry {
            versions,
            deps: HashMap::new(),
        };
        let vulns = NoVulnerabilities;
        let config = ResolverConfig {
            max_iterations: 50,
            seed: Some(7),
            ..ResolverConfig::default()
        };
        let state = ResolverState::new([PendingDependency::root("lodash", "^4.17.0")]);
        let mut mcts = Mcts::new(state, &registry, &vulns, &config);
        mcts.run();

        let (terminals, _, _) = mcts.into_parts();
        assert!(terminals
            .iter()
            .any(|(s, _, _)| s.resolved.get("lodash") == Some(&Version::new(4, 17, 21))));
    }
}
