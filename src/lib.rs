//! depresolve - a constraint- and vulnerability-aware dependency resolver
//!
//! depresolve treats dependency resolution as a sequential decision
//! problem and searches it with Monte Carlo Tree Search rather than
//! backtracking SAT-style solving: at each step it picks one pending
//! `(package, range)` requirement, samples a candidate version weighted by
//! recency and known-vulnerability exposure, and plays the choice out to a
//! terminal assignment before backpropagating a reward. Over many
//! iterations this converges on a resolution that trades off strict
//! constraint satisfaction against the caller's tolerance for risk,
//! expressed as a [`vulnerability::VulnerabilityThreshold`].
//!
//! # Examples
//!
//! ```no_run
//! use depresolve::{mcts::ResolverConfig, resolver};
//! use std::collections::HashMap;
//!
//! # fn example(registry: &dyn depresolve::registry::RegistryLookup,
//! #            vulnerabilities: &dyn depresolve::vulnadapter::VulnerabilityLookup) {
//! let roots = HashMap::from([("lodash".to_string(), "^4.17.0".to_string())]);
//! let config = ResolverConfig::default();
//! let outcome = resolver::resolve(&roots, &config, registry, vulnerabilities);
//! # let _ = outcome;
//! # }
//! ```
//!
//! # Modules
//!
//! - [`version`] - the concrete `Version` triple
//! - [`range`] - the version range grammar: `satisfies`, `best_match`, `normalize`
//! - [`constraint`] - `Constraint`, `PendingDependency`, `DependencyType`
//! - [`vulnerability`] - `CveItem`, `Severity`, `VulnerabilityList`, `VulnerabilityThreshold`
//! - [`cache`] - the generic dual-tier (memory + durable) cache
//! - [`durable`] - the file-backed `DurableStore` implementation
//! - [`registry`] - `PackageInfo` and the Registry Adapter
//! - [`registry_http`] - an HTTP-backed registry collaborator
//! - [`vulnadapter`] - the Vulnerability Adapter and its rate limiter
//! - [`state`] - `ResolverState` and the `step` state transition
//! - [`mcts`] - the search tree: selection, expansion, simulation, backpropagation
//! - [`resolver`] - `resolve()`, solution extraction, `Outcome`
//! - [`graph`] - projecting a resolved assignment into a display graph
//! - [`config`] - on-disk configuration for the CLI
//! - [`error`] - the shared error taxonomy

pub mod cache;
pub mod config;
pub mod constraint;
pub mod durable;
pub mod error;
pub mod graph;
pub mod mcts;
pub mod range;
pub mod registry;
pub mod registry_http;
pub mod resolver;
pub mod state;
pub mod version;
pub mod vulnadapter;
pub mod vulnerability;

pub use config::Config;
pub use error::{Error, Result};
pub use resolver::{resolve, Diagnostics, Outcome};
pub use version::Version;
