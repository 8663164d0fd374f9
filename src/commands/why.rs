//! `depresolve why <package>`: resolve the given roots, then report the
//! package's resolved version and any recorded diagnostic naming it — the
//! live-`Outcome` analogue of the teacher's lockfile-backed `why` command.

use super::common::{build_registry, build_vulnerabilities, parse_roots};
use anyhow::Result;
use depresolve::resolver::{self, Outcome};
use depresolve::Config;

pub fn run(
    roots: Vec<String>,
    package: String,
    dependency_type: Option<String>,
    threshold: Option<String>,
    seed: Option<u64>,
) -> Result<()> {
    let mut config = Config::load()?;
    if let Some(dependency_type) = dependency_type {
        config.resolver.dependency_type = dependency_type;
    }
    if threshold.is_some() {
        config.resolver.threshold = threshold;
    }

    let roots = parse_roots(&roots)?;
    let registry = build_registry(&config)?;
    let vulnerabilities = build_vulnerabilities(&config)?;
    let resolver_config = config.resolver.to_resolver_config(seed);

    let (assignment, messages) = match resolver::resolve(
        &roots,
        &resolver_config,
        registry.as_ref(),
        vulnerabilities.as_ref(),
    ) {
        Outcome::Success(assignment) => (Some(assignment), Vec::new()),
        Outcome::PartialFailure(assignment, diagnostics) => (Some(assignment), diagnostics.messages),
        Outcome::Failure(diagnostics) => (None, diagnostics.messages),
    };

    match assignment.as_ref().and_then(|a| a.get(&package)) {
        Some(version) => println!("{} resolved to {}", package, version),
        None => println!("{} was not resolved.", package),
    }

    let related: Vec<&String> = messages.iter().filter(|m| m.contains(&package)).collect();
    if related.is_empty() {
        println!("No recorded diagnostics mention {}.", package);
    } else {
        println!("Diagnostics mentioning {}:", package);
        for message in related {
            println!("  - {}", message);
        }
    }

    Ok(())
}
