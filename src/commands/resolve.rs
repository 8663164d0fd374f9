use super::common::{build_registry, build_vulnerabilities, parse_roots};
use anyhow::Result;
use depresolve::resolver::{self, Diagnostics, Outcome};
use depresolve::Config;

#[allow(clippy::too_many_arguments)]
pub fn run(
    roots: Vec<String>,
    dependency_type: Option<String>,
    threshold: Option<String>,
    seed: Option<u64>,
    max_iterations: Option<u32>,
    init_versions: bool,
) -> Result<()> {
    let mut config = Config::load()?;
    if let Some(dependency_type) = dependency_type {
        config.resolver.dependency_type = dependency_type;
    }
    if threshold.is_some() {
        config.resolver.threshold = threshold;
    }
    if let Some(max_iterations) = max_iterations {
        config.resolver.max_iterations = max_iterations;
    }
    config.resolver.init_versions = config.resolver.init_versions || init_versions;

    let roots = parse_roots(&roots)?;
    let registry = build_registry(&config)?;
    let vulnerabilities = build_vulnerabilities(&config)?;
    let resolver_config = config.resolver.to_resolver_config(seed);

    match resolver::resolve(&roots, &resolver_config, registry.as_ref(), vulnerabilities.as_ref()) {
        Outcome::Success(assignment) => {
            println!("Resolved {} package(s):", assignment.len());
            print_assignment(&assignment);
            Ok(())
        }
        Outcome::PartialFailure(assignment, diagnostics) => {
            println!("Partial resolution ({} package(s) assigned):", assignment.len());
            print_assignment(&assignment);
            println!();
            println!("Did not reach a complete, constraint-satisfying assignment.");
            print_diagnostics(&diagnostics, config.resolver.verbose_conflicts);
            std::process::exit(1);
        }
        Outcome::Failure(diagnostics) => {
            println!("Resolution failed.");
            print_diagnostics(&diagnostics, config.resolver.verbose_conflicts);
            std::process::exit(1);
        }
    }
}

fn print_assignment(assignment: &std::collections::HashMap<String, depresolve::Version>) {
    let mut names: Vec<_> = assignment.keys().collect();
    names.sort();
    for name in names {
        println!("  {} {}", name, assignment[name]);
    }
}

fn print_diagnostics(diagnostics: &Diagnostics, verbose: bool) {
    println!("{}", diagnostics.terminal_summary);
    if verbose {
        for message in &diagnostics.messages {
            println!("  - {}", message);
        }
    } else if let Some(last) = diagnostics.messages.last() {
        println!("  - {}", last);
    }
}
