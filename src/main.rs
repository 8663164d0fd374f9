use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

/// depresolve - a constraint- and vulnerability-aware MCTS dependency resolver
#[derive(Parser)]
#[command(name = "depresolve")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Force debug logging regardless of RUST_LOG
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a set of root requirements (repeatable "name@range" args)
    Resolve {
        /// Root requirements, e.g. `lodash@^4.17.0`
        #[arg(required = true)]
        roots: Vec<String>,

        /// Which dependency edges to follow: runtime (default), dev, peer
        #[arg(long)]
        dependency_type: Option<String>,

        /// Vulnerability threshold: CRITICAL, HIGH, MEDIUM, LOW, or
        /// CUSTOM:critical,high,medium,low
        #[arg(long)]
        threshold: Option<String>,

        /// Seed the search RNG for a reproducible run
        #[arg(long)]
        seed: Option<u64>,

        /// Override the configured MCTS iteration budget
        #[arg(long)]
        max_iterations: Option<u32>,

        /// Restrict root package candidates to the root's own range
        #[arg(long)]
        init_versions: bool,
    },

    /// Resolve, then print the resulting dependency graph as nodes/edges
    Graph {
        #[arg(required = true)]
        roots: Vec<String>,

        #[arg(long)]
        dependency_type: Option<String>,

        /// How many edges deep to expand before marking nodes unexpanded
        #[arg(long)]
        max_depth: Option<u32>,
    },

    /// Explain why a package did or didn't resolve
    Why {
        #[arg(required = true)]
        roots: Vec<String>,

        package: String,

        #[arg(long)]
        dependency_type: Option<String>,

        #[arg(long)]
        threshold: Option<String>,

        #[arg(long)]
        seed: Option<u64>,
    },

    /// Manage the durable registry/vulnerability cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Show cache directory and entry counts
    Info,

    /// Remove the entire durable cache
    Clear,
}

fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();

    let result = match cli.command {
        Commands::Resolve {
            roots,
            dependency_type,
            threshold,
            seed,
            max_iterations,
            init_versions,
        } => commands::resolve::run(roots, dependency_type, threshold, seed, max_iterations, init_versions),
        Commands::Graph {
            roots,
            dependency_type,
            max_depth,
        } => commands::graph::run(roots, dependency_type, max_depth),
        Commands::Why {
            roots,
            package,
            dependency_type,
            threshold,
            seed,
        } => commands::why::run(roots, package, dependency_type, threshold, seed),
        Commands::Cache { action } => match action {
            CacheAction::Info => commands::cache::run_info(),
            CacheAction::Clear => commands::cache::run_clear(),
        },
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
