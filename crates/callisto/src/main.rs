//! Callisto CLI - architecture analytics from the command line.
//!
//! Callisto indexes source files into a symbol dependency graph and reports
//! cycles, layering, communities, fragile boundaries, blast radius, what-if
//! refactorings and health trends.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

mod cli;

/// Callisto: incremental code graph and architecture analytics.
#[derive(Parser)]
#[command(name = "callisto")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Workspace root directory (defaults to current directory)
    #[arg(short, long, global = true)]
    workspace: Option<PathBuf>,

    /// Verbose output (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Print query results as JSON instead of human-readable text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Index source files in the workspace (incremental)
    Index {
        /// Rebuild index from scratch (clears existing data)
        #[arg(long)]
        rebuild: bool,
    },

    /// Show files that changed since the last index
    Status,

    /// Show index statistics
    Stats,

    /// Detect dependency cycles
    Cycles,

    /// Show architectural layers and upward edges
    Layers,

    /// Show the canonical health score and what drives it
    Health,

    /// Show communities and their quality
    Clusters {
        /// Partition with recursive spectral bisection instead of Louvain
        #[arg(long)]
        spectral: bool,

        /// Number of spectral communities (chosen from the spectral gap if omitted)
        #[arg(short, long, requires = "spectral")]
        k: Option<usize>,
    },

    /// Find fragile boundaries between communities
    Cut {
        /// Maximum number of boundaries and leak edges to show
        #[arg(short, long, default_value = "10")]
        top: usize,
    },

    /// Show everything that transitively depends on a symbol
    Impact {
        /// Symbol name or qualified name
        symbol: String,

        /// Maximum number of hops (unbounded if omitted)
        #[arg(short, long)]
        depth: Option<usize>,
    },

    /// Check how contained a symbol or file is
    SafeZones {
        /// Symbol name, qualified name or file path
        target: String,

        /// Maximum number of hops
        #[arg(short, long, default_value = "5")]
        depth: usize,
    },

    /// Simulate a refactoring and compare metrics
    Simulate {
        #[command(subcommand)]
        operation: SimulateCommand,
    },

    /// Rank likely root causes around a symbol
    Diagnose {
        /// Symbol name or qualified name
        symbol: String,

        /// Maximum number of hops
        #[arg(short, long, default_value = "2")]
        depth: usize,
    },

    /// Record the current metrics in the snapshot history
    Snapshot {
        /// Label for this snapshot
        #[arg(short, long)]
        tag: Option<String>,

        /// Branch to record with the snapshot
        #[arg(long)]
        git_branch: Option<String>,

        /// Commit to record with the snapshot
        #[arg(long)]
        git_commit: Option<String>,
    },

    /// Show how a metric moved across snapshots
    Trend {
        /// Metric name (health_score, cycles, tangle_ratio, ...)
        #[arg(short, long, default_value = "health_score")]
        metric: String,

        /// Number of most recent snapshots to include
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Project metric trends forward and flag threshold crossings
    Forecast {
        /// Snapshots ahead to project (configured horizon if omitted)
        #[arg(long)]
        horizon: Option<u32>,
    },
}

#[derive(Subcommand)]
enum SimulateCommand {
    /// Move a symbol to another file
    Move {
        /// Symbol name or qualified name
        symbol: String,
        /// Destination file
        target_file: PathBuf,
    },
    /// Move a symbol and its private same-file helpers to another file
    Extract {
        /// Symbol name or qualified name
        symbol: String,
        /// Destination file
        target_file: PathBuf,
    },
    /// Fold every symbol of the second file into the first
    Merge {
        /// Surviving file
        file_a: PathBuf,
        /// File whose symbols move
        file_b: PathBuf,
    },
    /// Remove a symbol, or every symbol in a file
    Delete {
        /// Symbol name or file path
        target: String,
    },
}

impl From<SimulateCommand> for callisto::simulate::Operation {
    fn from(command: SimulateCommand) -> Self {
        match command {
            SimulateCommand::Move {
                symbol,
                target_file,
            } => Self::Move {
                symbol,
                target_file,
            },
            SimulateCommand::Extract {
                symbol,
                target_file,
            } => Self::Extract {
                symbol,
                target_file,
            },
            SimulateCommand::Merge { file_a, file_b } => Self::Merge { file_a, file_b },
            SimulateCommand::Delete { target } => Self::Delete { target },
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    // Determine workspace root
    let workspace = match cli.workspace {
        Some(w) => w,
        None => match std::env::current_dir() {
            Ok(dir) => dir,
            Err(e) => {
                eprintln!(
                    "{}: failed to get current directory: {e}",
                    "error".red().bold()
                );
                return ExitCode::FAILURE;
            }
        },
    };

    let json = cli.json;
    let result = match cli.command {
        Commands::Index { rebuild } => cli::index::run(&workspace, rebuild),
        Commands::Status => cli::index::status(&workspace),
        Commands::Stats => cli::stats::run(&workspace),
        Commands::Cycles => cli::structure::cycles(&workspace),
        Commands::Layers => cli::structure::layers(&workspace),
        Commands::Health => cli::history::health(&workspace, json),
        Commands::Clusters { spectral, k } => cli::clusters::run(&workspace, spectral, k),
        Commands::Cut { top } => cli::clusters::cut(&workspace, top),
        Commands::Impact { symbol, depth } => cli::impact::run(&workspace, &symbol, depth, json),
        Commands::SafeZones { target, depth } => {
            cli::impact::safe_zones(&workspace, &target, depth, json)
        }
        Commands::Simulate { operation } => cli::simulate::run(&workspace, &operation.into(), json),
        Commands::Diagnose { symbol, depth } => cli::diagnose::run(&workspace, &symbol, depth, json),
        Commands::Snapshot {
            tag,
            git_branch,
            git_commit,
        } => cli::history::snapshot(
            &workspace,
            tag.as_deref(),
            git_branch.as_deref(),
            git_commit.as_deref(),
        ),
        Commands::Trend { metric, limit } => cli::history::trend(&workspace, &metric, limit, json),
        Commands::Forecast { horizon } => cli::history::forecast(&workspace, horizon, json),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}: {e}", "error".red().bold());
            // Show cause chain for nested errors
            let mut source = std::error::Error::source(&e);
            while let Some(cause) = source {
                eprintln!("  {}: {cause}", "caused by".dimmed());
                source = std::error::Error::source(cause);
            }
            ExitCode::FAILURE
        }
    }
}
