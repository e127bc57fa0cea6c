//! zonegate: dry-run zone-aware admission.
//!
//! # Usage
//!
//! ```text
//! zonegate filters
//! zonegate check --config zonegate.toml --snapshot snapshot.json
//! zonegate zones --snapshot snapshot.json --available-only
//! ```
//!
//! Results are printed to stdout as JSON; logs go to stderr.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;
mod snapshot;

#[derive(Parser)]
#[command(
    name = "zonegate",
    about = "Zone-aware admission filtering for cells and hosts",
    version,
    propagate_version = true,
)]
struct Cli {
    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the standard cell and host filters and filter groups.
    Filters {
        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },
    /// Run both filter chains for the request in a snapshot.
    Check {
        /// Configuration file (defaults apply when omitted).
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Snapshot of inventory, projects, candidates and request (JSON).
        #[arg(short, long)]
        snapshot: PathBuf,
    },
    /// Print the zone catalog derived from a snapshot.
    Zones {
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[arg(short, long)]
        snapshot: PathBuf,
        /// Skip zones that are only on disabled services.
        #[arg(long)]
        available_only: bool,
    },
}

fn init_tracing(json: bool) -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new("info,zonegate=debug"))?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json)?;

    match cli.command {
        Commands::Filters { format } => commands::filters::list(&format),
        Commands::Check { config, snapshot } => {
            commands::check::run(config.as_deref(), &snapshot)
        }
        Commands::Zones {
            config,
            snapshot,
            available_only,
        } => commands::zones::run(config.as_deref(), &snapshot, available_only),
    }
}
