//! # quill CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use quill_cli::audit::{run_audit, AuditArgs};
use quill_cli::card::{run_card, CardArgs};
use quill_cli::ingest::{run_ingest, IngestArgs};

/// Quill CLI — offline access to the ingestion gate and card resolver.
#[derive(Parser, Debug)]
#[command(name = "quill", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate and store a local image under the public uploads directory.
    Ingest(IngestArgs),

    /// Resolve preview cards for content records read from a JSON file.
    Card(CardArgs),

    /// Audit log operations.
    Audit(AuditArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Ingest(args) => run_ingest(&args),
        Commands::Card(args) => run_card(&args),
        Commands::Audit(args) => run_audit(&args),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            eprintln!("error: {e:#}");
            ExitCode::from(1)
        }
    }
}
