//! # ingest-cli
//!
//! A thin binary exposing `ingest` and `activate` as subcommands, driving
//! the orchestrator (C8) directly (C11, SPEC_FULL §4.11). No worker, no RPC.

pub mod cli;
pub mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use ingest_config::IngestConfig;

/// Parse arguments, load configuration, and dispatch to the requested
/// subcommand. Exit-code mapping happens at the binary boundary: `Ok`
/// means the caller should exit 0, `Err` means exit 1. Clap itself handles
/// usage errors with exit code 2 before this function is ever reached.
///
/// # Errors
///
/// Returns whatever the dispatched subcommand returns.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    let config = IngestConfig::load(None)?;

    match &cli.command {
        Commands::Ingest(args) => commands::ingest(args, config).await,
        Commands::Activate(args) => commands::activate(args, config).await,
    }
}

fn init_tracing(verbose: bool) -> anyhow::Result<()> {
    let level = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_env("INGEST_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing subscriber: {e}"))?;

    Ok(())
}
