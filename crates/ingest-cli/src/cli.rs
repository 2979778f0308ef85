//! Argument parsing for the `ingest` binary (C11, SPEC_FULL §4.11).

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Thin CLI driving the ingestion orchestrator directly — no worker, no RPC.
#[derive(Debug, Parser)]
#[command(name = "ingest", version, about = "Document ingestion pipeline")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable debug logging.
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Ingest a document into the knowledge base.
    Ingest(IngestArgs),
    /// Activate a staged document version without re-running the pipeline.
    Activate(ActivateArgs),
}

#[derive(Debug, clap::Args)]
pub struct IngestArgs {
    /// Path to the file to ingest.
    pub file_path: PathBuf,

    /// Tenant the document belongs to.
    #[arg(long = "tenant", value_name = "ID")]
    pub tenant_id: String,

    /// Document title.
    #[arg(long)]
    pub title: String,

    /// Activate the new version immediately (default).
    #[arg(long = "activate", action = clap::ArgAction::SetTrue)]
    pub activate: bool,
    /// Leave the new version inactive.
    #[arg(long = "no-activate", action = clap::ArgAction::SetTrue, conflicts_with = "activate")]
    pub no_activate: bool,

    /// Optional human-readable label for the new version.
    #[arg(long = "version-label", value_name = "LABEL")]
    pub version_label: Option<String>,
}

impl IngestArgs {
    #[must_use]
    pub fn should_activate(&self) -> bool {
        !self.no_activate
    }
}

#[derive(Debug, clap::Args)]
pub struct ActivateArgs {
    /// Tenant the version belongs to.
    #[arg(long = "tenant", value_name = "ID")]
    pub tenant_id: String,

    /// Document version id to activate.
    #[arg(long = "doc-version-id", value_name = "ID")]
    pub doc_version_id: String,
}

#[cfg(test)]
mod tests {
    use clap::{CommandFactory, Parser};

    use super::*;

    #[test]
    fn clap_command_tree_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn ingest_defaults_to_activate() {
        let cli = Cli::try_parse_from(["ingest", "ingest", "file.pdf", "--tenant", "t1", "--title", "Doc"]).unwrap();
        let Commands::Ingest(args) = cli.command else { panic!("expected Ingest") };
        assert!(args.should_activate());
    }

    #[test]
    fn ingest_respects_no_activate_flag() {
        let cli = Cli::try_parse_from([
            "ingest",
            "ingest",
            "file.pdf",
            "--tenant",
            "t1",
            "--title",
            "Doc",
            "--no-activate",
        ])
        .unwrap();
        let Commands::Ingest(args) = cli.command else { panic!("expected Ingest") };
        assert!(!args.should_activate());
    }

    #[test]
    fn ingest_requires_tenant_and_title() {
        let parsed = Cli::try_parse_from(["ingest", "ingest", "file.pdf"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn activate_requires_both_options() {
        let parsed = Cli::try_parse_from(["ingest", "activate", "--tenant", "t1"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn activate_parses_with_both_options() {
        let cli =
            Cli::try_parse_from(["ingest", "activate", "--tenant", "t1", "--doc-version-id", "ver-1"]).unwrap();
        let Commands::Activate(args) = cli.command else { panic!("expected Activate") };
        assert_eq!(args.tenant_id, "t1");
        assert_eq!(args.doc_version_id, "ver-1");
    }
}
