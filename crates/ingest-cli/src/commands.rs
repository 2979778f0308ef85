//! Subcommand handlers (C11, SPEC_FULL §4.11). Both drive the orchestrator
//! (C8) or its repositories directly — there is no worker or RPC boundary
//! on this path.

use std::sync::Arc;

use ingest_config::IngestConfig;
use ingest_core::TenantId;
use ingest_db::IngestDb;
use ingest_embed::{Embedder, HttpEmbedder, LocalEmbedder};
use ingest_pipeline::{IngestRequest, create_run, execute};
use serde::Serialize;
use serde_json::json;

use crate::cli::{ActivateArgs, IngestArgs};

fn build_embedder(config: &IngestConfig) -> Arc<dyn Embedder> {
    match &config.embedder_endpoint {
        Some(url) => Arc::new(HttpEmbedder::new(url.clone())),
        None => Arc::new(LocalEmbedder::new()),
    }
}

#[derive(Debug, Serialize)]
struct IngestReport {
    doc_id: String,
    version_id: Option<String>,
    num_chunks: usize,
    skipped: bool,
}

/// Run `ingest <path> --tenant <id> --title <string>`.
///
/// Creates a run row, then executes it synchronously — unlike the worker,
/// the CLI never enqueues and returns; the process that invoked it owns the
/// whole pipeline and reports the outcome on stdout as JSON.
pub async fn ingest(args: &IngestArgs, config: IngestConfig) -> anyhow::Result<()> {
    let db = IngestDb::open_local(&config.database_url).await?;
    let embedder = build_embedder(&config);
    let tenant = TenantId::from(args.tenant_id.clone());

    println!("Ingesting {} for tenant {}...", args.file_path.display(), tenant.as_str());

    let request = IngestRequest {
        file_path: &args.file_path,
        title: &args.title,
        activate: args.should_activate(),
        version_label: args.version_label.as_deref(),
    };

    let run_id = create_run(&db, &config, &tenant, &request).await?;
    let outcome = execute(&db, embedder.as_ref(), &config, &tenant, &run_id).await?;

    let report = IngestReport {
        doc_id: outcome.doc_id.as_str().to_string(),
        version_id: outcome.version_id.map(|v| v.as_str().to_string()),
        num_chunks: outcome.num_chunks,
        skipped: outcome.skipped,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}

/// Run `activate --tenant <id> --doc-version-id <id>`.
///
/// Flips a specific version to active without re-running the pipeline —
/// useful to roll back to a previous version.
pub async fn activate(args: &ActivateArgs, config: IngestConfig) -> anyhow::Result<()> {
    let db = IngestDb::open_local(&config.database_url).await?;
    let tenant = TenantId::from(args.tenant_id.clone());
    let version_id = args.doc_version_id.clone().into();

    match ingest_db::activate(&db, &tenant, &version_id).await? {
        ingest_db::ActivateOutcome::Activated { doc_id } => {
            println!("{}", json!({"doc_id": doc_id.as_str(), "version_id": args.doc_version_id, "activated": true}));
            Ok(())
        }
        ingest_db::ActivateOutcome::NotFound => {
            anyhow::bail!("version not found: {}", args.doc_version_id)
        }
    }
}
