//! Background job processing: claim, execute, cleanup (§4.7).
//!
//! Runs off the request/response path — `routes::process` only decides
//! whether to admit the job, this module does the actual work.

use std::path::Path;

use ingest_core::RunId;
use ingest_db::ClaimOutcome;

use crate::state::AppState;

/// Claim and run a previously-accepted job, then release its admission slot.
///
/// Re-derives the run's tenant and upload URI from the durable run row rather
/// than trusting the RPC body a second time — the row is the one thing both
/// the original enqueue and a reclaiming worker agree on.
pub async fn run(state: AppState, run_id: RunId) {
    match ingest_db::repos::run::claim(&state.db, &run_id, state.config.stale_running_minutes).await {
        Ok(ClaimOutcome::Claimed) => process(&state, &run_id).await,
        Ok(ClaimOutcome::AlreadySucceeded) => {
            tracing::info!(run_id = run_id.as_str(), "run already succeeded, skipping");
        }
        Ok(ClaimOutcome::OwnedByAnother) => {
            tracing::info!(run_id = run_id.as_str(), "run is actively owned by another worker, skipping");
        }
        Ok(ClaimOutcome::MissingRow) => {
            tracing::error!(run_id = run_id.as_str(), "claim requested for a run that doesn't exist");
        }
        Err(e) => {
            tracing::error!(run_id = run_id.as_str(), error = %e, "failed to claim run");
        }
    }
    state.release(run_id.as_str());
}

async fn process(state: &AppState, run_id: &RunId) {
    let job = match ingest_db::repos::run::job_payload(&state.db, run_id).await {
        Ok(Some(job)) => job,
        Ok(None) => {
            tracing::error!(run_id = run_id.as_str(), "claimed run has no job payload");
            return;
        }
        Err(e) => {
            tracing::error!(run_id = run_id.as_str(), error = %e, "failed to read job payload");
            return;
        }
    };

    tracing::info!(run_id = run_id.as_str(), tenant = job.tenant.as_str(), doc_id = ?job.doc_id, "processing job");

    match ingest_pipeline::execute(&state.db, state.embedder.as_ref(), &state.config, &job.tenant, run_id).await {
        Ok(outcome) => {
            tracing::info!(
                run_id = run_id.as_str(),
                num_chunks = outcome.num_chunks,
                skipped = outcome.skipped,
                "job succeeded"
            );
            cleanup_upload(&job.upload_uri, run_id);
        }
        Err(e) => {
            tracing::error!(run_id = run_id.as_str(), error = %e, "job failed");
        }
    }
}

/// Delete the raw upload and its now-possibly-empty parent directory on
/// success. Best-effort: a leftover upload file never fails a run.
fn cleanup_upload(upload_uri: &str, run_id: &RunId) {
    let Some(path) = upload_uri.strip_prefix("file://") else { return };
    let path = Path::new(path);
    if let Err(e) = std::fs::remove_file(path) {
        tracing::warn!(run_id = run_id.as_str(), error = %e, "failed to remove raw upload");
        return;
    }
    if let Some(parent) = path.parent() {
        let _ = std::fs::remove_dir(parent);
    }
}
