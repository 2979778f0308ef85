//! Ingestion-run repository backing the worker's claim/heartbeat/terminate
//! state machine (C9, SPEC_FULL §4.7/§4.9).

use chrono::{DateTime, SecondsFormat, Utc};
use ingest_core::{DocId, RunId, RunStats, RunStatus, TenantId};
use libsql::params;

use crate::IngestDb;
use crate::error::DbError;
use crate::helpers::{get_opt_string, parse_datetime, parse_optional_datetime};

const INTERRUPTED_ERROR: &str = "interrupted — service restarted";

/// The document-side fields of a job, known before a run row exists.
#[derive(Debug, Clone)]
pub struct NewRun {
    pub doc_id: Option<DocId>,
    pub upload_uri: String,
    pub title: String,
    pub source_type: String,
    pub source_uri: String,
    pub content_hash: String,
}

/// A job payload read back from a run row, durable so a reclaiming worker
/// doesn't need the original RPC body.
#[derive(Debug, Clone)]
pub struct JobPayload {
    pub run_id: RunId,
    pub tenant: TenantId,
    pub doc_id: Option<DocId>,
    pub upload_uri: String,
    pub title: String,
    pub source_type: String,
    pub source_uri: String,
    pub content_hash: String,
}

/// Outcome of [`claim`] (SPEC_FULL §4.7's conditional-update claim).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// This worker now owns the run; proceed with the pipeline.
    Claimed,
    /// A prior attempt already completed; nothing to do.
    AlreadySucceeded,
    /// Another worker's heartbeat is still fresh; back off.
    OwnedByAnother,
    /// No run with this id exists.
    MissingRow,
}

/// Create a `queued` run row carrying the job payload.
///
/// # Errors
///
/// Returns [`DbError`] on a query failure.
pub async fn create(
    db: &IngestDb,
    tenant: &TenantId,
    payload: &NewRun,
    config_snapshot: &serde_json::Value,
) -> Result<RunId, DbError> {
    let run_id = db.generate_id(RunId::PREFIX).await?;
    let config = serde_json::to_string(config_snapshot)
        .map_err(|e| DbError::InvalidState(format!("config snapshot serialize: {e}")))?;

    db.conn()
        .execute(
            "INSERT INTO ingestion_runs
                 (run_id, tenant, status, config, doc_id, upload_uri, title, source_type, source_uri, content_hash)
             VALUES (?1, ?2, 'queued', ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                run_id.as_str(),
                tenant.as_str(),
                config,
                payload.doc_id.as_ref().map(DocId::as_str),
                payload.upload_uri.as_str(),
                payload.title.as_str(),
                payload.source_type.as_str(),
                payload.source_uri.as_str(),
                payload.content_hash.as_str()
            ],
        )
        .await?;

    Ok(RunId::from(run_id))
}

/// Conditionally transition a run from `queued`/`failed` to `running`.
///
/// `stale_running_minutes` is the configured threshold (SPEC_FULL §6) past
/// which a `running` row with no fresh heartbeat is force-reclaimed rather
/// than treated as owned by another worker.
///
/// # Errors
///
/// Returns [`DbError`] on a query failure.
pub async fn claim(db: &IngestDb, run_id: &RunId, stale_running_minutes: i64) -> Result<ClaimOutcome, DbError> {
    let updated = db
        .conn()
        .execute(
            "UPDATE ingestion_runs
             SET status = 'running',
                 started_at = coalesce(started_at, strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
             WHERE run_id = ?1 AND status IN ('queued', 'failed')",
            params![run_id.as_str()],
        )
        .await?;

    if updated > 0 {
        return Ok(ClaimOutcome::Claimed);
    }

    let mut rows = db
        .conn()
        .query("SELECT status, updated_at FROM ingestion_runs WHERE run_id = ?1", params![run_id.as_str()])
        .await?;

    let Some(row) = rows.next().await? else {
        tracing::warn!(run_id = run_id.as_str(), "claim requested for a run that doesn't exist");
        return Ok(ClaimOutcome::MissingRow);
    };

    let status = row.get::<String>(0)?;
    if status == "succeeded" {
        return Ok(ClaimOutcome::AlreadySucceeded);
    }

    let updated_at = parse_datetime(&row.get::<String>(1)?)?;
    let stale_before = Utc::now() - chrono::Duration::minutes(stale_running_minutes);
    if updated_at < stale_before {
        db.conn()
            .execute(
                "UPDATE ingestion_runs SET updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE run_id = ?1",
                params![run_id.as_str()],
            )
            .await?;
        tracing::warn!(run_id = run_id.as_str(), "force-reclaiming stale running row");
        return Ok(ClaimOutcome::Claimed);
    }

    Ok(ClaimOutcome::OwnedByAnother)
}

/// Bump `updated_at` after a pipeline stage completes, feeding stale-reclaim.
///
/// # Errors
///
/// Returns [`DbError`] on a query failure.
pub async fn heartbeat(db: &IngestDb, run_id: &RunId) -> Result<(), DbError> {
    db.conn()
        .execute(
            "UPDATE ingestion_runs SET updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now') WHERE run_id = ?1",
            params![run_id.as_str()],
        )
        .await?;
    Ok(())
}

/// Terminate a run as `succeeded` with computed stats.
///
/// # Errors
///
/// Returns [`DbError`] on a query failure.
pub async fn mark_succeeded(db: &IngestDb, run_id: &RunId, stats: &RunStats) -> Result<(), DbError> {
    let stats_json =
        serde_json::to_string(stats).map_err(|e| DbError::InvalidState(format!("stats serialize: {e}")))?;
    db.conn()
        .execute(
            "UPDATE ingestion_runs
             SET status = 'succeeded',
                 finished_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now'),
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now'),
                 stats = ?2
             WHERE run_id = ?1",
            params![run_id.as_str(), stats_json],
        )
        .await?;
    Ok(())
}

/// Terminate a run as `failed` with a stage-tagged error message.
///
/// # Errors
///
/// Returns [`DbError`] on a query failure.
pub async fn mark_failed(db: &IngestDb, run_id: &RunId, tagged_error: &str) -> Result<(), DbError> {
    db.conn()
        .execute(
            "UPDATE ingestion_runs
             SET status = 'failed',
                 finished_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now'),
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now'),
                 error = ?2
             WHERE run_id = ?1",
            params![run_id.as_str(), tagged_error],
        )
        .await?;
    Ok(())
}

/// Sweep `running` rows older than `crash_recovery_minutes` (SPEC_FULL §6)
/// to `failed` on worker startup, so the UI never shows an eternal spinner
/// for a run that died with its process.
///
/// # Errors
///
/// Returns [`DbError`] on a query failure.
pub async fn sweep_interrupted(db: &IngestDb, crash_recovery_minutes: i64) -> Result<usize, DbError> {
    let threshold = (Utc::now() - chrono::Duration::minutes(crash_recovery_minutes))
        .to_rfc3339_opts(SecondsFormat::Millis, true);
    let updated = db
        .conn()
        .execute(
            "UPDATE ingestion_runs
             SET status = 'failed',
                 finished_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now'),
                 error = ?1
             WHERE status = 'running' AND updated_at < ?2",
            params![INTERRUPTED_ERROR, threshold],
        )
        .await?;
    if updated > 0 {
        tracing::warn!(count = updated, "swept interrupted runs to failed on startup");
    }
    Ok(updated as usize)
}

/// Fetch the durable job payload for a run, for a worker claiming or
/// reclaiming it.
///
/// # Errors
///
/// Returns [`DbError`] on a query failure.
pub async fn job_payload(db: &IngestDb, run_id: &RunId) -> Result<Option<JobPayload>, DbError> {
    let mut rows = db
        .conn()
        .query(
            "SELECT tenant, doc_id, upload_uri, title, source_type, source_uri, content_hash
             FROM ingestion_runs WHERE run_id = ?1",
            params![run_id.as_str()],
        )
        .await?;

    let Some(row) = rows.next().await? else { return Ok(None) };
    Ok(Some(JobPayload {
        run_id: run_id.clone(),
        tenant: TenantId::from(row.get::<String>(0)?),
        doc_id: get_opt_string(&row, 1)?.map(DocId::from),
        upload_uri: row.get::<String>(2)?,
        title: row.get::<String>(3)?,
        source_type: row.get::<String>(4)?,
        source_uri: row.get::<String>(5)?,
        content_hash: row.get::<String>(6)?,
    }))
}

/// Fetch a run's config snapshot (the JSON blob recorded at [`create`] time),
/// for a worker reclaiming a run without the original request body.
///
/// # Errors
///
/// Returns [`DbError`] on a query failure or if the stored JSON is malformed.
pub async fn config_snapshot(db: &IngestDb, run_id: &RunId) -> Result<Option<serde_json::Value>, DbError> {
    let mut rows =
        db.conn().query("SELECT config FROM ingestion_runs WHERE run_id = ?1", params![run_id.as_str()]).await?;
    let Some(row) = rows.next().await? else { return Ok(None) };
    let raw = row.get::<String>(0)?;
    Ok(Some(serde_json::from_str(&raw).map_err(|e| DbError::InvalidState(format!("config snapshot parse: {e}")))?))
}

/// Fetch a run's current status and heartbeat, for callers polling progress.
///
/// # Errors
///
/// Returns [`DbError`] on a query failure.
pub async fn status(db: &IngestDb, run_id: &RunId) -> Result<Option<(RunStatus, DateTime<Utc>)>, DbError> {
    let mut rows =
        db.conn().query("SELECT status, updated_at FROM ingestion_runs WHERE run_id = ?1", params![run_id.as_str()]).await?;
    let Some(row) = rows.next().await? else { return Ok(None) };
    let status = match row.get::<String>(0)?.as_str() {
        "queued" => RunStatus::Queued,
        "running" => RunStatus::Running,
        "succeeded" => RunStatus::Succeeded,
        "failed" => RunStatus::Failed,
        other => return Err(DbError::InvalidState(format!("unknown run status: {other}"))),
    };
    let updated_at = parse_optional_datetime(Some(&row.get::<String>(1)?))?.ok_or(DbError::NoResult)?;
    Ok(Some((status, updated_at)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_run() -> NewRun {
        NewRun {
            doc_id: None,
            upload_uri: "file:///tmp/a.html".to_string(),
            title: "A".to_string(),
            source_type: "hypertext".to_string(),
            source_uri: "file:///tmp/a.html".to_string(),
            content_hash: "hash1".to_string(),
        }
    }

    #[tokio::test]
    async fn claim_transitions_queued_to_running() {
        let db = IngestDb::open_local(":memory:").await.unwrap();
        let tenant = TenantId::from("t1");
        let run_id = create(&db, &tenant, &new_run(), &serde_json::json!({})).await.unwrap();

        assert_eq!(claim(&db, &run_id, 15).await.unwrap(), ClaimOutcome::Claimed);
        let (status, _) = status(&db, &run_id).await.unwrap().unwrap();
        assert_eq!(status, RunStatus::Running);
    }

    #[tokio::test]
    async fn claim_on_fresh_running_row_is_owned_by_another() {
        let db = IngestDb::open_local(":memory:").await.unwrap();
        let tenant = TenantId::from("t1");
        let run_id = create(&db, &tenant, &new_run(), &serde_json::json!({})).await.unwrap();
        claim(&db, &run_id, 15).await.unwrap();

        assert_eq!(claim(&db, &run_id, 15).await.unwrap(), ClaimOutcome::OwnedByAnother);
    }

    #[tokio::test]
    async fn claim_on_succeeded_row_is_idempotent() {
        let db = IngestDb::open_local(":memory:").await.unwrap();
        let tenant = TenantId::from("t1");
        let run_id = create(&db, &tenant, &new_run(), &serde_json::json!({})).await.unwrap();
        claim(&db, &run_id, 15).await.unwrap();
        mark_succeeded(
            &db,
            &run_id,
            &RunStats { chunks_created: 1, tokens_total: 10, embedding_model: "m".to_string(), duration_ms: 1, skipped: false },
        )
        .await
        .unwrap();

        assert_eq!(claim(&db, &run_id, 15).await.unwrap(), ClaimOutcome::AlreadySucceeded);
    }

    #[tokio::test]
    async fn claim_on_missing_row_is_reported() {
        let db = IngestDb::open_local(":memory:").await.unwrap();
        let run_id = RunId::from("run-doesnotexist");
        assert_eq!(claim(&db, &run_id, 15).await.unwrap(), ClaimOutcome::MissingRow);
    }

    #[tokio::test]
    async fn sweep_interrupted_fails_old_running_rows() {
        let db = IngestDb::open_local(":memory:").await.unwrap();
        let tenant = TenantId::from("t1");
        let run_id = create(&db, &tenant, &new_run(), &serde_json::json!({})).await.unwrap();
        claim(&db, &run_id, 15).await.unwrap();

        db.conn()
            .execute(
                "UPDATE ingestion_runs SET updated_at = '2000-01-01T00:00:00.000Z' WHERE run_id = ?1",
                params![run_id.as_str()],
            )
            .await
            .unwrap();

        let swept = sweep_interrupted(&db, 10).await.unwrap();
        assert_eq!(swept, 1);
        let (status, _) = status(&db, &run_id).await.unwrap().unwrap();
        assert_eq!(status, RunStatus::Failed);
    }
}
