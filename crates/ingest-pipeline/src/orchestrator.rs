//! The ingestion orchestrator (C8, SPEC_FULL §4.8): extract → chunk →
//! metadata → embed → persist, plus the best-effort artifact write.
//!
//! [`create_run`] and [`execute`] are the two halves of the shared entry
//! point SPEC_FULL §4.8 calls for: a CLI invocation creates a run and
//! immediately executes it; a worker claims an existing run (created by
//! whatever enqueued it) and executes it the same way, heartbeating between
//! stages so a crashed attempt can be told apart from a live one.

use std::io::Read;
use std::path::Path;

use ingest_chunk::{ChunkParams, Tokenizer, chunk_blocks, generate_chunk_metadata};
use ingest_config::IngestConfig;
use ingest_core::{ChunkWithEmbedding, DocId, RunId, RunStats, SourceType, Stage, TenantId, VersionId};
use ingest_db::{IngestDb, WriteRequest, repos};
use ingest_embed::Embedder;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::PipelineError;

/// Per-run configuration snapshot persisted on the job row, so a worker
/// reclaiming an in-flight run after a restart doesn't need the original
/// request body to know how to finish it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    pub activate: bool,
    pub version_label: Option<String>,
    pub embedding_model_id: String,
    pub chunk_target: u32,
    pub chunk_min: u32,
    pub chunk_max: u32,
    pub chunk_hard_cap: u32,
}

impl RunConfig {
    #[must_use]
    fn from_config(config: &IngestConfig, activate: bool, version_label: Option<&str>) -> Self {
        Self {
            activate,
            version_label: version_label.map(str::to_string),
            embedding_model_id: config.embedding_model_id.clone(),
            chunk_target: config.chunk_target,
            chunk_min: config.chunk_min,
            chunk_max: config.chunk_max,
            chunk_hard_cap: config.chunk_hard_cap,
        }
    }

    fn chunk_params(&self) -> ChunkParams {
        ChunkParams { target: self.chunk_target, min: self.chunk_min, max: self.chunk_max, hard_cap: self.chunk_hard_cap }
    }
}

/// A file to ingest (C11's `ingest` subcommand, or a single upload job).
pub struct IngestRequest<'a> {
    pub file_path: &'a Path,
    pub title: &'a str,
    pub activate: bool,
    pub version_label: Option<&'a str>,
}

/// Result of a completed, or idempotently skipped, ingestion run.
#[derive(Debug, Clone)]
pub struct IngestOutcome {
    pub run_id: RunId,
    pub doc_id: DocId,
    pub version_id: Option<VersionId>,
    pub num_chunks: usize,
    pub skipped: bool,
}

fn compute_content_hash(path: &Path) -> Result<String, PipelineError> {
    let mut file = std::fs::File::open(path)
        .map_err(|e| PipelineError::new(Stage::Extract, format!("opening {}: {e}", path.display())))?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 8192];
    loop {
        let n = file
            .read(&mut buf)
            .map_err(|e| PipelineError::new(Stage::Extract, format!("reading {}: {e}", path.display())))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

fn file_uri(path: &Path) -> String {
    let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    format!("file://{}", canonical.display())
}

/// Create a `queued` run row for `req`: validates the file exists and has a
/// recognized extension, computes its content hash and source URI up front,
/// and durably records everything the pipeline needs to run — or retry —
/// later (SPEC_FULL §4.7's job payload contract).
///
/// # Errors
///
/// Returns [`PipelineError`] if the file is missing, its extension is
/// unrecognized, or the run row can't be created.
pub async fn create_run(
    db: &IngestDb,
    config: &IngestConfig,
    tenant: &TenantId,
    req: &IngestRequest<'_>,
) -> Result<RunId, PipelineError> {
    if !req.file_path.exists() {
        return Err(PipelineError::new(Stage::Extract, format!("file not found: {}", req.file_path.display())));
    }
    let ext = req.file_path.extension().and_then(|e| e.to_str()).unwrap_or_default();
    let source_type = SourceType::from_extension(ext)
        .ok_or_else(|| PipelineError::new(Stage::Extract, format!("unsupported file format: .{ext}")))?;

    let content_hash = compute_content_hash(req.file_path)?;
    let source_uri = file_uri(req.file_path);

    let run_config = RunConfig::from_config(config, req.activate, req.version_label);
    let config_snapshot = serde_json::to_value(&run_config)
        .map_err(|e| PipelineError::new(Stage::DbWrite, format!("config snapshot: {e}")))?;

    let new_run = repos::run::NewRun {
        doc_id: None,
        upload_uri: source_uri.clone(),
        title: req.title.to_string(),
        source_type: source_type.as_db_str().to_string(),
        source_uri,
        content_hash,
    };

    repos::run::create(db, tenant, &new_run, &config_snapshot)
        .await
        .map_err(|e| PipelineError::new(Stage::DbWrite, e.to_string()))
}

/// Run the extract → chunk → metadata → embed → persist pipeline for an
/// already-claimed run, heartbeating between stages. Does not itself claim
/// the run — callers (CLI, worker) own that decision, since a worker also
/// needs [`ingest_db::ClaimOutcome`] to decide whether to call this at all.
///
/// On success the run is marked `succeeded` with computed stats and the
/// best-effort artifact is written. On failure the run is marked `failed`
/// with a stage-tagged error message, and the transformed error is returned.
///
/// # Errors
///
/// Returns [`PipelineError`] tagged with the stage that failed.
pub async fn execute(
    db: &IngestDb,
    embedder: &dyn Embedder,
    config: &IngestConfig,
    tenant: &TenantId,
    run_id: &RunId,
) -> Result<IngestOutcome, PipelineError> {
    let started = std::time::Instant::now();
    match run_once(db, embedder, config, tenant, run_id, started).await {
        Ok(outcome) => Ok(outcome),
        Err(err) => {
            if let Err(e) = repos::run::mark_failed(db, run_id, &err.to_string()).await {
                tracing::error!(run_id = run_id.as_str(), error = %e, "failed to record run failure");
            }
            Err(err)
        }
    }
}

async fn run_once(
    db: &IngestDb,
    embedder: &dyn Embedder,
    config: &IngestConfig,
    tenant: &TenantId,
    run_id: &RunId,
    started: std::time::Instant,
) -> Result<IngestOutcome, PipelineError> {
    let job = repos::run::job_payload(db, run_id)
        .await
        .map_err(|e| PipelineError::new(Stage::DbWrite, e.to_string()))?
        .ok_or_else(|| PipelineError::new(Stage::DbWrite, format!("no such run: {}", run_id.as_str())))?;

    let snapshot = repos::run::config_snapshot(db, run_id)
        .await
        .map_err(|e| PipelineError::new(Stage::DbWrite, e.to_string()))?
        .ok_or_else(|| PipelineError::new(Stage::DbWrite, "run row vanished mid-execution".to_string()))?;
    let run_config: RunConfig = serde_json::from_value(snapshot)
        .map_err(|e| PipelineError::new(Stage::DbWrite, format!("config snapshot: {e}")))?;

    let file_path = job
        .upload_uri
        .strip_prefix("file://")
        .map(Path::new)
        .ok_or_else(|| PipelineError::new(Stage::Extract, format!("unsupported upload uri scheme: {}", job.upload_uri)))?;

    // Stage 1: extract
    let blocks = ingest_extract::extract(file_path).map_err(|e| PipelineError::new(Stage::Extract, e.to_string()))?;
    if blocks.is_empty() {
        return Err(PipelineError::new(Stage::Extract, format!("no blocks extracted from {}", file_path.display())));
    }
    repos::run::heartbeat(db, run_id).await.map_err(|e| PipelineError::new(Stage::Extract, e.to_string()))?;

    // Stage 2: chunk
    let tok = Tokenizer::get().map_err(|e| PipelineError::new(Stage::Chunk, e.to_string()))?;
    let mut chunks = chunk_blocks(&blocks, tok, run_config.chunk_params());
    if chunks.is_empty() {
        return Err(PipelineError::new(Stage::Chunk, format!("no chunks created from {}", file_path.display())));
    }
    repos::run::heartbeat(db, run_id).await.map_err(|e| PipelineError::new(Stage::Chunk, e.to_string()))?;

    // Stage 3: metadata
    for chunk in &mut chunks {
        let is_table = matches!(chunk.kind, ingest_core::ChunkKind::Table);
        chunk.metadata = generate_chunk_metadata(&chunk.text, is_table);
    }
    repos::run::heartbeat(db, run_id).await.map_err(|e| PipelineError::new(Stage::Metadata, e.to_string()))?;

    // Stage 4: embed
    let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
    let vectors = embedder
        .embed(&texts, &run_config.embedding_model_id, config.embedding_batch_size)
        .await
        .map_err(|e| PipelineError::new(Stage::Embed, e.to_string()))?;
    if vectors.len() != chunks.len() {
        return Err(PipelineError::new(
            Stage::Embed,
            format!("embedding count mismatch: expected {}, got {}", chunks.len(), vectors.len()),
        ));
    }
    let tokens_total: u64 = chunks.iter().map(|c| u64::from(c.token_count)).sum();
    let chunks_with_embeddings: Vec<ChunkWithEmbedding> =
        chunks.into_iter().zip(vectors).map(|(chunk, embedding)| ChunkWithEmbedding { chunk, embedding }).collect();
    repos::run::heartbeat(db, run_id).await.map_err(|e| PipelineError::new(Stage::Embed, e.to_string()))?;

    // Stage 5: persist
    let source_type = SourceType::from_db_str(&job.source_type)
        .ok_or_else(|| PipelineError::new(Stage::DbWrite, format!("unknown source_type: {}", job.source_type)))?;

    let outcome = repos::document::write(
        db,
        WriteRequest {
            tenant,
            source_type,
            source_uri: &job.source_uri,
            title: &job.title,
            content_hash: &job.content_hash,
            chunks: &chunks_with_embeddings,
            embedding_model_id: &run_config.embedding_model_id,
            activate: run_config.activate,
            version_label: run_config.version_label.as_deref(),
            artifact_uri: None,
        },
    )
    .await
    .map_err(|e| PipelineError::new(Stage::DbWrite, e.to_string()))?;

    // Best-effort artifact write, outside the writing transaction, patched
    // onto the version row afterward. Never fails the run.
    if let (false, Some(version_id)) = (outcome.skipped, &outcome.version_id) {
        let version_label = run_config.version_label.clone().unwrap_or_else(|| version_id.as_str().to_string());
        if let Some(uri) = crate::artifact::save(&config.artifact_base_path, tenant.as_str(), outcome.doc_id.as_str(), &version_label, &blocks)
            && let Err(e) = ingest_db::set_artifact_uri(db, tenant, version_id, &uri).await
        {
            tracing::warn!(run_id = run_id.as_str(), error = %e, "failed to patch artifact_uri");
        }
    }

    let stats = RunStats {
        chunks_created: outcome.num_chunks,
        tokens_total,
        embedding_model: run_config.embedding_model_id.clone(),
        duration_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        skipped: outcome.skipped,
    };
    repos::run::mark_succeeded(db, run_id, &stats).await.map_err(|e| PipelineError::new(Stage::DbWrite, e.to_string()))?;

    Ok(IngestOutcome {
        run_id: run_id.clone(),
        doc_id: outcome.doc_id,
        version_id: outcome.version_id,
        num_chunks: outcome.num_chunks,
        skipped: outcome.skipped,
    })
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use ingest_core::RunStatus;
    use ingest_embed::EmbedError;
    use tempfile::TempDir;

    use super::*;

    struct FakeEmbedder;

    #[async_trait]
    impl Embedder for FakeEmbedder {
        async fn embed(&self, texts: &[String], _model_id: &str, _batch_size: usize) -> Result<Vec<Vec<f32>>, EmbedError> {
            if texts.is_empty() {
                return Err(EmbedError::EmptyInput);
            }
            Ok(texts.iter().map(|_| vec![0.1, 0.2, 0.3]).collect())
        }
    }

    fn write_html(tmp: &TempDir, name: &str) -> std::path::PathBuf {
        let path = tmp.path().join(name);
        std::fs::write(
            &path,
            "<html><body><h1>Intro</h1><p>hello world this is a test document about rust</p></body></html>",
        )
        .unwrap();
        path
    }

    #[tokio::test]
    async fn create_run_rejects_a_missing_file() {
        let db = IngestDb::open_local(":memory:").await.unwrap();
        let config = IngestConfig::default();
        let tenant = TenantId::from("t1");
        let req = IngestRequest {
            file_path: Path::new("/tmp/does-not-exist-ingest-pipeline-test.html"),
            title: "Missing",
            activate: true,
            version_label: None,
        };

        let err = create_run(&db, &config, &tenant, &req).await.unwrap_err();
        assert_eq!(err.stage, Stage::Extract);
    }

    #[tokio::test]
    async fn create_run_rejects_an_unsupported_extension() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("notes.txt");
        std::fs::write(&path, "plain text").unwrap();

        let db = IngestDb::open_local(":memory:").await.unwrap();
        let config = IngestConfig::default();
        let tenant = TenantId::from("t1");
        let req = IngestRequest { file_path: &path, title: "Notes", activate: true, version_label: None };

        let err = create_run(&db, &config, &tenant, &req).await.unwrap_err();
        assert_eq!(err.stage, Stage::Extract);
    }

    #[tokio::test]
    async fn end_to_end_create_and_execute_succeeds() {
        let tmp = TempDir::new().unwrap();
        let artifact_dir = tmp.path().join("artifacts");
        let html_path = write_html(&tmp, "doc.html");

        let db = IngestDb::open_local(":memory:").await.unwrap();
        let mut config = IngestConfig::default();
        config.artifact_base_path = artifact_dir.clone();
        let tenant = TenantId::from("t1");
        let embedder = FakeEmbedder;

        let req = IngestRequest { file_path: &html_path, title: "Doc", activate: true, version_label: None };
        let run_id = create_run(&db, &config, &tenant, &req).await.unwrap();

        let outcome = execute(&db, &embedder, &config, &tenant, &run_id).await.unwrap();
        assert!(!outcome.skipped);
        assert!(outcome.num_chunks >= 1);
        assert!(outcome.version_id.is_some());

        let (status, _) = repos::run::status(&db, &run_id).await.unwrap().unwrap();
        assert_eq!(status, RunStatus::Succeeded);

        let saved = std::fs::read_dir(&artifact_dir).is_ok();
        assert!(saved, "artifact directory should have been created");
    }

    #[tokio::test]
    async fn reingesting_unchanged_file_is_skipped() {
        let tmp = TempDir::new().unwrap();
        let html_path = write_html(&tmp, "doc.html");

        let db = IngestDb::open_local(":memory:").await.unwrap();
        let mut config = IngestConfig::default();
        config.artifact_base_path = tmp.path().join("artifacts");
        let tenant = TenantId::from("t1");
        let embedder = FakeEmbedder;

        let req = IngestRequest { file_path: &html_path, title: "Doc", activate: true, version_label: None };
        let first_run = create_run(&db, &config, &tenant, &req).await.unwrap();
        execute(&db, &embedder, &config, &tenant, &first_run).await.unwrap();

        let second_run = create_run(&db, &config, &tenant, &req).await.unwrap();
        let outcome = execute(&db, &embedder, &config, &tenant, &second_run).await.unwrap();
        assert!(outcome.skipped);
    }
}
