//! The ingestion engine's single configuration struct (C10, SPEC_FULL §6).
//!
//! Every recognized option is an explicit field here — no ad-hoc
//! keyword-argument configuration anywhere downstream.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Relational store endpoint. A local libSQL file path, or `:memory:` for tests.
    pub database_url: String,

    /// Embedder identifier passed to the embedding backend.
    pub embedding_model_id: String,
    /// Expected vector length for `embedding_model_id`.
    pub embedding_dim: usize,
    /// Max texts per embed call.
    pub embedding_batch_size: usize,
    /// Base URL of a remote embedder endpoint (§6). `None` selects the local
    /// `fastembed` handle; the two are interchangeable per the `Embedder` contract.
    pub embedder_endpoint: Option<String>,

    /// Soft target token count the chunker tries to reach before flushing.
    pub chunk_target: u32,
    /// Minimum token count below which a trailing chunk is still flushed.
    pub chunk_min: u32,
    /// Token count above which the buffer is flushed before appending more.
    pub chunk_max: u32,
    /// Absolute upper bound, violable only by an unsplittable atomic unit.
    pub chunk_hard_cap: u32,

    /// Where extracted-block JSON snapshots are written (best-effort).
    pub artifact_base_path: PathBuf,

    /// Worker bounded-concurrency pool size.
    pub worker_max_concurrent: usize,
    /// Worker HTTP bind port.
    pub worker_port: u16,
    /// Bearer token required on `/internal/process`. Empty disables the check.
    pub internal_auth_token: String,

    /// Minutes after which a `running` row is considered stale and reclaimable.
    pub stale_running_minutes: i64,
    /// Minutes after which a `running` row found at startup is swept to `failed`.
    pub crash_recovery_minutes: i64,

    /// `tracing` env-filter directive.
    pub log_level: String,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            database_url: "ingest.db".to_string(),
            embedding_model_id: "BAAI/bge-base-en-v1.5".to_string(),
            embedding_dim: 768,
            embedding_batch_size: 256,
            embedder_endpoint: None,
            chunk_target: 450,
            chunk_min: 350,
            chunk_max: 500,
            chunk_hard_cap: 800,
            artifact_base_path: PathBuf::from("/data/artifacts"),
            worker_max_concurrent: 3,
            worker_port: 8002,
            internal_auth_token: String::new(),
            stale_running_minutes: 15,
            crash_recovery_minutes: 10,
            log_level: "info".to_string(),
        }
    }
}

impl IngestConfig {
    #[must_use]
    pub fn artifact_path(&self, tenant: &str, doc_id: &str, version_label: &str) -> PathBuf {
        self.artifact_base_path.join(tenant).join(doc_id).join(format!("{version_label}.json"))
    }
}
