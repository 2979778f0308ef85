//! The durable per-attempt record driven by the worker and orchestrator (C8/C9, §4.9).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::RunId;
use crate::tenant::TenantId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Queued,
    Running,
    Succeeded,
    Failed,
}

impl RunStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        }
    }

    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

/// Pipeline stage tags used to prefix a failed run's error text (§4.8, §7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Extract,
    Chunk,
    Metadata,
    Embed,
    DbWrite,
}

impl Stage {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Extract => "extract",
            Self::Chunk => "chunk",
            Self::Metadata => "metadata",
            Self::Embed => "embed",
            Self::DbWrite => "db_write",
        }
    }

    /// Tag a raw error message with this stage, e.g. `"[extract] file not found"`.
    #[must_use]
    pub fn tag(self, message: impl AsRef<str>) -> String {
        format!("[{}] {}", self.as_str(), message.as_ref())
    }
}

/// Computed summary statistics written on successful completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunStats {
    pub chunks_created: usize,
    pub tokens_total: u64,
    pub embedding_model: String,
    pub duration_ms: u64,
    pub skipped: bool,
}

/// A durable record of one ingestion attempt.
#[derive(Debug, Clone)]
pub struct IngestionRun {
    pub id: RunId,
    pub tenant: TenantId,
    pub status: RunStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub config_snapshot: serde_json::Value,
    pub stats: Option<RunStats>,
    pub error: Option<String>,
}
