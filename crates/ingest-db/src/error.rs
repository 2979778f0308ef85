//! Database error types for ingest-db.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("query failed: {0}")]
    Query(String),

    #[error("migration failed: {0}")]
    Migration(String),

    #[error("expected a result row but none was returned")]
    NoResult,

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("libSQL error: {0}")]
    LibSql(#[from] libsql::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
