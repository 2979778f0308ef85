//! # ingest-db
//!
//! The relational store (§6 "Persisted schema"): connection/migration
//! bootstrap, the single canonical persistence writer (C7), and the
//! ingestion-run repository backing the worker's claim/heartbeat/terminate
//! state machine (C9).

pub mod error;
pub mod helpers;
pub mod repos;

use libsql::Builder;

pub use error::DbError;
pub use repos::document::{ActivateOutcome, WriteRequest, activate, set_artifact_uri};
pub use repos::run::{ClaimOutcome, JobPayload, NewRun};

const MIGRATION_001: &str = include_str!("../migrations/001_initial.sql");

/// A connection to the ingestion engine's relational store.
///
/// Every content-table query goes through here rather than a bare
/// `libsql::Connection` so a single place owns migration bootstrap.
pub struct IngestDb {
    conn: libsql::Connection,
}

impl IngestDb {
    /// Open (creating if absent) a local libSQL database at `path` — or
    /// `:memory:` for tests — and run pending migrations.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the database can't be opened or a migration fails.
    pub async fn open_local(path: &str) -> Result<Self, DbError> {
        let db = Builder::new_local(path).build().await.map_err(DbError::LibSql)?;
        let conn = db.connect().map_err(DbError::LibSql)?;
        let this = Self { conn };
        this.run_migrations().await?;
        Ok(this)
    }

    async fn run_migrations(&self) -> Result<(), DbError> {
        self.conn
            .execute_batch(MIGRATION_001)
            .await
            .map_err(|e| DbError::Migration(format!("001_initial: {e}")))?;
        Ok(())
    }

    #[must_use]
    pub const fn conn(&self) -> &libsql::Connection {
        &self.conn
    }

    /// Mint a prefixed opaque ID the way every schema default does, for
    /// call sites that need the ID before the row exists (e.g. to reference
    /// it from a second table in the same transaction).
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the query fails.
    pub async fn generate_id(&self, prefix: &str) -> Result<String, DbError> {
        let sql = format!("SELECT '{prefix}-' || lower(hex(randomblob(4)))");
        let mut rows = self.conn.query(&sql, ()).await?;
        let row = rows.next().await?.ok_or(DbError::NoResult)?;
        Ok(row.get::<String>(0)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn opens_in_memory_and_runs_migrations() {
        let db = IngestDb::open_local(":memory:").await.unwrap();
        let mut rows = db.conn().query("SELECT count(*) FROM documents", ()).await.unwrap();
        let row = rows.next().await.unwrap().unwrap();
        assert_eq!(row.get::<i64>(0).unwrap(), 0);
    }

    #[tokio::test]
    async fn generate_id_uses_the_given_prefix() {
        let db = IngestDb::open_local(":memory:").await.unwrap();
        let id = db.generate_id("doc").await.unwrap();
        assert!(id.starts_with("doc-"), "got {id}");
    }
}
