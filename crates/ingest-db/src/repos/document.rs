//! The single canonical persistence writer (C7, SPEC_FULL §4.6).
//!
//! One transaction covers the dedup check, document upsert, prior-version
//! deactivation, new-version insert, and chunk/embedding/FTS inserts. The
//! worker's deactivate-before-insert ordering is used everywhere — see the
//! Open Question resolution in `DESIGN.md`.

use chrono::Utc;
use ingest_core::{ChunkWithEmbedding, DocId, Document, SourceType, TenantId, VersionId, WriteOutcome};
use libsql::params;

use crate::IngestDb;
use crate::error::DbError;

/// Everything [`write`] needs for one document version.
pub struct WriteRequest<'a> {
    pub tenant: &'a TenantId,
    pub source_type: SourceType,
    pub source_uri: &'a str,
    pub title: &'a str,
    pub content_hash: &'a str,
    pub chunks: &'a [ChunkWithEmbedding],
    pub embedding_model_id: &'a str,
    pub activate: bool,
    pub version_label: Option<&'a str>,
    pub artifact_uri: Option<&'a str>,
}

struct ExistingDocument {
    doc_id: String,
    content_hash: String,
    has_active_version: bool,
}

async fn find_existing(
    db: &IngestDb,
    tenant: &TenantId,
    source_uri: &str,
) -> Result<Option<ExistingDocument>, DbError> {
    let mut rows = db
        .conn()
        .query(
            "SELECT d.doc_id, d.content_hash,
                    EXISTS(
                        SELECT 1 FROM document_versions dv
                        WHERE dv.doc_id = d.doc_id AND dv.tenant = d.tenant AND dv.active = 1
                    )
             FROM documents d
             WHERE d.tenant = ?1 AND d.source_uri = ?2",
            params![tenant.as_str(), source_uri],
        )
        .await?;

    match rows.next().await? {
        None => Ok(None),
        Some(row) => Ok(Some(ExistingDocument {
            doc_id: row.get::<String>(0)?,
            content_hash: row.get::<String>(1)?,
            has_active_version: row.get::<i64>(2)? != 0,
        })),
    }
}

/// Write one document version, its chunks, and their embeddings (§4.6).
///
/// # Errors
///
/// Returns [`DbError`] if any step fails; the whole transaction is rolled
/// back and no partial state is left behind.
pub async fn write(db: &IngestDb, req: WriteRequest<'_>) -> Result<WriteOutcome, DbError> {
    if req.chunks.is_empty() {
        return Err(DbError::InvalidState("cannot write a document version with zero chunks".to_string()));
    }

    let existing = find_existing(db, req.tenant, req.source_uri).await?;

    if let Some(existing) = &existing
        && existing.content_hash == req.content_hash
        && existing.has_active_version
    {
        tracing::info!(
            doc_id = existing.doc_id.as_str(),
            source_uri = req.source_uri,
            "content hash unchanged and a version is already active, skipping"
        );
        return Ok(WriteOutcome {
            doc_id: DocId::from(existing.doc_id.clone()),
            version_id: None,
            num_chunks: 0,
            skipped: true,
        });
    }

    let version_label = req
        .version_label
        .map(str::to_string)
        .unwrap_or_else(|| format!("v{}", Utc::now().format("%Y%m%d%H%M%S")));

    let tx = db.conn().transaction().await?;

    let doc_id = match &existing {
        Some(existing) => {
            tx.execute(
                "UPDATE documents SET content_hash = ?1, updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE doc_id = ?2 AND tenant = ?3",
                params![req.content_hash, existing.doc_id.as_str(), req.tenant.as_str()],
            )
            .await?;
            existing.doc_id.clone()
        }
        None => {
            let doc_id = db.generate_id(DocId::PREFIX).await?;
            tx.execute(
                "INSERT INTO documents (doc_id, tenant, source_type, source_uri, title, content_hash)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    doc_id.as_str(),
                    req.tenant.as_str(),
                    req.source_type.as_db_str(),
                    req.source_uri,
                    req.title,
                    req.content_hash
                ],
            )
            .await?;
            doc_id
        }
    };

    if req.activate {
        tx.execute(
            "UPDATE document_versions SET active = 0 WHERE doc_id = ?1 AND tenant = ?2 AND active = 1",
            params![doc_id.as_str(), req.tenant.as_str()],
        )
        .await?;
    }

    let version_id = db.generate_id(VersionId::PREFIX).await?;
    tx.execute(
        "INSERT INTO document_versions
             (version_id, tenant, doc_id, version_label, active, content_hash, artifact_uri)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            version_id.as_str(),
            req.tenant.as_str(),
            doc_id.as_str(),
            version_label.as_str(),
            i64::from(req.activate),
            req.content_hash,
            req.artifact_uri
        ],
    )
    .await?;

    for item in req.chunks {
        let chunk_id = db.generate_id("chk").await?;
        let heading_path = serde_json::to_string(&item.chunk.heading_path)
            .map_err(|e| DbError::InvalidState(format!("heading_path serialize: {e}")))?;
        let metadata = serde_json::to_string(&item.chunk.metadata)
            .map_err(|e| DbError::InvalidState(format!("metadata serialize: {e}")))?;
        let kind = match item.chunk.kind {
            ingest_core::ChunkKind::Text => "text",
            ingest_core::ChunkKind::Table => "table",
        };

        tx.execute(
            "INSERT INTO chunks
                 (chunk_id, tenant, version_id, ordinal, heading_path, kind, text, token_count, metadata)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                chunk_id.as_str(),
                req.tenant.as_str(),
                version_id.as_str(),
                i64::from(item.chunk.ordinal),
                heading_path,
                kind,
                item.chunk.text.as_str(),
                i64::from(item.chunk.token_count),
                metadata
            ],
        )
        .await?;

        let embedding_json = serde_json::to_string(&item.embedding)
            .map_err(|e| DbError::InvalidState(format!("embedding serialize: {e}")))?;
        tx.execute(
            "INSERT INTO chunk_embeddings (chunk_id, tenant, embedding_model, embedding)
             VALUES (?1, ?2, ?3, ?4)",
            params![chunk_id.as_str(), req.tenant.as_str(), req.embedding_model_id, embedding_json],
        )
        .await?;

        tx.execute(
            "INSERT INTO chunk_fts (chunk_id, tenant, text) VALUES (?1, ?2, ?3)",
            params![chunk_id.as_str(), req.tenant.as_str(), item.chunk.text.as_str()],
        )
        .await?;
    }

    tx.commit().await?;

    tracing::info!(
        doc_id = doc_id.as_str(),
        version_id = version_id.as_str(),
        chunks = req.chunks.len(),
        activate = req.activate,
        "wrote document version"
    );

    Ok(WriteOutcome {
        doc_id: DocId::from(doc_id),
        version_id: Some(VersionId::from(version_id)),
        num_chunks: req.chunks.len(),
        skipped: false,
    })
}

/// Patch a version's `artifact_uri` after a best-effort artifact write that
/// happens outside the writing transaction (§4.6, §4.8).
///
/// # Errors
///
/// Returns [`DbError`] on a query failure.
pub async fn set_artifact_uri(
    db: &IngestDb,
    tenant: &TenantId,
    version_id: &VersionId,
    artifact_uri: &str,
) -> Result<(), DbError> {
    db.conn()
        .execute(
            "UPDATE document_versions SET artifact_uri = ?1 WHERE version_id = ?2 AND tenant = ?3",
            params![artifact_uri, version_id.as_str(), tenant.as_str()],
        )
        .await?;
    Ok(())
}

/// Outcome of [`activate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivateOutcome {
    /// The version was found (under this tenant) and is now the active one.
    Activated { doc_id: DocId },
    /// No version with this id exists for this tenant.
    NotFound,
}

/// Flip a specific version to active, deactivating its document's current
/// active version first (the same ordering [`write`] uses). Useful to roll
/// back to an earlier version without re-running the pipeline.
///
/// # Errors
///
/// Returns [`DbError`] on a query failure.
pub async fn activate(db: &IngestDb, tenant: &TenantId, version_id: &VersionId) -> Result<ActivateOutcome, DbError> {
    let mut rows = db
        .conn()
        .query(
            "SELECT doc_id FROM document_versions WHERE version_id = ?1 AND tenant = ?2",
            params![version_id.as_str(), tenant.as_str()],
        )
        .await?;
    let Some(row) = rows.next().await? else { return Ok(ActivateOutcome::NotFound) };
    let doc_id = row.get::<String>(0)?;

    let tx = db.conn().transaction().await?;
    tx.execute(
        "UPDATE document_versions SET active = 0 WHERE doc_id = ?1 AND tenant = ?2 AND active = 1",
        params![doc_id.as_str(), tenant.as_str()],
    )
    .await?;
    tx.execute(
        "UPDATE document_versions SET active = 1 WHERE version_id = ?1 AND tenant = ?2",
        params![version_id.as_str(), tenant.as_str()],
    )
    .await?;
    tx.commit().await?;

    tracing::info!(doc_id = doc_id.as_str(), version_id = version_id.as_str(), "activated version");
    Ok(ActivateOutcome::Activated { doc_id: DocId::from(doc_id) })
}

/// Fetch a document's current record, if any, for the given tenant.
///
/// # Errors
///
/// Returns [`DbError`] on a query failure.
pub async fn find_by_source_uri(
    db: &IngestDb,
    tenant: &TenantId,
    source_uri: &str,
) -> Result<Option<Document>, DbError> {
    let mut rows = db
        .conn()
        .query(
            "SELECT doc_id, tenant, source_type, source_uri, title, content_hash
             FROM documents WHERE tenant = ?1 AND source_uri = ?2",
            params![tenant.as_str(), source_uri],
        )
        .await?;

    let Some(row) = rows.next().await? else { return Ok(None) };
    let source_type_raw = row.get::<String>(2)?;
    let source_type = SourceType::from_db_str(&source_type_raw)
        .ok_or_else(|| DbError::InvalidState(format!("unknown source_type in row: {source_type_raw}")))?;
    Ok(Some(Document {
        id: DocId::from(row.get::<String>(0)?),
        tenant: TenantId::from(row.get::<String>(1)?),
        source_type,
        source_uri: row.get::<String>(3)?,
        title: row.get::<String>(4)?,
        content_hash: row.get::<String>(5)?,
    }))
}

#[cfg(test)]
mod tests {
    use ingest_core::{Chunk, ChunkKind, ChunkMetadata};

    use super::*;

    fn sample_chunk(ordinal: u32) -> ChunkWithEmbedding {
        ChunkWithEmbedding {
            chunk: Chunk {
                kind: ChunkKind::Text,
                text: format!("chunk {ordinal}"),
                token_count: 10,
                heading_path: vec!["Intro".to_string()],
                ordinal,
                metadata: ChunkMetadata::new(vec!["intro".to_string()]),
            },
            embedding: vec![0.6, 0.8],
        }
    }

    #[tokio::test]
    async fn writes_a_new_document_and_activates_it() {
        let db = IngestDb::open_local(":memory:").await.unwrap();
        let tenant = TenantId::from("t1");
        let outcome = write(
            &db,
            WriteRequest {
                tenant: &tenant,
                source_type: SourceType::Hypertext,
                source_uri: "file:///a.html",
                title: "A",
                content_hash: "hash1",
                chunks: &[sample_chunk(0)],
                embedding_model_id: "BAAI/bge-base-en-v1.5",
                activate: true,
                version_label: None,
                artifact_uri: None,
            },
        )
        .await
        .unwrap();

        assert!(!outcome.skipped);
        assert_eq!(outcome.num_chunks, 1);
        assert!(outcome.version_id.is_some());
    }

    #[tokio::test]
    async fn reingesting_identical_hash_with_active_version_is_skipped() {
        let db = IngestDb::open_local(":memory:").await.unwrap();
        let tenant = TenantId::from("t1");
        let req = || WriteRequest {
            tenant: &tenant,
            source_type: SourceType::Hypertext,
            source_uri: "file:///a.html",
            title: "A",
            content_hash: "hash1",
            chunks: &[sample_chunk(0)],
            embedding_model_id: "BAAI/bge-base-en-v1.5",
            activate: true,
            version_label: None,
            artifact_uri: None,
        };

        write(&db, req()).await.unwrap();
        let second = write(&db, req()).await.unwrap();

        assert!(second.skipped);
        assert_eq!(second.num_chunks, 0);
        assert!(second.version_id.is_none());
    }

    #[tokio::test]
    async fn new_content_hash_deactivates_the_prior_version() {
        let db = IngestDb::open_local(":memory:").await.unwrap();
        let tenant = TenantId::from("t1");

        write(
            &db,
            WriteRequest {
                tenant: &tenant,
                source_type: SourceType::Hypertext,
                source_uri: "file:///a.html",
                title: "A",
                content_hash: "hash1",
                chunks: &[sample_chunk(0)],
                embedding_model_id: "BAAI/bge-base-en-v1.5",
                activate: true,
                version_label: None,
                artifact_uri: None,
            },
        )
        .await
        .unwrap();

        write(
            &db,
            WriteRequest {
                tenant: &tenant,
                source_type: SourceType::Hypertext,
                source_uri: "file:///a.html",
                title: "A",
                content_hash: "hash2",
                chunks: &[sample_chunk(0)],
                embedding_model_id: "BAAI/bge-base-en-v1.5",
                activate: true,
                version_label: None,
                artifact_uri: None,
            },
        )
        .await
        .unwrap();

        let mut rows = db
            .conn()
            .query(
                "SELECT count(*) FROM document_versions WHERE tenant = ?1 AND active = 1",
                params!["t1"],
            )
            .await
            .unwrap();
        let row = rows.next().await.unwrap().unwrap();
        assert_eq!(row.get::<i64>(0).unwrap(), 1);
    }

    #[tokio::test]
    async fn tenant_scoped_query_returns_nothing_for_other_tenant() {
        let db = IngestDb::open_local(":memory:").await.unwrap();
        let tenant = TenantId::from("t1");
        write(
            &db,
            WriteRequest {
                tenant: &tenant,
                source_type: SourceType::Hypertext,
                source_uri: "file:///a.html",
                title: "A",
                content_hash: "hash1",
                chunks: &[sample_chunk(0)],
                embedding_model_id: "BAAI/bge-base-en-v1.5",
                activate: true,
                version_label: None,
                artifact_uri: None,
            },
        )
        .await
        .unwrap();

        let other_tenant = TenantId::from("t2");
        let found = find_by_source_uri(&db, &other_tenant, "file:///a.html").await.unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn set_artifact_uri_patches_the_version_row() {
        let db = IngestDb::open_local(":memory:").await.unwrap();
        let tenant = TenantId::from("t1");
        let outcome = write(
            &db,
            WriteRequest {
                tenant: &tenant,
                source_type: SourceType::Hypertext,
                source_uri: "file:///a.html",
                title: "A",
                content_hash: "hash1",
                chunks: &[sample_chunk(0)],
                embedding_model_id: "BAAI/bge-base-en-v1.5",
                activate: true,
                version_label: None,
                artifact_uri: None,
            },
        )
        .await
        .unwrap();

        let version_id = outcome.version_id.unwrap();
        set_artifact_uri(&db, &tenant, &version_id, "file:///artifacts/a/v1.json").await.unwrap();

        let mut rows = db
            .conn()
            .query(
                "SELECT artifact_uri FROM document_versions WHERE version_id = ?1",
                params![version_id.as_str()],
            )
            .await
            .unwrap();
        let row = rows.next().await.unwrap().unwrap();
        assert_eq!(row.get::<String>(0).unwrap(), "file:///artifacts/a/v1.json");
    }

    #[tokio::test]
    async fn activate_switches_the_active_version_and_deactivates_the_prior_one() {
        let db = IngestDb::open_local(":memory:").await.unwrap();
        let tenant = TenantId::from("t1");
        let first = write(
            &db,
            WriteRequest {
                tenant: &tenant,
                source_type: SourceType::Hypertext,
                source_uri: "file:///a.html",
                title: "A",
                content_hash: "hash1",
                chunks: &[sample_chunk(0)],
                embedding_model_id: "BAAI/bge-base-en-v1.5",
                activate: true,
                version_label: Some("v1"),
                artifact_uri: None,
            },
        )
        .await
        .unwrap();
        let second = write(
            &db,
            WriteRequest {
                tenant: &tenant,
                source_type: SourceType::Hypertext,
                source_uri: "file:///a.html",
                title: "A",
                content_hash: "hash2",
                chunks: &[sample_chunk(0)],
                embedding_model_id: "BAAI/bge-base-en-v1.5",
                activate: true,
                version_label: Some("v2"),
                artifact_uri: None,
            },
        )
        .await
        .unwrap();

        let first_version = first.version_id.unwrap();
        let outcome = activate(&db, &tenant, &first_version).await.unwrap();
        assert_eq!(outcome, ActivateOutcome::Activated { doc_id: second.doc_id.clone() });

        let mut rows = db
            .conn()
            .query("SELECT version_id FROM document_versions WHERE tenant = ?1 AND active = 1", params!["t1"])
            .await
            .unwrap();
        let row = rows.next().await.unwrap().unwrap();
        assert_eq!(row.get::<String>(0).unwrap(), first_version.as_str());
    }

    #[tokio::test]
    async fn activate_reports_missing_version() {
        let db = IngestDb::open_local(":memory:").await.unwrap();
        let tenant = TenantId::from("t1");
        let outcome = activate(&db, &tenant, &VersionId::from("ver-doesnotexist")).await.unwrap();
        assert_eq!(outcome, ActivateOutcome::NotFound);
    }
}
