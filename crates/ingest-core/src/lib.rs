//! # ingest-core
//!
//! Core types, ID generation, and cross-cutting error types for the
//! document ingestion engine: the `Block`/`Chunk` structural model,
//! `Document`/`DocumentVersion` persistence records, and the `IngestionRun`
//! state-machine record shared by the pipeline orchestrator and the worker.

pub mod block;
pub mod chunk;
pub mod document;
pub mod error;
pub mod ids;
pub mod run;
pub mod tenant;

pub use block::{Block, BlockKind};
pub use chunk::{Chunk, ChunkKind, ChunkMetadata, ChunkWithEmbedding, StoredChunk, TableMetadata};
pub use document::{Document, DocumentVersion, SourceType, WriteOutcome};
pub use error::CoreError;
pub use ids::{ChunkId, DocId, RunId, VersionId};
pub use run::{IngestionRun, RunStats, RunStatus, Stage};
pub use tenant::TenantId;
