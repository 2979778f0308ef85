//! The token-bounded unit destined for embedding and storage (C4 output).

use serde::{Deserialize, Serialize};

use crate::ids::ChunkId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkKind {
    Text,
    Table,
}

/// Table-specific metadata carried alongside the generic keyword set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableMetadata {
    pub format: String,
}

/// Per-chunk metadata (C5). `summary` and `hypothetical_questions` are
/// reserved V2 slots — always present, always empty in this version, so
/// downstream consumers can key on stable field names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub summary: String,
    pub keywords: Vec<String>,
    pub hypothetical_questions: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table: Option<TableMetadata>,
}

impl ChunkMetadata {
    #[must_use]
    pub fn new(keywords: Vec<String>) -> Self {
        Self { summary: String::new(), keywords, hypothetical_questions: Vec::new(), table: None }
    }

    #[must_use]
    pub fn with_table_format(mut self, format: impl Into<String>) -> Self {
        self.table = Some(TableMetadata { format: format.into() });
        self
    }
}

/// A token-bounded unit assembled from one or more blocks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub kind: ChunkKind,
    pub text: String,
    pub token_count: u32,
    /// Ordered ancestor heading texts, h1 down to the current section.
    pub heading_path: Vec<String>,
    /// Dense, 0-based, assigned globally in document order after chunking (I4).
    pub ordinal: u32,
    pub metadata: ChunkMetadata,
}

/// A chunk paired with the embedding vector computed for it, ready to persist.
#[derive(Debug, Clone)]
pub struct ChunkWithEmbedding {
    pub chunk: Chunk,
    pub embedding: Vec<f32>,
}

/// A chunk row as read back from storage, carrying its assigned ID.
#[derive(Debug, Clone)]
pub struct StoredChunk {
    pub id: ChunkId,
    pub chunk: Chunk,
}
