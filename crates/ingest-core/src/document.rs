//! Logical document and version records (C7).

use serde::{Deserialize, Serialize};

use crate::ids::{DocId, VersionId};
use crate::tenant::TenantId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    WordProcessor,
    Portable,
    Hypertext,
}

impl SourceType {
    /// Detect from a file extension, matching the three supported extractors.
    #[must_use]
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "docx" => Some(Self::WordProcessor),
            "pdf" => Some(Self::Portable),
            "html" | "htm" => Some(Self::Hypertext),
            _ => None,
        }
    }

    /// The `documents.source_type` column value for this variant.
    #[must_use]
    pub const fn as_db_str(self) -> &'static str {
        match self {
            Self::WordProcessor => "word_processor",
            Self::Portable => "portable",
            Self::Hypertext => "hypertext",
        }
    }

    /// Parse a `documents.source_type` column value back into its variant.
    #[must_use]
    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "word_processor" => Some(Self::WordProcessor),
            "portable" => Some(Self::Portable),
            "hypertext" => Some(Self::Hypertext),
            _ => None,
        }
    }
}

/// A logical, tenant-scoped record keyed by (tenant, source URI).
#[derive(Debug, Clone)]
pub struct Document {
    pub id: DocId,
    pub tenant: TenantId,
    pub source_type: SourceType,
    pub source_uri: String,
    pub title: String,
    pub content_hash: String,
}

/// A point-in-time snapshot of a document's chunks and embeddings.
#[derive(Debug, Clone)]
pub struct DocumentVersion {
    pub id: VersionId,
    pub tenant: TenantId,
    pub doc_id: DocId,
    pub version_label: String,
    pub active: bool,
    pub content_hash: String,
    pub artifact_uri: Option<String>,
}

/// Result of the persistence writer's `write` operation (§4.6).
#[derive(Debug, Clone)]
pub struct WriteOutcome {
    pub doc_id: DocId,
    pub version_id: Option<VersionId>,
    pub num_chunks: usize,
    pub skipped: bool,
}
