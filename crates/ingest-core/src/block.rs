//! The structural unit produced by extraction and consumed by chunking (C1).

use serde::{Deserialize, Serialize};

/// Kind-dependent attributes of a [`Block`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BlockKind {
    /// `level` is 1-6, matching the source heading level ("Heading N" style,
    /// `h1`..`h6`, or font-size classification).
    Heading { level: u8 },
    Paragraph,
    List,
    /// A table already converted to the shared markdown-grid representation.
    Table {
        rows: usize,
        cols: usize,
        /// Source page number, when the extractor can determine one (PDF only).
        page: Option<u32>,
    },
    Code { language: Option<String> },
}

/// An ordered record produced by extraction. Immutable after extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    #[serde(flatten)]
    pub kind: BlockKind,
    /// Non-empty UTF-8. Paragraph/heading text has internal whitespace
    /// collapsed to single spaces; table text retains line structure as the
    /// markdown grid; list/code text is stored as-is.
    pub text: String,
}

impl Block {
    #[must_use]
    pub fn heading(level: u8, text: impl Into<String>) -> Self {
        Self { kind: BlockKind::Heading { level }, text: text.into() }
    }

    #[must_use]
    pub fn paragraph(text: impl Into<String>) -> Self {
        Self { kind: BlockKind::Paragraph, text: text.into() }
    }

    #[must_use]
    pub fn list_item(text: impl Into<String>) -> Self {
        Self { kind: BlockKind::List, text: text.into() }
    }

    #[must_use]
    pub fn table(text: impl Into<String>, rows: usize, cols: usize, page: Option<u32>) -> Self {
        Self { kind: BlockKind::Table { rows, cols, page }, text: text.into() }
    }

    #[must_use]
    pub fn code(text: impl Into<String>, language: Option<String>) -> Self {
        Self { kind: BlockKind::Code { language }, text: text.into() }
    }

    #[must_use]
    pub const fn is_heading(&self) -> bool {
        matches!(self.kind, BlockKind::Heading { .. })
    }

    #[must_use]
    pub const fn is_table(&self) -> bool {
        matches!(self.kind, BlockKind::Table { .. })
    }

    #[must_use]
    pub const fn heading_level(&self) -> Option<u8> {
        match self.kind {
            BlockKind::Heading { level } => Some(level),
            _ => None,
        }
    }
}
