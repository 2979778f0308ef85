//! # ingest-chunk
//!
//! The tokenizer adapter (C3), structure-aware chunker (C4), and per-chunk
//! metadata/keyword generator (C5).

pub mod chunker;
pub mod error;
pub mod metadata;
pub mod tokenizer;

pub use chunker::{ChunkParams, chunk_blocks};
pub use error::ChunkError;
pub use metadata::{extract_keywords, generate_chunk_metadata};
pub use tokenizer::Tokenizer;
