//! Tokenizer adapter (C3).
//!
//! Counts tokens using the same byte-pair encoding as the downstream
//! language model (`cl100k_base`), so the chunker's budgets and the
//! serving stage that later feeds chunks into a prompt never disagree.
//! The encoder is a process-wide lazy singleton — loaded once, held for
//! the process lifetime (SPEC_FULL §9, "process-wide caches").

use std::sync::OnceLock;

use tiktoken_rs::CoreBPE;

use crate::error::ChunkError;

static ENCODER: OnceLock<CoreBPE> = OnceLock::new();

/// A cached tokenizer handle. Cloning is cheap — it's a reference to the
/// process-wide singleton, not a fresh encoder.
#[derive(Debug, Clone, Copy)]
pub struct Tokenizer;

impl Tokenizer {
    /// Get (or lazily initialize) the shared tokenizer.
    ///
    /// # Errors
    ///
    /// Returns [`ChunkError::TokenizerInit`] if the `cl100k_base` vocabulary
    /// can't be constructed.
    pub fn get() -> Result<Self, ChunkError> {
        if ENCODER.get().is_none() {
            let bpe = tiktoken_rs::cl100k_base()
                .map_err(|e| ChunkError::TokenizerInit(e.to_string()))?;
            let _ = ENCODER.set(bpe);
        }
        Ok(Self)
    }

    /// Count the number of tokens `text` would encode to.
    #[must_use]
    pub fn count(self, text: &str) -> u32 {
        let bpe = ENCODER.get().expect("Tokenizer::get must be called before count");
        u32::try_from(bpe.encode_ordinary(text).len()).unwrap_or(u32::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_are_positive_for_non_empty_text() {
        let tok = Tokenizer::get().unwrap();
        assert!(tok.count("hello, world") > 0);
    }

    #[test]
    fn empty_text_counts_to_zero() {
        let tok = Tokenizer::get().unwrap();
        assert_eq!(tok.count(""), 0);
    }

    #[test]
    fn longer_text_never_counts_fewer_tokens() {
        let tok = Tokenizer::get().unwrap();
        let short = "the quick brown fox";
        let long = "the quick brown fox jumps over the lazy dog repeatedly";
        assert!(tok.count(long) >= tok.count(short));
    }
}
