//! # ingest-extract
//!
//! Format-specific extractors (C2): word-processor, portable-document, and
//! hypertext, each producing the ordered [`ingest_core::Block`] stream the
//! chunker consumes. [`extract`] dispatches on file extension.

pub mod docx;
pub mod error;
pub mod html;
pub mod pdf;
pub mod table;

use std::path::Path;

use ingest_core::Block;

pub use error::ExtractError;

/// Extract an ordered block stream from `path`, dispatching by extension.
///
/// # Errors
///
/// Returns [`ExtractError::InputFormat`] for an unrecognized extension, and
/// propagates whatever the format-specific extractor returns otherwise.
pub fn extract(path: &Path) -> Result<Vec<Block>, ExtractError> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or_default().to_lowercase();
    match ext.as_str() {
        "docx" => docx::extract(path),
        "pdf" => pdf::extract(path),
        "html" | "htm" => html::extract(path),
        _ => Err(ExtractError::InputFormat(path.to_path_buf())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_extension_is_input_format_error() {
        let path = std::path::Path::new("/tmp/does-not-matter.txt");
        match extract(path) {
            Err(ExtractError::InputFormat(_)) => {}
            other => panic!("expected InputFormat error, got {other:?}"),
        }
    }
}
