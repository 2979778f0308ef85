//! Cross-cutting error types shared by every ingestion crate.

use thiserror::Error;

/// Errors that can be raised by any ingestion crate.
///
/// Domain-specific errors (extraction, chunking, persistence) are defined in
/// their own crates and convert into this one at the orchestrator boundary.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("not found: {entity_type} {id}")]
    NotFound { entity_type: String, id: String },

    #[error("invalid state transition: {entity_type} {id} from {from} to {to}")]
    InvalidTransition {
        entity_type: String,
        id: String,
        from: String,
        to: String,
    },

    #[error("validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
