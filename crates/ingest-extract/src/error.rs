use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("input not found: {0}")]
    InputNotFound(PathBuf),

    #[error("unexpected file extension for {0}")]
    InputFormat(PathBuf),

    #[error("extraction produced zero non-empty blocks: {0}")]
    ExtractEmpty(PathBuf),

    #[error("malformed container: {0}")]
    Malformed(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
