use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChunkError {
    #[error("failed to initialize tokenizer: {0}")]
    TokenizerInit(String),

    #[error("no non-empty blocks to chunk")]
    EmptyInput,
}
