use thiserror::Error;

#[derive(Debug, Error)]
pub enum EmbedError {
    #[error("no texts given to embed")]
    EmptyInput,

    #[error("unsupported embedding model id: {0}")]
    UnsupportedModel(String),

    #[error("failed to initialize embedding model: {0}")]
    ModelInit(String),

    #[error("embedding inference failed: {0}")]
    Inference(String),

    #[error("embedder transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("embedder returned an unexpected response: {0}")]
    UnexpectedResponse(String),
}
