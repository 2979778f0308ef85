//! Local `fastembed` model handle.
//!
//! `fastembed::TextEmbedding` is synchronous — the ONNX runtime handles its
//! own internal parallelism — so every call runs on the blocking pool via
//! `spawn_blocking`, and the loaded handle is cached per model id behind a
//! mutex so the first job pays the load cost and later jobs reuse it
//! (SPEC_FULL "process-wide caches" / "lazy model loading").

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use fastembed::{EmbeddingModel, TextEmbedding, TextInitOptions};

use crate::error::EmbedError;
use crate::{Embedder, MAX_BATCH_SIZE, l2_normalize};

/// Resolve a configured model id (a Hugging Face repo id, e.g.
/// `BAAI/bge-base-en-v1.5`) to the `fastembed` enum variant backing it.
fn resolve_model(model_id: &str) -> Result<EmbeddingModel, EmbedError> {
    match model_id {
        "BAAI/bge-small-en-v1.5" => Ok(EmbeddingModel::BGESmallENV15),
        "BAAI/bge-base-en-v1.5" => Ok(EmbeddingModel::BGEBaseENV15),
        "BAAI/bge-large-en-v1.5" => Ok(EmbeddingModel::BGELargeENV15),
        "sentence-transformers/all-MiniLM-L6-v2" => Ok(EmbeddingModel::AllMiniLML6V2),
        other => Err(EmbedError::UnsupportedModel(other.to_string())),
    }
}

fn default_cache_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")).join(".cache").join("ingest").join("fastembed")
}

/// Embedder backed by an in-process `fastembed` model.
///
/// The model map lives behind a `std::sync::Mutex` rather than a
/// `tokio::sync::Mutex`: every access happens inside `spawn_blocking`, which
/// runs on a dedicated blocking thread, so a synchronous lock never
/// contends with the async reactor.
pub struct LocalEmbedder {
    cache_dir: PathBuf,
    models: Arc<Mutex<HashMap<String, TextEmbedding>>>,
}

impl LocalEmbedder {
    #[must_use]
    pub fn new() -> Self {
        Self::with_cache_dir(default_cache_dir())
    }

    #[must_use]
    pub fn with_cache_dir(cache_dir: PathBuf) -> Self {
        Self { cache_dir, models: Arc::new(Mutex::new(HashMap::new())) }
    }
}

impl Default for LocalEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Embedder for LocalEmbedder {
    async fn embed(
        &self,
        texts: &[String],
        model_id: &str,
        batch_size: usize,
    ) -> Result<Vec<Vec<f32>>, EmbedError> {
        if texts.is_empty() {
            return Err(EmbedError::EmptyInput);
        }
        let batch_size = batch_size.clamp(1, MAX_BATCH_SIZE);
        let variant = resolve_model(model_id)?;

        let models = Arc::clone(&self.models);
        let cache_dir = self.cache_dir.clone();
        let owned_texts = texts.to_vec();
        let model_id = model_id.to_string();

        let raw = tokio::task::spawn_blocking(move || -> Result<Vec<Vec<f32>>, EmbedError> {
            let mut guard = models.lock().expect("embedding model map mutex poisoned");
            if !guard.contains_key(&model_id) {
                let opts = TextInitOptions::new(variant)
                    .with_cache_dir(cache_dir)
                    .with_show_download_progress(false);
                let handle = TextEmbedding::try_new(opts).map_err(|e| EmbedError::ModelInit(e.to_string()))?;
                tracing::info!(model_id = model_id.as_str(), "loaded local embedding model");
                guard.insert(model_id.clone(), handle);
            }
            let model = guard.get_mut(&model_id).expect("just inserted above");
            model.embed(owned_texts, Some(batch_size)).map_err(|e| EmbedError::Inference(e.to_string()))
        })
        .await
        .map_err(|e| EmbedError::Inference(format!("embedding task panicked: {e}")))??;

        let mut vectors = raw;
        for v in &mut vectors {
            l2_normalize(v);
        }
        Ok(vectors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_known_model_ids() {
        assert!(resolve_model("BAAI/bge-base-en-v1.5").is_ok());
        assert!(resolve_model("not-a-real-model").is_err());
    }
}
