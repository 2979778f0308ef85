//! Remote embedder reached over the `/embed` RPC (SPEC_FULL §6).
//!
//! `model_id` is accepted for trait-level symmetry with [`crate::LocalEmbedder`]
//! but is not sent on the wire: the endpoint contract (`{texts:[...]}` ->
//! `{embeddings:[[...], ...]}`) carries no model selector, so whichever
//! model the remote service is configured with is the one that answers.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::EmbedError;
use crate::{Embedder, MAX_BATCH_SIZE, l2_normalize};

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    texts: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

/// Embedder backed by a remote HTTP endpoint.
pub struct HttpEmbedder {
    client: reqwest::Client,
    base_url: String,
}

impl HttpEmbedder {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { client: reqwest::Client::new(), base_url: base_url.into() }
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed(
        &self,
        texts: &[String],
        _model_id: &str,
        batch_size: usize,
    ) -> Result<Vec<Vec<f32>>, EmbedError> {
        if texts.is_empty() {
            return Err(EmbedError::EmptyInput);
        }
        let batch_size = batch_size.clamp(1, MAX_BATCH_SIZE);

        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(batch_size) {
            let response = self
                .client
                .post(format!("{}/embed", self.base_url))
                .json(&EmbedRequest { texts: batch })
                .send()
                .await?
                .error_for_status()?;

            let body: EmbedResponse = response.json().await?;
            if body.embeddings.len() != batch.len() {
                return Err(EmbedError::UnexpectedResponse(format!(
                    "expected {} embeddings, got {}",
                    batch.len(),
                    body.embeddings.len()
                )));
            }
            vectors.extend(body.embeddings);
        }

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
    fn embed_request_serializes_to_wire_contract() {
        let texts = vec!["hello".to_string()];
        let req = EmbedRequest { texts: &texts };
        let json = serde_json::to_string(&req).unwrap();
        assert_eq!(json, r#"{"texts":["hello"]}"#);
    }

    #[test]
    fn embed_response_deserializes_from_wire_contract() {
        let body: EmbedResponse = serde_json::from_str(r#"{"embeddings":[[0.1,0.2]]}"#).unwrap();
        assert_eq!(body.embeddings, vec![vec![0.1, 0.2]]);
    }
}
