//! # ingest-embed
//!
//! The embedder (C6, SPEC_FULL §4.5): turns chunk text into L2-normalized
//! vectors. Two interchangeable implementations share the [`Embedder`]
//! trait — a local `fastembed` model handle and a remote HTTP endpoint —
//! so the pipeline can be pointed at either without caring which.

pub mod error;
pub mod http;
pub mod local;

use async_trait::async_trait;

pub use error::EmbedError;
pub use http::HttpEmbedder;
pub use local::LocalEmbedder;

/// Maximum texts accepted in a single `embed` call (SPEC_FULL §6).
pub const MAX_BATCH_SIZE: usize = 256;

/// Turns chunk text into embedding vectors.
///
/// # Contract
///
/// Output order matches input order. Every vector is L2-normalized (unit
/// norm), so cosine similarity between two embeddings equals their inner
/// product. `batch_size` is clamped to [`MAX_BATCH_SIZE`]. Identical inputs
/// produce identical vectors, modulo the underlying model's own
/// determinism guarantees.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed `texts`, returning one vector per input in the same order.
    ///
    /// # Errors
    ///
    /// Returns [`EmbedError::EmptyInput`] for an empty `texts` slice, and
    /// whatever transport or inference error the backend produced
    /// otherwise.
    async fn embed(
        &self,
        texts: &[String],
        model_id: &str,
        batch_size: usize,
    ) -> Result<Vec<Vec<f32>>, EmbedError>;
}

/// Rescale `vector` to unit L2 norm in place, leaving an all-zero vector
/// untouched (its norm is already 0 and there is no direction to scale to).
pub(crate) fn l2_normalize(vector: &mut [f32]) {
    let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in vector.iter_mut() {
            *x /= norm;
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn l2_normalize_scales_to_unit_norm() {
        let mut v = vec![3.0, 4.0];
        l2_normalize(&mut v);
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-6, "norm was {norm}");
        assert_eq!(v, vec![0.6, 0.8]);
    }

    #[test]
    fn l2_normalize_leaves_zero_vector_alone() {
        let mut v = vec![0.0, 0.0];
        l2_normalize(&mut v);
        assert_eq!(v, vec![0.0, 0.0]);
    }
}
