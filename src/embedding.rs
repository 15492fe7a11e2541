//! Embedding adapter and vector utilities.
//!
//! [`GeminiEmbedder`] implements [`Embedder`] over a [`GeminiClient`].
//! Empty input, or any model failure after the client's retries, returns
//! an empty vector rather than an error — the pipelines treat a missing
//! vector as data ("no embedding available"), not as a failure.
//!
//! Also provides the vector helpers used by the SQLite store:
//! - [`vec_to_blob`] — encode a `Vec<f32>` as little-endian bytes for BLOB storage
//! - [`blob_to_vec`] — decode a BLOB back into a `Vec<f32>`
//! - [`cosine_similarity`] — similarity between two embedding vectors

use async_trait::async_trait;

use crate::gemini::GeminiClient;
use crate::traits::Embedder;

/// [`Embedder`] backed by a [`GeminiClient`].
pub struct GeminiEmbedder {
    client: GeminiClient,
}

impl GeminiEmbedder {
    pub fn new(client: GeminiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Embedder for GeminiEmbedder {
    async fn embed(&self, text: &str) -> Vec<f32> {
        if text.trim().is_empty() {
            return Vec::new();
        }
        match self.client.embed(text).await {
            Ok(values) => values,
            Err(e) => {
                tracing::warn!(error = %e, "embedding failed, returning empty vector");
                Vec::new()
            }
        }
    }
}

/// Encode a float vector as a BLOB (little-endian f32 bytes).
///
/// Each `f32` is stored as 4 bytes in little-endian order, producing a
/// BLOB of `vec.len() × 4` bytes.
pub fn vec_to_blob(vec: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vec.len() * 4);
    for &v in vec {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

/// Decode a BLOB back into a float vector.
///
/// Reverses [`vec_to_blob`]: reads 4-byte little-endian `f32` values from
/// the byte slice.
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// Compute cosine similarity between two embedding vectors.
///
/// Returns a value in `[-1.0, 1.0]`; `0.0` for empty vectors or vectors
/// of different lengths.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }

    dot / denom
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GeminiConfig;

    #[test]
    fn test_vec_blob_roundtrip() {
        let vec = vec![1.0f32, -2.5, 3.125, 0.0, -0.001];
        let blob = vec_to_blob(&vec);
        assert_eq!(blob.len(), 20);
        assert_eq!(blob_to_vec(&blob), vec);
    }

    #[test]
    fn test_cosine_identical() {
        let v = vec![1.0, 2.0, 3.0];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_orthogonal() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![0.0, 1.0, 0.0];
        assert!(cosine_similarity(&a, &b).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_empty_or_mismatched() {
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[1.0]), 0.0);
    }

    /// Client pointed at a closed port: any model call fails immediately,
    /// exercising the failure arm rather than a live endpoint.
    fn unreachable_embedder() -> GeminiEmbedder {
        let config = GeminiConfig {
            api_key: Some("test-key".to_string()),
            api_base: "http://127.0.0.1:1".to_string(),
            max_retries: 0,
            timeout_secs: 1,
            ..Default::default()
        };
        GeminiEmbedder::new(GeminiClient::new(config).unwrap())
    }

    #[tokio::test]
    async fn test_empty_input_yields_empty_vector_without_model_call() {
        let embedder = unreachable_embedder();
        assert!(embedder.embed("  ").await.is_empty());
    }

    #[tokio::test]
    async fn test_model_failure_yields_empty_vector() {
        let embedder = unreachable_embedder();
        assert!(embedder.embed("fn main() {}").await.is_empty());
    }
}
