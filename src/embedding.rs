//! Embedding abstraction and implementations.
//!
//! Defines the [`Embedder`] trait used by the bundled vector backends,
//! and two implementations:
//! - **[`HashEmbedder`]** — deterministic hashed bag-of-words vectors;
//!   fully offline, the default.
//! - **[`OpenAiEmbedder`]** — calls an OpenAI-compatible embeddings API
//!   with batching, retry, and backoff.
//!
//! Also provides pure vector utilities:
//! - [`cosine_similarity`] — similarity between two embedding vectors
//! - [`vec_to_blob`] — encode a `Vec<f32>` as little-endian bytes for
//!   BLOB storage
//! - [`blob_to_vec`] — decode a BLOB back into a `Vec<f32>`
//!
//! # Provider Selection
//!
//! Use [`create_embedder`] to instantiate the configured implementation
//! once at startup:
//!
//! ```rust,no_run
//! # use rag_indexer::config::EmbeddingConfig;
//! # use rag_indexer::embedding::create_embedder;
//! let config = EmbeddingConfig::default(); // provider = "hash"
//! let embedder = create_embedder(&config).unwrap();
//! assert_eq!(embedder.model_name(), "hashed-bow");
//! ```
//!
//! # Retry Strategy
//!
//! The OpenAI embedder uses exponential backoff for transient errors:
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors → retry
//! - Backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5)

use std::time::Duration;

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::config::EmbeddingConfig;
use crate::error::{IndexerError, Result};

/// Trait for embedding backends.
///
/// The bundled vector backends embed chunk text and query text through
/// this seam; swapping the implementation never changes storage
/// behavior.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Returns the model identifier (e.g. `"text-embedding-3-small"`).
    fn model_name(&self) -> &str;
    /// Returns the embedding vector dimensionality.
    fn dims(&self) -> usize;
    /// Embed a batch of texts, one vector per input, in input order.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

// ============ Hashing Embedder ============

/// Deterministic hashed bag-of-words embedder.
///
/// Tokenizes on non-alphanumeric boundaries, hashes each lowercased
/// token into one of `dims` buckets, and L2-normalizes the counts.
/// Texts sharing vocabulary land near each other under cosine distance,
/// which is enough for tests and small offline corpora. No I/O, no
/// model download, identical output across runs and platforms.
pub struct HashEmbedder {
    dims: usize,
}

impl HashEmbedder {
    pub const MODEL_NAME: &'static str = "hashed-bow";
    pub const DEFAULT_DIMS: usize = 256;

    pub fn new(dims: usize) -> Result<Self> {
        if dims == 0 {
            return Err(IndexerError::InvalidConfig(
                "embedding.dims must be > 0".to_string(),
            ));
        }
        Ok(Self { dims })
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self {
            dims: Self::DEFAULT_DIMS,
        }
    }
}

fn token_bucket(token: &str, dims: usize) -> usize {
    let digest = Sha256::digest(token.as_bytes());
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&digest[..8]);
    (u64::from_le_bytes(raw) % dims as u64) as usize
}

#[async_trait]
impl Embedder for HashEmbedder {
    fn model_name(&self) -> &str {
        Self::MODEL_NAME
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let vectors = texts
            .iter()
            .map(|text| {
                let mut vec = vec![0.0f32; self.dims];
                for token in text
                    .split(|c: char| !c.is_alphanumeric())
                    .filter(|t| !t.is_empty())
                {
                    vec[token_bucket(&token.to_lowercase(), self.dims)] += 1.0;
                }
                let norm = vec.iter().map(|v| v * v).sum::<f32>().sqrt();
                if norm > f32::EPSILON {
                    for v in &mut vec {
                        *v /= norm;
                    }
                }
                vec
            })
            .collect();
        Ok(vectors)
    }
}

// ============ OpenAI Embedder ============

/// Embedder calling an OpenAI-compatible `POST /v1/embeddings` endpoint.
///
/// Requires the `OPENAI_API_KEY` environment variable. Inputs are split
/// into `batch_size` batches; each batch is retried with exponential
/// backoff on rate limits, server errors, and network failures.
pub struct OpenAiEmbedder {
    model: String,
    dims: usize,
    batch_size: usize,
    max_retries: u32,
    timeout: Duration,
}

impl OpenAiEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let model = config.model.clone().ok_or_else(|| {
            IndexerError::InvalidConfig("embedding.model required for openai provider".to_string())
        })?;
        let dims = config.dims.ok_or_else(|| {
            IndexerError::InvalidConfig("embedding.dims required for openai provider".to_string())
        })?;
        if std::env::var("OPENAI_API_KEY").is_err() {
            return Err(IndexerError::InvalidConfig(
                "OPENAI_API_KEY environment variable not set".to_string(),
            ));
        }
        Ok(Self {
            model,
            dims,
            batch_size: config.batch_size.max(1),
            max_retries: config.max_retries,
            timeout: Duration::from_secs(config.timeout_secs),
        })
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| IndexerError::Backend("OPENAI_API_KEY not set".to_string()))?;

        let client = reqwest::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| IndexerError::Backend(e.to_string()))?;

        let body = serde_json::json!({
            "model": self.model,
            "input": texts,
        });

        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s, 4s, 8s, ...
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tokio::time::sleep(delay).await;
            }

            let resp = client
                .post("https://api.openai.com/v1/embeddings")
                .header("Authorization", format!("Bearer {}", api_key))
                .header("Content-Type", "application/json")
                .json(&body)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let json: serde_json::Value = response
                            .json()
                            .await
                            .map_err(|e| IndexerError::Backend(e.to_string()))?;
                        return parse_embeddings_response(&json);
                    }

                    // Rate limited or server error — retry
                    if status.as_u16() == 429 || status.is_server_error() {
                        let body_text = response.text().await.unwrap_or_default();
                        last_err = Some(IndexerError::Backend(format!(
                            "embeddings API error {}: {}",
                            status, body_text
                        )));
                        continue;
                    }

                    // Client error (not 429) — don't retry
                    let body_text = response.text().await.unwrap_or_default();
                    return Err(IndexerError::Backend(format!(
                        "embeddings API error {}: {}",
                        status, body_text
                    )));
                }
                Err(e) => {
                    last_err = Some(IndexerError::Backend(e.to_string()));
                    continue;
                }
            }
        }

        Err(last_err
            .unwrap_or_else(|| IndexerError::Backend("embedding failed after retries".to_string())))
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            out.extend(self.embed_batch(batch).await?);
        }
        Ok(out)
    }
}

/// Parse an OpenAI-style embeddings response JSON.
///
/// Extracts the `data[].embedding` arrays in order.
fn parse_embeddings_response(json: &serde_json::Value) -> Result<Vec<Vec<f32>>> {
    let data = json
        .get("data")
        .and_then(|d| d.as_array())
        .ok_or_else(|| IndexerError::Backend("invalid response: missing data array".to_string()))?;

    let mut embeddings = Vec::with_capacity(data.len());

    for item in data {
        let embedding = item
            .get("embedding")
            .and_then(|e| e.as_array())
            .ok_or_else(|| {
                IndexerError::Backend("invalid response: missing embedding".to_string())
            })?;

        let vec: Vec<f32> = embedding
            .iter()
            .map(|v| v.as_f64().unwrap_or(0.0) as f32)
            .collect();

        embeddings.push(vec);
    }

    Ok(embeddings)
}

/// Create the configured [`Embedder`] once at startup.
///
/// | Config value | Implementation |
/// |--------------|----------------|
/// | `"hash"` | [`HashEmbedder`] |
/// | `"openai"` | [`OpenAiEmbedder`] |
pub fn create_embedder(config: &EmbeddingConfig) -> Result<Box<dyn Embedder>> {
    match config.provider.as_str() {
        "hash" => Ok(Box::new(HashEmbedder::new(
            config.dims.unwrap_or(HashEmbedder::DEFAULT_DIMS),
        )?)),
        "openai" => Ok(Box::new(OpenAiEmbedder::new(config)?)),
        other => Err(IndexerError::InvalidConfig(format!(
            "unknown embedding provider: {}",
            other
        ))),
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
/// Reverses [`vec_to_blob`]: reads 4-byte little-endian `f32` values.
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

    #[tokio::test]
    async fn test_hash_embedder_deterministic() {
        let e = HashEmbedder::default();
        let texts = vec!["the quick brown fox".to_string()];
        let a = e.embed(&texts).await.unwrap();
        let b = e.embed(&texts).await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a[0].len(), HashEmbedder::DEFAULT_DIMS);
    }

    #[tokio::test]
    async fn test_hash_embedder_similar_texts_closer() {
        let e = HashEmbedder::default();
        let texts = vec![
            "rust memory safety ownership".to_string(),
            "rust ownership and memory".to_string(),
            "baking sourdough bread recipes".to_string(),
        ];
        let vecs = e.embed(&texts).await.unwrap();
        let near = cosine_similarity(&vecs[0], &vecs[1]);
        let far = cosine_similarity(&vecs[0], &vecs[2]);
        assert!(near > far, "near={} far={}", near, far);
    }

    #[tokio::test]
    async fn test_hash_embedder_empty_text_zero_vector() {
        let e = HashEmbedder::default();
        let vecs = e.embed(&["".to_string()]).await.unwrap();
        assert!(vecs[0].iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_hash_embedder_rejects_zero_dims() {
        assert!(HashEmbedder::new(0).is_err());
    }

    #[test]
    fn test_vec_blob_roundtrip() {
        let vec = vec![1.0f32, -2.5, 3.125, 0.0, -0.001];
        let blob = vec_to_blob(&vec);
        let restored = blob_to_vec(&blob);
        assert_eq!(vec, restored);
    }

    #[test]
    fn test_cosine_identical() {
        let v = vec![1.0, 2.0, 3.0];
        let sim = cosine_similarity(&v, &v);
        assert!((sim - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_orthogonal() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![0.0, 1.0, 0.0];
        assert!(cosine_similarity(&a, &b).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_empty_and_mismatched() {
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[1.0]), 0.0);
    }
}
