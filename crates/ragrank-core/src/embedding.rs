//! Embedding provider trait, the deterministic placeholder embedder, and
//! vector utilities.
//!
//! [`EmbeddingProvider`] is the seam where a real embedding model plugs in.
//! The shipped [`HashEmbedder`] is **not** semantic: it hashes characters
//! into buckets so that the pipeline has well-formed, reproducible vectors
//! to index. Nothing should rely on it clustering related texts.

use std::hash::Hasher;

use twox_hash::XxHash64;

use crate::error::{Result, RetrievalError};
use crate::tokenize::tokenize;

/// Default embedding dimensionality.
pub const DEFAULT_DIMS: usize = 384;

/// Trait for embedding providers.
///
/// Implementations must return vectors of exactly [`dims`](Self::dims)
/// elements, L2-normalized, or the zero vector for text with no tokens.
pub trait EmbeddingProvider: Send + Sync {
    /// Returns the model identifier (e.g. `"hash-placeholder"`).
    fn model_name(&self) -> &str;
    /// Returns the embedding vector dimensionality (e.g. `384`).
    fn dims(&self) -> usize;
    /// Embed a single text.
    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed a batch of texts, in order.
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed(t)).collect()
    }
}

/// Deterministic, non-semantic placeholder embedder.
///
/// For every character of every token, a stable xxHash of the character
/// code, its position in the token, and the token's index picks a bucket;
/// a sine of the code and position, damped by the token index, is added to
/// that bucket. The result is L2-normalized.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dims: usize,
}

impl HashEmbedder {
    pub const MODEL_NAME: &'static str = "hash-placeholder";

    pub fn new(dims: usize) -> Result<Self> {
        if dims == 0 {
            return Err(RetrievalError::invalid_config("embedding dims must be > 0"));
        }
        Ok(Self { dims })
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self {
            dims: DEFAULT_DIMS,
        }
    }
}

impl EmbeddingProvider for HashEmbedder {
    fn model_name(&self) -> &str {
        Self::MODEL_NAME
    }

    fn dims(&self) -> usize {
        self.dims
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vector = vec![0.0f32; self.dims];

        for (token_index, token) in tokenize(text).iter().enumerate() {
            let damping = 1.0 / ((token_index + 1) as f32).sqrt();
            for (position, ch) in token.chars().enumerate() {
                let code = ch as u32;
                let bucket = bucket_for(code, position, token_index, self.dims);
                let phase = code as f32 * (position + 1) as f32 * 0.01;
                vector[bucket] += (phase.sin() + 1.0) * damping;
            }
        }

        l2_normalize(&mut vector);
        Ok(vector)
    }
}

fn bucket_for(code: u32, position: usize, token_index: usize, dims: usize) -> usize {
    let mut hasher = XxHash64::with_seed(0);
    hasher.write_u32(code);
    hasher.write_u64(position as u64);
    hasher.write_u64(token_index as u64);
    (hasher.finish() % dims as u64) as usize
}

/// Euclidean length of `v`.
pub fn magnitude(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Scale `v` to unit length in place. The zero vector is left unchanged.
pub fn l2_normalize(v: &mut [f32]) {
    let norm = magnitude(v);
    if norm < f32::EPSILON {
        return;
    }
    for x in v.iter_mut() {
        *x /= norm;
    }
}

/// Encode a float vector as little-endian f32 bytes.
///
/// # Example
///
/// ```rust
/// use ragrank_core::embedding::{vec_to_blob, blob_to_vec};
///
/// let v = vec![1.0f32, -2.5, 3.125];
/// let blob = vec_to_blob(&v);
/// assert_eq!(blob.len(), 12); // 3 × 4 bytes
/// assert_eq!(blob_to_vec(&blob), v);
/// ```
pub fn vec_to_blob(vec: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vec.len() * 4);
    for &v in vec {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

/// Decode little-endian f32 bytes back into a float vector.
///
/// Trailing bytes that do not form a whole `f32` are ignored.
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// Compute cosine similarity between two embedding vectors.
///
/// Returns a value in `[-1.0, 1.0]`:
/// - `1.0` = identical direction
/// - `0.0` = orthogonal (unrelated)
/// - `-1.0` = opposite direction
///
/// Returns `0.0` for empty vectors, vectors of different lengths, or when
/// either vector has zero magnitude.
///
/// # Formula
///
/// ```text
///            a · b
/// cos(θ) = ─────────
///          ‖a‖ × ‖b‖
/// ```
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

    (dot / denom).clamp(-1.0, 1.0)
}
