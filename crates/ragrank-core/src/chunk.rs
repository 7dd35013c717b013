//! Overlapping word-window chunker.
//!
//! Splits document content into [`Chunk`]s of at most `chunk_size` words.
//! Consecutive chunks share exactly `overlap` words so a passage that
//! straddles a boundary is still scored intact in one of them.
//!
//! Each chunk id is derived from its parent id and start word offset, and
//! each chunk carries a SHA-256 hash of its text for staleness detection
//! when restoring snapshots.
//!
//! # Algorithm
//!
//! 1. Split the content on whitespace into words.
//! 2. Place a window of `chunk_size` words at offset 0.
//! 3. Emit the window if its text is non-empty.
//! 4. Stop once a window reaches the last word; otherwise advance by
//!    `chunk_size - overlap` words and repeat.
//!
//! For `N > overlap` words this yields `ceil((N - overlap) / (chunk_size - overlap))`
//! chunks; content shorter than `chunk_size` always yields exactly one.
//!
//! # Example
//!
//! ```rust
//! use ragrank_core::chunk::{chunk_document, ChunkOptions};
//!
//! let text = (0..1000).map(|i| format!("w{i}")).collect::<Vec<_>>().join(" ");
//! let chunks = chunk_document("doc-1", &text, ChunkOptions::default()).unwrap();
//! assert_eq!(chunks.len(), 3);
//! assert_eq!(chunks[1].start_index, 450);
//! ```

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{Result, RetrievalError};
use crate::models::Chunk;

pub const DEFAULT_CHUNK_SIZE: usize = 500;
pub const DEFAULT_OVERLAP: usize = 50;

/// Window size and overlap, both in words.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkOptions {
    pub chunk_size: usize,
    pub overlap: usize,
}

impl Default for ChunkOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_OVERLAP,
        }
    }
}

impl ChunkOptions {
    /// Build validated options.
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self> {
        let options = Self {
            chunk_size,
            overlap,
        };
        options.validate()?;
        Ok(options)
    }

    /// `overlap` must be strictly smaller than a non-zero `chunk_size`,
    /// otherwise the window would never advance.
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(RetrievalError::invalid_config("chunk_size must be > 0"));
        }
        if self.overlap >= self.chunk_size {
            return Err(RetrievalError::invalid_config(format!(
                "overlap ({}) must be smaller than chunk_size ({})",
                self.overlap, self.chunk_size
            )));
        }
        Ok(())
    }

    /// Words the window advances per step.
    pub fn step(&self) -> usize {
        self.chunk_size - self.overlap
    }
}

/// Split `content` into overlapping word windows.
///
/// # Guarantees
///
/// - No chunk exceeds `chunk_size` words.
/// - Consecutive chunks overlap by exactly `overlap` words.
/// - The chunks together cover every word of the content.
/// - Empty or whitespace-only content yields no chunks.
/// - The same input always yields the same ids, text, and hashes.
pub fn chunk_document(
    document_id: &str,
    content: &str,
    options: ChunkOptions,
) -> Result<Vec<Chunk>> {
    options.validate()?;

    let words: Vec<&str> = content.split_whitespace().collect();
    let mut chunks = Vec::new();
    let mut start = 0;

    while start < words.len() {
        let end = (start + options.chunk_size).min(words.len());
        let text = words[start..end].join(" ");
        if !text.trim().is_empty() {
            chunks.push(make_chunk(document_id, start, end - start, text));
        }
        if end == words.len() {
            break;
        }
        start += options.step();
    }

    Ok(chunks)
}

/// Deterministic chunk id for a window starting at `start_index`.
pub fn chunk_id(document_id: &str, start_index: usize) -> String {
    format!("{}:{}", document_id, start_index)
}

/// SHA-256 of `text`, hex encoded.
pub fn content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn make_chunk(document_id: &str, start_index: usize, word_count: usize, text: String) -> Chunk {
    Chunk {
        id: chunk_id(document_id, start_index),
        document_id: document_id.to_string(),
        hash: content_hash(&text),
        content: text,
        start_index,
        word_count,
    }
}
