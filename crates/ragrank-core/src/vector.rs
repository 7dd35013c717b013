//! In-memory vector index with brute-force cosine search.
//!
//! Entries keep their insertion order, which is also the tie-break order for
//! equal similarities. The index holds no durable state; it is rebuilt from
//! the document store or a snapshot.

use std::collections::HashMap;

use crate::embedding::cosine_similarity;
use crate::error::{Result, RetrievalError};

/// A single search hit.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorHit {
    pub id: String,
    pub similarity: f32,
}

/// Fixed-dimension store of embeddings keyed by chunk id.
#[derive(Debug, Clone)]
pub struct VectorIndex {
    dims: usize,
    ids: Vec<String>,
    vectors: Vec<Vec<f32>>,
    positions: HashMap<String, usize>,
}

impl VectorIndex {
    pub fn new(dims: usize) -> Self {
        Self {
            dims,
            ids: Vec::new(),
            vectors: Vec::new(),
            positions: HashMap::new(),
        }
    }

    pub fn dims(&self) -> usize {
        self.dims
    }

    /// Insert or replace the embedding for `id`.
    ///
    /// Replacing keeps the entry's original insertion position.
    pub fn upsert(&mut self, id: impl Into<String>, embedding: Vec<f32>) -> Result<()> {
        if embedding.len() != self.dims {
            return Err(RetrievalError::DimensionMismatch {
                expected: self.dims,
                actual: embedding.len(),
            });
        }

        let id = id.into();
        match self.positions.get(&id) {
            Some(&pos) => self.vectors[pos] = embedding,
            None => {
                self.positions.insert(id.clone(), self.ids.len());
                self.ids.push(id);
                self.vectors.push(embedding);
            }
        }
        Ok(())
    }

    /// Remove `id`. Returns whether it was present.
    pub fn remove(&mut self, id: &str) -> bool {
        let Some(pos) = self.positions.remove(id) else {
            return false;
        };
        self.ids.remove(pos);
        self.vectors.remove(pos);
        for (offset, shifted) in self.ids[pos..].iter().enumerate() {
            self.positions.insert(shifted.clone(), pos + offset);
        }
        true
    }

    /// The `top_k` most similar entries, best first, ties in insertion order.
    pub fn search(&self, query: &[f32], top_k: usize) -> Vec<VectorHit> {
        let mut hits: Vec<VectorHit> = self
            .ids
            .iter()
            .zip(self.vectors.iter())
            .map(|(id, v)| VectorHit {
                id: id.clone(),
                similarity: cosine_similarity(query, v),
            })
            .collect();

        // sort_by is stable, so equal similarities keep insertion order.
        hits.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(top_k);
        hits
    }

    pub fn get(&self, id: &str) -> Option<&[f32]> {
        self.positions.get(id).map(|&pos| self.vectors[pos].as_slice())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.positions.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn clear(&mut self) {
        self.ids.clear();
        self.vectors.clear();
        self.positions.clear();
    }
}
