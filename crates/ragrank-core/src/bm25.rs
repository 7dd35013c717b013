//! BM25 lexical scoring and the per-chunk term statistics it needs.
//!
//! Inverse document frequency is deliberately left out: collections are
//! small and change often, so only the term-frequency saturation and length
//! normalization parts of BM25 are applied.
//!
//! ```text
//!                    tf · (k1 + 1)
//! score = Σ  ─────────────────────────────────
//!        t∈q  tf + k1 · (1 − b + b · len / avg)
//! ```

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::tokenize::tokenize;

/// BM25 free parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bm25Params {
    /// Term-frequency saturation.
    pub k1: f64,
    /// Length normalization strength, `0.0..=1.0`.
    pub b: f64,
}

impl Default for Bm25Params {
    fn default() -> Self {
        Self { k1: 1.5, b: 0.75 }
    }
}

/// Token count and term frequencies of one chunk.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TermStats {
    pub length: usize,
    pub term_freqs: HashMap<String, u32>,
}

impl TermStats {
    pub fn from_text(text: &str) -> Self {
        Self::from_tokens(&tokenize(text))
    }

    pub fn from_tokens(tokens: &[String]) -> Self {
        let mut term_freqs = HashMap::new();
        for token in tokens {
            *term_freqs.entry(token.clone()).or_insert(0) += 1;
        }
        Self {
            length: tokens.len(),
            term_freqs,
        }
    }

    pub fn tf(&self, term: &str) -> u32 {
        self.term_freqs.get(term).copied().unwrap_or(0)
    }

    pub fn distinct_terms(&self) -> usize {
        self.term_freqs.len()
    }
}

/// Score a chunk given its cached stats and already-tokenized query terms.
///
/// Every term in `query_terms` contributes, so a repeated query term counts
/// once per occurrence.
pub fn score_terms(
    query_terms: &[String],
    stats: &TermStats,
    avg_chunk_length: f64,
    params: Bm25Params,
) -> f64 {
    let length_ratio = if avg_chunk_length > 0.0 {
        stats.length as f64 / avg_chunk_length
    } else {
        1.0
    };
    let norm = params.k1 * (1.0 - params.b + params.b * length_ratio);

    query_terms
        .iter()
        .map(|term| {
            let tf = stats.tf(term) as f64;
            if tf == 0.0 {
                0.0
            } else {
                tf * (params.k1 + 1.0) / (tf + norm)
            }
        })
        .sum()
}

/// Score raw chunk text against a raw query.
pub fn score(query: &str, chunk_content: &str, avg_chunk_length: f64, params: Bm25Params) -> f64 {
    score_terms(
        &tokenize(query),
        &TermStats::from_text(chunk_content),
        avg_chunk_length,
        params,
    )
}

/// Cached [`TermStats`] for every indexed chunk, plus the corpus average
/// chunk length.
#[derive(Debug, Clone, Default)]
pub struct LexicalIndex {
    entries: HashMap<String, TermStats>,
    total_length: usize,
    avg_chunk_length: f64,
}

impl LexicalIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index (or re-index) a chunk's text.
    pub fn insert(&mut self, chunk_id: impl Into<String>, text: &str) {
        let stats = TermStats::from_text(text);
        self.total_length += stats.length;
        if let Some(old) = self.entries.insert(chunk_id.into(), stats) {
            self.total_length -= old.length;
        }
        self.recompute_average();
    }

    pub fn remove(&mut self, chunk_id: &str) -> bool {
        match self.entries.remove(chunk_id) {
            Some(old) => {
                self.total_length -= old.length;
                self.recompute_average();
                true
            }
            None => false,
        }
    }

    pub fn get(&self, chunk_id: &str) -> Option<&TermStats> {
        self.entries.get(chunk_id)
    }

    /// Mean token count over indexed chunks; `0.0` when empty.
    pub fn avg_chunk_length(&self) -> f64 {
        self.avg_chunk_length
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.total_length = 0;
        self.avg_chunk_length = 0.0;
    }

    fn recompute_average(&mut self) {
        self.avg_chunk_length = if self.entries.is_empty() {
            0.0
        } else {
            self.total_length as f64 / self.entries.len() as f64
        };
    }
}
