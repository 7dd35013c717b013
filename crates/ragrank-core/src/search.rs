//! Local search over a [`RetrievalIndex`].
//!
//! # Search Flow
//!
//! 1. Reject a blank query with [`RetrievalError::EmptyQuery`].
//! 2. An empty corpus returns no results (not an error).
//! 3. Score every document and apply rerank boosts (see [`crate::rank`]).
//! 4. Keep results whose relevance is strictly above `threshold`.
//! 5. Truncate to `top_k`.
//!
//! [`answer`] builds on the same flow but treats an empty corpus as an
//! error, since there is nothing to answer from.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, RetrievalError};
use crate::index::RetrievalIndex;
use crate::models::{Answer, SearchResult};
use crate::rank::{confidence, QueryTerms};

pub const DEFAULT_TOP_K: usize = 5;

/// Per-request search knobs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SearchOptions {
    /// Maximum results to return.
    pub top_k: usize,
    /// Results need relevance strictly greater than this.
    pub threshold: f64,
    /// Populate [`SearchResult::explain`].
    pub explain: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            threshold: 0.0,
            explain: false,
        }
    }
}

impl SearchOptions {
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_explain(mut self, explain: bool) -> Self {
        self.explain = explain;
        self
    }
}

/// Rank every document in `index` against `query`.
pub fn search(index: &RetrievalIndex, query: &str, options: &SearchOptions) -> Result<Vec<SearchResult>> {
    let terms = QueryTerms::parse(query);
    if terms.is_blank() {
        return Err(RetrievalError::EmptyQuery);
    }
    if index.is_empty() {
        debug!("search on empty corpus");
        return Ok(Vec::new());
    }

    let ranked = index.rank(&terms, options.explain)?;
    let scored = ranked.len();
    let mut results = filter_by_threshold(ranked, options.threshold);
    results.truncate(options.top_k);

    debug!(
        query = %terms.text,
        scored,
        returned = results.len(),
        "search complete"
    );
    Ok(results)
}

/// Drop results whose relevance is not strictly above `threshold`.
pub fn filter_by_threshold(mut results: Vec<SearchResult>, threshold: f64) -> Vec<SearchResult> {
    results.retain(|r| r.relevance > threshold);
    results
}

/// Documents that look like `document_id`, best first, excluding itself.
///
/// The target's most varied chunk (most distinct tokens, earliest on ties)
/// is used as the query text.
pub fn find_similar_documents(
    index: &RetrievalIndex,
    document_id: &str,
    limit: usize,
) -> Result<Vec<SearchResult>> {
    if !index.contains(document_id) {
        return Err(RetrievalError::not_found(document_id));
    }

    let mut probe = None;
    let mut most_distinct = 0;
    for chunk in index.chunks(document_id) {
        let distinct = index
            .lexical_index()
            .get(&chunk.id)
            .map_or(0, |stats| stats.distinct_terms());
        if probe.is_none() || distinct > most_distinct {
            probe = Some(chunk);
            most_distinct = distinct;
        }
    }
    let Some(probe) = probe else {
        return Ok(Vec::new());
    };

    let terms = QueryTerms::parse(&probe.content);
    let mut results: Vec<SearchResult> = index
        .rank(&terms, false)?
        .into_iter()
        .filter(|r| r.document_id != document_id && r.relevance > 0.0)
        .collect();
    results.truncate(limit);

    debug!(document_id, probe = %probe.id, returned = results.len(), "similar documents");
    Ok(results)
}

/// Local answer: the top sources for `question` plus a confidence value.
pub fn answer(index: &RetrievalIndex, question: &str, options: &SearchOptions) -> Result<Answer> {
    if question.trim().is_empty() {
        return Err(RetrievalError::EmptyQuery);
    }
    if index.is_empty() {
        return Err(RetrievalError::EmptyCorpus);
    }
    let sources = search(index, question, options)?;
    Ok(Answer {
        question: question.to_string(),
        confidence: confidence(&sources),
        sources,
    })
}
