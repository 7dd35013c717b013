//! Hybrid ranking: semantic + BM25 scoring, rerank boosts, relevance, and
//! confidence.
//!
//! # Scoring Algorithm
//!
//! 1. For every chunk compute a semantic score (the bag-of-words
//!    [`heuristic_semantic_score`] by default, or embedding cosine) and a
//!    BM25 keyword score.
//! 2. `combined = semantic_weight × semantic + keyword_weight × keyword`.
//! 3. The best chunk represents its document; documents are sorted by it.
//! 4. Rerank: multiply by the title, exact-phrase, and tag boosts that apply.
//! 5. Re-sort by the boosted score. Both sorts are stable, so ties keep
//!    corpus order.
//! 6. `relevance = min(score / relevance_scale, 1)`.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::bm25::{score_terms, Bm25Params, TermStats};
use crate::error::{Result, RetrievalError};
use crate::models::{Chunk, Document, ScoreExplanation, SearchResult};
use crate::tokenize::tokenize;

/// Which signal feeds the semantic half of the hybrid score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SemanticSignal {
    /// Token-overlap heuristic; needs no embeddings.
    #[default]
    Heuristic,
    /// Cosine similarity between query and chunk embeddings, floored at 0.
    Embedding,
}

/// Weights and boosts for [`HybridRanker`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RankingParams {
    pub semantic_weight: f64,
    pub keyword_weight: f64,
    pub title_boost: f64,
    pub exact_match_boost: f64,
    pub tag_boost: f64,
    /// Score that maps to relevance `1.0`.
    pub relevance_scale: f64,
    pub bm25: Bm25Params,
    pub semantic_signal: SemanticSignal,
}

impl Default for RankingParams {
    fn default() -> Self {
        Self {
            semantic_weight: 0.6,
            keyword_weight: 0.4,
            title_boost: 1.3,
            exact_match_boost: 1.5,
            tag_boost: 1.2,
            relevance_scale: 10.0,
            bm25: Bm25Params::default(),
            semantic_signal: SemanticSignal::Heuristic,
        }
    }
}

impl RankingParams {
    pub fn validate(&self) -> Result<()> {
        let non_negative = [
            ("semantic_weight", self.semantic_weight),
            ("keyword_weight", self.keyword_weight),
            ("title_boost", self.title_boost),
            ("exact_match_boost", self.exact_match_boost),
            ("tag_boost", self.tag_boost),
            ("k1", self.bm25.k1),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(RetrievalError::invalid_config(format!(
                    "{name} must be a non-negative number (got {value})"
                )));
            }
        }
        if !(0.0..=1.0).contains(&self.bm25.b) {
            return Err(RetrievalError::invalid_config("b must be in [0.0, 1.0]"));
        }
        if self.relevance_scale.is_nan() || self.relevance_scale <= 0.0 {
            return Err(RetrievalError::invalid_config("relevance_scale must be > 0"));
        }
        Ok(())
    }
}

/// A query normalized once and reused for every chunk.
#[derive(Debug, Clone)]
pub struct QueryTerms {
    /// Lower-cased query with whitespace collapsed, used for exact matching.
    pub text: String,
    pub tokens: Vec<String>,
    token_set: HashSet<String>,
}

impl QueryTerms {
    pub fn parse(query: &str) -> Self {
        let text = query
            .to_lowercase()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");
        let tokens = tokenize(query);
        let token_set = tokens.iter().cloned().collect();
        Self {
            text,
            tokens,
            token_set,
        }
    }

    pub fn is_blank(&self) -> bool {
        self.text.is_empty()
    }

    pub fn contains_token(&self, token: &str) -> bool {
        self.token_set.contains(token)
    }
}

/// Bag-of-words stand-in for semantic similarity.
///
/// `0.7 × (share of query tokens present in the chunk) + 0.3 × (share of
/// chunk tokens that are query tokens)`. This is token overlap, not
/// embedding similarity.
pub fn heuristic_semantic_score(query: &QueryTerms, stats: &TermStats) -> f64 {
    if query.tokens.is_empty() || stats.length == 0 {
        return 0.0;
    }

    let found = query.tokens.iter().filter(|t| stats.tf(t) > 0).count();
    let query_coverage = found as f64 / query.tokens.len() as f64;

    let matching: u32 = query.token_set.iter().map(|t| stats.tf(t)).sum();
    let chunk_coverage = matching as f64 / stats.length as f64;

    0.7 * query_coverage + 0.3 * chunk_coverage
}

/// A chunk offered to the ranker.
#[derive(Debug, Clone, Copy)]
pub struct ChunkCandidate<'a> {
    pub chunk: &'a Chunk,
    pub stats: &'a TermStats,
    /// Query/chunk embedding cosine, when the embedding signal is in use.
    pub embedding_similarity: Option<f32>,
}

/// A document and its chunks offered to the ranker.
#[derive(Debug, Clone)]
pub struct DocumentCandidate<'a> {
    pub document: &'a Document,
    pub chunks: Vec<ChunkCandidate<'a>>,
}

/// Per-chunk scores before boosting.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChunkScore {
    pub semantic: f64,
    pub keyword: f64,
    pub combined: f64,
}

/// Rerank conditions that held for a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Boosts {
    pub title: bool,
    pub exact_match: bool,
    pub tag: bool,
}

impl Boosts {
    pub fn detect(query: &QueryTerms, document: &Document, chunk: &Chunk) -> Self {
        let title = document.title.to_lowercase();
        Self {
            title: query.tokens.iter().any(|t| title.contains(t.as_str())),
            exact_match: !query.is_blank() && chunk.content.to_lowercase().contains(&query.text),
            tag: document
                .tags()
                .iter()
                .any(|tag| query.contains_token(&tag.to_lowercase())),
        }
    }

    /// Product of the boosts that fired; each applies at most once.
    pub fn factor(&self, params: &RankingParams) -> f64 {
        let mut factor = 1.0;
        if self.title {
            factor *= params.title_boost;
        }
        if self.exact_match {
            factor *= params.exact_match_boost;
        }
        if self.tag {
            factor *= params.tag_boost;
        }
        factor
    }

    pub fn reason(&self) -> Option<String> {
        let mut parts = Vec::new();
        if self.title {
            parts.push("query term in title");
        }
        if self.exact_match {
            parts.push("exact phrase match");
        }
        if self.tag {
            parts.push("matching tag");
        }
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(", "))
        }
    }
}

/// Merges semantic and lexical signals into one ranking.
#[derive(Debug, Clone, Default)]
pub struct HybridRanker {
    params: RankingParams,
}

impl HybridRanker {
    pub fn new(params: RankingParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &RankingParams {
        &self.params
    }

    pub fn score_chunk(
        &self,
        query: &QueryTerms,
        candidate: &ChunkCandidate<'_>,
        avg_chunk_length: f64,
    ) -> ChunkScore {
        let semantic = match (self.params.semantic_signal, candidate.embedding_similarity) {
            (SemanticSignal::Embedding, Some(sim)) => f64::from(sim.max(0.0)),
            _ => heuristic_semantic_score(query, candidate.stats),
        };
        let keyword = score_terms(
            &query.tokens,
            candidate.stats,
            avg_chunk_length,
            self.params.bm25,
        );
        ChunkScore {
            semantic,
            keyword,
            combined: self.params.semantic_weight * semantic + self.params.keyword_weight * keyword,
        }
    }

    pub fn relevance(&self, score: f64) -> f64 {
        (score / self.params.relevance_scale).clamp(0.0, 1.0)
    }

    /// Score, rerank, and sort every candidate document. Documents without
    /// chunks are skipped.
    pub fn rank_all(
        &self,
        query: &QueryTerms,
        candidates: &[DocumentCandidate<'_>],
        avg_chunk_length: f64,
        explain: bool,
    ) -> Vec<SearchResult> {
        struct Scored<'a> {
            document: &'a Document,
            chunk: &'a Chunk,
            score: ChunkScore,
            boosts: Boosts,
            final_score: f64,
        }

        let mut scored: Vec<Scored<'_>> = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let mut best: Option<(&Chunk, ChunkScore)> = None;
            for chunk in &candidate.chunks {
                let s = self.score_chunk(query, chunk, avg_chunk_length);
                if best.map_or(true, |(_, b)| s.combined > b.combined) {
                    best = Some((chunk.chunk, s));
                }
            }
            if let Some((chunk, score)) = best {
                scored.push(Scored {
                    document: candidate.document,
                    chunk,
                    score,
                    boosts: Boosts::default(),
                    final_score: score.combined,
                });
            }
        }

        scored.sort_by(|a, b| {
            b.score
                .combined
                .partial_cmp(&a.score.combined)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        for s in &mut scored {
            s.boosts = Boosts::detect(query, s.document, s.chunk);
            s.final_score = s.score.combined * s.boosts.factor(&self.params);
        }

        scored.sort_by(|a, b| {
            b.final_score
                .partial_cmp(&a.final_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        scored
            .into_iter()
            .map(|s| SearchResult {
                document_id: s.document.id.clone(),
                title: s.document.title.clone(),
                chunk_id: s.chunk.id.clone(),
                content: s.chunk.content.clone(),
                score: s.final_score,
                relevance: self.relevance(s.final_score),
                relevance_reason: s.boosts.reason(),
                explain: explain.then(|| ScoreExplanation {
                    semantic_score: s.score.semantic,
                    keyword_score: s.score.keyword,
                    base_score: s.score.combined,
                    boost: s.boosts.factor(&self.params),
                    title_match: s.boosts.title,
                    exact_match: s.boosts.exact_match,
                    tag_match: s.boosts.tag,
                }),
            })
            .collect()
    }

    /// [`rank_all`](Self::rank_all) truncated to `top_k`.
    pub fn rank_documents(
        &self,
        query: &str,
        candidates: &[DocumentCandidate<'_>],
        avg_chunk_length: f64,
        top_k: usize,
    ) -> Vec<SearchResult> {
        let mut results = self.rank_all(
            &QueryTerms::parse(query),
            candidates,
            avg_chunk_length,
            false,
        );
        results.truncate(top_k);
        results
    }
}

/// Aggregate trust in a set of sources:
/// `0.7 × mean relevance + 0.3 × min(count / 3, 1)`. Zero for no sources.
pub fn confidence(sources: &[SearchResult]) -> f64 {
    if sources.is_empty() {
        return 0.0;
    }
    let avg_relevance = sources.iter().map(|s| s.relevance).sum::<f64>() / sources.len() as f64;
    let coverage = (sources.len() as f64 / 3.0).min(1.0);
    0.7 * avg_relevance + 0.3 * coverage
}
