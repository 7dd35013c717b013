//! Async retrieval service.
//!
//! [`RetrievalService`] owns one [`RetrievalIndex`] behind a
//! `tokio::sync::RwLock`. Searches hold the read lock only while ranking
//! locally and release it before any selector call. Writers commit fully
//! prepared documents, so readers never observe a half-indexed document.
//!
//! # Search with a selector
//!
//! 1. Rank locally and take the top `max_candidates`.
//! 2. Ask the [`DocumentSelector`] which of them to keep, under a timeout.
//! 3. On a valid reply, keep the selected entries in local score order and
//!    truncate to `top_k`.
//! 4. On timeout, transport error, or an invalid reply, log a warning and
//!    return the local ranking unchanged.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use ragrank_core::rank::confidence;
use ragrank_core::{
    Answer, Chunk, Document, IndexSnapshot, NewDocument, Result, RetrievalError, RetrievalIndex,
    SearchOptions, SearchResult,
};
use serde::Serialize;
use tokio::sync::{RwLock, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::persist;
use crate::selector::{create_selector, parse_selection, DocumentSelector, SelectionCandidate};

/// Tuning for [`RetrievalService`].
#[derive(Debug, Clone, Copy)]
pub struct ServiceOptions {
    /// Concurrent document preparations during batch ingestion.
    pub workers: usize,
    pub selector_timeout: Duration,
    /// Local results offered to the selector.
    pub max_candidates: usize,
}

impl Default for ServiceOptions {
    fn default() -> Self {
        Self {
            workers: 4,
            selector_timeout: Duration::from_secs(10),
            max_candidates: 20,
        }
    }
}

impl ServiceOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            workers: config.ingest.workers,
            selector_timeout: Duration::from_secs(config.reranker.timeout_secs),
            max_candidates: config.reranker.max_candidates,
        }
    }
}

/// Outcome of [`RetrievalService::ingest_batch`].
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Ids of indexed documents, in input order.
    pub indexed: Vec<String>,
    pub failed: Vec<BatchFailure>,
}

/// One rejected input of a batch.
#[derive(Debug)]
pub struct BatchFailure {
    /// Position in the input batch.
    pub position: usize,
    pub id: Option<String>,
    pub error: RetrievalError,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexStats {
    pub documents: usize,
    pub chunks: usize,
    pub vectors: usize,
    pub avg_chunk_length: f64,
    pub model: String,
    pub dims: usize,
}

pub struct RetrievalService {
    index: Arc<RwLock<RetrievalIndex>>,
    selector: Option<Arc<dyn DocumentSelector>>,
    options: ServiceOptions,
}

impl RetrievalService {
    pub fn new(index: RetrievalIndex, options: ServiceOptions) -> Self {
        Self {
            index: Arc::new(RwLock::new(index)),
            selector: None,
            options,
        }
    }

    /// Open the configured index (restoring its snapshot if present) and
    /// attach the configured selector.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let index = persist::open_index(config)?;
        let mut service = Self::new(index, ServiceOptions::from_config(config));
        service.selector = create_selector(&config.reranker)?;
        Ok(service)
    }

    pub fn with_selector(mut self, selector: Arc<dyn DocumentSelector>) -> Self {
        self.selector = Some(selector);
        self
    }

    pub fn index(&self) -> Arc<RwLock<RetrievalIndex>> {
        Arc::clone(&self.index)
    }

    pub async fn add_document(&self, input: NewDocument) -> Result<String> {
        let preparer = self.index.read().await.preparer();
        let prepared = preparer.prepare(input)?;
        self.index.write().await.commit(prepared)
    }

    /// Prepare documents on a bounded worker pool, then commit them in
    /// input order. Invalid items are reported, not fatal. A repeated id
    /// keeps its first indexed occurrence; later ones are reported as failures.
    pub async fn ingest_batch(&self, inputs: Vec<NewDocument>) -> BatchReport {
        let total = inputs.len();
        let preparer = self.index.read().await.preparer();
        let semaphore = Arc::new(Semaphore::new(self.options.workers.max(1)));
        let mut set = JoinSet::new();

        for (position, input) in inputs.into_iter().enumerate() {
            let semaphore = Arc::clone(&semaphore);
            let preparer = preparer.clone();
            set.spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                let id = input.id.clone();
                let prepared = tokio::task::spawn_blocking(move || preparer.prepare(input))
                    .await
                    .unwrap_or_else(|e| {
                        Err(RetrievalError::external(format!("ingestion worker failed: {e}")))
                    });
                (position, id, prepared)
            });
        }

        let mut slots = Vec::with_capacity(total);
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(slot) => slots.push(slot),
                Err(e) => warn!(error = %e, "ingestion task failed"),
            }
        }
        slots.sort_by_key(|(position, _, _)| *position);

        let mut report = BatchReport::default();
        let mut seen: HashSet<String> = HashSet::new();
        let mut index = self.index.write().await;
        for (position, id, prepared) in slots {
            let prepared = match &id {
                Some(doc_id) if seen.contains(doc_id) => {
                    Err(RetrievalError::Validation {
                        violations: vec![format!("duplicate id in batch: {doc_id}")],
                    })
                }
                _ => prepared,
            };
            match prepared.and_then(|p| index.commit(p)) {
                Ok(doc_id) => {
                    seen.insert(doc_id.clone());
                    report.indexed.push(doc_id);
                }
                Err(error) => {
                    debug!(position, id = ?id, error = %error, "rejected batch item");
                    report.failed.push(BatchFailure {
                        position,
                        id,
                        error,
                    });
                }
            }
        }

        info!(
            total,
            indexed = report.indexed.len(),
            failed = report.failed.len(),
            "batch ingestion complete"
        );
        report
    }

    pub async fn update_document(&self, id: &str, input: NewDocument) -> Result<String> {
        let preparer = self.index.read().await.preparer();
        let prepared = preparer.prepare(input.with_id(id))?;
        let mut index = self.index.write().await;
        if !index.contains(id) {
            return Err(RetrievalError::not_found(id));
        }
        index.commit(prepared)
    }

    pub async fn remove_document(&self, id: &str) -> Result<Document> {
        self.index.write().await.remove_document(id)
    }

    pub async fn reindex(&self) -> Result<usize> {
        self.index.write().await.reindex()
    }

    pub async fn get_document(&self, id: &str) -> Option<(Document, Vec<Chunk>)> {
        let index = self.index.read().await;
        let document = index.get_document(id)?.clone();
        Some((document, index.chunks(id).to_vec()))
    }

    /// Local search, refined by the selector when one is attached.
    pub async fn search(&self, query: &str, options: &SearchOptions) -> Result<Vec<SearchResult>> {
        let Some(selector) = &self.selector else {
            return self.index.read().await.search(query, options);
        };

        let pool = options.top_k.max(self.options.max_candidates);
        let mut local = self
            .index
            .read()
            .await
            .search(query, &options.with_top_k(pool))?;
        if local.is_empty() {
            return Ok(local);
        }

        match self.select(selector.as_ref(), query, &local).await {
            Ok(ids) => {
                let chosen: HashSet<String> = ids.into_iter().collect();
                local.retain(|r| chosen.contains(&r.document_id));
                local.truncate(options.top_k);
                debug!(selector = selector.name(), kept = local.len(), "applied document selection");
            }
            Err(error) => {
                warn!(selector = selector.name(), error = %error, "document selection failed; using local ranking");
                local.truncate(options.top_k);
            }
        }
        Ok(local)
    }

    async fn select(
        &self,
        selector: &dyn DocumentSelector,
        query: &str,
        ranked: &[SearchResult],
    ) -> Result<Vec<String>> {
        let candidates: Vec<SelectionCandidate> = ranked
            .iter()
            .take(self.options.max_candidates)
            .map(SelectionCandidate::from_result)
            .collect();
        let known: Vec<&str> = candidates.iter().map(|c| c.id.as_str()).collect();

        let raw = tokio::time::timeout(
            self.options.selector_timeout,
            selector.select(query, &candidates),
        )
        .await
        .map_err(|_| {
            RetrievalError::external(format!(
                "selector timed out after {:?}",
                self.options.selector_timeout
            ))
        })??;

        parse_selection(&raw, &known)
    }

    pub async fn find_similar_documents(&self, id: &str, limit: usize) -> Result<Vec<SearchResult>> {
        self.index.read().await.find_similar_documents(id, limit)
    }

    /// Sources for `question` with a confidence value.
    pub async fn answer(&self, question: &str, options: &SearchOptions) -> Result<Answer> {
        if question.trim().is_empty() {
            return Err(RetrievalError::EmptyQuery);
        }
        if self.index.read().await.is_empty() {
            return Err(RetrievalError::EmptyCorpus);
        }
        let sources = self.search(question, options).await?;
        Ok(Answer {
            question: question.to_string(),
            confidence: confidence(&sources),
            sources,
        })
    }

    pub async fn snapshot(&self) -> IndexSnapshot {
        self.index.read().await.snapshot()
    }

    pub async fn stats(&self) -> IndexStats {
        let index = self.index.read().await;
        IndexStats {
            documents: index.len(),
            chunks: index.chunk_count(),
            vectors: index.vector_index().len(),
            avg_chunk_length: index.avg_chunk_length(),
            model: index.embedder().model_name().to_string(),
            dims: index.embedder().dims(),
        }
    }
}
