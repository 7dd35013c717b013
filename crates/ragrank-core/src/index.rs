//! The retrieval index: one explicit handle over a document store, its
//! vector index, and its lexical index.
//!
//! Several independent [`RetrievalIndex`] values can coexist (one per
//! tenant, per test, ...). Mutations go through [`RetrievalIndex::commit`],
//! which validates a fully [`PreparedDocument`] before touching any of the
//! three structures, so a failed add leaves the index unchanged.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::bm25::LexicalIndex;
use crate::chunk::{chunk_document, ChunkOptions};
use crate::embedding::{cosine_similarity, EmbeddingProvider, HashEmbedder};
use crate::error::{Result, RetrievalError};
use crate::models::{Answer, Chunk, Document, NewDocument, SearchResult};
use crate::rank::{ChunkCandidate, DocumentCandidate, HybridRanker, QueryTerms, RankingParams, SemanticSignal};
use crate::search::{self, SearchOptions};
use crate::snapshot::IndexSnapshot;
use crate::store::DocumentStore;
use crate::vector::VectorIndex;

/// Chunking and ranking configuration for an index.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct IndexOptions {
    pub chunking: ChunkOptions,
    pub ranking: RankingParams,
}

impl IndexOptions {
    pub fn validate(&self) -> Result<()> {
        self.chunking.validate()?;
        self.ranking.validate()
    }
}

/// A validated, chunked, and embedded document ready to be committed.
#[derive(Debug, Clone)]
pub struct PreparedDocument {
    pub(crate) document: Document,
    pub(crate) chunks: Vec<Chunk>,
    pub(crate) embeddings: Vec<Vec<f32>>,
}

impl PreparedDocument {
    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }
}

/// Turns ingestion input into [`PreparedDocument`]s.
///
/// Cheap to clone and `Send`, so batch ingestion can prepare documents on
/// worker threads while the index itself stays behind one writer.
#[derive(Clone)]
pub struct DocumentPreparer {
    embedder: Arc<dyn EmbeddingProvider>,
    chunking: ChunkOptions,
}

impl DocumentPreparer {
    /// Validate `input`, assign an id if it has none, then chunk and embed.
    pub fn prepare(&self, input: NewDocument) -> Result<PreparedDocument> {
        input.validate()?;
        let document = Document {
            id: input.id.unwrap_or_else(|| Uuid::new_v4().to_string()),
            title: input.title,
            content: input.content,
            metadata: input.metadata,
            created_at: Utc::now(),
        };
        self.prepare_document(document)
    }

    /// Chunk and embed an already-built document.
    pub fn prepare_document(&self, document: Document) -> Result<PreparedDocument> {
        let chunks = chunk_document(&document.id, &document.content, self.chunking)?;
        let texts: Vec<&str> = chunks.iter().map(|c| c.content.as_str()).collect();
        let embeddings = self.embedder.embed_batch(&texts)?;
        Ok(PreparedDocument {
            document,
            chunks,
            embeddings,
        })
    }
}

/// In-memory hybrid retrieval index.
pub struct RetrievalIndex {
    embedder: Arc<dyn EmbeddingProvider>,
    options: IndexOptions,
    ranker: HybridRanker,
    store: DocumentStore,
    vectors: VectorIndex,
    lexical: LexicalIndex,
}

impl RetrievalIndex {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, options: IndexOptions) -> Result<Self> {
        options.validate()?;
        if embedder.dims() == 0 {
            return Err(RetrievalError::invalid_config("embedding dims must be > 0"));
        }
        Ok(Self {
            vectors: VectorIndex::new(embedder.dims()),
            ranker: HybridRanker::new(options.ranking),
            embedder,
            options,
            store: DocumentStore::new(),
            lexical: LexicalIndex::new(),
        })
    }

    /// Index with the placeholder embedder and default options.
    pub fn with_defaults() -> Self {
        let options = IndexOptions::default();
        Self {
            vectors: VectorIndex::new(crate::embedding::DEFAULT_DIMS),
            ranker: HybridRanker::new(options.ranking),
            embedder: Arc::new(HashEmbedder::default()),
            options,
            store: DocumentStore::new(),
            lexical: LexicalIndex::new(),
        }
    }

    pub fn options(&self) -> &IndexOptions {
        &self.options
    }

    pub fn embedder(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedder
    }

    pub fn preparer(&self) -> DocumentPreparer {
        DocumentPreparer {
            embedder: Arc::clone(&self.embedder),
            chunking: self.options.chunking,
        }
    }

    /// Validate, chunk, embed, and index a document. Returns its id.
    pub fn add_document(&mut self, input: NewDocument) -> Result<String> {
        let prepared = self.preparer().prepare(input)?;
        self.commit(prepared)
    }

    /// Replace an indexed document wholesale.
    pub fn update_document(&mut self, id: &str, input: NewDocument) -> Result<String> {
        if !self.store.contains(id) {
            return Err(RetrievalError::not_found(id));
        }
        self.add_document(input.with_id(id))
    }

    /// Insert a prepared document, replacing any document with the same id.
    ///
    /// Every embedding is checked against the index dimension before
    /// anything is modified.
    pub fn commit(&mut self, prepared: PreparedDocument) -> Result<String> {
        if prepared.embeddings.len() != prepared.chunks.len() {
            return Err(RetrievalError::external(format!(
                "embedding provider returned {} vectors for {} chunks",
                prepared.embeddings.len(),
                prepared.chunks.len()
            )));
        }
        let dims = self.vectors.dims();
        if let Some(bad) = prepared.embeddings.iter().find(|e| e.len() != dims) {
            return Err(RetrievalError::DimensionMismatch {
                expected: dims,
                actual: bad.len(),
            });
        }

        let PreparedDocument {
            document,
            chunks,
            embeddings,
        } = prepared;
        let id = document.id.clone();

        let stale: Vec<String> = self.store.chunks(&id).iter().map(|c| c.id.clone()).collect();
        for chunk_id in &stale {
            self.vectors.remove(chunk_id);
            self.lexical.remove(chunk_id);
        }

        for (chunk, embedding) in chunks.iter().zip(embeddings) {
            self.vectors.upsert(chunk.id.clone(), embedding)?;
            self.lexical.insert(chunk.id.clone(), &chunk.content);
        }

        debug!(
            document_id = %id,
            chunks = chunks.len(),
            replaced = !stale.is_empty(),
            "committed document"
        );
        self.store.insert(document, chunks);
        Ok(id)
    }

    /// Remove a document and all of its index entries.
    pub fn remove_document(&mut self, id: &str) -> Result<Document> {
        let (document, chunks) = self
            .store
            .remove(id)
            .ok_or_else(|| RetrievalError::not_found(id))?;
        for chunk in &chunks {
            self.vectors.remove(&chunk.id);
            self.lexical.remove(&chunk.id);
        }
        debug!(document_id = %id, chunks = chunks.len(), "removed document");
        Ok(document)
    }

    /// Re-chunk and re-embed every document. Nothing changes if any
    /// document fails to prepare. Returns the number of chunks indexed.
    pub fn reindex(&mut self) -> Result<usize> {
        let preparer = self.preparer();
        let prepared: Vec<PreparedDocument> = self
            .store
            .iter()
            .map(|(doc, _)| preparer.prepare_document(doc.clone()))
            .collect::<Result<_>>()?;

        self.clear();
        let mut total = 0;
        for p in prepared {
            total += p.chunks.len();
            self.commit(p)?;
        }
        debug!(documents = self.len(), chunks = total, "reindexed");
        Ok(total)
    }

    /// Switch chunking parameters and rebuild.
    pub fn set_chunk_options(&mut self, chunking: ChunkOptions) -> Result<usize> {
        chunking.validate()?;
        let previous = self.options.chunking;
        self.options.chunking = chunking;
        self.reindex().inspect_err(|_| self.options.chunking = previous)
    }

    pub fn clear(&mut self) {
        self.store.clear();
        self.vectors.clear();
        self.lexical.clear();
    }

    pub fn get_document(&self, id: &str) -> Option<&Document> {
        self.store.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.store.contains(id)
    }

    pub fn chunks(&self, id: &str) -> &[Chunk] {
        self.store.chunks(id)
    }

    /// Documents in insertion order.
    pub fn documents(&self) -> impl Iterator<Item = &Document> + '_ {
        self.store.iter().map(|(doc, _)| doc)
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn chunk_count(&self) -> usize {
        self.store.chunk_count()
    }

    pub fn avg_chunk_length(&self) -> f64 {
        self.lexical.avg_chunk_length()
    }

    pub fn vector_index(&self) -> &VectorIndex {
        &self.vectors
    }

    pub fn lexical_index(&self) -> &LexicalIndex {
        &self.lexical
    }

    pub fn ranker(&self) -> &HybridRanker {
        &self.ranker
    }

    /// Score and rerank every document against `query`, best first.
    pub fn rank(&self, query: &QueryTerms, explain: bool) -> Result<Vec<SearchResult>> {
        let query_embedding = match self.options.ranking.semantic_signal {
            SemanticSignal::Embedding => Some(self.embedder.embed(&query.text)?),
            SemanticSignal::Heuristic => None,
        };

        let candidates: Vec<DocumentCandidate<'_>> = self
            .store
            .iter()
            .map(|(document, chunks)| DocumentCandidate {
                document,
                chunks: chunks
                    .iter()
                    .filter_map(|chunk| {
                        let stats = self.lexical.get(&chunk.id)?;
                        let embedding_similarity = query_embedding.as_deref().map(|qv| {
                            self.vectors
                                .get(&chunk.id)
                                .map_or(0.0, |v| cosine_similarity(qv, v))
                        });
                        Some(ChunkCandidate {
                            chunk,
                            stats,
                            embedding_similarity,
                        })
                    })
                    .collect(),
            })
            .collect();

        Ok(self
            .ranker
            .rank_all(query, &candidates, self.lexical.avg_chunk_length(), explain))
    }

    /// Local search: see [`search::search`].
    pub fn search(&self, query: &str, options: &SearchOptions) -> Result<Vec<SearchResult>> {
        search::search(self, query, options)
    }

    /// Documents most similar to `document_id`: see [`search::find_similar_documents`].
    pub fn find_similar_documents(&self, document_id: &str, limit: usize) -> Result<Vec<SearchResult>> {
        search::find_similar_documents(self, document_id, limit)
    }

    /// Sources and confidence for a question: see [`search::answer`].
    pub fn answer(&self, question: &str, options: &SearchOptions) -> Result<Answer> {
        search::answer(self, question, options)
    }

    pub fn snapshot(&self) -> IndexSnapshot {
        IndexSnapshot::capture(self)
    }
}
