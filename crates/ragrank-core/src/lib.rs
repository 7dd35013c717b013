//! # ragrank core
//!
//! Runtime-free retrieval engine: data models, tokenizer, chunking, BM25,
//! vector index, hybrid ranking, and snapshots.
//!
//! This crate has no async runtime, network, or filesystem dependencies.
//! The `ragrank` application crate layers configuration, ingestion
//! workers, LLM reranking, and persistence on top of it.
//!
//! # Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`error`] | [`RetrievalError`] and the crate [`Result`] alias |
//! | [`models`] | Documents, chunks, search results, answers |
//! | [`tokenize`] | Lower-cased word tokens used by every scorer |
//! | [`chunk`] | Overlapping word-window chunker |
//! | [`embedding`] | [`EmbeddingProvider`] trait and the placeholder embedder |
//! | [`vector`] | Brute-force cosine vector index |
//! | [`bm25`] | BM25 scoring and per-chunk term statistics |
//! | [`rank`] | Hybrid scoring, rerank boosts, relevance, confidence |
//! | [`store`] | Document and chunk ownership |
//! | [`index`] | [`RetrievalIndex`], the handle tying it all together |
//! | [`search`] | Search, similar documents, local answers |
//! | [`snapshot`] | Serializable index image |
//!
//! # Example
//!
//! ```rust
//! use ragrank_core::{NewDocument, RetrievalIndex, SearchOptions};
//!
//! let mut index = RetrievalIndex::with_defaults();
//! index
//!     .add_document(NewDocument::new(
//!         "Tokio",
//!         "Tokio is an asynchronous runtime for the Rust programming language.",
//!     ))
//!     .unwrap();
//!
//! let results = index.search("rust runtime", &SearchOptions::default()).unwrap();
//! assert_eq!(results[0].title, "Tokio");
//! ```

pub mod bm25;
pub mod chunk;
pub mod embedding;
pub mod error;
pub mod index;
pub mod models;
pub mod rank;
pub mod search;
pub mod snapshot;
pub mod store;
pub mod tokenize;
pub mod vector;

pub use bm25::Bm25Params;
pub use chunk::ChunkOptions;
pub use embedding::{EmbeddingProvider, HashEmbedder};
pub use error::{Result, RetrievalError};
pub use index::{DocumentPreparer, IndexOptions, PreparedDocument, RetrievalIndex};
pub use models::{Answer, Chunk, Document, Metadata, NewDocument, ScoreExplanation, SearchResult};
pub use rank::{RankingParams, SemanticSignal};
pub use search::SearchOptions;
pub use snapshot::IndexSnapshot;
