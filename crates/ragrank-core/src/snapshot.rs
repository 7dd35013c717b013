//! Serializable image of a [`RetrievalIndex`].
//!
//! A snapshot stores documents (with metadata and timestamps) and, per
//! chunk, its id, content hash, and embedding as base64 little-endian
//! `f32`s. On restore, documents are re-chunked with the target index's
//! chunking parameters. A stored embedding is reused only when the chunk id
//! and hash match and the embedder has the same model name and dimension;
//! everything else is embedded again.

use std::collections::HashMap;
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::chunk::{chunk_document, ChunkOptions};
use crate::embedding::{blob_to_vec, vec_to_blob, EmbeddingProvider};
use crate::error::{Result, RetrievalError};
use crate::index::{IndexOptions, PreparedDocument, RetrievalIndex};
use crate::models::Document;

pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexSnapshot {
    pub version: u32,
    /// Embedding model that produced the stored vectors.
    pub model: String,
    pub dims: usize,
    pub chunking: ChunkOptions,
    pub documents: Vec<SnapshotDocument>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotDocument {
    pub document: Document,
    pub chunks: Vec<SnapshotChunk>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotChunk {
    pub id: String,
    pub hash: String,
    pub embedding: String,
}

/// Counts reported by [`IndexSnapshot::restore`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RestoreStats {
    pub documents: usize,
    pub reused_embeddings: usize,
    pub computed_embeddings: usize,
}

impl IndexSnapshot {
    /// Capture every document, chunk hash, and embedding in `index`.
    pub fn capture(index: &RetrievalIndex) -> Self {
        let vectors = index.vector_index();
        let documents = index
            .documents()
            .map(|document| SnapshotDocument {
                document: document.clone(),
                chunks: index
                    .chunks(&document.id)
                    .iter()
                    .map(|chunk| SnapshotChunk {
                        id: chunk.id.clone(),
                        hash: chunk.hash.clone(),
                        embedding: vectors.get(&chunk.id).map(encode_embedding).unwrap_or_default(),
                    })
                    .collect(),
            })
            .collect();

        Self {
            version: SNAPSHOT_VERSION,
            model: index.embedder().model_name().to_string(),
            dims: index.embedder().dims(),
            chunking: index.options().chunking,
            documents,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| RetrievalError::snapshot(e.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let snapshot: Self =
            serde_json::from_str(json).map_err(|e| RetrievalError::snapshot(e.to_string()))?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(RetrievalError::snapshot(format!(
                "unsupported snapshot version {} (expected {})",
                snapshot.version, SNAPSHOT_VERSION
            )));
        }
        Ok(snapshot)
    }

    pub fn document_count(&self) -> usize {
        self.documents.len()
    }

    pub fn chunk_count(&self) -> usize {
        self.documents.iter().map(|d| d.chunks.len()).sum()
    }

    /// Rebuild an index from this snapshot using `options`.
    ///
    /// Changing the chunking parameters changes chunk ids and hashes, so
    /// affected chunks are embedded again.
    pub fn restore(
        &self,
        embedder: Arc<dyn EmbeddingProvider>,
        options: IndexOptions,
    ) -> Result<(RetrievalIndex, RestoreStats)> {
        let mut index = RetrievalIndex::new(Arc::clone(&embedder), options)?;
        let same_model = self.model == embedder.model_name() && self.dims == embedder.dims();
        let mut stats = RestoreStats::default();

        for stored in &self.documents {
            let document = stored.document.clone();
            let chunks = chunk_document(&document.id, &document.content, options.chunking)?;
            let saved: HashMap<&str, &SnapshotChunk> =
                stored.chunks.iter().map(|c| (c.id.as_str(), c)).collect();

            let mut embeddings = Vec::with_capacity(chunks.len());
            for chunk in &chunks {
                let reusable = saved
                    .get(chunk.id.as_str())
                    .filter(|s| same_model && s.hash == chunk.hash)
                    .map(|s| decode_embedding(&s.embedding))
                    .transpose()?
                    .filter(|v| v.len() == self.dims);
                match reusable {
                    Some(v) => {
                        stats.reused_embeddings += 1;
                        embeddings.push(v);
                    }
                    None => {
                        stats.computed_embeddings += 1;
                        embeddings.push(embedder.embed(&chunk.content)?);
                    }
                }
            }

            index.commit(PreparedDocument {
                document,
                chunks,
                embeddings,
            })?;
            stats.documents += 1;
        }

        if !same_model {
            debug!(
                snapshot_model = %self.model,
                model = embedder.model_name(),
                "embedder changed; recomputed all embeddings"
            );
        }
        info!(
            documents = stats.documents,
            reused = stats.reused_embeddings,
            computed = stats.computed_embeddings,
            "restored index snapshot"
        );
        Ok((index, stats))
    }
}

/// Base64 of the little-endian `f32` bytes.
pub fn encode_embedding(v: &[f32]) -> String {
    STANDARD.encode(vec_to_blob(v))
}

pub fn decode_embedding(encoded: &str) -> Result<Vec<f32>> {
    let bytes = STANDARD
        .decode(encoded)
        .map_err(|e| RetrievalError::snapshot(format!("bad embedding encoding: {e}")))?;
    if bytes.len() % 4 != 0 {
        return Err(RetrievalError::snapshot(format!(
            "embedding byte length {} is not a multiple of 4",
            bytes.len()
        )));
    }
    Ok(blob_to_vec(&bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::HashEmbedder;
    use crate::models::NewDocument;
    use crate::search::SearchOptions;

    const ML: &str = "Machine learning is a subset of artificial intelligence that learns from data.";

    fn populated() -> RetrievalIndex {
        let mut index = RetrievalIndex::with_defaults();
        index
            .add_document(
                NewDocument::new("Machine Learning", ML)
                    .with_id("ml")
                    .with_tags(["ai"])
                    .with_metadata("year", serde_json::json!(2024)),
            )
            .unwrap();
        index
            .add_document(
                NewDocument::new(
                    "Bread",
                    "Sourdough bread relies on a wild yeast starter and a long, slow fermentation.",
                )
                .with_id("bread"),
            )
            .unwrap();
        index
    }

    #[test]
    fn test_round_trip_reuses_embeddings() {
        let index = populated();
        let json = index.snapshot().to_json().unwrap();
        let snapshot = IndexSnapshot::from_json(&json).unwrap();
        assert_eq!(snapshot.document_count(), 2);
        assert_eq!(snapshot.chunk_count(), 2);

        let (restored, stats) = snapshot
            .restore(Arc::new(HashEmbedder::default()), IndexOptions::default())
            .unwrap();
        assert_eq!(stats.reused_embeddings, 2);
        assert_eq!(stats.computed_embeddings, 0);

        let original: Vec<&Document> = index.documents().collect();
        let roundtrip: Vec<&Document> = restored.documents().collect();
        assert_eq!(original, roundtrip);
        assert_eq!(
            index.vector_index().get("ml:0"),
            restored.vector_index().get("ml:0")
        );

        let opts = SearchOptions::default().with_explain(true);
        assert_eq!(
            index.search("machine learning", &opts).unwrap(),
            restored.search("machine learning", &opts).unwrap()
        );
    }

    #[test]
    fn test_model_change_recomputes() {
        let snapshot = populated().snapshot();
        let (restored, stats) = snapshot
            .restore(Arc::new(HashEmbedder::new(16).unwrap()), IndexOptions::default())
            .unwrap();
        assert_eq!(stats.reused_embeddings, 0);
        assert_eq!(stats.computed_embeddings, 2);
        assert_eq!(restored.vector_index().get("ml:0").unwrap().len(), 16);
    }

    #[test]
    fn test_hash_mismatch_recomputes() {
        let mut snapshot = populated().snapshot();
        snapshot.documents[0].chunks[0].hash = "stale".into();
        let (_, stats) = snapshot
            .restore(Arc::new(HashEmbedder::default()), IndexOptions::default())
            .unwrap();
        assert_eq!(stats.reused_embeddings, 1);
        assert_eq!(stats.computed_embeddings, 1);
    }

    #[test]
    fn test_new_chunking_recomputes() {
        let snapshot = populated().snapshot();
        let options = IndexOptions {
            chunking: ChunkOptions::new(5, 1).unwrap(),
            ..IndexOptions::default()
        };
        let (restored, stats) = snapshot
            .restore(Arc::new(HashEmbedder::default()), options)
            .unwrap();
        // 12 and 13 words: three 5-word windows each.
        assert_eq!(stats.reused_embeddings, 0);
        assert_eq!(stats.computed_embeddings, 6);
        assert_eq!(restored.options().chunking, options.chunking);
        assert_eq!(restored.len(), 2);
    }

    #[test]
    fn test_corrupt_input_rejected() {
        assert!(matches!(
            IndexSnapshot::from_json("{ not json"),
            Err(RetrievalError::Snapshot { .. })
        ));

        let mut snapshot = populated().snapshot();
        snapshot.version = 99;
        let json = snapshot.to_json().unwrap();
        assert!(matches!(
            IndexSnapshot::from_json(&json),
            Err(RetrievalError::Snapshot { .. })
        ));

        assert!(decode_embedding("!!!").is_err());
        assert!(decode_embedding(&STANDARD.encode([1u8, 2, 3])).is_err());
    }

    #[test]
    fn test_embedding_encoding() {
        let v = vec![0.5f32, -1.25, 3.0];
        assert_eq!(decode_embedding(&encode_embedding(&v)).unwrap(), v);
    }
}
