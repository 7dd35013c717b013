//! Document store: owns documents and their derived chunks.
//!
//! Documents live in an id-keyed arena. Chunks are stored next to their
//! parent and refer back to it by id only. Iteration follows insertion
//! order; replacing a document keeps its original position.

use std::collections::HashMap;

use crate::models::{Chunk, Document};

struct StoredDocument {
    document: Document,
    chunks: Vec<Chunk>,
}

/// In-memory owner of [`Document`]s and their [`Chunk`]s.
#[derive(Default)]
pub struct DocumentStore {
    documents: HashMap<String, StoredDocument>,
    order: Vec<String>,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or wholesale-replace a document and its chunks.
    ///
    /// Returns the previous document and chunks when replacing.
    pub fn insert(&mut self, document: Document, chunks: Vec<Chunk>) -> Option<(Document, Vec<Chunk>)> {
        let id = document.id.clone();
        let previous = self
            .documents
            .insert(id.clone(), StoredDocument { document, chunks });
        match previous {
            Some(old) => Some((old.document, old.chunks)),
            None => {
                self.order.push(id);
                None
            }
        }
    }

    pub fn remove(&mut self, id: &str) -> Option<(Document, Vec<Chunk>)> {
        let removed = self.documents.remove(id)?;
        self.order.retain(|existing| existing != id);
        Some((removed.document, removed.chunks))
    }

    pub fn get(&self, id: &str) -> Option<&Document> {
        self.documents.get(id).map(|s| &s.document)
    }

    /// Chunks of `id` in word order; empty for unknown ids.
    pub fn chunks(&self, id: &str) -> &[Chunk] {
        self.documents
            .get(id)
            .map(|s| s.chunks.as_slice())
            .unwrap_or(&[])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.documents.contains_key(id)
    }

    /// Documents with their chunks, in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&Document, &[Chunk])> + '_ {
        self.order.iter().filter_map(move |id| {
            self.documents
                .get(id)
                .map(|s| (&s.document, s.chunks.as_slice()))
        })
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn chunk_count(&self) -> usize {
        self.documents.values().map(|s| s.chunks.len()).sum()
    }

    pub fn clear(&mut self) {
        self.documents.clear();
        self.order.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn doc(id: &str, title: &str) -> Document {
        Document {
            id: id.into(),
            title: title.into(),
            content: format!("content of {id}"),
            metadata: Default::default(),
            created_at: Utc::now(),
        }
    }

    fn chunk(doc_id: &str, start: usize) -> Chunk {
        Chunk {
            id: format!("{doc_id}:{start}"),
            document_id: doc_id.into(),
            content: "text".into(),
            start_index: start,
            word_count: 1,
            hash: String::new(),
        }
    }

    #[test]
    fn test_insert_get_remove() {
        let mut store = DocumentStore::new();
        assert!(store.insert(doc("a", "A"), vec![chunk("a", 0)]).is_none());
        assert_eq!(store.get("a").unwrap().title, "A");
        assert_eq!(store.chunks("a").len(), 1);
        assert_eq!(store.chunk_count(), 1);

        let (removed, chunks) = store.remove("a").unwrap();
        assert_eq!(removed.id, "a");
        assert_eq!(chunks.len(), 1);
        assert!(store.is_empty());
        assert!(store.chunks("a").is_empty());
        assert!(store.remove("a").is_none());
    }

    #[test]
    fn test_replace_keeps_position() {
        let mut store = DocumentStore::new();
        store.insert(doc("a", "A"), vec![]);
        store.insert(doc("b", "B"), vec![]);
        let (old, _) = store
            .insert(doc("a", "A2"), vec![chunk("a", 0), chunk("a", 5)])
            .unwrap();
        assert_eq!(old.title, "A");

        let order: Vec<(&str, usize)> = store
            .iter()
            .map(|(d, c)| (d.title.as_str(), c.len()))
            .collect();
        assert_eq!(order, vec![("A2", 2), ("B", 0)]);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_clear() {
        let mut store = DocumentStore::new();
        store.insert(doc("a", "A"), vec![chunk("a", 0)]);
        store.clear();
        assert!(store.is_empty());
        assert_eq!(store.chunk_count(), 0);
    }
}
