//! Snapshot persistence between CLI invocations.
//!
//! The index lives in memory; between runs it is stored as an
//! [`IndexSnapshot`] JSON file at `[index].snapshot_path`. Writes go to a
//! sibling temp file first and are renamed into place.

use anyhow::{Context, Result};
use ragrank_core::{HashEmbedder, IndexSnapshot, RetrievalIndex};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use crate::config::Config;

/// Read the snapshot at `path`, or `None` if there is none yet.
pub fn load_snapshot(path: &Path) -> Result<Option<IndexSnapshot>> {
    if !path.exists() {
        return Ok(None);
    }
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read index snapshot: {}", path.display()))?;
    let snapshot = IndexSnapshot::from_json(&json)
        .with_context(|| format!("Failed to decode index snapshot: {}", path.display()))?;
    Ok(Some(snapshot))
}

pub fn save_snapshot(path: &Path, snapshot: &IndexSnapshot) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
    }

    let json = snapshot.to_json()?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, json)
        .with_context(|| format!("Failed to write index snapshot: {}", tmp.display()))?;
    std::fs::rename(&tmp, path)
        .with_context(|| format!("Failed to replace index snapshot: {}", path.display()))?;

    info!(
        path = %path.display(),
        documents = snapshot.document_count(),
        chunks = snapshot.chunk_count(),
        "saved index snapshot"
    );
    Ok(())
}

/// Build the configured index, restoring the snapshot if one exists.
pub fn open_index(config: &Config) -> Result<RetrievalIndex> {
    let embedder = Arc::new(HashEmbedder::new(config.embedding.dims)?);
    let options = config.index_options();

    match load_snapshot(&config.index.snapshot_path)? {
        Some(snapshot) => {
            let (index, _) = snapshot.restore(embedder, options)?;
            Ok(index)
        }
        None => Ok(RetrievalIndex::new(embedder, options)?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragrank_core::NewDocument;

    #[test]
    fn test_save_then_open() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.index.snapshot_path = dir.path().join("nested/index.json");

        let mut index = open_index(&config).unwrap();
        assert!(index.is_empty());
        index
            .add_document(
                NewDocument::new(
                    "Persistence",
                    "Snapshots keep documents, chunk hashes, and embeddings between runs.",
                )
                .with_id("persist"),
            )
            .unwrap();
        save_snapshot(&config.index.snapshot_path, &index.snapshot()).unwrap();
        assert!(!config.index.snapshot_path.with_extension("json.tmp").exists());

        let reopened = open_index(&config).unwrap();
        assert_eq!(reopened.len(), 1);
        assert_eq!(reopened.get_document("persist"), index.get_document("persist"));
    }

    #[test]
    fn test_corrupt_snapshot_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(load_snapshot(&path).is_err());
    }
}
