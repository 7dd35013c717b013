//! Core data models: documents, chunks, search results, and answers.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, RetrievalError};

/// Minimum accepted content length, in characters.
pub const MIN_CONTENT_CHARS: usize = 50;
/// Maximum accepted content length, in characters.
pub const MAX_CONTENT_CHARS: usize = 1_000_000;

/// Free-form document metadata. `metadata["tags"]` may hold a list of
/// strings used by the tag boost.
pub type Metadata = BTreeMap<String, serde_json::Value>;

/// A document owned by the [`DocumentStore`](crate::store::DocumentStore).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub metadata: Metadata,
    pub created_at: DateTime<Utc>,
}

impl Document {
    /// Tags from `metadata["tags"]`. Non-string entries are ignored.
    pub fn tags(&self) -> Vec<String> {
        match self.metadata.get("tags") {
            Some(serde_json::Value::Array(items)) => items
                .iter()
                .filter_map(|v| v.as_str())
                .map(str::to_string)
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Number of whitespace-separated words in the content.
    pub fn word_count(&self) -> usize {
        self.content.split_whitespace().count()
    }
}

/// Ingestion input for a document.
///
/// When `id` is `None` a UUID is assigned at indexing time; when it names an
/// indexed document, that document is replaced wholesale.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NewDocument {
    #[serde(default)]
    pub id: Option<String>,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub metadata: Metadata,
}

impl NewDocument {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: None,
            title: title.into(),
            content: content.into(),
            metadata: Metadata::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tags: Vec<serde_json::Value> = tags
            .into_iter()
            .map(|t| serde_json::Value::String(t.into()))
            .collect();
        self.metadata
            .insert("tags".to_string(), serde_json::Value::Array(tags));
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Check title and content, collecting every violation.
    pub fn validate(&self) -> Result<()> {
        let mut violations = Vec::new();

        if let Some(id) = &self.id {
            if id.trim().is_empty() {
                violations.push("id must not be blank when provided".to_string());
            }
        }
        if self.title.trim().is_empty() {
            violations.push("title must not be empty".to_string());
        }
        if self.content.trim().is_empty() {
            violations.push("content must not be empty".to_string());
        }

        let chars = self.content.chars().count();
        if chars < MIN_CONTENT_CHARS {
            violations.push(format!(
                "content must be at least {} characters (got {})",
                MIN_CONTENT_CHARS, chars
            ));
        } else if chars > MAX_CONTENT_CHARS {
            violations.push(format!(
                "content must be at most {} characters (got {})",
                MAX_CONTENT_CHARS, chars
            ));
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(RetrievalError::Validation { violations })
        }
    }
}

/// A word-window slice of a document.
///
/// Holds only the parent's id, never a copy of the parent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// `"{document_id}:{start_index}"`.
    pub id: String,
    pub document_id: String,
    pub content: String,
    /// Offset of the first word in the parent's word sequence.
    pub start_index: usize,
    pub word_count: usize,
    /// SHA-256 of `content`, hex encoded.
    pub hash: String,
}

impl Chunk {
    /// Exclusive end offset in the parent's word sequence.
    pub fn end_index(&self) -> usize {
        self.start_index + self.word_count
    }
}

/// One ranked document, represented by its best chunk.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    pub document_id: String,
    pub title: String,
    pub chunk_id: String,
    /// Text of the chunk that represents the document.
    pub content: String,
    /// Boosted hybrid score, `>= 0`.
    pub score: f64,
    /// `min(score / relevance_scale, 1)`.
    pub relevance: f64,
    /// Which rerank boosts fired, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relevance_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explain: Option<ScoreExplanation>,
}

/// Scoring breakdown for a [`SearchResult`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreExplanation {
    pub semantic_score: f64,
    pub keyword_score: f64,
    /// `semantic_weight × semantic + keyword_weight × keyword`, before boosts.
    pub base_score: f64,
    /// Product of the boosts that fired (`1.0` when none did).
    pub boost: f64,
    pub title_match: bool,
    pub exact_match: bool,
    pub tag_match: bool,
}

/// Retrieved sources for a question, handed to an answer-generating model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Answer {
    pub question: String,
    pub sources: Vec<SearchResult>,
    pub confidence: f64,
}

impl Answer {
    /// Numbered passages with citations, ready to paste into a prompt.
    pub fn context(&self) -> String {
        let mut out = String::new();
        for (i, source) in self.sources.iter().enumerate() {
            if i > 0 {
                out.push_str("\n\n");
            }
            out.push_str(&format!(
                "[{}] {} (document {})\n{}",
                i + 1,
                source.title,
                source.document_id,
                source.content
            ));
        }
        out
    }
}
