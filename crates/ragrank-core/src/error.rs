//! Error types for the retrieval engine.
//!
//! Every public operation in this crate returns [`Result`]. None of the
//! variants is fatal: callers can report them to the user and carry on.

/// Result type used throughout `ragrank-core`.
pub type Result<T> = std::result::Result<T, RetrievalError>;

/// Recoverable failure of a retrieval operation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RetrievalError {
    /// Ingestion input failed validation. Lists every violation found,
    /// not just the first.
    #[error("invalid document: {}", .violations.join("; "))]
    Validation { violations: Vec<String> },

    /// The search query was empty or whitespace only.
    #[error("search query is empty")]
    EmptyQuery,

    /// Nothing has been indexed yet.
    #[error("no documents have been indexed yet; add documents first")]
    EmptyCorpus,

    /// An embedding's length disagrees with the index dimension.
    #[error("embedding has dimension {actual}, index expects {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// The optional external reranking/embedding collaborator failed or
    /// produced output that did not pass validation.
    #[error("external provider failed: {message}")]
    ExternalProvider { message: String },

    /// Chunking, ranking, or embedding parameters are unusable.
    #[error("invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// No document with the given id is indexed.
    #[error("document not found: {id}")]
    NotFound { id: String },

    /// A persisted snapshot could not be decoded.
    #[error("snapshot is corrupt: {message}")]
    Snapshot { message: String },
}

impl RetrievalError {
    pub fn invalid_config<S: Into<String>>(message: S) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    pub fn external<S: Into<String>>(message: S) -> Self {
        Self::ExternalProvider {
            message: message.into(),
        }
    }

    pub fn not_found<S: Into<String>>(id: S) -> Self {
        Self::NotFound { id: id.into() }
    }

    pub fn snapshot<S: Into<String>>(message: S) -> Self {
        Self::Snapshot {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_lists_all_violations() {
        let err = RetrievalError::Validation {
            violations: vec!["title is empty".into(), "content is empty".into()],
        };
        assert_eq!(
            err.to_string(),
            "invalid document: title is empty; content is empty"
        );
    }

    #[test]
    fn test_dimension_mismatch_message() {
        let err = RetrievalError::DimensionMismatch {
            expected: 384,
            actual: 3,
        };
        assert!(err.to_string().contains("384"));
        assert!(err.to_string().contains('3'));
    }
}
