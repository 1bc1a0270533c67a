use loom_types::ContentHash;

/// Errors produced by blob storage operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BlobError {
    #[error("blob not found: {0}")]
    NotFound(ContentHash),

    #[error("blob content does not match its address: expected {expected}, got {actual}")]
    HashMismatch {
        expected: ContentHash,
        actual: ContentHash,
    },

    #[error("backend error: {0}")]
    Backend(String),
}

/// Result type for blob operations.
pub type BlobResult<T> = Result<T, BlobError>;
