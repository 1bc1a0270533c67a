use loom_types::{BranchId, RecordId, Sequence};

/// Errors produced by log, forest, and reconstruction operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LogError {
    #[error("branch not found: {0}")]
    BranchNotFound(String),

    #[error("branch already exists: {0}")]
    BranchExists(String),

    #[error("invalid branch point {requested} (parent head is {parent_head})")]
    InvalidBranchPoint {
        requested: Sequence,
        parent_head: Sequence,
    },

    #[error("cannot delete protected branch {0}")]
    CannotDeleteProtected(String),

    #[error("ancestor of branch {branch} is missing (dangling parent {parent})")]
    AncestorMissing { branch: String, parent: BranchId },

    #[error("invalid sequence {requested} (head is {head})")]
    InvalidSequence { requested: Sequence, head: Sequence },

    #[error("invalid sequence range: from={from}, to={to}")]
    InvalidRange { from: Sequence, to: Sequence },

    #[error("record not found: {0}")]
    RecordNotFound(RecordId),

    #[error("state cell not found: {0}")]
    StateNotFound(String),

    #[error("append out of order: expected seq {expected}, got {got}")]
    OutOfOrder { expected: Sequence, got: Sequence },

    #[error("storage corruption: {0}")]
    Corruption(String),

    #[error("blob store error: {0}")]
    Blob(#[from] loom_store::BlobError),
}

/// Result type for log operations.
pub type LogResult<T> = Result<T, LogError>;
