use loom_types::Sequence;

/// Errors produced by synchronization.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyncError {
    #[error("missing range on branch {branch}: expected seq {expected}, got {got}")]
    MissingRange {
        branch: String,
        expected: Sequence,
        got: Sequence,
    },

    #[error("branch {branch} diverged at seq {seq}")]
    Diverged { branch: String, seq: Sequence },

    #[error("cannot resolve branch {0} (parent chain unavailable)")]
    UnresolvedBranch(String),

    #[error("log error: {0}")]
    Log(#[from] loom_log::LogError),

    #[error("transport error: {0}")]
    Transport(String),
}

/// Result type for synchronization.
pub type SyncResult<T> = Result<T, SyncError>;
