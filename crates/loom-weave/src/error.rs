/// Errors produced by the embedding layer.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WeaveError {
    #[error("record {0} is not a control envelope")]
    NotAnEnvelope(String),

    #[error("undecodable control envelope: {0}")]
    Decode(String),

    #[error("log error: {0}")]
    Log(#[from] loom_log::LogError),
}

/// Result type for embedding operations.
pub type WeaveResult<T> = Result<T, WeaveError>;
