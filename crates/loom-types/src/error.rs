/// Errors produced while constructing foundation types.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TypeError {
    #[error("invalid loom identifier: {0:?}")]
    InvalidLoomId(String),

    #[error("invalid content hash: {0}")]
    InvalidHash(String),
}
