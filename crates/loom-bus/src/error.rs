use crate::bus::SubscriptionId;

/// Errors produced by subscription operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BusError {
    #[error("subscription not found: {0}")]
    SubscriptionNotFound(SubscriptionId),
}

/// Result type for subscription operations.
pub type BusResult<T> = Result<T, BusError>;
