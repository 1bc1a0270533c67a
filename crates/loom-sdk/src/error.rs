use loom_types::LoomPath;
use thiserror::Error;

/// Unified error for the high-level API.
#[derive(Debug, Error)]
pub enum LoomError {
    #[error("no loom embedded at {0}")]
    LoomNotFound(LoomPath),

    #[error("loom at {0} already exists")]
    LoomExists(LoomPath),

    #[error("loom at {0} is archived")]
    Archived(LoomPath),

    #[error("loom at {0} is not archived; compaction requires archival")]
    NotArchived(LoomPath),

    #[error("record not found: {0}")]
    RecordNotFound(loom_types::RecordId),

    #[error("blob not found: {0}")]
    BlobNotFound(loom_types::ContentHash),

    #[error(transparent)]
    Type(#[from] loom_types::TypeError),

    #[error(transparent)]
    Log(#[from] loom_log::LogError),

    #[error(transparent)]
    Blob(#[from] loom_store::BlobError),

    #[error(transparent)]
    Weave(#[from] loom_weave::WeaveError),

    #[error(transparent)]
    Bus(#[from] loom_bus::BusError),

    #[error(transparent)]
    Merge(#[from] loom_merge::MergeError),

    #[error(transparent)]
    Gc(#[from] loom_gc::GcError),

    #[error(transparent)]
    Acl(#[from] loom_acl::AclError),
}

/// Result type for the high-level API.
pub type LoomResult<T> = Result<T, LoomError>;
