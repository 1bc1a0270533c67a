//! High-level API for the loom record store.
//!
//! Two entry points:
//!
//! - [`Loom`] — one store: branches, records, materialized cells,
//!   subscriptions, checkpoints, statistics. Consumers treat this
//!   surface as the only way to observe or mutate state.
//! - [`Weave`] — a flat, path-keyed registry of embedded looms. All
//!   mutations of an embedded loom go through the weave so each level's
//!   control log receives its envelope, which is what makes
//!   [`Weave::heads`] and [`Weave::observe`] (time travel across
//!   embeddings) work.

pub mod config;
pub mod error;
pub mod loom;
pub mod query;
pub mod weave;

pub use config::LoomConfig;
pub use error::{LoomError, LoomResult};
pub use loom::{Loom, LoomStats};
pub use query::{QueryPage, QueryParams};
pub use weave::Weave;

// Re-export the vocabulary consumers need.
pub use loom_acl::AclState;
pub use loom_bus::{EventFilter, LoomEvent, OverflowPolicy, SubscriptionId};
pub use loom_gc::{CompactionReport, GcPolicy, GcReport};
pub use loom_log::{cell_push, cell_set, CheckpointPolicy, MaterializedState, ROOT_BRANCH};
pub use loom_merge::{MergeResolver, PreferLeft, PreferRight, UnionCells};
pub use loom_types::{
    Branch, BranchId, ContentHash, LoomId, LoomPath, Record, RecordDraft, RecordId, Sequence,
};
pub use loom_weave::{AccessKind, HeadsMap};
