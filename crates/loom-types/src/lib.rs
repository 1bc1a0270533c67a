//! Foundation types for the loom record store.
//!
//! A *loom* is a branching, event-sourced record store: an append-only
//! causal log partitioned into named branches that form a forest. This
//! crate provides the identity, temporal, and structural types used by
//! every other loom crate.
//!
//! # Key Types
//!
//! - [`RecordId`] — UUID v7 record identifier, globally unique by
//!   construction (which is what keeps embedding ID maps trivial)
//! - [`Sequence`] — per-branch position in the log
//! - [`BranchId`] — arena key for a branch within one loom
//! - [`ContentHash`] — BLAKE3 content address for blobs and state digests
//! - [`Record`] / [`RecordDraft`] — the immutable log entry and its input
//! - [`Branch`] — branch metadata: parent link, branch point, head
//! - [`LoomPath`] — ordered loom identifiers for embedding namespaces

pub mod branch;
pub mod error;
pub mod hash;
pub mod id;
pub mod path;
pub mod record;

pub use branch::Branch;
pub use error::TypeError;
pub use hash::ContentHash;
pub use id::{BranchId, RecordId, Sequence};
pub use path::{LoomId, LoomPath};
pub use record::{Record, RecordDraft};

/// Timestamp used on records and branches (UTC).
pub type Timestamp = chrono::DateTime<chrono::Utc>;
