//! Anti-entropy synchronization for the loom record store.
//!
//! Peers exchange branch-head maps, request missing records by branch
//! and range, and apply them idempotently: duplicate delivery is a
//! no-op, gaps are typed errors, and divergent histories are surfaced
//! rather than silently overwritten. The transport is an async trait;
//! [`LocalPeer`] wires two in-process stores together for tests and
//! embedding.

pub mod engine;
pub mod error;
pub mod transport;
pub mod types;

pub use engine::{advertise, apply, collect, diff, sync_with};
pub use error::{SyncError, SyncResult};
pub use transport::{LocalPeer, SyncPeer};
pub use types::{ApplyReport, BranchHead, HeadAdvert, RangeRequest, RecordBatch};
