//! Core log for the loom record store.
//!
//! This crate is the heart of the loom. It provides:
//! - [`BranchForest`] — named branches with parent links and branch points
//! - [`RecordLog`] — per-branch append-only record storage with
//!   linearized appends and reverse-link indexes
//! - [`visibility`] — which records a branch sees at a sequence,
//!   combining local and inherited ancestor records
//! - [`CheckpointStore`] — ordered checkpoint index with nearest-below
//!   lookup for bounded-cost reconstruction
//! - [`projection`] — the materialized cell state folded from records,
//!   and `reconstruct` tying checkpoints and visibility together

pub mod checkpoint;
pub mod error;
pub mod forest;
pub mod log;
pub mod projection;
pub mod visibility;

pub use checkpoint::{Checkpoint, CheckpointPolicy, CheckpointStore};
pub use error::{LogError, LogResult};
pub use forest::{BranchForest, ROOT_BRANCH};
pub use log::RecordLog;
pub use projection::{
    cell_push, cell_set, reconstruct, take_checkpoint, MaterializedState, CELL_PUSH, CELL_SET,
};
pub use visibility::{delta, delta_tail, visible, visible_tail};
