//! Merge engine for the loom record store.
//!
//! A merge joins two branch heads into a single record on a target
//! branch. The merge record's `caused_by` names both head records, so
//! the join is visible to causal reachability; the payload comes from a
//! pluggable [`MergeResolver`] given both sides' materialized states.

use loom_log::{reconstruct, BranchForest, CheckpointStore, LogError, MaterializedState, RecordLog};
use loom_store::BlobStore;
use loom_types::{Record, RecordDraft, Sequence};
use serde_json::Value;
use tracing::info;

/// Record type of a merge record.
pub const MERGE: &str = "merge";

/// Errors produced by merge operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MergeError {
    #[error("merge conflict between {left} and {right}: {reason}")]
    Conflict {
        left: String,
        right: String,
        reason: String,
    },

    #[error("cannot merge empty branch {0} (no head record)")]
    EmptyBranch(String),

    #[error("log error: {0}")]
    Log(#[from] LogError),
}

/// Result type for merge operations.
pub type MergeResult<T> = Result<T, MergeError>;

/// Decides the merged payload from both sides' materialized states.
///
/// Returning `Err` with a reason declines the merge and surfaces as
/// [`MergeError::Conflict`].
pub trait MergeResolver {
    /// Produce the merge record's payload, or decline with a reason.
    fn resolve(
        &self,
        left: &MaterializedState,
        right: &MaterializedState,
    ) -> Result<Value, String>;
}

/// Keep the left side's cells wholesale.
pub struct PreferLeft;

impl MergeResolver for PreferLeft {
    fn resolve(&self, left: &MaterializedState, _: &MaterializedState) -> Result<Value, String> {
        serde_json::to_value(left).map_err(|e| e.to_string())
    }
}

/// Keep the right side's cells wholesale.
pub struct PreferRight;

impl MergeResolver for PreferRight {
    fn resolve(&self, _: &MaterializedState, right: &MaterializedState) -> Result<Value, String> {
        serde_json::to_value(right).map_err(|e| e.to_string())
    }
}

/// Union of both sides' cells; declines when a cell differs on both
/// sides.
pub struct UnionCells;

impl MergeResolver for UnionCells {
    fn resolve(
        &self,
        left: &MaterializedState,
        right: &MaterializedState,
    ) -> Result<Value, String> {
        let mut merged = left.clone();
        for (cell, value) in &right.cells {
            match merged.cells.get(cell) {
                Some(existing) if existing != value => {
                    return Err(format!("cell {cell:?} diverged"));
                }
                _ => {
                    merged.cells.insert(cell.clone(), value.clone());
                }
            }
        }
        serde_json::to_value(&merged).map_err(|e| e.to_string())
    }
}

/// Merge `left` and `right` heads into a record on `target`.
///
/// Both sides must have a head record (their heads may be inherited
/// from an ancestor). The merge record lands on `target` like any other
/// append; emitting a control envelope for embedded looms is the
/// embedding layer's responsibility.
pub fn merge(
    forest: &BranchForest,
    log: &RecordLog,
    checkpoints: &CheckpointStore,
    blobs: &dyn BlobStore,
    target: &str,
    left: &str,
    right: &str,
    resolver: &dyn MergeResolver,
) -> MergeResult<Record> {
    let left_head = head_record(forest, log, left)?;
    let right_head = head_record(forest, log, right)?;

    let left_state = reconstruct_at_head(forest, log, checkpoints, blobs, left)?;
    let right_state = reconstruct_at_head(forest, log, checkpoints, blobs, right)?;

    let payload = resolver
        .resolve(&left_state, &right_state)
        .map_err(|reason| MergeError::Conflict {
            left: left.to_string(),
            right: right.to_string(),
            reason,
        })?;

    let draft = RecordDraft::new(MERGE, payload).caused_by([left_head.id, right_head.id]);
    let record = log.append(forest, target, draft)?;
    info!(target, left, right, seq = %record.sequence, "branches merged");
    Ok(record)
}

/// The record at a branch's head, following inherited visibility when
/// the branch has no local records.
fn head_record(forest: &BranchForest, log: &RecordLog, branch: &str) -> MergeResult<Record> {
    let meta = forest.require(branch)?;
    let mut tail = loom_log::visible_tail(forest, log, branch, meta.head, 1)?;
    tail.pop().ok_or_else(|| MergeError::EmptyBranch(branch.to_string()))
}

fn reconstruct_at_head(
    forest: &BranchForest,
    log: &RecordLog,
    checkpoints: &CheckpointStore,
    blobs: &dyn BlobStore,
    branch: &str,
) -> MergeResult<MaterializedState> {
    let meta = forest.require(branch)?;
    reconstruct(forest, log, checkpoints, blobs, branch, meta.head).map_err(MergeError::from)
}

/// A merge never targets sequence 0; helper for asserting in tests.
pub fn is_merge_record(record: &Record) -> bool {
    record.record_type == MERGE && record.sequence > Sequence::ZERO
}
