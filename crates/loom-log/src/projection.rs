//! Materialized cell state and checkpointed reconstruction.
//!
//! State is a map of named *cells* folded from typed records:
//! `cell:set` replaces a cell's value, `cell:push` appends to a list
//! cell. `reconstruct` rebuilds the state a branch sees at a sequence
//! in O(log c + δ): nearest-below checkpoint lookup, blob load, digest
//! verification, then a fold of only the records past the checkpoint.

use std::collections::BTreeMap;

use loom_store::BlobStore;
use loom_types::{ContentHash, Record, RecordDraft, Sequence};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::checkpoint::{Checkpoint, CheckpointStore};
use crate::error::{LogError, LogResult};
use crate::forest::BranchForest;
use crate::log::RecordLog;
use crate::visibility::{lineage_segments, visible};

/// Record type that replaces a cell's value.
pub const CELL_SET: &str = "cell:set";
/// Record type that appends an item to a list cell.
pub const CELL_PUSH: &str = "cell:push";

/// Draft a `cell:set` record.
pub fn cell_set(cell: &str, value: Value) -> RecordDraft {
    RecordDraft::new(CELL_SET, json!({ "cell": cell, "value": value }))
}

/// Draft a `cell:push` record.
pub fn cell_push(cell: &str, item: Value) -> RecordDraft {
    RecordDraft::new(CELL_PUSH, json!({ "cell": cell, "item": item }))
}

/// Materialized state: named cells.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MaterializedState {
    pub cells: BTreeMap<String, Value>,
}

impl MaterializedState {
    /// Fold one record into the state. Non-cell records are ignored.
    pub fn apply(&mut self, record: &Record) {
        match record.record_type.as_str() {
            CELL_SET => {
                if let (Some(cell), Some(value)) = (
                    record.payload.get("cell").and_then(Value::as_str),
                    record.payload.get("value"),
                ) {
                    self.cells.insert(cell.to_string(), value.clone());
                }
            }
            CELL_PUSH => {
                if let (Some(cell), Some(item)) = (
                    record.payload.get("cell").and_then(Value::as_str),
                    record.payload.get("item"),
                ) {
                    // A push onto a non-list cell restarts the list.
                    let entry = self
                        .cells
                        .entry(cell.to_string())
                        .or_insert_with(|| Value::Array(Vec::new()));
                    match entry.as_array_mut() {
                        Some(items) => items.push(item.clone()),
                        None => *entry = Value::Array(vec![item.clone()]),
                    }
                }
            }
            _ => {}
        }
    }

    /// Fold a record sequence, in order.
    pub fn fold(records: &[Record]) -> Self {
        let mut state = Self::default();
        for record in records {
            state.apply(record);
        }
        state
    }

    /// Value of a cell.
    pub fn cell(&self, name: &str) -> Option<&Value> {
        self.cells.get(name)
    }

    /// Length of a list cell (1 for scalar cells).
    pub fn len_of(&self, name: &str) -> Option<usize> {
        self.cells
            .get(name)
            .map(|v| v.as_array().map_or(1, Vec::len))
    }

    /// Serialized form for checkpoint blobs.
    pub fn encode(&self) -> LogResult<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| LogError::Corruption(e.to_string()))
    }

    /// Decode a checkpoint blob.
    pub fn decode(bytes: &[u8]) -> LogResult<Self> {
        serde_json::from_slice(bytes)
            .map_err(|e| LogError::Corruption(format!("undecodable checkpoint state: {e}")))
    }

    /// Digest of the decoded state.
    pub fn digest(&self) -> LogResult<ContentHash> {
        Ok(ContentHash::of(&self.encode()?))
    }
}

/// Find the latest checkpoint usable for `Visible(branch, at)`.
///
/// A checkpoint on an ancestor is usable when it falls inside the
/// ancestor's clamped visible slice, since that prefix is shared with
/// the querying branch.
fn usable_checkpoint(
    forest: &BranchForest,
    checkpoints: &CheckpointStore,
    branch_name: &str,
    at: Sequence,
) -> LogResult<Option<Checkpoint>> {
    let branch = forest.require(branch_name)?;
    let segments = lineage_segments(forest, &branch, at)?;
    for segment in segments.iter().rev() {
        if let Some(cp) = checkpoints.latest_in(segment.branch, segment.from, segment.to) {
            return Ok(Some(cp));
        }
    }
    Ok(None)
}

/// Records visible to `branch` at `at` strictly after the checkpoint
/// position `(cp.branch, cp.sequence)` in causal order.
fn delta_after(
    forest: &BranchForest,
    log: &RecordLog,
    branch_name: &str,
    at: Sequence,
    cp: &Checkpoint,
) -> LogResult<Vec<Record>> {
    let branch = forest.require(branch_name)?;
    let segments = lineage_segments(forest, &branch, at)?;
    let mut out = Vec::new();
    let mut past_checkpoint = false;
    for segment in segments {
        if past_checkpoint {
            out.extend(log.local_range(segment.branch, segment.from, segment.to));
        } else if segment.branch == cp.branch {
            past_checkpoint = true;
            out.extend(log.local_range(segment.branch, cp.sequence, segment.to));
        }
    }
    Ok(out)
}

/// Reconstruct the materialized state `branch` sees at `at`.
///
/// Loads the nearest checkpoint, verifies its digest, then folds only
/// the delta. Without a checkpoint this is a full fold of the visible
/// set. A digest or decode failure is `Corruption`; the caller decides
/// whether to fall back to full replay.
pub fn reconstruct(
    forest: &BranchForest,
    log: &RecordLog,
    checkpoints: &CheckpointStore,
    blobs: &dyn BlobStore,
    branch_name: &str,
    at: Sequence,
) -> LogResult<MaterializedState> {
    let Some(cp) = usable_checkpoint(forest, checkpoints, branch_name, at)? else {
        return Ok(MaterializedState::fold(&visible(
            forest,
            log,
            branch_name,
            at,
        )?));
    };

    let bytes = blobs
        .fetch(&cp.blob)?
        .ok_or_else(|| LogError::Corruption(format!("checkpoint blob missing: {}", cp.blob)))?;
    let mut state = MaterializedState::decode(&bytes)?;
    if state.digest()? != cp.state_digest {
        return Err(LogError::Corruption(format!(
            "checkpoint digest mismatch at ({}, {})",
            cp.branch, cp.sequence
        )));
    }

    let delta = delta_after(forest, log, branch_name, at, &cp)?;
    debug!(
        branch = branch_name,
        at = %at,
        checkpoint = %cp.sequence,
        delta = delta.len(),
        "reconstructing from checkpoint"
    );
    for record in &delta {
        state.apply(record);
    }
    Ok(state)
}

/// Materialize `branch` at its head and record a checkpoint for it.
pub fn take_checkpoint(
    forest: &BranchForest,
    log: &RecordLog,
    checkpoints: &CheckpointStore,
    blobs: &dyn BlobStore,
    branch_name: &str,
) -> LogResult<Checkpoint> {
    let branch = forest.require(branch_name)?;
    let state = reconstruct(forest, log, checkpoints, blobs, branch_name, branch.head)?;
    let bytes = state.encode()?;
    let blob = blobs.store(&bytes)?;
    let checkpoint = Checkpoint {
        branch: branch.id,
        sequence: branch.head,
        state_digest: state.digest()?,
        blob,
    };
    checkpoints.record(checkpoint);
    info!(branch = branch_name, seq = %branch.head, "checkpoint taken");
    Ok(checkpoint)
}
