//! Checkpoint index: materialized snapshots for bounded-cost replay.
//!
//! Checkpoints live in an ordered index keyed by `(branch, sequence)`
//! so the latest checkpoint at-or-below a sequence is an O(log c)
//! nearest-below lookup. The snapshot bytes themselves live in the blob
//! store; a checkpoint carries the blob address plus a digest of the
//! decoded state for corruption detection.

use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::RwLock;

use loom_types::{BranchId, ContentHash, Sequence};
use serde::{Deserialize, Serialize};

/// A materialized snapshot reference.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub branch: BranchId,
    pub sequence: Sequence,
    /// Digest of the decoded state, verified on reconstruction.
    pub state_digest: ContentHash,
    /// Address of the encoded state in the blob store.
    pub blob: ContentHash,
}

/// When to take checkpoints.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CheckpointPolicy {
    /// Take a checkpoint after this many appends past the last one.
    pub every: u64,
}

impl Default for CheckpointPolicy {
    fn default() -> Self {
        Self { every: 64 }
    }
}

impl CheckpointPolicy {
    /// Returns `true` if a branch at `head` with the given latest
    /// checkpoint is due for a new one.
    pub fn due(&self, head: Sequence, latest: Option<Sequence>) -> bool {
        let base = latest.unwrap_or(Sequence::ZERO);
        head.0.saturating_sub(base.0) >= self.every
    }
}

/// Ordered index of checkpoints.
pub struct CheckpointStore {
    inner: RwLock<BTreeMap<(BranchId, Sequence), Checkpoint>>,
}

impl CheckpointStore {
    /// Create an empty index.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(BTreeMap::new()),
        }
    }

    /// Record a checkpoint.
    pub fn record(&self, checkpoint: Checkpoint) {
        self.inner
            .write()
            .expect("lock poisoned")
            .insert((checkpoint.branch, checkpoint.sequence), checkpoint);
    }

    /// Latest checkpoint on `branch` with sequence ≤ `at`.
    pub fn latest_at(&self, branch: BranchId, at: Sequence) -> Option<Checkpoint> {
        let inner = self.inner.read().expect("lock poisoned");
        inner
            .range((
                Bound::Included((branch, Sequence::ZERO)),
                Bound::Included((branch, at)),
            ))
            .next_back()
            .map(|(_, cp)| *cp)
    }

    /// Latest checkpoint on `branch` with sequence in `(from, to]`.
    pub fn latest_in(&self, branch: BranchId, from: Sequence, to: Sequence) -> Option<Checkpoint> {
        if from >= to {
            return None;
        }
        let inner = self.inner.read().expect("lock poisoned");
        inner
            .range((
                Bound::Excluded((branch, from)),
                Bound::Included((branch, to)),
            ))
            .next_back()
            .map(|(_, cp)| *cp)
    }

    /// Latest checkpoint on `branch`, if any.
    pub fn latest(&self, branch: BranchId) -> Option<Checkpoint> {
        self.latest_at(branch, Sequence(u64::MAX))
    }

    /// Remove a single checkpoint. Used when a checkpoint turns out to
    /// be corrupt.
    pub fn remove(&self, branch: BranchId, sequence: Sequence) -> Option<Checkpoint> {
        self.inner
            .write()
            .expect("lock poisoned")
            .remove(&(branch, sequence))
    }

    /// Drop all checkpoints for a branch. Returns the removed entries.
    pub fn remove_branch(&self, branch: BranchId) -> Vec<Checkpoint> {
        let mut inner = self.inner.write().expect("lock poisoned");
        let keys: Vec<(BranchId, Sequence)> = inner
            .range((
                Bound::Included((branch, Sequence::ZERO)),
                Bound::Included((branch, Sequence(u64::MAX))),
            ))
            .map(|(k, _)| *k)
            .collect();
        keys.iter().filter_map(|k| inner.remove(k)).collect()
    }

    /// Drop everything but the latest checkpoint per branch (GC tier C).
    /// Returns the discarded entries.
    pub fn retain_latest_per_branch(&self) -> Vec<Checkpoint> {
        let mut inner = self.inner.write().expect("lock poisoned");
        let mut keep: BTreeMap<BranchId, Sequence> = BTreeMap::new();
        for (branch, seq) in inner.keys() {
            let entry = keep.entry(*branch).or_insert(*seq);
            if *seq > *entry {
                *entry = *seq;
            }
        }
        let doomed: Vec<(BranchId, Sequence)> = inner
            .keys()
            .filter(|(b, s)| keep.get(b) != Some(s))
            .copied()
            .collect();
        doomed.iter().filter_map(|k| inner.remove(k)).collect()
    }

    /// All checkpointed record positions, for GC pinning.
    pub fn pinned_positions(&self) -> Vec<(BranchId, Sequence)> {
        self.inner
            .read()
            .expect("lock poisoned")
            .keys()
            .copied()
            .collect()
    }

    /// Total checkpoints.
    pub fn count(&self) -> usize {
        self.inner.read().expect("lock poisoned").len()
    }
}

impl Default for CheckpointStore {
    fn default() -> Self {
        Self::new()
    }
}
