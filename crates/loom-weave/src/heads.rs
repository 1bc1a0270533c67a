//! Head-map folding: an embedded loom's branch heads as of an outer
//! sequence.
//!
//! `Heads(loom, outerSeq)` is a fold over the control envelopes visible
//! on an outer branch up to `outerSeq`, producing the inner loom's
//! branch-name → head-sequence map at that outer time. Because
//! envelopes are ordinary records, branching the outer store freezes
//! the envelope prefix and therefore freezes every embedded loom's
//! heads — nested snapshotting needs no extra bookkeeping.
//!
//! [`HeadsIndex`] checkpoints folded maps every K envelopes so lookups
//! are a nearest-below probe plus a short local fold instead of a full
//! replay.

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use loom_log::{visible, BranchForest, RecordLog};
use loom_types::{BranchId, LoomId, Record, Sequence};
use tracing::debug;

use crate::envelope::ControlEnvelope;
use crate::error::WeaveResult;

/// Inner branch name → head sequence, as of some outer time.
pub type HeadsMap = BTreeMap<String, Sequence>;

/// Fold envelopes concerning `child` into a heads map.
pub fn fold_heads<'a>(
    records: impl IntoIterator<Item = &'a Record>,
    child: &LoomId,
) -> HeadsMap {
    let mut heads = HeadsMap::new();
    fold_into(&mut heads, records, child);
    heads
}

fn fold_into<'a>(
    heads: &mut HeadsMap,
    records: impl IntoIterator<Item = &'a Record>,
    child: &LoomId,
) {
    for record in records {
        let Some(envelope) = ControlEnvelope::maybe_from_record(record) else {
            continue;
        };
        if envelope.loom() != Some(child) {
            continue;
        }
        match envelope {
            ControlEnvelope::Append { branch, seq, .. } => {
                heads.insert(branch, seq);
            }
            ControlEnvelope::Branch { name, at, .. } => {
                heads.insert(name, at);
            }
            ControlEnvelope::Merge { into, seq, .. } => {
                heads.insert(into, seq);
            }
            ControlEnvelope::Archive { .. }
            | ControlEnvelope::AclGrant { .. }
            | ControlEnvelope::AclRevoke { .. } => {}
        }
    }
}

/// Heads of `child` as seen from `branch` at `seq`, by full fold of the
/// visible envelope prefix.
pub fn heads_at(
    forest: &BranchForest,
    log: &RecordLog,
    branch: &str,
    seq: Sequence,
    child: &LoomId,
) -> WeaveResult<HeadsMap> {
    let records = visible(forest, log, branch, seq)?;
    Ok(fold_heads(records.iter(), child))
}

/// Cadence for heads-map snapshots.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HeadsPolicy {
    /// Snapshot the folded map when the fold distance reaches this many
    /// sequences.
    pub snapshot_every: u64,
}

impl Default for HeadsPolicy {
    fn default() -> Self {
        Self { snapshot_every: 64 }
    }
}

/// Cached heads-map snapshots keyed by `(child, outer branch)`.
///
/// Snapshots are only recorded at positions inside the branch's local
/// range; queries below the branch point fall back to a full fold,
/// which stays correct after any branching topology change. Mutating
/// operations that delete envelopes (GC, compaction) must
/// [`invalidate`](HeadsIndex::invalidate) the child.
pub struct HeadsIndex {
    policy: HeadsPolicy,
    snapshots: RwLock<HashMap<(LoomId, BranchId), BTreeMap<Sequence, HeadsMap>>>,
}

impl HeadsIndex {
    /// Create an empty index with the given cadence.
    pub fn new(policy: HeadsPolicy) -> Self {
        Self {
            policy,
            snapshots: RwLock::new(HashMap::new()),
        }
    }

    /// Heads of `child` from `branch` at `seq`, via the snapshot cache.
    pub fn heads(
        &self,
        forest: &BranchForest,
        log: &RecordLog,
        branch: &str,
        seq: Sequence,
        child: &LoomId,
    ) -> WeaveResult<HeadsMap> {
        let meta = forest.require(branch)?;
        let base = meta.base();

        let snapshot = if seq > base {
            let snapshots = self.snapshots.read().expect("lock poisoned");
            snapshots.get(&(child.clone(), meta.id)).and_then(|cache| {
                cache
                    .range(..=seq)
                    .next_back()
                    .filter(|(s, _)| **s > base)
                    .map(|(s, m)| (*s, m.clone()))
            })
        } else {
            None
        };

        let (from, mut heads) = match snapshot {
            Some((snap_seq, map)) => (snap_seq, map),
            None => (Sequence::ZERO, HeadsMap::new()),
        };

        if from == Sequence::ZERO {
            // Full fold over the visible prefix.
            let records = visible(forest, log, branch, seq)?;
            fold_into(&mut heads, records.iter(), child);
        } else {
            // Snapshots sit inside the local range, so the suffix since
            // the snapshot is local to this branch.
            let suffix = log.local_range(meta.id, from, seq);
            fold_into(&mut heads, suffix.iter(), child);
        }

        if seq > base && seq.0 - from.0.max(base.0) >= self.policy.snapshot_every {
            debug!(child = %child, branch, seq = %seq, "heads snapshot recorded");
            self.snapshots
                .write()
                .expect("lock poisoned")
                .entry((child.clone(), meta.id))
                .or_default()
                .insert(seq, heads.clone());
        }

        Ok(heads)
    }

    /// Drop all snapshots for a child (its envelopes changed under us).
    pub fn invalidate(&self, child: &LoomId) {
        self.snapshots
            .write()
            .expect("lock poisoned")
            .retain(|(c, _), _| c != child);
    }

    /// Drop everything.
    pub fn clear(&self) {
        self.snapshots.write().expect("lock poisoned").clear();
    }
}

impl Default for HeadsIndex {
    fn default() -> Self {
        Self::new(HeadsPolicy::default())
    }
}
