//! Garbage collection for the loom record store.
//!
//! Three tiers of reclamation:
//!
//! - **Tier A (logical)** — an archive envelope marks a loom inactive;
//!   no data is removed. That envelope is the embedding layer's job;
//!   this crate handles the destructive tiers.
//! - **Tier B (reachability)** — [`collect`] computes the live set as
//!   the closure over lineage-predecessor edges and `caused_by` edges
//!   (plus `linked_to` when the policy opts in) from the root set:
//!   branch heads, checkpointed positions, and policy pins. Everything
//!   outside the closure is deleted.
//! - **Tier C (compaction)** — [`compact`] keeps only the latest
//!   checkpoint per branch and discards historical records; safe only
//!   for archived looms, whose storage is namespace-isolated.
//!
//! Tier B is copy-on-scan: heads are snapshotted up front and any
//! branch whose head moved before the sweep is skipped, so a scan never
//! observes a half-mutated live set.

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

use loom_log::{take_checkpoint, BranchForest, CheckpointStore, LogError, RecordLog};
use loom_store::BlobStore;
use loom_types::{BranchId, RecordId, Sequence};
use tracing::{debug, info};

/// Errors produced by garbage collection.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GcError {
    #[error("log error: {0}")]
    Log(#[from] LogError),
}

/// Result type for garbage collection.
pub type GcResult<T> = Result<T, GcError>;

/// What keeps records alive.
#[derive(Clone, Debug, Default)]
pub struct GcPolicy {
    /// Follow `linked_to` edges in the reachability closure. Soft
    /// references do not pin records unless the embedder opts in.
    pub follow_linked_to: bool,
    /// Records pinned regardless of reachability.
    pub pinned: BTreeSet<RecordId>,
}

/// Outcome of a tier-B collection.
#[derive(Clone, Debug, Default)]
pub struct GcReport {
    /// Records examined.
    pub scanned: usize,
    /// Records in the live closure.
    pub live: usize,
    /// Records deleted.
    pub deleted: Vec<RecordId>,
    /// Branches skipped because their head moved during the scan.
    pub skipped_branches: Vec<BranchId>,
}

/// Outcome of a tier-C compaction.
#[derive(Clone, Debug, Default)]
pub struct CompactionReport {
    /// Historical records discarded.
    pub records_discarded: usize,
    /// Superseded checkpoints discarded.
    pub checkpoints_discarded: usize,
    /// Branches compacted.
    pub branches: usize,
}

/// A log position owned by a specific branch.
type Position = (BranchId, Sequence);

/// Resolve the owning position of `(branch, seq)`: walk toward the
/// root while the sequence falls at or below a branch's base. Returns
/// `None` when the lineage dangles or the sequence is 0.
fn resolve_position(forest: &BranchForest, branch: BranchId, seq: Sequence) -> Option<Position> {
    if seq == Sequence::ZERO {
        return None;
    }
    let mut meta = forest.get_by_id(branch)?;
    loop {
        if seq > meta.base() {
            return Some((meta.id, seq));
        }
        meta = forest.get_by_id(meta.parent?)?;
    }
}

/// Predecessor position in visible order, if any.
fn predecessor(forest: &BranchForest, position: Position) -> Option<Position> {
    let (branch, seq) = position;
    resolve_position(forest, branch, seq.prev()?)
}

/// Compute the live closure and delete everything outside it.
pub fn collect(
    forest: &BranchForest,
    log: &RecordLog,
    checkpoints: &CheckpointStore,
    policy: &GcPolicy,
) -> GcResult<GcReport> {
    // Copy-on-scan: snapshot heads before computing anything.
    let head_snapshot: HashMap<BranchId, Sequence> =
        forest.list().into_iter().map(|b| (b.id, b.head)).collect();

    // Root set: branch heads, checkpointed positions, policy pins.
    let mut frontier: VecDeque<Position> = VecDeque::new();
    for (branch, head) in &head_snapshot {
        if let Some(position) = resolve_position(forest, *branch, *head) {
            frontier.push_back(position);
        }
    }
    for (branch, seq) in checkpoints.pinned_positions() {
        if let Some(position) = resolve_position(forest, branch, seq) {
            frontier.push_back(position);
        }
    }
    for id in &policy.pinned {
        if let Some(position) = log.locate(*id) {
            frontier.push_back(position);
        }
    }

    // BFS over lineage predecessors and causal edges.
    let mut live_positions: HashSet<Position> = HashSet::new();
    let mut live_ids: HashSet<RecordId> = HashSet::new();
    while let Some(position) = frontier.pop_front() {
        if !live_positions.insert(position) {
            continue;
        }
        if let Some(previous) = predecessor(forest, position) {
            frontier.push_back(previous);
        }
        let Some(record) = log.record_at(position.0, position.1) else {
            continue;
        };
        live_ids.insert(record.id);
        let mut targets: Vec<RecordId> = record.caused_by.iter().copied().collect();
        if policy.follow_linked_to {
            targets.extend(record.linked_to.iter().copied());
        }
        for target in targets {
            if let Some(position) = log.locate(target) {
                frontier.push_back(position);
            }
        }
    }

    // Sweep, skipping branches whose head moved since the snapshot.
    let mut report = GcReport {
        live: live_ids.len(),
        ..Default::default()
    };
    for branch in log.branch_ids() {
        if let Some(meta) = forest.get_by_id(branch) {
            let snapshot_head = head_snapshot.get(&branch).copied();
            if snapshot_head != Some(meta.head) {
                debug!(%branch, "head moved during scan; skipping");
                report.skipped_branches.push(branch);
                continue;
            }
        }
        for (seq, id) in log.branch_record_ids(branch) {
            report.scanned += 1;
            if !live_ids.contains(&id) {
                log.remove(branch, seq);
                report.deleted.push(id);
            }
        }
    }

    info!(
        scanned = report.scanned,
        live = report.live,
        deleted = report.deleted.len(),
        "collection finished"
    );
    Ok(report)
}

/// Tier C: checkpoint every branch at its head, keep only that latest
/// checkpoint, and discard all records. Only call on archived looms.
pub fn compact(
    forest: &BranchForest,
    log: &RecordLog,
    checkpoints: &CheckpointStore,
    blobs: &dyn BlobStore,
) -> GcResult<CompactionReport> {
    let mut report = CompactionReport::default();

    for branch in forest.list() {
        if branch.head > Sequence::ZERO {
            take_checkpoint(forest, log, checkpoints, blobs, &branch.name)?;
        }
        report.branches += 1;
    }

    let discarded = checkpoints.retain_latest_per_branch();
    report.checkpoints_discarded = discarded.len();

    // Delete superseded checkpoint blobs unless a kept checkpoint
    // shares the same content address.
    let kept: HashSet<_> = checkpoints
        .pinned_positions()
        .iter()
        .filter_map(|(b, s)| checkpoints.latest_at(*b, *s))
        .map(|cp| cp.blob)
        .collect();
    for checkpoint in discarded {
        if !kept.contains(&checkpoint.blob) {
            blobs
                .delete(&checkpoint.blob)
                .map_err(LogError::from)?;
        }
    }

    for branch in log.branch_ids() {
        report.records_discarded += log.branch_record_ids(branch).len();
        log.drop_branch(branch);
    }

    info!(
        branches = report.branches,
        records = report.records_discarded,
        "compaction finished"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use loom_log::{cell_push, reconstruct, visible, ROOT_BRANCH};
    use loom_store::InMemoryBlobStore;
    use loom_types::RecordDraft;
    use serde_json::json;

    fn setup() -> (BranchForest, RecordLog, CheckpointStore, InMemoryBlobStore) {
        (
            BranchForest::new(),
            RecordLog::new(),
            CheckpointStore::new(),
            InMemoryBlobStore::new(),
        )
    }

    #[test]
    fn visible_history_stays_live() {
        let (forest, log, checkpoints, _) = setup();
        for n in 1..=5 {
            log.append(&forest, ROOT_BRANCH, cell_push("items", json!(n)))
                .unwrap();
        }
        let report = collect(&forest, &log, &checkpoints, &GcPolicy::default()).unwrap();
        assert!(report.deleted.is_empty());
        assert_eq!(report.scanned, 5);
        assert_eq!(
            visible(&forest, &log, ROOT_BRANCH, Sequence(5)).unwrap().len(),
            5
        );
    }

    #[test]
    fn deleted_branch_records_are_reclaimed() {
        let (forest, log, checkpoints, _) = setup();
        log.append(&forest, ROOT_BRANCH, cell_push("items", json!(0)))
            .unwrap();
        forest.create("scrap", Some(ROOT_BRANCH), None).unwrap();
        for n in 1..=3 {
            log.append(&forest, "scrap", cell_push("items", json!(n)))
                .unwrap();
        }
        forest.delete("scrap").unwrap();

        let report = collect(&forest, &log, &checkpoints, &GcPolicy::default()).unwrap();
        assert_eq!(report.deleted.len(), 3);
        assert_eq!(log.record_count(), 1);
    }

    #[test]
    fn caused_by_keeps_cross_branch_references() {
        let (forest, log, checkpoints, _) = setup();
        forest.create("scrap", Some(ROOT_BRANCH), None).unwrap();
        let kept = log
            .append(&forest, "scrap", cell_push("items", json!("kept")))
            .unwrap();
        let doomed = log
            .append(&forest, "scrap", cell_push("items", json!("doomed")))
            .unwrap();
        // Reference the first scrap record from main, then delete scrap.
        log.append(
            &forest,
            ROOT_BRANCH,
            RecordDraft::new("note", json!({})).caused_by([kept.id]),
        )
        .unwrap();
        forest.delete("scrap").unwrap();

        let report = collect(&forest, &log, &checkpoints, &GcPolicy::default()).unwrap();
        assert_eq!(report.deleted, vec![doomed.id]);
        assert!(log.contains(kept.id));
    }

    #[test]
    fn linked_to_follows_only_by_policy() {
        let (forest, log, checkpoints, _) = setup();
        forest.create("scrap", Some(ROOT_BRANCH), None).unwrap();
        let soft = log
            .append(&forest, "scrap", cell_push("items", json!("soft")))
            .unwrap();
        log.append(
            &forest,
            ROOT_BRANCH,
            RecordDraft::new("note", json!({})).linked_to([soft.id]),
        )
        .unwrap();
        forest.delete("scrap").unwrap();

        // Default: soft references do not pin.
        let report = collect(&forest, &log, &checkpoints, &GcPolicy::default()).unwrap();
        assert_eq!(report.deleted, vec![soft.id]);

        // Rebuild with the opt-in policy.
        let (forest, log, checkpoints, _) = setup();
        forest.create("scrap", Some(ROOT_BRANCH), None).unwrap();
        let soft = log
            .append(&forest, "scrap", cell_push("items", json!("soft")))
            .unwrap();
        log.append(
            &forest,
            ROOT_BRANCH,
            RecordDraft::new("note", json!({})).linked_to([soft.id]),
        )
        .unwrap();
        forest.delete("scrap").unwrap();

        let policy = GcPolicy {
            follow_linked_to: true,
            ..Default::default()
        };
        let report = collect(&forest, &log, &checkpoints, &policy).unwrap();
        assert!(report.deleted.is_empty());
        assert!(log.contains(soft.id));
    }

    #[test]
    fn pinned_records_survive() {
        let (forest, log, checkpoints, _) = setup();
        forest.create("scrap", Some(ROOT_BRANCH), None).unwrap();
        let pinned = log
            .append(&forest, "scrap", cell_push("items", json!("pin")))
            .unwrap();
        forest.delete("scrap").unwrap();

        let policy = GcPolicy {
            pinned: [pinned.id].into(),
            ..Default::default()
        };
        let report = collect(&forest, &log, &checkpoints, &policy).unwrap();
        assert!(report.deleted.is_empty());
    }

    #[test]
    fn compaction_keeps_reconstruction_at_head() {
        let (forest, log, checkpoints, blobs) = setup();
        for n in 1..=6 {
            log.append(&forest, ROOT_BRANCH, cell_push("items", json!(n)))
                .unwrap();
        }
        let before = reconstruct(&forest, &log, &checkpoints, &blobs, ROOT_BRANCH, Sequence(6))
            .unwrap();

        let report = compact(&forest, &log, &checkpoints, &blobs).unwrap();
        assert_eq!(report.records_discarded, 6);
        assert_eq!(log.record_count(), 0);
        assert_eq!(checkpoints.count(), 1);

        let after = reconstruct(&forest, &log, &checkpoints, &blobs, ROOT_BRANCH, Sequence(6))
            .unwrap();
        assert_eq!(before, after);
    }
}
