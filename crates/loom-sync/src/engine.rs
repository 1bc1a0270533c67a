//! The sync engine: advertise, diff, collect, apply.

use loom_log::{BranchForest, RecordLog};
use loom_types::Sequence;
use tracing::{debug, info};

use crate::error::{SyncError, SyncResult};
use crate::transport::SyncPeer;
use crate::types::{ApplyReport, BranchHead, HeadAdvert, RangeRequest, RecordBatch};

/// Build this store's head advert. Branches with a dangling ancestry
/// are advertised too; only their metadata is shared.
pub fn advertise(forest: &BranchForest) -> HeadAdvert {
    let mut advert = HeadAdvert::default();
    for branch in forest.list() {
        let parent = branch
            .parent
            .and_then(|pid| forest.get_by_id(pid))
            .map(|p| p.name);
        advert.branches.insert(
            branch.name.clone(),
            BranchHead {
                head: branch.head,
                branch_point: branch.branch_point,
                parent,
            },
        );
    }
    advert
}

/// Ranges the local store is missing relative to a remote advert.
pub fn diff(local: &HeadAdvert, remote: &HeadAdvert) -> Vec<RangeRequest> {
    let mut requests = Vec::new();
    for (name, remote_head) in &remote.branches {
        let from = match local.branches.get(name) {
            Some(local_head) => local_head.head,
            None => remote_head.branch_point.unwrap_or(Sequence::ZERO),
        };
        if remote_head.head > from {
            requests.push(RangeRequest {
                branch: name.clone(),
                from,
                to: remote_head.head,
            });
        }
    }
    requests
}

/// Serve record ranges for a peer's requests.
pub fn collect(
    forest: &BranchForest,
    log: &RecordLog,
    requests: &[RangeRequest],
) -> SyncResult<Vec<RecordBatch>> {
    let mut batches = Vec::new();
    for request in requests {
        let branch = forest.require(&request.branch)?;
        batches.push(RecordBatch {
            branch: request.branch.clone(),
            records: log.local_range(branch.id, request.from, request.to),
        });
    }
    Ok(batches)
}

/// Create any advertised branches that are missing locally and whose
/// parent has already caught up to the branch point.
fn create_ready_branches(
    forest: &BranchForest,
    advert: &HeadAdvert,
    report: &mut ApplyReport,
) -> SyncResult<bool> {
    let mut progressed = false;
    for (name, meta) in &advert.branches {
        if forest.get(name).is_some() {
            continue;
        }
        let creatable = match &meta.parent {
            None => true,
            Some(parent) => forest
                .get(parent)
                .is_some_and(|p| meta.branch_point.unwrap_or(Sequence::ZERO) <= p.head),
        };
        if creatable {
            forest.create(name, meta.parent.as_deref(), meta.branch_point)?;
            report.branches_created += 1;
            progressed = true;
        }
    }
    Ok(progressed)
}

fn apply_batch(
    forest: &BranchForest,
    log: &RecordLog,
    batch: &RecordBatch,
    report: &mut ApplyReport,
) -> SyncResult<()> {
    let branch = forest.require(&batch.branch)?;
    for record in &batch.records {
        if log.contains(record.id) {
            report.records_skipped += 1;
            continue;
        }
        let head = forest.require(&batch.branch)?.head;
        if record.sequence <= head {
            // Occupied position: the same id would have been skipped
            // above, so this is a real divergence.
            if log.record_at(branch.id, record.sequence).is_some() {
                return Err(SyncError::Diverged {
                    branch: batch.branch.clone(),
                    seq: record.sequence,
                });
            }
            report.records_skipped += 1;
            continue;
        }
        let expected = head.next();
        if record.sequence != expected {
            return Err(SyncError::MissingRange {
                branch: batch.branch.clone(),
                expected,
                got: record.sequence,
            });
        }
        log.import(forest, &batch.branch, record.clone())?;
        report.records_applied += 1;
    }
    debug!(branch = %batch.branch, "batch applied");
    Ok(())
}

/// Apply remote record batches idempotently.
///
/// Branch creation interleaves with record application: a child branch
/// only becomes creatable once its parent's records raised the local
/// head past the branch point. Known record ids and already-covered
/// sequences are skipped; a gap is a typed error; a different record
/// at an occupied sequence means the histories diverged.
pub fn apply(
    forest: &BranchForest,
    log: &RecordLog,
    advert: &HeadAdvert,
    batches: Vec<RecordBatch>,
) -> SyncResult<ApplyReport> {
    let mut report = ApplyReport::default();
    let mut remaining = batches;

    loop {
        let created = create_ready_branches(forest, advert, &mut report)?;

        let mut deferred = Vec::new();
        let mut applied = false;
        for batch in remaining {
            if forest.get(&batch.branch).is_none() {
                deferred.push(batch);
                continue;
            }
            apply_batch(forest, log, &batch, &mut report)?;
            applied = true;
        }
        remaining = deferred;

        if remaining.is_empty() && !created {
            return Ok(report);
        }
        if !created && !applied {
            let name = remaining
                .first()
                .map(|b| b.branch.clone())
                .unwrap_or_default();
            return Err(SyncError::UnresolvedBranch(name));
        }
    }
}

/// One full anti-entropy round against a peer: pull their advert,
/// request what we miss, apply it.
pub async fn sync_with(
    peer: &dyn SyncPeer,
    forest: &BranchForest,
    log: &RecordLog,
) -> SyncResult<ApplyReport> {
    let local = advertise(forest);
    let remote = peer.advertise().await?;
    let requests = diff(&local, &remote);
    let batches = peer.fetch(requests).await?;
    let report = apply(forest, log, &remote, batches)?;
    info!(
        applied = report.records_applied,
        skipped = report.records_skipped,
        branches = report.branches_created,
        "sync round finished"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use loom_log::ROOT_BRANCH;
    use loom_types::RecordDraft;
    use serde_json::json;

    fn fill(forest: &BranchForest, log: &RecordLog, branch: &str, n: u64) {
        for i in 0..n {
            log.append(forest, branch, RecordDraft::new("m", json!(i)))
                .unwrap();
        }
    }

    fn replicate(
        source: (&BranchForest, &RecordLog),
        target: (&BranchForest, &RecordLog),
    ) -> SyncResult<ApplyReport> {
        let remote = advertise(source.0);
        let local = advertise(target.0);
        let requests = diff(&local, &remote);
        let batches = collect(source.0, source.1, &requests)?;
        apply(target.0, target.1, &remote, batches)
    }

    #[test]
    fn diff_requests_only_missing_ranges() {
        let source = BranchForest::new();
        let log = RecordLog::new();
        fill(&source, &log, ROOT_BRANCH, 5);

        let target = BranchForest::new();
        let requests = diff(&advertise(&target), &advertise(&source));
        assert_eq!(
            requests,
            vec![RangeRequest {
                branch: ROOT_BRANCH.into(),
                from: Sequence::ZERO,
                to: Sequence(5),
            }]
        );
    }

    #[test]
    fn replication_carries_branches_and_records() {
        let src_forest = BranchForest::new();
        let src_log = RecordLog::new();
        fill(&src_forest, &src_log, ROOT_BRANCH, 3);
        src_forest
            .create("feature", Some(ROOT_BRANCH), Some(Sequence(2)))
            .unwrap();
        fill(&src_forest, &src_log, "feature", 2);

        let dst_forest = BranchForest::new();
        let dst_log = RecordLog::new();
        let report = replicate((&src_forest, &src_log), (&dst_forest, &dst_log)).unwrap();
        assert_eq!(report.branches_created, 1);
        assert_eq!(report.records_applied, 5);

        let feature = dst_forest.get("feature").unwrap();
        assert_eq!(feature.branch_point, Some(Sequence(2)));
        assert_eq!(feature.head, Sequence(4));
    }

    #[test]
    fn applying_twice_is_a_no_op() {
        let src_forest = BranchForest::new();
        let src_log = RecordLog::new();
        fill(&src_forest, &src_log, ROOT_BRANCH, 4);

        let dst_forest = BranchForest::new();
        let dst_log = RecordLog::new();
        let first = replicate((&src_forest, &src_log), (&dst_forest, &dst_log)).unwrap();
        assert_eq!(first.records_applied, 4);

        // Re-apply the same batches explicitly.
        let remote = advertise(&src_forest);
        let requests = vec![RangeRequest {
            branch: ROOT_BRANCH.into(),
            from: Sequence::ZERO,
            to: Sequence(4),
        }];
        let batches = collect(&src_forest, &src_log, &requests).unwrap();
        let second = apply(&dst_forest, &dst_log, &remote, batches).unwrap();
        assert_eq!(second.records_applied, 0);
        assert_eq!(second.records_skipped, 4);

        // Logs are identical after one and two deliveries.
        assert_eq!(dst_log.record_count(), 4);
        assert_eq!(dst_forest.get(ROOT_BRANCH).unwrap().head, Sequence(4));
    }

    #[test]
    fn gaps_are_rejected() {
        let src_forest = BranchForest::new();
        let src_log = RecordLog::new();
        fill(&src_forest, &src_log, ROOT_BRANCH, 4);

        let dst_forest = BranchForest::new();
        let dst_log = RecordLog::new();
        let remote = advertise(&src_forest);
        // Ship only records 3..4, skipping 1..2.
        let batches = collect(
            &src_forest,
            &src_log,
            &[RangeRequest {
                branch: ROOT_BRANCH.into(),
                from: Sequence(2),
                to: Sequence(4),
            }],
        )
        .unwrap();
        let err = apply(&dst_forest, &dst_log, &remote, batches).unwrap_err();
        assert!(matches!(err, SyncError::MissingRange { .. }));
    }

    #[test]
    fn divergent_histories_are_surfaced() {
        let a_forest = BranchForest::new();
        let a_log = RecordLog::new();
        fill(&a_forest, &a_log, ROOT_BRANCH, 2);

        let b_forest = BranchForest::new();
        let b_log = RecordLog::new();
        fill(&b_forest, &b_log, ROOT_BRANCH, 2);

        // Same positions, different records.
        let remote = advertise(&a_forest);
        let batches = collect(
            &a_forest,
            &a_log,
            &[RangeRequest {
                branch: ROOT_BRANCH.into(),
                from: Sequence::ZERO,
                to: Sequence(2),
            }],
        )
        .unwrap();
        let err = apply(&b_forest, &b_log, &remote, batches).unwrap_err();
        assert!(matches!(err, SyncError::Diverged { .. }));
    }

    #[tokio::test]
    async fn sync_with_local_peer() {
        use crate::transport::LocalPeer;
        use std::sync::Arc;

        let src_forest = Arc::new(BranchForest::new());
        let src_log = Arc::new(RecordLog::new());
        fill(&src_forest, &src_log, ROOT_BRANCH, 6);
        let peer = LocalPeer::new(Arc::clone(&src_forest), Arc::clone(&src_log));

        let dst_forest = BranchForest::new();
        let dst_log = RecordLog::new();
        let report = sync_with(&peer, &dst_forest, &dst_log).await.unwrap();
        assert_eq!(report.records_applied, 6);

        // A second round is a no-op.
        let again = sync_with(&peer, &dst_forest, &dst_log).await.unwrap();
        assert_eq!(again.records_applied, 0);
    }
}
