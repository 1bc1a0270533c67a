//! Visibility: which records a branch sees at a given sequence.
//!
//! `Visible(branch, n)` is the branch's local records with sequence in
//! `(branch_point, n]` plus `Visible(parent, min(n, branch_point))`.
//! The `min(n, branch_point)` clamp is load-bearing: without it a child
//! queried below its own branch point would pull ancestor records past
//! the point it actually forked from.

use loom_types::{Branch, BranchId, Record, Sequence};

use crate::error::{LogError, LogResult};
use crate::forest::BranchForest;
use crate::log::RecordLog;

/// One lineage slice: local records of `branch` in `(from, to]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Segment {
    pub branch: BranchId,
    pub from: Sequence,
    pub to: Sequence,
}

/// Decompose `Visible(branch, to)` into per-branch slices, root first.
///
/// Fails with `AncestorMissing` when a parent link dangles.
pub(crate) fn lineage_segments(
    forest: &BranchForest,
    branch: &Branch,
    to: Sequence,
) -> LogResult<Vec<Segment>> {
    let mut segments = Vec::new();
    let mut current = branch.clone();
    let mut upper = to;
    loop {
        segments.push(Segment {
            branch: current.id,
            from: current.base(),
            to: upper,
        });
        match current.parent {
            Some(parent_id) => {
                let point = current.base();
                upper = upper.min(point);
                current = forest
                    .get_by_id(parent_id)
                    .ok_or(LogError::AncestorMissing {
                        branch: current.name.clone(),
                        parent: parent_id,
                    })?;
            }
            None => break,
        }
    }
    segments.reverse();
    Ok(segments)
}

fn bounds_check(branch: &Branch, to: Sequence) -> LogResult<()> {
    if to > branch.head {
        return Err(LogError::InvalidSequence {
            requested: to,
            head: branch.head,
        });
    }
    Ok(())
}

/// Full reconstruction set: every record visible to `branch` at `to`,
/// in causal (ascending, root-first) order.
pub fn visible(
    forest: &BranchForest,
    log: &RecordLog,
    branch_name: &str,
    to: Sequence,
) -> LogResult<Vec<Record>> {
    let branch = forest.require(branch_name)?;
    bounds_check(&branch, to)?;
    let mut out = Vec::new();
    for segment in lineage_segments(forest, &branch, to)? {
        out.extend(log.local_range(segment.branch, segment.from, segment.to));
    }
    Ok(out)
}

/// Incremental set: only `branch`'s local records in `(from, to]`.
/// Inherited records are never part of a delta.
pub fn delta(
    forest: &BranchForest,
    log: &RecordLog,
    branch_name: &str,
    from: Sequence,
    to: Sequence,
) -> LogResult<Vec<Record>> {
    let branch = forest.require(branch_name)?;
    if from > to {
        return Err(LogError::InvalidRange { from, to });
    }
    bounds_check(&branch, to)?;
    let lower = from.max(branch.base());
    Ok(log.local_range(branch.id, lower, to))
}

/// Reverse-order visibility: up to `limit` visible records, nearest to
/// `to` first, without scanning from the beginning.
pub fn visible_tail(
    forest: &BranchForest,
    log: &RecordLog,
    branch_name: &str,
    to: Sequence,
    limit: usize,
) -> LogResult<Vec<Record>> {
    let branch = forest.require(branch_name)?;
    bounds_check(&branch, to)?;
    let mut out = Vec::new();
    // Walk the lineage nearest-segment first and stop as soon as the
    // limit is filled.
    for segment in lineage_segments(forest, &branch, to)?.into_iter().rev() {
        if out.len() >= limit {
            break;
        }
        out.extend(log.local_range_rev(
            segment.branch,
            segment.from,
            segment.to,
            limit - out.len(),
        ));
    }
    Ok(out)
}

/// Reverse-order delta: up to `limit` local records in `(from, to]`,
/// nearest to `to` first.
pub fn delta_tail(
    forest: &BranchForest,
    log: &RecordLog,
    branch_name: &str,
    from: Sequence,
    to: Sequence,
    limit: usize,
) -> LogResult<Vec<Record>> {
    let branch = forest.require(branch_name)?;
    if from > to {
        return Err(LogError::InvalidRange { from, to });
    }
    bounds_check(&branch, to)?;
    let lower = from.max(branch.base());
    Ok(log.local_range_rev(branch.id, lower, to, limit))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forest::ROOT_BRANCH;
    use loom_types::RecordDraft;
    use proptest::prelude::*;
    use serde_json::json;

    fn fill(forest: &BranchForest, log: &RecordLog, branch: &str, n: u64) {
        for i in 0..n {
            log.append(forest, branch, RecordDraft::new("message", json!({ "i": i })))
                .unwrap();
        }
    }

    /// Fork isolation: main 1-5, feature forked at 3, two more on main,
    /// one on feature. Feature sees main's prefix and its own records
    /// only.
    #[test]
    fn fork_scenario() {
        let forest = BranchForest::new();
        let log = RecordLog::new();
        fill(&forest, &log, ROOT_BRANCH, 5);
        forest
            .create("feature", Some(ROOT_BRANCH), Some(Sequence(3)))
            .unwrap();
        fill(&forest, &log, ROOT_BRANCH, 2); // main 6..7
        fill(&forest, &log, "feature", 1); // feature local 4

        let feature = visible(&forest, &log, "feature", Sequence(4)).unwrap();
        let seqs: Vec<u64> = feature.iter().map(|r| r.sequence.0).collect();
        assert_eq!(seqs, [1, 2, 3, 4]);
        assert!(feature[..3].iter().all(|r| r.branch == BranchId(1)));
        assert_eq!(feature[3].branch, forest.get("feature").unwrap().id);

        let main = visible(&forest, &log, ROOT_BRANCH, Sequence(7)).unwrap();
        assert_eq!(main.len(), 7);

        // feature never observes main's 6..7.
        let head = forest.get("feature").unwrap().head;
        let all = visible(&forest, &log, "feature", head).unwrap();
        assert!(all
            .iter()
            .all(|r| r.branch != BranchId(1) || r.sequence <= Sequence(3)));
    }

    #[test]
    fn clamp_below_branch_point() {
        let forest = BranchForest::new();
        let log = RecordLog::new();
        fill(&forest, &log, ROOT_BRANCH, 5);
        forest
            .create("feature", Some(ROOT_BRANCH), Some(Sequence(3)))
            .unwrap();

        // Querying feature at 2 must clamp to main's prefix [1, 2] only.
        let seen = visible(&forest, &log, "feature", Sequence(2)).unwrap();
        let seqs: Vec<u64> = seen.iter().map(|r| r.sequence.0).collect();
        assert_eq!(seqs, [1, 2]);
    }

    #[test]
    fn beyond_head_is_invalid() {
        let forest = BranchForest::new();
        let log = RecordLog::new();
        fill(&forest, &log, ROOT_BRANCH, 2);
        let err = visible(&forest, &log, ROOT_BRANCH, Sequence(3)).unwrap_err();
        assert!(matches!(err, LogError::InvalidSequence { .. }));
    }

    #[test]
    fn delta_is_local_only() {
        let forest = BranchForest::new();
        let log = RecordLog::new();
        fill(&forest, &log, ROOT_BRANCH, 3);
        forest.create("feature", Some(ROOT_BRANCH), None).unwrap();
        fill(&forest, &log, "feature", 2); // local 4..5

        // A delta reaching below the branch point yields local records only.
        let d = delta(&forest, &log, "feature", Sequence(1), Sequence(5)).unwrap();
        let seqs: Vec<u64> = d.iter().map(|r| r.sequence.0).collect();
        assert_eq!(seqs, [4, 5]);

        let err = delta(&forest, &log, "feature", Sequence(5), Sequence(4)).unwrap_err();
        assert!(matches!(err, LogError::InvalidRange { .. }));
    }

    #[test]
    fn tail_is_nearest_first_across_segments() {
        let forest = BranchForest::new();
        let log = RecordLog::new();
        fill(&forest, &log, ROOT_BRANCH, 4);
        forest.create("feature", Some(ROOT_BRANCH), None).unwrap();
        fill(&forest, &log, "feature", 2); // local 5..6

        let tail = visible_tail(&forest, &log, "feature", Sequence(6), 3).unwrap();
        let seqs: Vec<u64> = tail.iter().map(|r| r.sequence.0).collect();
        assert_eq!(seqs, [6, 5, 4]);
    }

    #[test]
    fn deleted_ancestor_surfaces() {
        let forest = BranchForest::new();
        let log = RecordLog::new();
        forest.create("mid", Some(ROOT_BRANCH), None).unwrap();
        forest.create("leaf", Some("mid"), None).unwrap();
        forest.delete("mid").unwrap();
        let err = visible(&forest, &log, "leaf", Sequence::ZERO).unwrap_err();
        assert!(matches!(err, LogError::AncestorMissing { .. }));
    }

    // ---- Property: visibility equals the recursive definition ----

    /// Brute-force `Visible`: the literal recursive definition.
    fn brute_visible(
        forest: &BranchForest,
        log: &RecordLog,
        branch: &Branch,
        n: Sequence,
    ) -> Vec<Record> {
        let mut out = match branch.parent {
            Some(pid) => {
                let parent = forest.get_by_id(pid).unwrap();
                let clamp = n.min(branch.base());
                brute_visible(forest, log, &parent, clamp)
            }
            None => Vec::new(),
        };
        out.extend(log.local_range(branch.id, branch.base(), n));
        out
    }

    /// Random forest: each step either appends to a random branch or
    /// forks a random branch at a random admissible point.
    fn arb_ops() -> impl Strategy<Value = Vec<(u8, u64, u64)>> {
        proptest::collection::vec((0u8..4, 0u64..5, 0u64..100), 1..40)
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]
        #[test]
        fn visible_matches_brute_force(ops in arb_ops()) {
            let forest = BranchForest::new();
            let log = RecordLog::new();
            let mut names = vec![ROOT_BRANCH.to_string()];

            for (kind, pick, point) in ops {
                let parent = names[(pick as usize) % names.len()].clone();
                if kind == 0 && names.len() < 8 {
                    let head = forest.get(&parent).unwrap().head;
                    let at = Sequence(point % (head.0 + 1));
                    let name = format!("b{}", names.len());
                    forest.create(&name, Some(parent.as_str()), Some(at)).unwrap();
                    names.push(name);
                } else {
                    log.append(&forest, &parent, RecordDraft::new("m", json!(point)))
                        .unwrap();
                }
            }

            for name in &names {
                let branch = forest.get(name).unwrap();
                for n in 0..=branch.head.0 {
                    let fast = visible(&forest, &log, name, Sequence(n)).unwrap();
                    let slow = brute_visible(&forest, &log, &branch, Sequence(n));
                    prop_assert_eq!(&fast, &slow);

                    // The reverse iteration is exactly the reversal.
                    let mut rev = visible_tail(&forest, &log, name, Sequence(n), usize::MAX).unwrap();
                    rev.reverse();
                    prop_assert_eq!(&rev, &slow);
                }
            }
        }
    }
}
