use std::collections::BTreeMap;

use loom_types::{Record, Sequence};
use serde::{Deserialize, Serialize};

/// One branch's position in a head advert.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchHead {
    pub head: Sequence,
    pub branch_point: Option<Sequence>,
    /// Parent branch by name (names are the cross-peer identity).
    pub parent: Option<String>,
}

/// The branch-head map a peer advertises.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeadAdvert {
    pub branches: BTreeMap<String, BranchHead>,
}

/// Request for a branch's local records in `(from, to]`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeRequest {
    pub branch: String,
    pub from: Sequence,
    pub to: Sequence,
}

/// Records shipped for one branch, ascending by sequence.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecordBatch {
    pub branch: String,
    pub records: Vec<Record>,
}

/// Outcome of applying remote records.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ApplyReport {
    pub branches_created: usize,
    pub records_applied: usize,
    pub records_skipped: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advert_is_ordered_by_name() {
        let mut advert = HeadAdvert::default();
        advert.branches.insert(
            "zeta".into(),
            BranchHead {
                head: Sequence(1),
                branch_point: None,
                parent: None,
            },
        );
        advert.branches.insert(
            "alpha".into(),
            BranchHead {
                head: Sequence(2),
                branch_point: None,
                parent: None,
            },
        );
        let names: Vec<&String> = advert.branches.keys().collect();
        assert_eq!(names, ["alpha", "zeta"]);
    }

    #[test]
    fn apply_report_defaults() {
        let report = ApplyReport::default();
        assert_eq!(report.records_applied, 0);
        assert_eq!(report.records_skipped, 0);
    }
}
