//! Branch metadata.

use serde::{Deserialize, Serialize};

use crate::id::{BranchId, Sequence};
use crate::Timestamp;

/// A named, linear append point in the loom.
///
/// Root branches have no parent. A branch's local records occupy the
/// sequence range `(branch_point, head]`, or `[1, head]` for roots.
/// The parent link and branch point are set once at creation and never
/// change; only `head` advances, and only via append.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branch {
    pub id: BranchId,
    pub name: String,
    pub parent: Option<BranchId>,
    pub branch_point: Option<Sequence>,
    pub head: Sequence,
    pub created_at: Timestamp,
}

impl Branch {
    /// Returns `true` if this branch has no parent.
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// Lower bound (exclusive) of this branch's local sequence range.
    pub fn base(&self) -> Sequence {
        self.branch_point.unwrap_or(Sequence::ZERO)
    }

    /// Number of records appended locally to this branch.
    pub fn local_len(&self) -> u64 {
        self.head.0 - self.base().0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn branch(parent: Option<BranchId>, point: Option<Sequence>, head: Sequence) -> Branch {
        Branch {
            id: BranchId(7),
            name: "b".into(),
            parent,
            branch_point: point,
            head,
            created_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn root_branch_base_is_zero() {
        let b = branch(None, None, Sequence(4));
        assert!(b.is_root());
        assert_eq!(b.base(), Sequence::ZERO);
        assert_eq!(b.local_len(), 4);
    }

    #[test]
    fn child_branch_local_range() {
        let b = branch(Some(BranchId(1)), Some(Sequence(3)), Sequence(5));
        assert!(!b.is_root());
        assert_eq!(b.base(), Sequence(3));
        assert_eq!(b.local_len(), 2);
    }
}
