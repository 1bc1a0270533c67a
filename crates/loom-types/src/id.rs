//! Identifier and sequence types.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a record.
///
/// UUID v7: time-ordered and globally unique without coordination, so a
/// record keeps the same identity when its loom is embedded inside
/// another loom.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RecordId(pub Uuid);

impl RecordId {
    /// Mint a fresh time-ordered identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Short hex prefix for logs and summaries.
    pub fn short(&self) -> String {
        self.0.simple().to_string()[..8].to_string()
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RecordId({})", self.short())
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Position in a branch's log.
///
/// Sequence 0 is the genesis position (no records); the first appended
/// record takes sequence 1.
#[derive(
    Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Sequence(pub u64);

impl Sequence {
    /// The genesis position.
    pub const ZERO: Sequence = Sequence(0);

    /// The next position.
    pub fn next(self) -> Self {
        Sequence(self.0 + 1)
    }

    /// The previous position, if any.
    pub fn prev(self) -> Option<Self> {
        self.0.checked_sub(1).map(Sequence)
    }
}

impl fmt::Debug for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Seq({})", self.0)
    }
}

impl fmt::Display for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Arena key for a branch within a single loom.
///
/// Branch ids are assigned densely at creation and are never reused,
/// so a dangling parent reference after deletion stays dangling.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BranchId(pub u64);

impl fmt::Debug for BranchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BranchId({})", self.0)
    }
}

impl fmt::Display for BranchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_ids_are_unique_and_ordered() {
        let a = RecordId::new();
        let b = RecordId::new();
        assert_ne!(a, b);
        // v7 ids are time-ordered; same-millisecond ids still differ.
        assert!(a <= b || b <= a);
    }

    #[test]
    fn sequence_navigation() {
        assert_eq!(Sequence(5).next(), Sequence(6));
        assert_eq!(Sequence(5).prev(), Some(Sequence(4)));
        assert_eq!(Sequence::ZERO.prev(), None);
    }

    #[test]
    fn record_id_short_is_stable() {
        let id = RecordId::new();
        assert_eq!(id.short().len(), 8);
        assert_eq!(id.short(), id.short());
    }
}
