//! Subscription filters.

use crate::event::LoomEvent;

/// Criteria selecting which events a subscription receives.
///
/// Category toggles gate whole event families; the optional lists
/// narrow within a family. Lifecycle events (`CaughtUp`, `Dropped`)
/// always pass.
#[derive(Clone, Debug, Default)]
pub struct EventFilter {
    /// Only records of these types (None = all types).
    pub record_types: Option<Vec<String>>,
    /// Only events from this branch (None = any branch).
    pub branch: Option<String>,
    /// Only changes to these cells (None = all cells).
    pub cells: Option<Vec<String>>,
    /// Deliver record events.
    pub include_records: bool,
    /// Deliver cell-change events.
    pub include_cells: bool,
    /// Deliver branch lifecycle events.
    pub include_branches: bool,
}

impl EventFilter {
    /// All records on any branch.
    pub fn records() -> Self {
        Self {
            include_records: true,
            ..Default::default()
        }
    }

    /// Records of specific types.
    pub fn record_types(types: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            record_types: Some(types.into_iter().map(Into::into).collect()),
            include_records: true,
            ..Default::default()
        }
    }

    /// Changes to specific cells.
    pub fn cells(cells: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            cells: Some(cells.into_iter().map(Into::into).collect()),
            include_cells: true,
            ..Default::default()
        }
    }

    /// Branch lifecycle events only.
    pub fn branches() -> Self {
        Self {
            include_branches: true,
            ..Default::default()
        }
    }

    /// Everything.
    pub fn all() -> Self {
        Self {
            include_records: true,
            include_cells: true,
            include_branches: true,
            ..Default::default()
        }
    }

    /// Restrict to one branch.
    pub fn on_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = Some(branch.into());
        self
    }

    /// Returns `true` if the event passes this filter.
    pub fn matches(&self, event: &LoomEvent) -> bool {
        match event {
            LoomEvent::RecordAppended { record } => {
                if !self.include_records {
                    return false;
                }
                if let Some(ref types) = self.record_types {
                    if !types.contains(&record.record_type) {
                        return false;
                    }
                }
                if let Some(ref branch) = self.branch {
                    if branch != &record.branch {
                        return false;
                    }
                }
                true
            }
            LoomEvent::CellChanged { cell, .. } => {
                if !self.include_cells {
                    return false;
                }
                match self.cells {
                    Some(ref cells) => cells.iter().any(|c| c == cell),
                    None => true,
                }
            }
            LoomEvent::BranchCreated { .. }
            | LoomEvent::BranchDeleted { .. }
            | LoomEvent::BranchHead { .. } => self.include_branches,
            LoomEvent::CaughtUp | LoomEvent::Dropped { .. } => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{BranchSummary, RecordSummary};
    use loom_types::Sequence;

    fn record_event(record_type: &str, branch: &str) -> LoomEvent {
        LoomEvent::RecordAppended {
            record: RecordSummary {
                id: loom_types::RecordId::new(),
                sequence: Sequence(1),
                branch: branch.into(),
                record_type: record_type.into(),
                timestamp: chrono::Utc::now(),
                payload_size: 2,
                payload: None,
            },
        }
    }

    #[test]
    fn type_filter() {
        let filter = EventFilter::record_types(["message"]);
        assert!(filter.matches(&record_event("message", "main")));
        assert!(!filter.matches(&record_event("tool-call", "main")));
    }

    #[test]
    fn branch_filter() {
        let filter = EventFilter::records().on_branch("feature");
        assert!(filter.matches(&record_event("message", "feature")));
        assert!(!filter.matches(&record_event("message", "main")));
    }

    #[test]
    fn cell_filter() {
        let filter = EventFilter::cells(["items"]);
        assert!(filter.matches(&LoomEvent::CellChanged {
            cell: "items".into(),
            sequence: Sequence(1),
        }));
        assert!(!filter.matches(&LoomEvent::CellChanged {
            cell: "other".into(),
            sequence: Sequence(1),
        }));
        assert!(!filter.matches(&record_event("message", "main")));
    }

    #[test]
    fn lifecycle_always_passes() {
        let filter = EventFilter::default();
        assert!(filter.matches(&LoomEvent::CaughtUp));
    }

    #[test]
    fn branch_events_gated_by_toggle() {
        let summary = BranchSummary {
            name: "b".into(),
            parent: None,
            branch_point: None,
            head: Sequence::ZERO,
            created_at: chrono::Utc::now(),
        };
        let event = LoomEvent::BranchCreated { branch: summary };
        assert!(EventFilter::branches().matches(&event));
        assert!(!EventFilter::records().matches(&event));
    }
}
