//! Record and record-draft types.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::id::{BranchId, RecordId, Sequence};
use crate::Timestamp;

/// A single immutable entry in the log.
///
/// Once appended no field is ever mutated; the only way a record's
/// lifetime ends is garbage collection. `caused_by` is a hard causal
/// dependency (participates in reachability), `linked_to` is a soft,
/// non-owning reference.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Globally unique identifier (assigned at append).
    pub id: RecordId,
    /// Position within the owning branch (assigned at append).
    pub sequence: Sequence,
    /// The branch this record was appended to.
    pub branch: BranchId,
    /// Application-defined type tag (e.g. "message", "cell:push").
    pub record_type: String,
    /// Application-defined JSON payload.
    pub payload: Value,
    /// Hard causal dependencies.
    pub caused_by: BTreeSet<RecordId>,
    /// Soft references.
    pub linked_to: BTreeSet<RecordId>,
    /// When the record was committed.
    pub timestamp: Timestamp,
}

impl Record {
    /// Approximate payload size in bytes (serialized form).
    pub fn payload_size(&self) -> usize {
        serde_json::to_vec(&self.payload).map(|v| v.len()).unwrap_or(0)
    }
}

/// Input for a new record, before id and sequence are assigned.
#[derive(Clone, Debug, Default)]
pub struct RecordDraft {
    pub record_type: String,
    pub payload: Value,
    pub caused_by: BTreeSet<RecordId>,
    pub linked_to: BTreeSet<RecordId>,
}

impl RecordDraft {
    /// Draft with a type tag and JSON payload.
    pub fn new(record_type: impl Into<String>, payload: Value) -> Self {
        Self {
            record_type: record_type.into(),
            payload,
            caused_by: BTreeSet::new(),
            linked_to: BTreeSet::new(),
        }
    }

    /// Add hard causal dependencies.
    pub fn caused_by(mut self, ids: impl IntoIterator<Item = RecordId>) -> Self {
        self.caused_by.extend(ids);
        self
    }

    /// Add soft references.
    pub fn linked_to(mut self, ids: impl IntoIterator<Item = RecordId>) -> Self {
        self.linked_to.extend(ids);
        self
    }
}
