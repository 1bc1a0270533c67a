//! Events delivered to subscribers.

use loom_types::{Branch, Record, RecordId, Sequence, Timestamp};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Summary of a record for event delivery: full payloads are inlined
/// only below a size threshold so slow consumers cannot be flooded by
/// one large append.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecordSummary {
    pub id: RecordId,
    pub sequence: Sequence,
    /// Name of the branch the record landed on.
    pub branch: String,
    pub record_type: String,
    pub timestamp: Timestamp,
    pub payload_size: usize,
    /// The payload, if it fits the threshold.
    pub payload: Option<Value>,
}

impl RecordSummary {
    /// Summarize a record, inlining the payload when small enough.
    pub fn from_record(record: &Record, branch_name: &str, payload_threshold: usize) -> Self {
        let payload_size = record.payload_size();
        Self {
            id: record.id,
            sequence: record.sequence,
            branch: branch_name.to_string(),
            record_type: record.record_type.clone(),
            timestamp: record.timestamp,
            payload_size,
            payload: (payload_size <= payload_threshold).then(|| record.payload.clone()),
        }
    }
}

/// Summary of a branch for event delivery.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchSummary {
    pub name: String,
    pub parent: Option<String>,
    pub branch_point: Option<Sequence>,
    pub head: Sequence,
    pub created_at: Timestamp,
}

impl BranchSummary {
    /// Summarize a branch, with the parent already resolved to a name.
    pub fn from_branch(branch: &Branch, parent_name: Option<String>) -> Self {
        Self {
            name: branch.name.clone(),
            parent: parent_name,
            branch_point: branch.branch_point,
            head: branch.head,
            created_at: branch.created_at,
        }
    }
}

/// Why a subscription stopped receiving events.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    /// The bounded buffer overflowed under the `Disconnect` policy.
    BufferOverflow,
    /// The consumer unsubscribed.
    Unsubscribed,
}

/// Events emitted by the store.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LoomEvent {
    /// A record was appended.
    RecordAppended { record: RecordSummary },
    /// A materialized cell changed (a `cell:*` record was appended).
    CellChanged { cell: String, sequence: Sequence },
    /// A branch was created.
    BranchCreated { branch: BranchSummary },
    /// A branch was deleted.
    BranchDeleted { name: String },
    /// A branch head advanced.
    BranchHead { branch: String, head: Sequence },
    /// Historical replay finished; later events are strictly live.
    CaughtUp,
    /// Terminal event: the subscription is dead.
    Dropped { reason: DropReason },
}
