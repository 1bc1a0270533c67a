//! Control envelopes: the records an embedding loom keeps about its
//! embedded looms' mutations.
//!
//! Envelopes are ordinary records on the embedding loom's control log,
//! typed `loom:*` / `acl:*`, with the envelope body as JSON payload.
//! They are never appended to the embedded loom's own branches.

use loom_types::{LoomId, LoomPath, Record, RecordDraft, RecordId, Sequence};
use serde::{Deserialize, Serialize};

use crate::error::{WeaveError, WeaveResult};

/// Record type of an append envelope.
pub const LOOM_APPEND: &str = "loom:append";
/// Record type of a branch-creation envelope.
pub const LOOM_BRANCH: &str = "loom:branch";
/// Record type of a merge envelope.
pub const LOOM_MERGE: &str = "loom:merge";
/// Record type of an archive envelope.
pub const LOOM_ARCHIVE: &str = "loom:archive";
/// Record type of an ACL grant envelope.
pub const ACL_GRANT: &str = "acl:grant";
/// Record type of an ACL revoke envelope.
pub const ACL_REVOKE: &str = "acl:revoke";

/// Access classes for ACL envelopes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessKind {
    Read,
    Write,
}

/// One envelope per embedded-loom mutation.
///
/// `loom` names the *direct* child the mutation happened in; deeper
/// nesting is resolved level by level (each loom only records envelopes
/// for its own children).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ControlEnvelope {
    /// A record was appended to `branch` of the child loom.
    Append {
        loom: LoomId,
        branch: String,
        seq: Sequence,
        record_id: RecordId,
    },
    /// A branch was created in the child loom. `at` is the resolved
    /// branch point (0 for roots).
    Branch {
        loom: LoomId,
        name: String,
        parent: Option<String>,
        at: Sequence,
    },
    /// Two branch heads were merged into `into` at `seq`.
    Merge {
        loom: LoomId,
        into: String,
        left: String,
        right: String,
        seq: Sequence,
        merge_record_id: RecordId,
    },
    /// The child loom was logically archived (GC tier A).
    Archive { loom: LoomId },
    /// `principal` was granted `access` under `path`.
    AclGrant {
        principal: String,
        path: LoomPath,
        access: AccessKind,
    },
    /// A previous grant was revoked.
    AclRevoke {
        principal: String,
        path: LoomPath,
        access: AccessKind,
    },
}

impl ControlEnvelope {
    /// The record type this envelope is stored under.
    pub fn record_type(&self) -> &'static str {
        match self {
            Self::Append { .. } => LOOM_APPEND,
            Self::Branch { .. } => LOOM_BRANCH,
            Self::Merge { .. } => LOOM_MERGE,
            Self::Archive { .. } => LOOM_ARCHIVE,
            Self::AclGrant { .. } => ACL_GRANT,
            Self::AclRevoke { .. } => ACL_REVOKE,
        }
    }

    /// Returns `true` if `record_type` names any envelope type.
    pub fn is_control_type(record_type: &str) -> bool {
        matches!(
            record_type,
            LOOM_APPEND | LOOM_BRANCH | LOOM_MERGE | LOOM_ARCHIVE | ACL_GRANT | ACL_REVOKE
        )
    }

    /// The child loom this envelope concerns, if any.
    pub fn loom(&self) -> Option<&LoomId> {
        match self {
            Self::Append { loom, .. }
            | Self::Branch { loom, .. }
            | Self::Merge { loom, .. }
            | Self::Archive { loom } => Some(loom),
            Self::AclGrant { .. } | Self::AclRevoke { .. } => None,
        }
    }

    /// Render as a record draft for the control log.
    pub fn to_draft(&self) -> WeaveResult<RecordDraft> {
        let payload =
            serde_json::to_value(self).map_err(|e| WeaveError::Decode(e.to_string()))?;
        Ok(RecordDraft::new(self.record_type(), payload))
    }

    /// Decode an envelope from a control record.
    pub fn from_record(record: &Record) -> WeaveResult<Self> {
        if !Self::is_control_type(&record.record_type) {
            return Err(WeaveError::NotAnEnvelope(record.record_type.clone()));
        }
        serde_json::from_value(record.payload.clone())
            .map_err(|e| WeaveError::Decode(e.to_string()))
    }

    /// Decode an envelope if the record is one, `None` otherwise.
    pub fn maybe_from_record(record: &Record) -> Option<Self> {
        if Self::is_control_type(&record.record_type) {
            serde_json::from_value(record.payload.clone()).ok()
        } else {
            None
        }
    }
}
