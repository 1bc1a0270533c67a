//! Path-scoped access control for the loom record store.
//!
//! ACL state is never stored as mutable side state: it is reconstructed
//! by folding `acl:grant` / `acl:revoke` control records, and
//! [`AclState::can_read`] / [`AclState::can_write`] are pure functions
//! of that state and a path. Checks happen at the store boundary before
//! any append or query is permitted.
//!
//! The posture is permissive: a path with no matching rules is open.
//! The first rule touching a path (or a prefix of it) makes access
//! explicit for that scope.

use std::collections::BTreeSet;

use loom_types::{LoomPath, Record};
use loom_weave::{AccessKind, ControlEnvelope};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Errors produced by permission checks.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AclError {
    #[error("permission denied: {principal} lacks {access:?} on {path}")]
    PermissionDenied {
        principal: String,
        path: LoomPath,
        access: AccessKind,
    },
}

/// Result type for permission checks.
pub type AclResult<T> = Result<T, AclError>;

/// One granted capability.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AclRule {
    pub principal: String,
    pub path: LoomPath,
    pub access: AccessKind,
}

/// Reconstructed ACL state.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AclState {
    rules: BTreeSet<AclRule>,
}

impl AclState {
    /// Fold one control record into the state. Non-ACL records are
    /// ignored.
    pub fn apply(&mut self, record: &Record) {
        match ControlEnvelope::maybe_from_record(record) {
            Some(ControlEnvelope::AclGrant {
                principal,
                path,
                access,
            }) => {
                debug!(%principal, %path, ?access, "grant");
                self.rules.insert(AclRule {
                    principal,
                    path,
                    access,
                });
            }
            Some(ControlEnvelope::AclRevoke {
                principal,
                path,
                access,
            }) => {
                debug!(%principal, %path, ?access, "revoke");
                self.rules.remove(&AclRule {
                    principal,
                    path,
                    access,
                });
            }
            _ => {}
        }
    }

    /// Fold a record sequence, in order.
    pub fn fold<'a>(records: impl IntoIterator<Item = &'a Record>) -> Self {
        let mut state = Self::default();
        for record in records {
            state.apply(record);
        }
        state
    }

    /// Number of active rules.
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Returns `true` if any rule scopes the given access at `path` or
    /// a prefix of it.
    fn scoped(&self, path: &LoomPath, access: AccessKind) -> bool {
        self.rules
            .iter()
            .any(|rule| rule.access == access && path.starts_with(&rule.path))
    }

    fn allowed(&self, principal: &str, path: &LoomPath, access: AccessKind) -> bool {
        // Open until someone scopes this path.
        if !self.scoped(path, access) {
            return true;
        }
        self.rules.iter().any(|rule| {
            rule.access == access
                && rule.principal == principal
                && path.starts_with(&rule.path)
        })
    }

    /// Pure read check.
    pub fn can_read(&self, principal: &str, path: &LoomPath) -> bool {
        self.allowed(principal, path, AccessKind::Read)
    }

    /// Pure write check.
    pub fn can_write(&self, principal: &str, path: &LoomPath) -> bool {
        self.allowed(principal, path, AccessKind::Write)
    }

    /// Boundary check that returns a typed failure.
    pub fn require(
        &self,
        principal: &str,
        path: &LoomPath,
        access: AccessKind,
    ) -> AclResult<()> {
        if self.allowed(principal, path, access) {
            Ok(())
        } else {
            Err(AclError::PermissionDenied {
                principal: principal.to_string(),
                path: path.clone(),
                access,
            })
        }
    }
}
