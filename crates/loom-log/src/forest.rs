//! The branch forest: named branches, parent links, branch points.
//!
//! Branches form a forest. Acyclicity holds by construction: a new
//! branch's parent must already exist and the new branch receives a
//! fresh id that nothing references yet, so parent links can never
//! cycle. Deleting a branch leaves descendants with a dangling parent
//! id; visibility queries surface that as `AncestorMissing`.

use std::collections::HashMap;
use std::sync::RwLock;

use loom_types::{Branch, BranchId, Sequence};
use tracing::{debug, info};

use crate::error::{LogError, LogResult};

/// Name of the root branch every forest starts with.
pub const ROOT_BRANCH: &str = "main";

#[derive(Default)]
struct ForestState {
    branches: HashMap<BranchId, Branch>,
    by_name: HashMap<String, BranchId>,
    next_id: u64,
}

/// Tracks branches and enforces the branching invariants.
pub struct BranchForest {
    inner: RwLock<ForestState>,
}

impl BranchForest {
    /// Create a forest containing the root branch `main` at head 0.
    pub fn new() -> Self {
        let mut state = ForestState {
            next_id: 1,
            ..Default::default()
        };
        let root = Branch {
            id: BranchId(1),
            name: ROOT_BRANCH.to_string(),
            parent: None,
            branch_point: None,
            head: Sequence::ZERO,
            created_at: chrono::Utc::now(),
        };
        state.by_name.insert(root.name.clone(), root.id);
        state.branches.insert(root.id, root);
        state.next_id = 2;
        Self {
            inner: RwLock::new(state),
        }
    }

    /// Create a branch.
    ///
    /// With a parent, the branch forks at `at` (default: the parent's
    /// head) and its head starts there, inheriting the parent's visible
    /// prefix. Without a parent a new root branch starts at head 0.
    pub fn create(
        &self,
        name: &str,
        parent: Option<&str>,
        at: Option<Sequence>,
    ) -> LogResult<Branch> {
        let mut state = self.inner.write().expect("lock poisoned");
        if state.by_name.contains_key(name) {
            return Err(LogError::BranchExists(name.to_string()));
        }

        let (parent_id, branch_point, head) = match parent {
            Some(parent_name) => {
                let parent_id = *state
                    .by_name
                    .get(parent_name)
                    .ok_or_else(|| LogError::BranchNotFound(parent_name.to_string()))?;
                let parent = &state.branches[&parent_id];
                let point = at.unwrap_or(parent.head);
                if point > parent.head {
                    return Err(LogError::InvalidBranchPoint {
                        requested: point,
                        parent_head: parent.head,
                    });
                }
                (Some(parent_id), Some(point), point)
            }
            None => (None, None, Sequence::ZERO),
        };

        let id = BranchId(state.next_id);
        state.next_id += 1;
        let branch = Branch {
            id,
            name: name.to_string(),
            parent: parent_id,
            branch_point,
            head,
            created_at: chrono::Utc::now(),
        };
        state.by_name.insert(name.to_string(), id);
        state.branches.insert(id, branch.clone());

        info!(branch = name, ?parent_id, point = ?branch_point, "branch created");
        Ok(branch)
    }

    /// Delete a branch by name.
    ///
    /// Root branches are protected. Descendants keep their (now
    /// dangling) parent id and fail visibility queries with
    /// `AncestorMissing` from then on.
    pub fn delete(&self, name: &str) -> LogResult<Branch> {
        let mut state = self.inner.write().expect("lock poisoned");
        let id = *state
            .by_name
            .get(name)
            .ok_or_else(|| LogError::BranchNotFound(name.to_string()))?;
        if state.branches[&id].is_root() {
            return Err(LogError::CannotDeleteProtected(name.to_string()));
        }
        state.by_name.remove(name);
        let removed = state.branches.remove(&id).expect("name index out of sync");
        info!(branch = name, "branch deleted");
        Ok(removed)
    }

    /// Look up a branch by name.
    pub fn get(&self, name: &str) -> Option<Branch> {
        let state = self.inner.read().expect("lock poisoned");
        state
            .by_name
            .get(name)
            .and_then(|id| state.branches.get(id))
            .cloned()
    }

    /// Look up a branch by id.
    pub fn get_by_id(&self, id: BranchId) -> Option<Branch> {
        self.inner
            .read()
            .expect("lock poisoned")
            .branches
            .get(&id)
            .cloned()
    }

    /// Look up a branch by name, failing with `BranchNotFound`.
    pub fn require(&self, name: &str) -> LogResult<Branch> {
        self.get(name)
            .ok_or_else(|| LogError::BranchNotFound(name.to_string()))
    }

    /// Look up a branch by id, failing with `BranchNotFound`.
    pub fn require_id(&self, id: BranchId) -> LogResult<Branch> {
        self.get_by_id(id)
            .ok_or_else(|| LogError::BranchNotFound(id.to_string()))
    }

    /// Advance a branch head. Called by the record log under the
    /// branch's append guard; heads never move backwards.
    pub(crate) fn set_head(&self, id: BranchId, head: Sequence) -> LogResult<()> {
        let mut state = self.inner.write().expect("lock poisoned");
        let branch = state
            .branches
            .get_mut(&id)
            .ok_or_else(|| LogError::BranchNotFound(id.to_string()))?;
        debug_assert!(head >= branch.head);
        branch.head = head;
        debug!(branch = %branch.name, head = %head, "head advanced");
        Ok(())
    }

    /// All branches, ordered by id.
    pub fn list(&self) -> Vec<Branch> {
        let state = self.inner.read().expect("lock poisoned");
        let mut branches: Vec<Branch> = state.branches.values().cloned().collect();
        branches.sort_by_key(|b| b.id);
        branches
    }

    /// Number of branches.
    pub fn count(&self) -> usize {
        self.inner.read().expect("lock poisoned").branches.len()
    }

    /// Direct children of a branch.
    pub fn children(&self, id: BranchId) -> Vec<Branch> {
        let state = self.inner.read().expect("lock poisoned");
        let mut out: Vec<Branch> = state
            .branches
            .values()
            .filter(|b| b.parent == Some(id))
            .cloned()
            .collect();
        out.sort_by_key(|b| b.id);
        out
    }

    /// Ancestry from the named branch to its root, child first.
    ///
    /// Fails with `AncestorMissing` if a parent link dangles.
    pub fn ancestry(&self, name: &str) -> LogResult<Vec<Branch>> {
        let state = self.inner.read().expect("lock poisoned");
        let id = *state
            .by_name
            .get(name)
            .ok_or_else(|| LogError::BranchNotFound(name.to_string()))?;

        let mut out = Vec::new();
        let mut current = state.branches.get(&id).cloned();
        while let Some(branch) = current {
            let parent = branch.parent;
            let child_name = branch.name.clone();
            out.push(branch);
            current = match parent {
                Some(pid) => Some(state.branches.get(&pid).cloned().ok_or(
                    LogError::AncestorMissing {
                        branch: child_name,
                        parent: pid,
                    },
                )?),
                None => None,
            };
        }
        Ok(out)
    }
}

impl Default for BranchForest {
    fn default() -> Self {
        Self::new()
    }
}
