//! The weave: a flat, path-keyed registry of embedded looms.
//!
//! Looms nest by *registration*, not by object nesting: every embedded
//! loom lives in one map keyed by [`LoomPath`], which keeps ownership
//! acyclic and lets garbage collection reason per namespace. Mutations
//! of an embedded loom must go through the weave: the real record lands
//! in the inner loom and a [`ControlEnvelope`] lands on the embedding
//! loom's current branch — its control log — recursively up the chain.
//! That dual write is the whole time-travel mechanism: branching an
//! outer branch freezes its envelope prefix, so [`Weave::heads`] and
//! [`Weave::observe`] can read any embedded loom as of any outer
//! sequence with no extra bookkeeping.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

use loom_acl::AclState;
use loom_gc::{CompactionReport, GcReport};
use loom_log::visible;
use loom_merge::MergeResolver;
use loom_store::InMemoryBlobStore;
use loom_types::{Branch, LoomPath, Record, RecordDraft, Sequence};
use loom_weave::{AccessKind, ControlEnvelope, HeadsIndex, HeadsMap};
use tracing::info;

use crate::config::LoomConfig;
use crate::error::{LoomError, LoomResult};
use crate::loom::Loom;

/// A root loom plus every loom embedded under it, keyed by path.
pub struct Weave {
    config: LoomConfig,
    root: Arc<Loom>,
    registry: RwLock<HashMap<LoomPath, Arc<Loom>>>,
    /// One heads index per embedding loom (keyed by that loom's path);
    /// branch ids are only unique within a single forest.
    indices: RwLock<HashMap<LoomPath, Arc<HeadsIndex>>>,
    principal: RwLock<Option<String>>,
}

impl Weave {
    /// Create a weave with a fresh root loom.
    pub fn new(config: LoomConfig) -> Self {
        let root = Arc::new(Loom::new(config.clone()));
        Self {
            config,
            root,
            registry: RwLock::new(HashMap::new()),
            indices: RwLock::new(HashMap::new()),
            principal: RwLock::new(None),
        }
    }

    /// The root loom.
    pub fn root(&self) -> &Arc<Loom> {
        &self.root
    }

    /// Resolve a path to its loom handle.
    pub fn loom(&self, path: &LoomPath) -> LoomResult<Arc<Loom>> {
        if path.is_root() {
            return Ok(Arc::clone(&self.root));
        }
        self.registry
            .read()
            .expect("lock poisoned")
            .get(path)
            .cloned()
            .ok_or_else(|| LoomError::LoomNotFound(path.clone()))
    }

    /// Paths of all embedded looms, shallowest first.
    pub fn paths(&self) -> Vec<LoomPath> {
        let mut paths: Vec<LoomPath> = self
            .registry
            .read()
            .expect("lock poisoned")
            .keys()
            .cloned()
            .collect();
        paths.sort_by_key(|p| (p.depth(), p.to_string()));
        paths
    }

    // ---- Permissions ----

    /// Set (or clear) the principal all boundary checks run as.
    pub fn set_principal(&self, principal: Option<String>) {
        *self.principal.write().expect("lock poisoned") = principal;
    }

    /// The ACL state folded from the root control log.
    pub fn acl_state(&self) -> LoomResult<AclState> {
        let branch = self.root.current_branch()?;
        let records = visible(self.root.forest(), self.root.log(), &branch.name, branch.head)?;
        Ok(AclState::fold(records.iter()))
    }

    fn check(&self, path: &LoomPath, access: AccessKind) -> LoomResult<()> {
        let principal = self.principal.read().expect("lock poisoned").clone();
        let Some(principal) = principal else {
            return Ok(());
        };
        self.acl_state()?.require(&principal, path, access)?;
        Ok(())
    }

    /// Grant `access` under `path` to a principal, as a control record.
    pub fn grant(
        &self,
        principal: &str,
        path: &LoomPath,
        access: AccessKind,
    ) -> LoomResult<Record> {
        self.check(path, AccessKind::Write)?;
        let envelope = ControlEnvelope::AclGrant {
            principal: principal.to_string(),
            path: path.clone(),
            access,
        };
        self.root.append(envelope.to_draft()?)
    }

    /// Revoke a previous grant, as a control record.
    pub fn revoke(
        &self,
        principal: &str,
        path: &LoomPath,
        access: AccessKind,
    ) -> LoomResult<Record> {
        self.check(path, AccessKind::Write)?;
        let envelope = ControlEnvelope::AclRevoke {
            principal: principal.to_string(),
            path: path.clone(),
            access,
        };
        self.root.append(envelope.to_draft()?)
    }

    // ---- Embedding ----

    /// Embed a fresh loom at `path`. The parent must already exist; the
    /// new loom starts with a root branch `main` announced on the
    /// parent's control log.
    pub fn embed(&self, path: &LoomPath) -> LoomResult<Arc<Loom>> {
        let Some(parent_path) = path.parent() else {
            return Err(LoomError::LoomExists(LoomPath::root()));
        };
        self.check(path, AccessKind::Write)?;
        // The parent must resolve (and accept writes) before anything
        // registers below it.
        let parent = self.loom(&parent_path)?;
        if parent.is_archived() {
            return Err(LoomError::Archived(parent_path));
        }

        let child = {
            let mut registry = self.registry.write().expect("lock poisoned");
            if registry.contains_key(path) {
                return Err(LoomError::LoomExists(path.clone()));
            }
            let child = Arc::new(Loom::at_path(
                self.config.clone(),
                Arc::new(InMemoryBlobStore::new()),
                path.clone(),
            ));
            registry.insert(path.clone(), Arc::clone(&child));
            child
        };

        let leaf = path.leaf().expect("non-root path has a leaf").clone();
        self.record_envelope(
            &parent_path,
            ControlEnvelope::Branch {
                loom: leaf,
                name: loom_log::ROOT_BRANCH.to_string(),
                parent: None,
                at: Sequence::ZERO,
            },
        )?;
        info!(path = %path, "loom embedded");
        Ok(child)
    }

    /// Append an envelope on the control log of the loom at `at_path`,
    /// then announce that append one level further up, recursively.
    fn record_envelope(&self, at_path: &LoomPath, envelope: ControlEnvelope) -> LoomResult<()> {
        let loom = self.loom(at_path)?;
        let branch = loom.current_branch()?.name;
        let record = loom.append_to(&branch, envelope.to_draft()?)?;
        if let Some(parent_path) = at_path.parent() {
            let leaf = at_path.leaf().expect("non-root path has a leaf").clone();
            self.record_envelope(
                &parent_path,
                ControlEnvelope::Append {
                    loom: leaf,
                    branch,
                    seq: record.sequence,
                    record_id: record.id,
                },
            )?;
        }
        Ok(())
    }

    // ---- Mutations of embedded looms ----

    /// Append to a branch of the loom at `path`, dual-writing the
    /// control envelope chain.
    pub fn append_in(
        &self,
        path: &LoomPath,
        branch: &str,
        draft: RecordDraft,
    ) -> LoomResult<Record> {
        self.check(path, AccessKind::Write)?;
        let loom = self.loom(path)?;
        let record = loom.append_to(branch, draft)?;
        if let Some(parent_path) = path.parent() {
            let leaf = path.leaf().expect("non-root path has a leaf").clone();
            self.record_envelope(
                &parent_path,
                ControlEnvelope::Append {
                    loom: leaf,
                    branch: branch.to_string(),
                    seq: record.sequence,
                    record_id: record.id,
                },
            )?;
        }
        Ok(record)
    }

    /// Create a branch in the loom at `path`, announced on the control
    /// log chain.
    pub fn create_branch_in(
        &self,
        path: &LoomPath,
        name: &str,
        from: Option<&str>,
        at: Option<Sequence>,
    ) -> LoomResult<Branch> {
        self.check(path, AccessKind::Write)?;
        let loom = self.loom(path)?;
        let branch = match (from, at) {
            (Some(parent), at) => loom.create_branch_at(name, parent, at)?,
            (None, None) => loom.create_branch(name, None)?,
            (None, Some(at)) => {
                let current = loom.current_branch()?.name;
                loom.create_branch_at(name, &current, Some(at))?
            }
        };
        if let Some(parent_path) = path.parent() {
            let leaf = path.leaf().expect("non-root path has a leaf").clone();
            let parent_name = branch
                .parent
                .and_then(|pid| loom.forest().get_by_id(pid))
                .map(|p| p.name);
            self.record_envelope(
                &parent_path,
                ControlEnvelope::Branch {
                    loom: leaf,
                    name: name.to_string(),
                    parent: parent_name,
                    at: branch.base(),
                },
            )?;
        }
        Ok(branch)
    }

    /// Merge two branches of the loom at `path`, announced as a
    /// `loom:merge` envelope.
    pub fn merge_in(
        &self,
        path: &LoomPath,
        target: &str,
        left: &str,
        right: &str,
        resolver: &dyn MergeResolver,
    ) -> LoomResult<Record> {
        self.check(path, AccessKind::Write)?;
        let loom = self.loom(path)?;
        let record = loom.merge(target, left, right, resolver)?;
        if let Some(parent_path) = path.parent() {
            let leaf = path.leaf().expect("non-root path has a leaf").clone();
            self.record_envelope(
                &parent_path,
                ControlEnvelope::Merge {
                    loom: leaf,
                    into: target.to_string(),
                    left: left.to_string(),
                    right: right.to_string(),
                    seq: record.sequence,
                    merge_record_id: record.id,
                },
            )?;
        }
        Ok(record)
    }

    // ---- Garbage collection tiers ----

    /// Tier A: mark the loom at `path` inactive with an archive
    /// envelope. No data is removed.
    pub fn archive(&self, path: &LoomPath) -> LoomResult<()> {
        let Some(parent_path) = path.parent() else {
            // The root has no control log above it to archive into.
            return Err(LoomError::LoomNotFound(LoomPath::root()));
        };
        self.check(path, AccessKind::Write)?;
        let loom = self.loom(path)?;
        loom.set_archived();
        let leaf = path.leaf().expect("non-root path has a leaf").clone();
        self.record_envelope(&parent_path, ControlEnvelope::Archive { loom: leaf })?;
        info!(path = %path, "loom archived");
        Ok(())
    }

    /// Tier C: compact an archived loom down to its latest checkpoints.
    pub fn compact(&self, path: &LoomPath) -> LoomResult<CompactionReport> {
        self.check(path, AccessKind::Write)?;
        let loom = self.loom(path)?;
        if !loom.is_archived() {
            return Err(LoomError::NotArchived(path.clone()));
        }
        let report = loom_gc::compact(
            loom.forest(),
            loom.log(),
            loom.checkpoints(),
            loom.blobs().as_ref(),
        )?;
        Ok(report)
    }

    /// Tier B on the loom at `path`. Envelope deletion can strand heads
    /// snapshots, so the indexes for that loom are dropped.
    pub fn collect_garbage(&self, path: &LoomPath) -> LoomResult<GcReport> {
        self.check(path, AccessKind::Write)?;
        let loom = self.loom(path)?;
        let report = loom.collect_garbage()?;
        if let Some(index) = self
            .indices
            .read()
            .expect("lock poisoned")
            .get(path)
            .cloned()
        {
            index.clear();
        }
        Ok(report)
    }

    // ---- Time travel ----

    fn index_for(&self, path: &LoomPath) -> Arc<HeadsIndex> {
        if let Some(index) = self.indices.read().expect("lock poisoned").get(path) {
            return Arc::clone(index);
        }
        let mut indices = self.indices.write().expect("lock poisoned");
        Arc::clone(
            indices
                .entry(path.clone())
                .or_insert_with(|| Arc::new(HeadsIndex::new(self.config.heads))),
        )
    }

    /// `Heads(loom, outerSeq)` on the root's current branch.
    pub fn heads(&self, path: &LoomPath, outer_seq: Sequence) -> LoomResult<HeadsMap> {
        let branch = self.root.current_branch()?.name;
        self.heads_on(path, &branch, outer_seq)
    }

    /// `Heads(loom, outerSeq)` as seen from a specific outer branch.
    ///
    /// Recursive embedding resolves one level at a time: each level's
    /// heads map yields the control-branch sequence at which to recurse
    /// into the next loom.
    pub fn heads_on(
        &self,
        path: &LoomPath,
        outer_branch: &str,
        outer_seq: Sequence,
    ) -> LoomResult<HeadsMap> {
        if path.is_root() {
            return Err(LoomError::LoomNotFound(LoomPath::root()));
        }
        self.check(path, AccessKind::Read)?;

        let mut level = Arc::clone(&self.root);
        let mut level_path = LoomPath::root();
        let mut branch = outer_branch.to_string();
        let mut seq = outer_seq;

        let segments = path.segments();
        for (depth, segment) in segments.iter().enumerate() {
            let index = self.index_for(&level_path);
            let map = index.heads(level.forest(), level.log(), &branch, seq, segment)?;
            if depth + 1 == segments.len() {
                return Ok(map);
            }
            level_path = level_path.child(segment.clone());
            let child = self.loom(&level_path)?;
            let child_branch = child.current_branch()?.name;
            seq = map.get(&child_branch).copied().unwrap_or(Sequence::ZERO);
            branch = child_branch;
            level = child;
        }
        unreachable!("non-root paths have at least one segment")
    }

    /// Observe an embedded loom as of an outer sequence: every inner
    /// branch's visible records at its frozen head.
    pub fn observe(
        &self,
        path: &LoomPath,
        outer_seq: Sequence,
    ) -> LoomResult<BTreeMap<String, Vec<Record>>> {
        let branch = self.root.current_branch()?.name;
        self.observe_on(path, &branch, outer_seq)
    }

    /// [`observe`](Self::observe) from a specific outer branch.
    pub fn observe_on(
        &self,
        path: &LoomPath,
        outer_branch: &str,
        outer_seq: Sequence,
    ) -> LoomResult<BTreeMap<String, Vec<Record>>> {
        let heads = self.heads_on(path, outer_branch, outer_seq)?;
        let loom = self.loom(path)?;
        let mut view = BTreeMap::new();
        for (branch, head) in heads {
            let Some(meta) = loom.forest().get(&branch) else {
                continue;
            };
            let at = head.min(meta.head);
            view.insert(
                branch.clone(),
                visible(loom.forest(), loom.log(), &branch, at)?,
            );
        }
        Ok(view)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loom_log::ROOT_BRANCH;
    use serde_json::json;

    fn path(text: &str) -> LoomPath {
        LoomPath::parse(text).unwrap()
    }

    fn draft(n: u64) -> RecordDraft {
        RecordDraft::new("message", json!({ "n": n }))
    }

    #[test]
    fn embed_registers_and_announces() {
        let weave = Weave::new(LoomConfig::default());
        weave.embed(&path("inner")).unwrap();

        assert!(weave.loom(&path("inner")).is_ok());
        assert!(matches!(
            weave.embed(&path("inner")).unwrap_err(),
            LoomError::LoomExists(_)
        ));
        // The announcement landed on the root control log.
        assert_eq!(weave.root().current_branch().unwrap().head, Sequence(1));

        // A parent must exist before a child registers below it.
        assert!(matches!(
            weave.embed(&path("ghost/leaf")).unwrap_err(),
            LoomError::LoomNotFound(_)
        ));
    }

    #[test]
    fn append_in_dual_writes() {
        let weave = Weave::new(LoomConfig::default());
        weave.embed(&path("inner")).unwrap();
        let record = weave
            .append_in(&path("inner"), ROOT_BRANCH, draft(1))
            .unwrap();

        // Inner loom holds the real record.
        let inner = weave.loom(&path("inner")).unwrap();
        assert_eq!(inner.record(record.id).unwrap().payload["n"], 1);

        // Root control log holds embed announcement + append envelope.
        let root_head = weave.root().current_branch().unwrap().head;
        assert_eq!(root_head, Sequence(2));

        let heads = weave.heads(&path("inner"), root_head).unwrap();
        assert_eq!(heads.get(ROOT_BRANCH), Some(&Sequence(1)));
    }

    #[test]
    fn heads_travel_backwards_in_outer_time() {
        let weave = Weave::new(LoomConfig::default());
        weave.embed(&path("inner")).unwrap(); // outer seq 1
        weave
            .append_in(&path("inner"), ROOT_BRANCH, draft(1))
            .unwrap(); // outer seq 2
        weave
            .append_in(&path("inner"), ROOT_BRANCH, draft(2))
            .unwrap(); // outer seq 3

        assert_eq!(
            weave.heads(&path("inner"), Sequence(3)).unwrap()[ROOT_BRANCH],
            Sequence(2)
        );
        assert_eq!(
            weave.heads(&path("inner"), Sequence(2)).unwrap()[ROOT_BRANCH],
            Sequence(1)
        );
        assert!(weave
            .heads(&path("inner"), Sequence(1))
            .unwrap()
            .get(ROOT_BRANCH)
            .is_none()
            || weave.heads(&path("inner"), Sequence(1)).unwrap()[ROOT_BRANCH]
                == Sequence::ZERO);
    }

    #[test]
    fn observe_reads_frozen_state() {
        let weave = Weave::new(LoomConfig::default());
        weave.embed(&path("inner")).unwrap();
        weave
            .append_in(&path("inner"), ROOT_BRANCH, draft(1))
            .unwrap();
        weave
            .append_in(&path("inner"), ROOT_BRANCH, draft(2))
            .unwrap();

        let at_two = weave.observe(&path("inner"), Sequence(2)).unwrap();
        assert_eq!(at_two[ROOT_BRANCH].len(), 1);
        let at_three = weave.observe(&path("inner"), Sequence(3)).unwrap();
        assert_eq!(at_three[ROOT_BRANCH].len(), 2);
    }

    #[test]
    fn acl_gates_embedded_writes() {
        let weave = Weave::new(LoomConfig::default());
        weave.embed(&path("inner")).unwrap();
        weave
            .grant("alice", &path("inner"), AccessKind::Write)
            .unwrap();

        weave.set_principal(Some("mallory".into()));
        assert!(matches!(
            weave
                .append_in(&path("inner"), ROOT_BRANCH, draft(1))
                .unwrap_err(),
            LoomError::Acl(_)
        ));

        weave.set_principal(Some("alice".into()));
        weave
            .append_in(&path("inner"), ROOT_BRANCH, draft(1))
            .unwrap();

        // The root itself was never scoped.
        weave.set_principal(Some("mallory".into()));
        weave
            .append_in(&LoomPath::root(), ROOT_BRANCH, draft(9))
            .unwrap();
    }

    #[test]
    fn archive_then_compact() {
        let weave = Weave::new(LoomConfig::default());
        weave.embed(&path("inner")).unwrap();
        for n in 1..=4 {
            weave
                .append_in(&path("inner"), ROOT_BRANCH, loom_log::cell_push("items", json!(n)))
                .unwrap();
        }

        // Compaction requires archival first.
        assert!(matches!(
            weave.compact(&path("inner")).unwrap_err(),
            LoomError::NotArchived(_)
        ));

        weave.archive(&path("inner")).unwrap();
        let inner = weave.loom(&path("inner")).unwrap();
        assert!(inner.is_archived());
        assert!(matches!(
            weave
                .append_in(&path("inner"), ROOT_BRANCH, draft(9))
                .unwrap_err(),
            LoomError::Archived(_)
        ));

        let report = weave.compact(&path("inner")).unwrap();
        assert_eq!(report.records_discarded, 4);
        // State at head still reconstructs from the kept checkpoint.
        assert_eq!(inner.cell_len("items").unwrap(), 4);
    }

    #[test]
    fn recursive_embedding_resolves_by_levels() {
        let weave = Weave::new(LoomConfig::default());
        weave.embed(&path("mid")).unwrap();
        weave.embed(&path("mid/leaf")).unwrap();
        weave
            .append_in(&path("mid/leaf"), ROOT_BRANCH, draft(1))
            .unwrap();

        let root_head = weave.root().current_branch().unwrap().head;
        let heads = weave.heads(&path("mid/leaf"), root_head).unwrap();
        assert_eq!(heads[ROOT_BRANCH], Sequence(1));

        let view = weave.observe(&path("mid/leaf"), root_head).unwrap();
        assert_eq!(view[ROOT_BRANCH].len(), 1);
    }
}
