//! The single-store facade.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use loom_bus::{BranchSummary, EventFilter, LoomEvent, RecordSummary, SubscriptionBus, SubscriptionId};
use loom_gc::{GcPolicy, GcReport};
use loom_log::{
    reconstruct, take_checkpoint, visible, visible_tail, BranchForest, CheckpointStore, LogError,
    MaterializedState, RecordLog, CELL_PUSH, CELL_SET,
};
use loom_merge::MergeResolver;
use loom_store::{BlobStore, InMemoryBlobStore};
use loom_types::{Branch, ContentHash, LoomPath, Record, RecordDraft, RecordId, Sequence};
use serde_json::Value;
use tracing::warn;

use crate::config::LoomConfig;
use crate::error::{LoomError, LoomResult};
use crate::query::{QueryPage, QueryParams};

/// Aggregate statistics for one store.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LoomStats {
    pub record_count: u64,
    pub branch_count: u64,
    pub checkpoint_count: u64,
    /// Materialized cells on the current branch.
    pub cell_count: u64,
    pub blob_count: u64,
    pub blob_bytes: u64,
    pub subscription_count: u64,
}

/// One branching, event-sourced record store.
///
/// All mutation goes through `append` (and the merge/branch operations
/// built on it); all observation goes through the query, cell, and
/// subscription surfaces. Embedded looms are driven through
/// [`Weave`](crate::Weave) so their control envelopes are written.
pub struct Loom {
    config: LoomConfig,
    path: LoomPath,
    forest: BranchForest,
    log: RecordLog,
    checkpoints: CheckpointStore,
    blobs: Arc<dyn BlobStore>,
    bus: SubscriptionBus,
    current: RwLock<String>,
    archived: AtomicBool,
}

impl std::fmt::Debug for Loom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Loom")
            .field("path", &self.path)
            .field("archived", &self.archived.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl Loom {
    /// Create a root store with in-memory blob storage.
    pub fn new(config: LoomConfig) -> Self {
        Self::with_blobs(config, Arc::new(InMemoryBlobStore::new()))
    }

    /// Create a root store over a specific blob backend.
    pub fn with_blobs(config: LoomConfig, blobs: Arc<dyn BlobStore>) -> Self {
        Self::at_path(config, blobs, LoomPath::root())
    }

    pub(crate) fn at_path(
        config: LoomConfig,
        blobs: Arc<dyn BlobStore>,
        path: LoomPath,
    ) -> Self {
        let bus = SubscriptionBus::new(config.bus);
        Self {
            config,
            path,
            forest: BranchForest::new(),
            log: RecordLog::new(),
            checkpoints: CheckpointStore::new(),
            blobs,
            bus,
            current: RwLock::new(loom_log::ROOT_BRANCH.to_string()),
            archived: AtomicBool::new(false),
        }
    }

    /// The path this store lives at (empty for a root store).
    pub fn path(&self) -> &LoomPath {
        &self.path
    }

    // ---- Branch operations ----

    /// All branches.
    pub fn branches(&self) -> Vec<Branch> {
        self.forest.list()
    }

    /// The current branch.
    pub fn current_branch(&self) -> LoomResult<Branch> {
        let name = self.current.read().expect("lock poisoned").clone();
        Ok(self.forest.require(&name)?)
    }

    /// Create a branch from `from` (default: the current branch) at its
    /// head.
    pub fn create_branch(&self, name: &str, from: Option<&str>) -> LoomResult<Branch> {
        let parent = match from {
            Some(parent) => parent.to_string(),
            None => self.current.read().expect("lock poisoned").clone(),
        };
        self.create_branch_at(name, &parent, None)
    }

    /// Create a branch from `from` at a specific sequence.
    pub fn create_branch_at(
        &self,
        name: &str,
        from: &str,
        at: Option<Sequence>,
    ) -> LoomResult<Branch> {
        self.ensure_active()?;
        let branch = self.forest.create(name, Some(from), at)?;
        let parent_name = branch
            .parent
            .and_then(|pid| self.forest.get_by_id(pid))
            .map(|p| p.name);
        self.bus.publish(
            &LoomEvent::BranchCreated {
                branch: BranchSummary::from_branch(&branch, parent_name),
            },
            None,
        );
        Ok(branch)
    }

    /// Switch the current branch. Fails `BranchNotFound` if unknown.
    pub fn switch_branch(&self, name: &str) -> LoomResult<Branch> {
        let branch = self.forest.require(name)?;
        *self.current.write().expect("lock poisoned") = name.to_string();
        Ok(branch)
    }

    /// Delete a branch. The current branch and roots are protected;
    /// records stay until garbage collection reclaims them.
    pub fn delete_branch(&self, name: &str) -> LoomResult<()> {
        {
            let current = self.current.read().expect("lock poisoned");
            if *current == name {
                return Err(LogError::CannotDeleteProtected(name.to_string()).into());
            }
        }
        let removed = self.forest.delete(name)?;
        self.checkpoints.remove_branch(removed.id);
        self.bus.publish(
            &LoomEvent::BranchDeleted {
                name: name.to_string(),
            },
            None,
        );
        Ok(())
    }

    // ---- Record operations ----

    /// Append a record to the current branch.
    pub fn append(&self, draft: RecordDraft) -> LoomResult<Record> {
        let branch = self.current.read().expect("lock poisoned").clone();
        self.append_to(&branch, draft)
    }

    /// Append a record to a named branch.
    pub fn append_to(&self, branch: &str, draft: RecordDraft) -> LoomResult<Record> {
        self.ensure_active()?;
        let record = self.log.append(&self.forest, branch, draft)?;
        self.publish_record(branch, &record);
        self.maybe_checkpoint(branch);
        Ok(record)
    }

    /// Fetch a record by id.
    pub fn record(&self, id: RecordId) -> LoomResult<Record> {
        self.log.get(id).ok_or(LoomError::RecordNotFound(id))
    }

    /// Records that name `id` in their `caused_by` set.
    pub fn effects(&self, id: RecordId) -> LoomResult<Vec<RecordId>> {
        if !self.log.contains(id) {
            return Err(LoomError::RecordNotFound(id));
        }
        Ok(self.log.effects_of(id))
    }

    /// Records that name `id` in their `linked_to` set.
    pub fn back_links(&self, id: RecordId) -> LoomResult<Vec<RecordId>> {
        if !self.log.contains(id) {
            return Err(LoomError::RecordNotFound(id));
        }
        Ok(self.log.back_links_of(id))
    }

    /// Query visible records on the current branch.
    pub fn query(&self, params: QueryParams) -> LoomResult<QueryPage> {
        let branch = self.current_branch()?;
        let to = params.to.unwrap_or(branch.head);
        let records = if params.reverse {
            visible_tail(&self.forest, &self.log, &branch.name, to, usize::MAX)?
        } else {
            visible(&self.forest, &self.log, &branch.name, to)?
        };
        let matching: Vec<Record> = records.into_iter().filter(|r| params.matches(r)).collect();
        Ok(QueryPage::paginate(matching, params.offset, params.limit))
    }

    // ---- Materialized cells ----

    /// Materialized state of a branch at a sequence, falling back to
    /// full replay when a checkpoint is corrupt.
    pub fn state_at(&self, branch: &str, at: Sequence) -> LoomResult<MaterializedState> {
        match reconstruct(
            &self.forest,
            &self.log,
            &self.checkpoints,
            self.blobs.as_ref(),
            branch,
            at,
        ) {
            Ok(state) => Ok(state),
            Err(LogError::Corruption(reason)) => {
                warn!(branch, %at, reason, "corrupt checkpoint; replaying from genesis");
                let records = visible(&self.forest, &self.log, branch, at)?;
                Ok(MaterializedState::fold(&records))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn head_state(&self) -> LoomResult<MaterializedState> {
        let branch = self.current_branch()?;
        self.state_at(&branch.name, branch.head)
    }

    /// Current value of a cell on the current branch.
    pub fn cell_value(&self, cell: &str) -> LoomResult<Value> {
        self.head_state()?
            .cell(cell)
            .cloned()
            .ok_or_else(|| LogError::StateNotFound(cell.to_string()).into())
    }

    /// Value of a cell at a historical sequence of the current branch.
    pub fn cell_value_at(&self, cell: &str, at: Sequence) -> LoomResult<Value> {
        let branch = self.current_branch()?;
        self.state_at(&branch.name, at)?
            .cell(cell)
            .cloned()
            .ok_or_else(|| LogError::StateNotFound(cell.to_string()).into())
    }

    /// Length of a cell (list length, or 1 for scalars).
    pub fn cell_len(&self, cell: &str) -> LoomResult<usize> {
        self.head_state()?
            .len_of(cell)
            .ok_or_else(|| LogError::StateNotFound(cell.to_string()).into())
    }

    /// A slice of a list cell.
    pub fn cell_slice(&self, cell: &str, offset: usize, limit: usize) -> LoomResult<Vec<Value>> {
        let value = self.cell_value(cell)?;
        let items = match value {
            Value::Array(items) => items,
            other => vec![other],
        };
        let start = offset.min(items.len());
        let end = offset.saturating_add(limit).min(items.len());
        Ok(items[start..end].to_vec())
    }

    /// The last `count` items of a list cell, via a reverse scan that
    /// stops as soon as the tail is filled (or a `cell:set` resets the
    /// list).
    pub fn cell_tail(&self, cell: &str, count: usize) -> LoomResult<Vec<Value>> {
        let branch = self.current_branch()?;
        let records = visible_tail(&self.forest, &self.log, &branch.name, branch.head, usize::MAX)?;
        let mut tail: Vec<Value> = Vec::new();
        let mut found = false;
        for record in &records {
            if count > 0 && tail.len() >= count {
                break;
            }
            if !matches!(record.record_type.as_str(), CELL_SET | CELL_PUSH) {
                continue;
            }
            let names_cell = record.payload.get("cell").and_then(Value::as_str) == Some(cell);
            if !names_cell {
                continue;
            }
            found = true;
            if count == 0 {
                break;
            }
            match record.record_type.as_str() {
                CELL_PUSH => {
                    if let Some(item) = record.payload.get("item") {
                        tail.push(item.clone());
                    }
                }
                CELL_SET => {
                    // A set is the floor of the list: take what we still
                    // need from its end and stop.
                    if let Some(value) = record.payload.get("value") {
                        match value.as_array() {
                            Some(items) => {
                                let need = count - tail.len();
                                let start = items.len().saturating_sub(need);
                                for item in items[start..].iter().rev() {
                                    tail.push(item.clone());
                                }
                            }
                            None => tail.push(value.clone()),
                        }
                    }
                    break;
                }
                _ => {}
            }
        }
        if !found {
            return Err(LogError::StateNotFound(cell.to_string()).into());
        }
        tail.reverse();
        Ok(tail)
    }

    // ---- Subscriptions ----

    /// Subscribe with a filter. `from` positions historical replay;
    /// default is the current head (live events only).
    pub fn subscribe(
        &self,
        filter: EventFilter,
        from: Option<Sequence>,
    ) -> LoomResult<SubscriptionId> {
        let cursor = match from {
            Some(seq) => seq,
            None => {
                let branch = match &filter.branch {
                    Some(name) => self.forest.require(name)?,
                    None => self.current_branch()?,
                };
                branch.head
            }
        };
        Ok(self.bus.subscribe(filter, cursor))
    }

    /// Replay history into the subscription, then switch it live.
    pub fn catch_up(&self, id: SubscriptionId) -> LoomResult<()> {
        let filter = self.bus.filter(id)?;
        let branch = match &filter.branch {
            Some(name) => name.clone(),
            None => self.current_branch()?.name,
        };
        loop {
            let cursor = self.bus.cursor(id)?;
            let head = self.forest.require(&branch)?.head;
            if head > cursor {
                let records = visible(&self.forest, &self.log, &branch, head)?;
                let mut events = Vec::new();
                for record in records.iter().filter(|r| r.sequence > cursor) {
                    events.extend(self.events_for(&branch, record));
                }
                self.bus.deliver_historical(id, events, head)?;
            }
            if self.bus.finish_catch_up(id, head.max(cursor))? {
                return Ok(());
            }
        }
    }

    /// Drain the next buffered event, non-blocking.
    pub fn poll(&self, id: SubscriptionId) -> LoomResult<Option<LoomEvent>> {
        Ok(self.bus.poll(id)?)
    }

    /// Destroy a subscription. Idempotent.
    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.bus.unsubscribe(id);
    }

    // ---- Merging ----

    /// Merge two branch heads into a record on `target`.
    pub fn merge(
        &self,
        target: &str,
        left: &str,
        right: &str,
        resolver: &dyn MergeResolver,
    ) -> LoomResult<Record> {
        self.ensure_active()?;
        let record = loom_merge::merge(
            &self.forest,
            &self.log,
            &self.checkpoints,
            self.blobs.as_ref(),
            target,
            left,
            right,
            resolver,
        )?;
        self.publish_record(target, &record);
        self.maybe_checkpoint(target);
        Ok(record)
    }

    // ---- Maintenance ----

    /// Run a tier-B garbage collection with the configured policy.
    pub fn collect_garbage(&self) -> LoomResult<GcReport> {
        self.collect_garbage_with(&self.config.gc)
    }

    /// Run a tier-B garbage collection with an explicit policy.
    pub fn collect_garbage_with(&self, policy: &GcPolicy) -> LoomResult<GcReport> {
        Ok(loom_gc::collect(
            &self.forest,
            &self.log,
            &self.checkpoints,
            policy,
        )?)
    }

    /// Force a checkpoint of a branch at its head.
    pub fn checkpoint_now(&self, branch: &str) -> LoomResult<()> {
        take_checkpoint(
            &self.forest,
            &self.log,
            &self.checkpoints,
            self.blobs.as_ref(),
            branch,
        )?;
        Ok(())
    }

    /// Aggregate statistics.
    pub fn stats(&self) -> LoomResult<LoomStats> {
        Ok(LoomStats {
            record_count: self.log.record_count(),
            branch_count: self.forest.count() as u64,
            checkpoint_count: self.checkpoints.count() as u64,
            cell_count: self.head_state()?.cells.len() as u64,
            blob_count: self.blobs.len()?,
            blob_bytes: self.blobs.total_bytes()?,
            subscription_count: self.bus.subscription_count() as u64,
        })
    }

    /// Flush blob storage to durable media.
    pub fn flush(&self) -> LoomResult<()> {
        Ok(self.blobs.flush()?)
    }

    // ---- Blobs ----

    /// Store an opaque payload by content hash.
    pub fn store_blob(&self, data: &[u8]) -> LoomResult<ContentHash> {
        Ok(self.blobs.store(data)?)
    }

    /// Fetch a payload by content hash.
    pub fn fetch_blob(&self, hash: &ContentHash) -> LoomResult<Vec<u8>> {
        self.blobs
            .fetch(hash)?
            .ok_or(LoomError::BlobNotFound(*hash))
    }

    // ---- Archival ----

    /// Returns `true` once the loom was archived (GC tier A).
    pub fn is_archived(&self) -> bool {
        self.archived.load(Ordering::SeqCst)
    }

    pub(crate) fn set_archived(&self) {
        self.archived.store(true, Ordering::SeqCst);
    }

    fn ensure_active(&self) -> LoomResult<()> {
        if self.is_archived() {
            return Err(LoomError::Archived(self.path.clone()));
        }
        Ok(())
    }

    // ---- Component access (sync, diagnostics) ----

    /// The branch forest.
    pub fn forest(&self) -> &BranchForest {
        &self.forest
    }

    /// The record log.
    pub fn log(&self) -> &RecordLog {
        &self.log
    }

    /// The checkpoint index.
    pub fn checkpoints(&self) -> &CheckpointStore {
        &self.checkpoints
    }

    /// The blob store.
    pub fn blobs(&self) -> &Arc<dyn BlobStore> {
        &self.blobs
    }

    // ---- Internals ----

    fn events_for(&self, branch: &str, record: &Record) -> Vec<LoomEvent> {
        let mut events = vec![LoomEvent::RecordAppended {
            record: RecordSummary::from_record(record, branch, self.bus.payload_threshold()),
        }];
        if matches!(record.record_type.as_str(), CELL_SET | CELL_PUSH) {
            if let Some(cell) = record.payload.get("cell").and_then(Value::as_str) {
                events.push(LoomEvent::CellChanged {
                    cell: cell.to_string(),
                    sequence: record.sequence,
                });
            }
        }
        events
    }

    fn publish_record(&self, branch: &str, record: &Record) {
        for event in self.events_for(branch, record) {
            self.bus.publish(&event, Some(record.sequence));
        }
        self.bus.publish(
            &LoomEvent::BranchHead {
                branch: branch.to_string(),
                head: record.sequence,
            },
            None,
        );
    }

    fn maybe_checkpoint(&self, branch: &str) {
        let Some(meta) = self.forest.get(branch) else {
            return;
        };
        let latest = self.checkpoints.latest(meta.id).map(|cp| cp.sequence);
        if !self.config.checkpoint.due(meta.head, latest) {
            return;
        }
        // Runs after the append committed, outside the append guard;
        // the append path never waits on state serialization.
        if let Err(e) = take_checkpoint(
            &self.forest,
            &self.log,
            &self.checkpoints,
            self.blobs.as_ref(),
            branch,
        ) {
            warn!(branch, error = %e, "checkpoint failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loom_log::{cell_push, cell_set, ROOT_BRANCH};
    use serde_json::json;

    fn store() -> Loom {
        Loom::new(LoomConfig::default())
    }

    #[test]
    fn append_and_fetch() {
        let loom = store();
        let record = loom
            .append(RecordDraft::new("message", json!({"text": "hi"})))
            .unwrap();
        assert_eq!(record.sequence, Sequence(1));
        assert_eq!(loom.record(record.id).unwrap().payload["text"], "hi");
        assert!(matches!(
            loom.record(RecordId::new()).unwrap_err(),
            LoomError::RecordNotFound(_)
        ));
    }

    #[test]
    fn branch_lifecycle() {
        let loom = store();
        loom.append(RecordDraft::new("m", json!(1))).unwrap();
        loom.create_branch("feature", None).unwrap();
        loom.switch_branch("feature").unwrap();
        assert_eq!(loom.current_branch().unwrap().name, "feature");

        // The current branch is protected.
        let err = loom.delete_branch("feature").unwrap_err();
        assert!(matches!(
            err,
            LoomError::Log(LogError::CannotDeleteProtected(_))
        ));
        loom.switch_branch(ROOT_BRANCH).unwrap();
        loom.delete_branch("feature").unwrap();
        assert!(matches!(
            loom.switch_branch("feature").unwrap_err(),
            LoomError::Log(LogError::BranchNotFound(_))
        ));
    }

    #[test]
    fn query_pagination_and_reverse() {
        let loom = store();
        for n in 1..=10 {
            loom.append(RecordDraft::new("m", json!(n))).unwrap();
        }
        let page = loom
            .query(QueryParams::default().limit(4).offset(4))
            .unwrap();
        assert_eq!(page.records.len(), 4);
        assert!(page.has_more);
        assert_eq!(page.records[0].sequence, Sequence(5));

        let tail = loom.query(QueryParams::default().limit(3).reverse()).unwrap();
        let seqs: Vec<u64> = tail.records.iter().map(|r| r.sequence.0).collect();
        assert_eq!(seqs, [10, 9, 8]);
        assert!(tail.has_more);

        let typed = loom
            .query(QueryParams::default().types(["missing"]))
            .unwrap();
        assert!(typed.records.is_empty());
        assert!(!typed.has_more);
    }

    #[test]
    fn cells_current_and_historical() {
        let loom = store();
        loom.append(cell_set("title", json!("v1"))).unwrap();
        for n in 1..=5 {
            loom.append(cell_push("items", json!(n))).unwrap();
        }
        loom.append(cell_set("title", json!("v2"))).unwrap();

        assert_eq!(loom.cell_value("title").unwrap(), json!("v2"));
        assert_eq!(loom.cell_value_at("title", Sequence(1)).unwrap(), json!("v1"));
        assert_eq!(loom.cell_len("items").unwrap(), 5);
        assert_eq!(loom.cell_slice("items", 1, 2).unwrap(), vec![json!(2), json!(3)]);
        assert_eq!(
            loom.cell_tail("items", 2).unwrap(),
            vec![json!(4), json!(5)]
        );
        assert!(matches!(
            loom.cell_value("ghost").unwrap_err(),
            LoomError::Log(LogError::StateNotFound(_))
        ));
    }

    #[test]
    fn cell_tail_crosses_a_set_boundary() {
        let loom = store();
        loom.append(cell_set("items", json!([1, 2, 3]))).unwrap();
        loom.append(cell_push("items", json!(4))).unwrap();
        assert_eq!(
            loom.cell_tail("items", 3).unwrap(),
            vec![json!(2), json!(3), json!(4)]
        );
        // Asking for more than exists returns everything.
        assert_eq!(loom.cell_tail("items", 99).unwrap().len(), 4);
    }

    #[test]
    fn checkpoints_follow_the_policy() {
        let loom = Loom::new(LoomConfig {
            checkpoint: loom_log::CheckpointPolicy { every: 5 },
            ..Default::default()
        });
        for n in 1..=12 {
            loom.append(cell_push("items", json!(n))).unwrap();
        }
        let stats = loom.stats().unwrap();
        assert!(stats.checkpoint_count >= 2);
        // Reconstruction agrees with full replay regardless.
        assert_eq!(loom.cell_len("items").unwrap(), 12);
    }

    #[test]
    fn subscription_roundtrip_with_history() {
        let loom = store();
        for n in 1..=3 {
            loom.append(cell_push("items", json!(n))).unwrap();
        }
        let id = loom
            .subscribe(EventFilter::cells(["items"]), Some(Sequence(1)))
            .unwrap();
        loom.catch_up(id).unwrap();

        // Historical: cell changes for records 2 and 3, then CaughtUp.
        let mut seen = Vec::new();
        while let Some(event) = loom.poll(id).unwrap() {
            seen.push(event);
        }
        assert_eq!(
            seen,
            vec![
                LoomEvent::CellChanged { cell: "items".into(), sequence: Sequence(2) },
                LoomEvent::CellChanged { cell: "items".into(), sequence: Sequence(3) },
                LoomEvent::CaughtUp,
            ]
        );

        // Live: exactly one event per append, in order.
        loom.append(cell_push("items", json!(4))).unwrap();
        loom.append(cell_push("items", json!(5))).unwrap();
        let mut live = Vec::new();
        while let Some(event) = loom.poll(id).unwrap() {
            live.push(event);
        }
        assert_eq!(
            live,
            vec![
                LoomEvent::CellChanged { cell: "items".into(), sequence: Sequence(4) },
                LoomEvent::CellChanged { cell: "items".into(), sequence: Sequence(5) },
            ]
        );
        loom.unsubscribe(id);
        loom.unsubscribe(id);
    }

    #[test]
    fn merge_through_the_facade() {
        let loom = store();
        loom.append(cell_set("base", json!(1))).unwrap();
        loom.create_branch("feature", None).unwrap();
        loom.append_to("feature", cell_set("extra", json!(2))).unwrap();

        let record = loom
            .merge(ROOT_BRANCH, ROOT_BRANCH, "feature", &crate::UnionCells)
            .unwrap();
        assert_eq!(record.record_type, loom_merge::MERGE);
        assert_eq!(record.caused_by.len(), 2);
    }

    #[test]
    fn blobs_and_stats_and_flush() {
        let loom = store();
        let hash = loom.store_blob(b"payload").unwrap();
        assert_eq!(loom.fetch_blob(&hash).unwrap(), b"payload");
        assert!(matches!(
            loom.fetch_blob(&ContentHash::of(b"missing")).unwrap_err(),
            LoomError::BlobNotFound(_)
        ));

        loom.append(RecordDraft::new("m", json!(1))).unwrap();
        let stats = loom.stats().unwrap();
        assert_eq!(stats.record_count, 1);
        assert_eq!(stats.branch_count, 1);
        assert_eq!(stats.blob_count, 1);
        loom.flush().unwrap();
    }

    #[test]
    fn archived_loom_rejects_mutation() {
        let loom = store();
        loom.set_archived();
        assert!(matches!(
            loom.append(RecordDraft::new("m", json!(1))).unwrap_err(),
            LoomError::Archived(_)
        ));
        assert!(matches!(
            loom.create_branch("b", None).unwrap_err(),
            LoomError::Archived(_)
        ));
    }
}
