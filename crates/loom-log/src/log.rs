//! Per-branch append-only record storage.
//!
//! Each branch owns an ordered map from sequence to record plus an
//! append guard. Appends to one branch serialize on that guard — never
//! on a store-wide lock — so unrelated branches append in parallel.
//! Readers take a per-branch read lock and observe either a committed
//! record or its absence, never a partial append.

use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;
use std::sync::{Arc, Mutex, RwLock};

use loom_types::{BranchId, Record, RecordDraft, RecordId, Sequence};
use tracing::debug;

use crate::error::{LogError, LogResult};
use crate::forest::BranchForest;

struct BranchCell {
    /// Linearization point for appends to this branch.
    guard: Mutex<()>,
    records: RwLock<BTreeMap<Sequence, Record>>,
}

impl BranchCell {
    fn new() -> Self {
        Self {
            guard: Mutex::new(()),
            records: RwLock::new(BTreeMap::new()),
        }
    }
}

/// Append-only record log, partitioned per branch.
pub struct RecordLog {
    cells: RwLock<HashMap<BranchId, Arc<BranchCell>>>,
    ids: RwLock<HashMap<RecordId, (BranchId, Sequence)>>,
    /// target -> records that name it in `caused_by`.
    effects: RwLock<HashMap<RecordId, Vec<RecordId>>>,
    /// target -> records that name it in `linked_to`.
    back_links: RwLock<HashMap<RecordId, Vec<RecordId>>>,
}

impl RecordLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self {
            cells: RwLock::new(HashMap::new()),
            ids: RwLock::new(HashMap::new()),
            effects: RwLock::new(HashMap::new()),
            back_links: RwLock::new(HashMap::new()),
        }
    }

    fn cell(&self, branch: BranchId) -> Arc<BranchCell> {
        if let Some(cell) = self.cells.read().expect("lock poisoned").get(&branch) {
            return Arc::clone(cell);
        }
        let mut cells = self.cells.write().expect("lock poisoned");
        Arc::clone(cells.entry(branch).or_insert_with(|| Arc::new(BranchCell::new())))
    }

    /// Append a draft to a branch, assigning `sequence = head + 1` and
    /// advancing the head. Atomic per branch.
    pub fn append(
        &self,
        forest: &BranchForest,
        branch_name: &str,
        draft: RecordDraft,
    ) -> LogResult<Record> {
        let branch = forest.require(branch_name)?;
        let cell = self.cell(branch.id);
        let _guard = cell.guard.lock().expect("lock poisoned");

        // Re-read under the guard (by id, in case the name was rebound):
        // another append may have advanced the head.
        let branch = forest.require_id(branch.id)?;
        let sequence = branch.head.next();
        let record = Record {
            id: RecordId::new(),
            sequence,
            branch: branch.id,
            record_type: draft.record_type,
            payload: draft.payload,
            caused_by: draft.caused_by,
            linked_to: draft.linked_to,
            timestamp: chrono::Utc::now(),
        };

        self.commit(&cell, &record);
        forest.set_head(branch.id, sequence)?;
        debug!(branch = %branch.name, seq = %sequence, kind = %record.record_type, "record appended");
        Ok(record)
    }

    /// Import an already-identified record (sync apply). The record must
    /// land exactly at `head + 1`; its id, payload, links, and timestamp
    /// are preserved, while the branch id is rewritten to the local one.
    pub fn import(
        &self,
        forest: &BranchForest,
        branch_name: &str,
        mut record: Record,
    ) -> LogResult<Record> {
        let branch = forest.require(branch_name)?;
        let cell = self.cell(branch.id);
        let _guard = cell.guard.lock().expect("lock poisoned");

        let branch = forest.require_id(branch.id)?;
        let expected = branch.head.next();
        if record.sequence != expected {
            return Err(LogError::OutOfOrder {
                expected,
                got: record.sequence,
            });
        }
        record.branch = branch.id;
        self.commit(&cell, &record);
        forest.set_head(branch.id, record.sequence)?;
        debug!(branch = %branch.name, seq = %record.sequence, "record imported");
        Ok(record)
    }

    fn commit(&self, cell: &BranchCell, record: &Record) {
        cell.records
            .write()
            .expect("lock poisoned")
            .insert(record.sequence, record.clone());
        self.ids
            .write()
            .expect("lock poisoned")
            .insert(record.id, (record.branch, record.sequence));
        let mut effects = self.effects.write().expect("lock poisoned");
        for target in &record.caused_by {
            effects.entry(*target).or_default().push(record.id);
        }
        drop(effects);
        let mut back_links = self.back_links.write().expect("lock poisoned");
        for target in &record.linked_to {
            back_links.entry(*target).or_default().push(record.id);
        }
    }

    /// Fetch a record by id.
    pub fn get(&self, id: RecordId) -> Option<Record> {
        let (branch, seq) = *self.ids.read().expect("lock poisoned").get(&id)?;
        self.record_at(branch, seq)
    }

    /// Locate a record's branch and sequence by id.
    pub fn locate(&self, id: RecordId) -> Option<(BranchId, Sequence)> {
        self.ids.read().expect("lock poisoned").get(&id).copied()
    }

    /// Returns `true` if the id is known to this log.
    pub fn contains(&self, id: RecordId) -> bool {
        self.ids.read().expect("lock poisoned").contains_key(&id)
    }

    /// Fetch the record at a branch position.
    pub fn record_at(&self, branch: BranchId, seq: Sequence) -> Option<Record> {
        let cell = self.cell(branch);
        let records = cell.records.read().expect("lock poisoned");
        records.get(&seq).cloned()
    }

    /// Records on `branch` with sequence in `(from, to]`, ascending.
    /// An inverted or empty interval yields no records.
    pub fn local_range(&self, branch: BranchId, from: Sequence, to: Sequence) -> Vec<Record> {
        if from >= to {
            return Vec::new();
        }
        let cell = self.cell(branch);
        let records = cell.records.read().expect("lock poisoned");
        records
            .range((Bound::Excluded(from), Bound::Included(to)))
            .map(|(_, r)| r.clone())
            .collect()
    }

    /// Records on `branch` with sequence in `(from, to]`, descending
    /// (nearest-to-`to` first), at most `limit`.
    pub fn local_range_rev(
        &self,
        branch: BranchId,
        from: Sequence,
        to: Sequence,
        limit: usize,
    ) -> Vec<Record> {
        if from >= to {
            return Vec::new();
        }
        let cell = self.cell(branch);
        let records = cell.records.read().expect("lock poisoned");
        records
            .range((Bound::Excluded(from), Bound::Included(to)))
            .rev()
            .take(limit)
            .map(|(_, r)| r.clone())
            .collect()
    }

    /// Records that name `id` in their `caused_by` set.
    pub fn effects_of(&self, id: RecordId) -> Vec<RecordId> {
        self.effects
            .read()
            .expect("lock poisoned")
            .get(&id)
            .cloned()
            .unwrap_or_default()
    }

    /// Records that name `id` in their `linked_to` set.
    pub fn back_links_of(&self, id: RecordId) -> Vec<RecordId> {
        self.back_links
            .read()
            .expect("lock poisoned")
            .get(&id)
            .cloned()
            .unwrap_or_default()
    }

    /// Total records across all branches.
    pub fn record_count(&self) -> u64 {
        self.ids.read().expect("lock poisoned").len() as u64
    }

    /// Local record count for one branch.
    pub fn branch_record_count(&self, branch: BranchId) -> u64 {
        let cell = self.cell(branch);
        let len = cell.records.read().expect("lock poisoned").len();
        len as u64
    }

    /// All record ids currently stored on a branch (ascending sequence).
    pub fn branch_record_ids(&self, branch: BranchId) -> Vec<(Sequence, RecordId)> {
        let cell = self.cell(branch);
        let records = cell.records.read().expect("lock poisoned");
        records.iter().map(|(s, r)| (*s, r.id)).collect()
    }

    /// Branch ids with storage cells, including branches already
    /// deleted from the forest.
    pub fn branch_ids(&self) -> Vec<BranchId> {
        let mut ids: Vec<BranchId> = self
            .cells
            .read()
            .expect("lock poisoned")
            .keys()
            .copied()
            .collect();
        ids.sort();
        ids
    }

    /// Remove a record from storage and all indexes (garbage collection
    /// only — everything else treats the log as append-only). Returns
    /// the removed record, if present.
    pub fn remove(&self, branch: BranchId, seq: Sequence) -> Option<Record> {
        let cell = self.cell(branch);
        let removed = cell.records.write().expect("lock poisoned").remove(&seq)?;
        self.ids.write().expect("lock poisoned").remove(&removed.id);
        let mut effects = self.effects.write().expect("lock poisoned");
        for target in &removed.caused_by {
            if let Some(list) = effects.get_mut(target) {
                list.retain(|r| *r != removed.id);
            }
        }
        drop(effects);
        let mut back_links = self.back_links.write().expect("lock poisoned");
        for target in &removed.linked_to {
            if let Some(list) = back_links.get_mut(target) {
                list.retain(|r| *r != removed.id);
            }
        }
        Some(removed)
    }

    /// Drop a branch's storage entirely (after forest deletion or GC
    /// compaction).
    pub fn drop_branch(&self, branch: BranchId) {
        let cell = self.cell(branch);
        let drained: Vec<Sequence> = {
            let records = cell.records.read().expect("lock poisoned");
            records.keys().copied().collect()
        };
        for seq in drained {
            self.remove(branch, seq);
        }
        self.cells.write().expect("lock poisoned").remove(&branch);
    }
}

impl Default for RecordLog {
    fn default() -> Self {
        Self::new()
    }
}
