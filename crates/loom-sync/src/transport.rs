//! The async peer boundary.

use std::sync::Arc;

use async_trait::async_trait;
use loom_log::{BranchForest, RecordLog};

use crate::engine::{advertise, collect};
use crate::error::SyncResult;
use crate::types::{HeadAdvert, RangeRequest, RecordBatch};

/// A remote store reachable over some transport.
///
/// The protocol shape is fixed — advertise heads, fetch ranges — but
/// the wire is not; HTTP, sockets, or in-process calls all fit behind
/// this trait.
#[async_trait]
pub trait SyncPeer: Send + Sync {
    /// The peer's branch-head map.
    async fn advertise(&self) -> SyncResult<HeadAdvert>;

    /// Fetch the requested record ranges.
    async fn fetch(&self, requests: Vec<RangeRequest>) -> SyncResult<Vec<RecordBatch>>;
}

/// An in-process peer: another store in the same process.
pub struct LocalPeer {
    forest: Arc<BranchForest>,
    log: Arc<RecordLog>,
}

impl LocalPeer {
    /// Wrap a store as a peer.
    pub fn new(forest: Arc<BranchForest>, log: Arc<RecordLog>) -> Self {
        Self { forest, log }
    }
}

#[async_trait]
impl SyncPeer for LocalPeer {
    async fn advertise(&self) -> SyncResult<HeadAdvert> {
        Ok(advertise(&self.forest))
    }

    async fn fetch(&self, requests: Vec<RangeRequest>) -> SyncResult<Vec<RecordBatch>> {
        collect(&self.forest, &self.log, &requests)
    }
}
