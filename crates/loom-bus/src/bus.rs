//! The subscription bus: bounded buffers, catch-up, poll.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use loom_types::Sequence;
use tracing::debug;

use crate::error::{BusError, BusResult};
use crate::event::{DropReason, LoomEvent};
use crate::filter::EventFilter;

/// Unique identifier for a subscription.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub:{}", self.0)
    }
}

/// What happens when a subscription's buffer is full.
///
/// The store keeps accepting appends regardless of subscriber speed;
/// this policy only decides what the slow subscriber loses.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OverflowPolicy {
    /// Terminate the subscription: the queue is replaced by a single
    /// terminal [`LoomEvent::Dropped`] event.
    #[default]
    Disconnect,
    /// Evict the oldest buffered event to make room.
    DropOldest,
}

/// Bus-wide defaults for new subscriptions.
#[derive(Clone, Copy, Debug)]
pub struct BusConfig {
    /// Max buffered events per subscription.
    pub buffer_size: usize,
    /// Payload inlining threshold for record summaries, in bytes.
    pub payload_threshold: usize,
    /// Overflow behavior.
    pub overflow: OverflowPolicy,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            buffer_size: 1024,
            payload_threshold: 4096,
            overflow: OverflowPolicy::Disconnect,
        }
    }
}

/// Everything mutable about one subscription, under a single lock so
/// catch-up and live publishing serialize per subscriber.
struct SubQueue {
    events: VecDeque<LoomEvent>,
    /// Live events that arrived before catch-up finished, with the
    /// sequence of the append that produced them (None for branch
    /// lifecycle events).
    pending: Vec<(Option<Sequence>, LoomEvent)>,
    /// Historical replay cursor: events at or below it were delivered.
    cursor: Sequence,
    caught_up: bool,
    dropped: bool,
}

struct Subscription {
    filter: EventFilter,
    capacity: usize,
    overflow: OverflowPolicy,
    queue: Mutex<SubQueue>,
}

impl Subscription {
    /// Push one event, applying the overflow policy. Returns `false`
    /// if the subscription was terminated by the push.
    fn push(&self, queue: &mut SubQueue, event: LoomEvent) -> bool {
        if queue.dropped {
            return false;
        }
        if queue.events.len() >= self.capacity {
            match self.overflow {
                OverflowPolicy::DropOldest => {
                    queue.events.pop_front();
                }
                OverflowPolicy::Disconnect => {
                    queue.dropped = true;
                    queue.events.clear();
                    queue.events.push_back(LoomEvent::Dropped {
                        reason: DropReason::BufferOverflow,
                    });
                    return false;
                }
            }
        }
        queue.events.push_back(event);
        true
    }
}

/// Delivers live mutation events to consumers with filtering and
/// bounded buffering.
pub struct SubscriptionBus {
    config: BusConfig,
    next_id: AtomicU64,
    subs: RwLock<HashMap<SubscriptionId, Arc<Subscription>>>,
}

impl SubscriptionBus {
    /// Create a bus with the given defaults.
    pub fn new(config: BusConfig) -> Self {
        Self {
            config,
            next_id: AtomicU64::new(1),
            subs: RwLock::new(HashMap::new()),
        }
    }

    /// Payload inlining threshold for record summaries.
    pub fn payload_threshold(&self) -> usize {
        self.config.payload_threshold
    }

    /// Register a subscription. `cursor` is the sequence historical
    /// replay starts after (events at or below it are never delivered).
    pub fn subscribe(&self, filter: EventFilter, cursor: Sequence) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let sub = Subscription {
            filter,
            capacity: self.config.buffer_size,
            overflow: self.config.overflow,
            queue: Mutex::new(SubQueue {
                events: VecDeque::new(),
                pending: Vec::new(),
                cursor,
                caught_up: false,
                dropped: false,
            }),
        };
        self.subs
            .write()
            .expect("lock poisoned")
            .insert(id, Arc::new(sub));
        debug!(%id, %cursor, "subscribed");
        id
    }

    fn get(&self, id: SubscriptionId) -> BusResult<Arc<Subscription>> {
        self.subs
            .read()
            .expect("lock poisoned")
            .get(&id)
            .cloned()
            .ok_or(BusError::SubscriptionNotFound(id))
    }

    /// The subscription's filter.
    pub fn filter(&self, id: SubscriptionId) -> BusResult<EventFilter> {
        Ok(self.get(id)?.filter.clone())
    }

    /// The subscription's historical cursor.
    pub fn cursor(&self, id: SubscriptionId) -> BusResult<Sequence> {
        let sub = self.get(id)?;
        let queue = sub.queue.lock().expect("lock poisoned");
        Ok(queue.cursor)
    }

    /// Returns `true` once catch-up completed.
    pub fn is_caught_up(&self, id: SubscriptionId) -> BusResult<bool> {
        let sub = self.get(id)?;
        let queue = sub.queue.lock().expect("lock poisoned");
        Ok(queue.caught_up)
    }

    /// Deliver a batch of historical events and advance the cursor.
    /// Events failing the filter are counted as delivered but skipped.
    pub fn deliver_historical(
        &self,
        id: SubscriptionId,
        events: Vec<LoomEvent>,
        new_cursor: Sequence,
    ) -> BusResult<()> {
        let sub = self.get(id)?;
        let mut queue = sub.queue.lock().expect("lock poisoned");
        for event in events {
            if sub.filter.matches(&event) && !sub.push(&mut queue, event) {
                break;
            }
        }
        queue.cursor = queue.cursor.max(new_cursor);
        Ok(())
    }

    /// Complete catch-up if the cursor still equals `expected`: flush
    /// pending live events past the cursor, enqueue `CaughtUp`, and
    /// switch to live delivery. Returns `false` when the cursor moved
    /// (more history appeared) and the caller should replay again.
    pub fn finish_catch_up(&self, id: SubscriptionId, expected: Sequence) -> BusResult<bool> {
        let sub = self.get(id)?;
        let mut queue = sub.queue.lock().expect("lock poisoned");
        if queue.cursor != expected {
            return Ok(false);
        }
        let pending = std::mem::take(&mut queue.pending);
        for (seq, event) in pending {
            // Anything at or below the cursor was already replayed.
            if seq.is_some_and(|s| s <= queue.cursor) {
                continue;
            }
            if !sub.push(&mut queue, event) {
                break;
            }
        }
        sub.push(&mut queue, LoomEvent::CaughtUp);
        queue.caught_up = true;
        debug!(%id, cursor = %queue.cursor, "caught up");
        Ok(true)
    }

    /// Publish a live event to every matching subscription. `seq` is
    /// the sequence of the append that produced it, used to deduplicate
    /// against concurrent historical replay.
    pub fn publish(&self, event: &LoomEvent, seq: Option<Sequence>) {
        let subs: Vec<Arc<Subscription>> = {
            let map = self.subs.read().expect("lock poisoned");
            map.values().cloned().collect()
        };
        for sub in subs {
            if !sub.filter.matches(event) {
                continue;
            }
            let mut queue = sub.queue.lock().expect("lock poisoned");
            if queue.dropped {
                continue;
            }
            if queue.caught_up {
                if seq.is_some_and(|s| s <= queue.cursor) {
                    continue;
                }
                sub.push(&mut queue, event.clone());
            } else {
                // Not caught up yet: park the event; finish_catch_up
                // decides whether replay already covered it.
                queue.pending.push((seq, event.clone()));
            }
        }
    }

    /// Drain the next buffered event, non-blocking.
    pub fn poll(&self, id: SubscriptionId) -> BusResult<Option<LoomEvent>> {
        let sub = self.get(id)?;
        let mut queue = sub.queue.lock().expect("lock poisoned");
        Ok(queue.events.pop_front())
    }

    /// Destroy a subscription. Idempotent and safe to call while
    /// deliveries are in flight.
    pub fn unsubscribe(&self, id: SubscriptionId) {
        if self
            .subs
            .write()
            .expect("lock poisoned")
            .remove(&id)
            .is_some()
        {
            debug!(%id, "unsubscribed");
        }
    }

    /// Number of live subscriptions.
    pub fn subscription_count(&self) -> usize {
        self.subs.read().expect("lock poisoned").len()
    }
}

impl Default for SubscriptionBus {
    fn default() -> Self {
        Self::new(BusConfig::default())
    }
}
