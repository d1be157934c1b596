//! Bounded handoff queue between telemetry producers and the dispatcher

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::types::TelemetrySnapshot;

/// Outcome of an enqueue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Enqueued {
    /// The snapshot was appended without displacing anything
    Accepted,
    /// The queue was full; the oldest pending snapshot was dropped
    EvictedOldest,
}

/// Bounded FIFO shared by any number of producers and exactly one consumer.
///
/// When full, `enqueue` drops the oldest pending snapshot: live telemetry
/// supersedes stale telemetry. Both operations hold a single mutex for a
/// bounded critical section and never wait on I/O.
#[derive(Debug)]
pub struct HandoffQueue {
    items: Mutex<VecDeque<TelemetrySnapshot>>,
    capacity: usize,
    evicted: AtomicU64,
}

impl HandoffQueue {
    /// Create a queue holding at most `capacity` snapshots (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self { items: Mutex::new(VecDeque::with_capacity(capacity)), capacity, evicted: AtomicU64::new(0) }
    }

    /// Append a snapshot, evicting the oldest one if the queue is full.
    pub fn enqueue(&self, snapshot: TelemetrySnapshot) -> Enqueued {
        let mut items = self.items.lock();
        let outcome = if items.len() >= self.capacity {
            items.pop_front();
            Enqueued::EvictedOldest
        } else {
            Enqueued::Accepted
        };
        items.push_back(snapshot);
        drop(items);

        if outcome == Enqueued::EvictedOldest {
            self.evicted.fetch_add(1, Ordering::Relaxed);
        }
        outcome
    }

    /// Remove and return everything queued, oldest first.
    pub fn dequeue_all(&self) -> Vec<TelemetrySnapshot> {
        let mut items = self.items.lock();
        items.drain(..).collect()
    }

    /// Drop everything queued, returning how many snapshots were discarded.
    pub fn clear(&self) -> usize {
        let mut items = self.items.lock();
        let discarded = items.len();
        items.clear();
        discarded
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Total snapshots dropped by the eviction policy since creation.
    pub fn evicted(&self) -> u64 {
        self.evicted.load(Ordering::Relaxed)
    }
}
