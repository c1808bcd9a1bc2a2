// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Lattice Authors

//! Queue store: named multi-priority FIFOs of pending runs.

use crate::error::StoreError;
use lx_core::{Clock, DagRunRef, Priority, QueuedItem, SystemClock};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::broadcast;

/// Change notification for queue watchers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueEvent {
    Enqueued { queue: String },
    Removed { queue: String },
}

/// Named queues of pending runs.
///
/// Ordering within a queue is `(priority desc, enqueuedAt asc, seq asc)`;
/// `seq` is assigned at enqueue time and breaks same-millisecond ties.
pub trait QueueStore: Send + Sync {
    fn enqueue(
        &self,
        queue: &str,
        priority: Priority,
        dag_run: DagRunRef,
    ) -> Result<(), StoreError>;

    /// Highest-priority oldest item; [`StoreError::QueueEmpty`] when none.
    fn dequeue_by_name(&self, queue: &str) -> Result<QueuedItem, StoreError>;

    /// Remove every queued item for `dag_run` regardless of position.
    fn dequeue_by_run(&self, queue: &str, dag_run: &DagRunRef)
        -> Result<Vec<QueuedItem>, StoreError>;

    fn len(&self, queue: &str) -> usize;
    fn list(&self, queue: &str) -> Vec<QueuedItem>;
    fn list_by_dag_name(&self, queue: &str, dag_name: &str) -> Vec<QueuedItem>;
    fn all(&self) -> Vec<QueuedItem>;
    /// Names of queues with at least one pending item.
    fn queue_list(&self) -> Vec<String>;

    /// Subscribe to change events. Watchers that lag may miss events and
    /// must treat a receive error as "rescan everything".
    fn watch(&self) -> broadcast::Receiver<QueueEvent>;
}

type OrderKey = (u8, u64, u64);

fn class(p: Priority) -> u8 {
    match p {
        Priority::High => 0,
        Priority::Low => 1,
    }
}

/// In-memory queue store.
pub struct MemoryQueueStore<C: Clock = SystemClock> {
    clock: C,
    inner: Mutex<Inner>,
    events: broadcast::Sender<QueueEvent>,
}

struct Inner {
    queues: HashMap<String, BTreeMap<OrderKey, QueuedItem>>,
    next_seq: u64,
}

impl MemoryQueueStore<SystemClock> {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for MemoryQueueStore<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> MemoryQueueStore<C> {
    pub fn with_clock(clock: C) -> Self {
        let (events, _) = broadcast::channel(256);
        Self {
            clock,
            inner: Mutex::new(Inner { queues: HashMap::new(), next_seq: 0 }),
            events,
        }
    }

    fn notify(&self, event: QueueEvent) {
        // No receivers is fine; watchers come and go.
        let _ = self.events.send(event);
    }
}

impl<C: Clock> QueueStore for MemoryQueueStore<C> {
    fn enqueue(
        &self,
        queue: &str,
        priority: Priority,
        dag_run: DagRunRef,
    ) -> Result<(), StoreError> {
        {
            let mut inner = self.inner.lock();
            let seq = inner.next_seq;
            inner.next_seq += 1;
            let item = QueuedItem {
                dag_run,
                priority,
                enqueued_at_ms: self.clock.epoch_ms(),
                seq,
            };
            inner
                .queues
                .entry(queue.to_string())
                .or_default()
                .insert((class(priority), item.enqueued_at_ms, seq), item);
        }
        self.notify(QueueEvent::Enqueued { queue: queue.to_string() });
        Ok(())
    }

    fn dequeue_by_name(&self, queue: &str) -> Result<QueuedItem, StoreError> {
        let item = {
            let mut inner = self.inner.lock();
            let q = inner
                .queues
                .get_mut(queue)
                .ok_or_else(|| StoreError::QueueEmpty(queue.to_string()))?;
            let key = *q.keys().next().ok_or_else(|| StoreError::QueueEmpty(queue.to_string()))?;
            let item = q.remove(&key);
            if q.is_empty() {
                inner.queues.remove(queue);
            }
            item.ok_or_else(|| StoreError::QueueEmpty(queue.to_string()))?
        };
        self.notify(QueueEvent::Removed { queue: queue.to_string() });
        Ok(item)
    }

    fn dequeue_by_run(
        &self,
        queue: &str,
        dag_run: &DagRunRef,
    ) -> Result<Vec<QueuedItem>, StoreError> {
        let removed = {
            let mut inner = self.inner.lock();
            let Some(q) = inner.queues.get_mut(queue) else { return Ok(Vec::new()) };
            let keys: Vec<OrderKey> = q
                .iter()
                .filter(|(_, item)| item.dag_run == *dag_run)
                .map(|(k, _)| *k)
                .collect();
            let removed: Vec<QueuedItem> = keys.iter().filter_map(|k| q.remove(k)).collect();
            if q.is_empty() {
                inner.queues.remove(queue);
            }
            removed
        };
        if !removed.is_empty() {
            self.notify(QueueEvent::Removed { queue: queue.to_string() });
        }
        Ok(removed)
    }

    fn len(&self, queue: &str) -> usize {
        self.inner.lock().queues.get(queue).map_or(0, |q| q.len())
    }

    fn list(&self, queue: &str) -> Vec<QueuedItem> {
        self.inner
            .lock()
            .queues
            .get(queue)
            .map(|q| q.values().cloned().collect())
            .unwrap_or_default()
    }

    fn list_by_dag_name(&self, queue: &str, dag_name: &str) -> Vec<QueuedItem> {
        self.list(queue).into_iter().filter(|i| i.dag_run.name == dag_name).collect()
    }

    fn all(&self) -> Vec<QueuedItem> {
        let inner = self.inner.lock();
        let mut items: Vec<QueuedItem> =
            inner.queues.values().flat_map(|q| q.values().cloned()).collect();
        items.sort_by(|a, b| a.dequeue_order(b));
        items
    }

    fn queue_list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.lock().queues.keys().cloned().collect();
        names.sort();
        names
    }

    fn watch(&self) -> broadcast::Receiver<QueueEvent> {
        self.events.subscribe()
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
