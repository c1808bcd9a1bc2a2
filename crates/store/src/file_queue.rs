// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Lattice Authors

//! File-backed queue store.
//!
//! One directory per queue under `⟨stateDir⟩/queue`; one JSON file per
//! queued item. The file name encodes the dequeue order key, so a sorted
//! directory listing is the queue:
//!
//! ```text
//! ⟨class⟩_⟨enqueuedAtMs:014⟩_⟨pid:08⟩_⟨seq:06⟩.json
//! ```
//!
//! Class is `0` for high priority, `1` for low. The per-process sequence
//! breaks same-millisecond ties; the PID keeps concurrent enqueuers from
//! colliding. Watcher events only cover in-process mutations; cross-process
//! consumers pair the watcher with their rescan interval.

use crate::error::StoreError;
use crate::queue::{QueueEvent, QueueStore};
use lx_core::{Clock, DagRunRef, Priority, QueuedItem, SystemClock};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;
use tracing::warn;

/// Queue store rooted at `⟨stateDir⟩/queue`.
pub struct FileQueueStore<C: Clock = SystemClock> {
    root: PathBuf,
    clock: C,
    seq: AtomicU64,
    events: broadcast::Sender<QueueEvent>,
}

impl FileQueueStore<SystemClock> {
    pub fn new(state_dir: impl Into<PathBuf>) -> Self {
        Self::with_clock(state_dir, SystemClock)
    }
}

impl<C: Clock> FileQueueStore<C> {
    pub fn with_clock(state_dir: impl Into<PathBuf>, clock: C) -> Self {
        let (events, _) = broadcast::channel(256);
        Self {
            root: state_dir.into().join("queue"),
            clock,
            seq: AtomicU64::new(0),
            events,
        }
    }

    fn queue_dir(&self, queue: &str) -> PathBuf {
        self.root.join(queue)
    }

    fn notify(&self, event: QueueEvent) {
        let _ = self.events.send(event);
    }

    /// Item files of `queue` in dequeue order.
    fn item_files(&self, queue: &str) -> Vec<PathBuf> {
        let Ok(entries) = fs::read_dir(self.queue_dir(queue)) else { return Vec::new() };
        let mut files: Vec<PathBuf> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
            .collect();
        files.sort();
        files
    }

    fn read_item(path: &Path) -> Option<QueuedItem> {
        let data = fs::read(path).ok()?;
        match serde_json::from_slice(&data) {
            Ok(item) => Some(item),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "corrupt queue item skipped");
                None
            }
        }
    }
}

fn class(p: Priority) -> u8 {
    match p {
        Priority::High => 0,
        Priority::Low => 1,
    }
}

impl<C: Clock> QueueStore for FileQueueStore<C> {
    fn enqueue(
        &self,
        queue: &str,
        priority: Priority,
        dag_run: DagRunRef,
    ) -> Result<(), StoreError> {
        let dir = self.queue_dir(queue);
        fs::create_dir_all(&dir)?;

        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        let item = QueuedItem {
            dag_run,
            priority,
            enqueued_at_ms: self.clock.epoch_ms(),
            seq,
        };
        let name = format!(
            "{}_{:014}_{:08}_{:06}.json",
            class(priority),
            item.enqueued_at_ms,
            std::process::id(),
            seq
        );
        let path = dir.join(name);
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, serde_json::to_vec(&item).map_err(|source| StoreError::Corrupt {
            path: path.display().to_string(),
            source,
        })?)?;
        fs::rename(&tmp, &path)?;

        self.notify(QueueEvent::Enqueued { queue: queue.to_string() });
        Ok(())
    }

    fn dequeue_by_name(&self, queue: &str) -> Result<QueuedItem, StoreError> {
        for path in self.item_files(queue) {
            let Some(item) = Self::read_item(&path) else { continue };
            // Removing the file is the claim; a concurrent consumer that
            // lost the race moves on to the next item.
            match fs::remove_file(&path) {
                Ok(()) => {
                    self.notify(QueueEvent::Removed { queue: queue.to_string() });
                    return Ok(item);
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Err(StoreError::QueueEmpty(queue.to_string()))
    }

    fn dequeue_by_run(
        &self,
        queue: &str,
        dag_run: &DagRunRef,
    ) -> Result<Vec<QueuedItem>, StoreError> {
        let mut removed = Vec::new();
        for path in self.item_files(queue) {
            let Some(item) = Self::read_item(&path) else { continue };
            if item.dag_run != *dag_run {
                continue;
            }
            match fs::remove_file(&path) {
                Ok(()) => removed.push(item),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            }
        }
        if !removed.is_empty() {
            self.notify(QueueEvent::Removed { queue: queue.to_string() });
        }
        Ok(removed)
    }

    fn len(&self, queue: &str) -> usize {
        self.item_files(queue).len()
    }

    fn list(&self, queue: &str) -> Vec<QueuedItem> {
        self.item_files(queue).iter().filter_map(|p| Self::read_item(p)).collect()
    }

    fn list_by_dag_name(&self, queue: &str, dag_name: &str) -> Vec<QueuedItem> {
        self.list(queue).into_iter().filter(|i| i.dag_run.name == dag_name).collect()
    }

    fn all(&self) -> Vec<QueuedItem> {
        let mut items: Vec<QueuedItem> =
            self.queue_list().iter().flat_map(|q| self.list(q)).collect();
        items.sort_by(|a, b| a.dequeue_order(b));
        items
    }

    fn queue_list(&self) -> Vec<String> {
        let Ok(entries) = fs::read_dir(&self.root) else { return Vec::new() };
        let mut names: Vec<String> = entries
            .filter_map(|e| e.ok())
            .filter(|e| e.path().is_dir())
            .filter(|e| !self.item_files(&e.file_name().to_string_lossy()).is_empty())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    fn watch(&self) -> broadcast::Receiver<QueueEvent> {
        self.events.subscribe()
    }
}

#[cfg(test)]
#[path = "file_queue_tests.rs"]
mod tests;
