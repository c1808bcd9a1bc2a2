// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Lattice Authors

//! Scheduler watermarks: the last instant a series was evaluated up to.
//!
//! Catch-up policies only mean something when the evaluation window can
//! start before process boot, so the watermark has to outlive the scheduler
//! process. The file store keeps one timestamp per key under
//! `⟨stateDir⟩/scheduler/`; a replica promoted to leader resumes from the
//! previous leader's watermark.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use tracing::warn;

/// Durable evaluation watermarks, keyed by series name.
pub trait WatermarkStore: Send + Sync {
    fn load(&self, key: &str) -> Option<DateTime<Utc>>;
    fn save(&self, key: &str, at: DateTime<Utc>);
}

/// In-memory watermarks for single-process embedding and tests.
#[derive(Default)]
pub struct MemoryWatermarkStore {
    marks: Mutex<HashMap<String, DateTime<Utc>>>,
}

impl MemoryWatermarkStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl WatermarkStore for MemoryWatermarkStore {
    fn load(&self, key: &str) -> Option<DateTime<Utc>> {
        self.marks.lock().get(key).copied()
    }

    fn save(&self, key: &str, at: DateTime<Utc>) {
        self.marks.lock().insert(key.to_string(), at);
    }
}

/// Watermarks under `⟨stateDir⟩/scheduler/⟨key⟩.json`, written atomically.
pub struct FileWatermarkStore {
    root: PathBuf,
}

impl FileWatermarkStore {
    pub fn new(state_dir: impl Into<PathBuf>) -> Self {
        Self { root: state_dir.into().join("scheduler") }
    }

    fn path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}.json"))
    }
}

impl WatermarkStore for FileWatermarkStore {
    fn load(&self, key: &str) -> Option<DateTime<Utc>> {
        let data = fs::read(self.path(key)).ok()?;
        match serde_json::from_slice(&data) {
            Ok(at) => Some(at),
            Err(e) => {
                warn!(key, error = %e, "corrupt watermark ignored");
                None
            }
        }
    }

    fn save(&self, key: &str, at: DateTime<Utc>) {
        let path = self.path(key);
        let write = || -> std::io::Result<()> {
            fs::create_dir_all(&self.root)?;
            let data = serde_json::to_vec(&at).map_err(std::io::Error::other)?;
            let tmp = path.with_extension("tmp");
            fs::write(&tmp, data)?;
            fs::rename(&tmp, &path)?;
            Ok(())
        };
        if let Err(e) = write() {
            warn!(key, error = %e, "watermark write failed");
        }
    }
}

#[cfg(test)]
#[path = "watermark_tests.rs"]
mod tests;
