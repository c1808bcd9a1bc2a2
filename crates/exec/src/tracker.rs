// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Lattice Authors

//! Tracking of child run processes started by this manager.

use lx_core::DagRunId;
use parking_lot::Mutex;
use std::collections::HashMap;

/// True when a process with `pid` exists (signal 0 probe).
#[cfg(unix)]
pub fn pid_alive(pid: i32) -> bool {
    use nix::unistd::Pid;
    if pid <= 0 {
        return false;
    }
    nix::sys::signal::kill(Pid::from_raw(pid), None).is_ok()
}

#[cfg(not(unix))]
pub fn pid_alive(_pid: i32) -> bool {
    false
}

/// Registry of run processes this manager spawned, keyed by DAG name.
///
/// Entries are inserted at spawn and removed by the reaper; `live_runs`
/// re-checks the PID so a crashed reaper never leaves phantom entries.
#[derive(Default)]
pub struct ProcessTracker {
    runs: Mutex<HashMap<String, HashMap<DagRunId, i32>>>,
}

impl ProcessTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, name: &str, run_id: DagRunId, pid: i32) {
        self.runs.lock().entry(name.to_string()).or_default().insert(run_id, pid);
    }

    pub fn remove(&self, name: &str, run_id: &DagRunId) {
        let mut runs = self.runs.lock();
        if let Some(by_run) = runs.get_mut(name) {
            by_run.remove(run_id);
            if by_run.is_empty() {
                runs.remove(name);
            }
        }
    }

    /// Run IDs of `name` whose recorded PID is still alive, newest first.
    pub fn live_runs(&self, name: &str) -> Vec<DagRunId> {
        let mut live: Vec<DagRunId> = self
            .runs
            .lock()
            .get(name)
            .map(|by_run| {
                by_run
                    .iter()
                    .filter(|(_, pid)| pid_alive(**pid))
                    .map(|(id, _)| id.clone())
                    .collect()
            })
            .unwrap_or_default();
        live.sort_by(|a, b| b.as_str().cmp(a.as_str()));
        live
    }
}

#[cfg(test)]
#[path = "tracker_tests.rs"]
mod tests;
