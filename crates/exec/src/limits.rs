// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Lattice Authors

//! Resource caps for spawned run processes.
//!
//! Linux only, via cgroup v2: a per-run group is created, limits are written,
//! and the child PID is attached so the cap covers the entire process tree.
//! Failures are reported to the caller, which treats them as non-fatal.

use lx_core::ResourceLimits;
use std::io;
use std::path::PathBuf;
use tracing::debug;

/// cgroup cpu.max period in microseconds.
const CPU_PERIOD_US: u64 = 100_000;

/// Applies [`ResourceLimits`] to child process trees.
#[derive(Debug, Clone)]
pub struct LimitController {
    root: PathBuf,
}

impl Default for LimitController {
    fn default() -> Self {
        Self { root: PathBuf::from("/sys/fs/cgroup") }
    }
}

impl LimitController {
    /// Controller rooted at a non-default cgroup mount (tests use a temp dir).
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create the run's cgroup, write its limits, and attach `pid`.
    pub fn apply(
        &self,
        dag_name: &str,
        run_id: &str,
        pid: i32,
        limits: &ResourceLimits,
    ) -> io::Result<()> {
        if limits.is_empty() {
            return Ok(());
        }
        if !cfg!(target_os = "linux") {
            debug!(dag = dag_name, "resource limits unsupported on this platform");
            return Ok(());
        }

        let group = self.group_dir(dag_name, run_id);
        std::fs::create_dir_all(&group)?;
        if let Some(cpu_millis) = limits.cpu_millis {
            std::fs::write(group.join("cpu.max"), cpu_max_line(cpu_millis))?;
        }
        if let Some(memory_bytes) = limits.memory_bytes {
            std::fs::write(group.join("memory.max"), format!("{memory_bytes}\n"))?;
        }
        std::fs::write(group.join("cgroup.procs"), format!("{pid}\n"))?;
        debug!(dag = dag_name, run_id, pid, "resource limits applied");
        Ok(())
    }

    /// Remove the run's cgroup once its tree has exited.
    pub fn cleanup(&self, dag_name: &str, run_id: &str) {
        let group = self.group_dir(dag_name, run_id);
        if let Err(e) = std::fs::remove_dir(&group) {
            if e.kind() != io::ErrorKind::NotFound {
                debug!(path = %group.display(), error = %e, "cgroup cleanup failed");
            }
        }
    }

    fn group_dir(&self, dag_name: &str, run_id: &str) -> PathBuf {
        self.root.join(format!("lattice-{dag_name}-{run_id}"))
    }
}

/// `cpu.max` line for a millicore budget: quota against a 100ms period.
fn cpu_max_line(cpu_millis: u64) -> String {
    let quota = cpu_millis.saturating_mul(CPU_PERIOD_US / 1000);
    format!("{quota} {CPU_PERIOD_US}\n")
}

#[cfg(test)]
#[path = "limits_tests.rs"]
mod tests;
