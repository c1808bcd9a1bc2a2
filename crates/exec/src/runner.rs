// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Lattice Authors

//! Spawning and signalling of run sub-commands.
//!
//! Children run in their own process group so stop signals reach the whole
//! subtree. `run` waits for exit and captures combined output on failure;
//! `start` detaches and reaps in the background.

use crate::builder::CmdSpec;
use crate::error::ExecError;
use std::process::Stdio;
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

fn command(spec: &CmdSpec) -> Command {
    let mut cmd = Command::new(&spec.bin);
    cmd.args(&spec.args);
    if let Some(dir) = &spec.working_dir {
        cmd.current_dir(dir);
    }
    for (key, value) in &spec.env {
        cmd.env(key, value);
    }
    if spec.forward_output {
        cmd.stdout(Stdio::inherit()).stderr(Stdio::inherit());
    } else {
        cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
    }
    cmd.stdin(Stdio::null());
    cmd.kill_on_drop(false);
    #[cfg(unix)]
    cmd.process_group(0);
    cmd
}

/// Run to completion. Non-zero exit surfaces the code and combined output.
pub async fn run(spec: &CmdSpec) -> Result<(), ExecError> {
    debug!(bin = %spec.bin.display(), args = ?spec.args, "running sub-command");
    let output = command(spec).output().await.map_err(ExecError::Spawn)?;
    if output.status.success() {
        return Ok(());
    }
    match output.status.code() {
        Some(code) => {
            let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
            combined.push_str(&String::from_utf8_lossy(&output.stderr));
            Err(ExecError::CommandFailed { code, output: combined.trim().to_string() })
        }
        None => Err(ExecError::Signalled),
    }
}

/// Run to completion unless `cancel` fires first; cancellation signals the
/// child's process group and reports [`ExecError::Canceled`].
pub async fn run_cancellable(spec: &CmdSpec, cancel: &CancellationToken) -> Result<(), ExecError> {
    let spawned = start(spec)?;
    let pid = spawned.pid;
    tokio::select! {
        result = spawned.wait() => result,
        _ = cancel.cancelled() => {
            stop_group(pid);
            Err(ExecError::Canceled)
        }
    }
}

/// A detached child with its reaper.
pub struct SpawnedRun {
    pub pid: i32,
    child: Child,
}

impl SpawnedRun {
    /// Wait for exit, mapping failures like [`run`].
    pub async fn wait(mut self) -> Result<(), ExecError> {
        let status = self.child.wait().await.map_err(ExecError::Spawn)?;
        if status.success() {
            return Ok(());
        }
        match status.code() {
            Some(code) => Err(ExecError::CommandFailed { code, output: String::new() }),
            None => Err(ExecError::Signalled),
        }
    }

    /// Detach, reaping in the background so the child never zombies.
    pub fn reap_detached(self) -> JoinHandle<()> {
        let pid = self.pid;
        let mut child = self.child;
        tokio::spawn(async move {
            match child.wait().await {
                Ok(status) if status.success() => {}
                Ok(status) => debug!(pid, %status, "sub-command exited non-zero"),
                Err(e) => warn!(pid, error = %e, "sub-command reap failed"),
            }
        })
    }

    /// Signal the child's process group (or the child itself where process
    /// groups are unavailable).
    pub fn stop(&self) {
        stop_group(self.pid);
    }
}

/// Spawn without waiting. Fails with [`ExecError::Spawn`] when the child
/// cannot be created.
pub fn start(spec: &CmdSpec) -> Result<SpawnedRun, ExecError> {
    debug!(bin = %spec.bin.display(), args = ?spec.args, "spawning sub-command");
    let child = command(spec).spawn().map_err(ExecError::Spawn)?;
    let pid = child.id().map(|id| id as i32).unwrap_or_default();
    Ok(SpawnedRun { pid, child })
}

#[cfg(unix)]
fn stop_group(pid: i32) {
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;
    if pid <= 0 {
        return;
    }
    if let Err(e) = killpg(Pid::from_raw(pid), Signal::SIGTERM) {
        debug!(pid, error = %e, "process group signal failed");
    }
}

#[cfg(not(unix))]
fn stop_group(_pid: i32) {
    // No process groups here; callers fall back to killing the direct child.
}

#[cfg(test)]
#[path = "runner_tests.rs"]
mod tests;
