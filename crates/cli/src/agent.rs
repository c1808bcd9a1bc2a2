// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Lattice Authors

//! Run lifecycle host: the body of `start`, `retry`, and `restart`.
//!
//! Owns one run from attempt creation to terminal status: claims the control
//! socket, executes steps sequentially in dependency order, records per-node
//! output and exit codes, and answers `POST /stop` by signalling the running
//! step's process group.

use crate::context::Context;
use anyhow::Context as _;
use chrono::Utc;
use lx_core::{Dag, DagRunId, DagRunRef, DagRunStatus, NodeState, RunStatus};
use lx_sock::{socket_path, ControlSocket, StatusSource};
use lx_store::{CreateAttemptOptions, RunAttempt, RunStore};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

pub struct AgentParams {
    pub dag: Dag,
    pub run_id: DagRunId,
    pub params: String,
    pub root: Option<DagRunRef>,
    pub parent: Option<DagRunRef>,
    /// Re-execute only this step.
    pub step_filter: Option<String>,
    pub retry: bool,
}

struct SharedStatus(Arc<Mutex<DagRunStatus>>);

impl StatusSource for SharedStatus {
    fn status(&self) -> DagRunStatus {
        self.0.lock().clone()
    }
}

/// Execute the run to a terminal status and return it.
pub async fn run_dag(ctx: &Context, params: AgentParams) -> anyhow::Result<RunStatus> {
    let AgentParams { dag, run_id, params: run_params, root, parent, step_filter, retry } = params;

    let mut attempt = ctx
        .run_store
        .create_attempt(
            &dag,
            Utc::now(),
            &run_id,
            CreateAttemptOptions { root: root.clone(), retry },
        )
        .await?;

    let mut initial = DagRunStatus::initial(&dag, run_id.clone(), run_params);
    initial.root = root;
    initial.parent = parent;
    let shared = Arc::new(Mutex::new(initial));

    let stop = CancellationToken::new();
    let socket = ControlSocket::bind(
        socket_path(&ctx.config.state_dir, &dag.name, run_id.as_str()),
        Arc::new(SharedStatus(Arc::clone(&shared))),
        stop.clone(),
    )?;
    forward_signals(stop.clone());

    {
        let mut status = shared.lock();
        status.mark_running(std::process::id() as i32, Utc::now());
    }
    save(&mut attempt, &shared).await?;
    info!(dag = %dag.name, run_id = %run_id, "run started");

    let final_status = execute_steps(ctx, &dag, &run_id, &step_filter, &shared, &mut attempt, &stop)
        .await;

    {
        let mut status = shared.lock();
        status.finish(final_status, Utc::now());
    }
    save(&mut attempt, &shared).await?;
    socket.shutdown().await;
    info!(dag = %dag.name, run_id = %run_id, status = %final_status, "run finished");
    Ok(final_status)
}

async fn execute_steps(
    ctx: &Context,
    dag: &Dag,
    run_id: &DagRunId,
    step_filter: &Option<String>,
    shared: &Arc<Mutex<DagRunStatus>>,
    attempt: &mut Box<dyn RunAttempt>,
    stop: &CancellationToken,
) -> RunStatus {
    let order: Vec<String> = dag
        .execution_order()
        .into_iter()
        .filter(|name| step_filter.as_deref().map_or(true, |only| only == *name))
        .map(str::to_string)
        .collect();

    let mut failed = false;
    let mut cancelled = false;

    for name in &order {
        if failed || cancelled || stop.is_cancelled() {
            set_node(shared, name, |node| {
                node.state = if failed { NodeState::Skipped } else { NodeState::Cancelled };
            });
            cancelled |= !failed;
            continue;
        }
        let Some(step) = dag.steps.iter().find(|s| s.name == *name) else { continue };

        set_node(shared, name, |node| {
            node.state = NodeState::Running;
            node.started_at = Some(Utc::now());
        });
        if let Err(e) = save(attempt, shared).await {
            warn!(step = %name, error = %e, "status write failed");
        }

        let outcome = run_step(ctx, dag, run_id, name, &step.command, stop).await;
        match outcome {
            StepOutcome::Exit { code, stdout, stderr } => {
                let ok = code == 0;
                set_node(shared, name, |node| {
                    node.state = if ok { NodeState::Succeeded } else { NodeState::Failed };
                    node.exit_code = Some(code);
                    node.stdout = Some(stdout.clone());
                    node.stderr = Some(stderr.clone());
                    node.finished_at = Some(Utc::now());
                });
                if !ok {
                    error!(step = %name, code, "step failed");
                    failed = true;
                }
            }
            StepOutcome::Cancelled => {
                set_node(shared, name, |node| {
                    node.state = NodeState::Cancelled;
                    node.finished_at = Some(Utc::now());
                });
                cancelled = true;
            }
            StepOutcome::SpawnError(e) => {
                set_node(shared, name, |node| {
                    node.state = NodeState::Failed;
                    node.error = Some(e.to_string());
                    node.finished_at = Some(Utc::now());
                });
                error!(step = %name, error = %e, "step could not be spawned");
                failed = true;
            }
        }
        if let Err(e) = save(attempt, shared).await {
            warn!(step = %name, error = %e, "status write failed");
        }
    }

    if cancelled {
        RunStatus::Cancelled
    } else if failed {
        RunStatus::Failed
    } else {
        RunStatus::Succeeded
    }
}

enum StepOutcome {
    Exit { code: i32, stdout: String, stderr: String },
    Cancelled,
    SpawnError(std::io::Error),
}

async fn run_step(
    ctx: &Context,
    dag: &Dag,
    run_id: &DagRunId,
    step: &str,
    command: &str,
    stop: &CancellationToken,
) -> StepOutcome {
    let log_dir = ctx.config.state_dir.join("logs").join(&dag.name).join(run_id.as_str());
    let (stdout_path, stderr_path) = match step_log_files(&log_dir, step) {
        Ok(paths) => paths,
        Err(e) => return StepOutcome::SpawnError(e),
    };

    let mut cmd = tokio::process::Command::new(&ctx.config.default_shell);
    cmd.arg("-c").arg(command).stdin(Stdio::null());
    match (std::fs::File::create(&stdout_path), std::fs::File::create(&stderr_path)) {
        (Ok(out), Ok(err)) => {
            cmd.stdout(Stdio::from(out)).stderr(Stdio::from(err));
        }
        (Err(e), _) | (_, Err(e)) => return StepOutcome::SpawnError(e),
    }
    let workdir =
        dag.working_dir.clone().or_else(|| dag.location.parent().map(PathBuf::from));
    if let Some(dir) = workdir {
        if dir.is_dir() {
            cmd.current_dir(dir);
        }
    }
    #[cfg(unix)]
    cmd.process_group(0);

    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) => return StepOutcome::SpawnError(e),
    };
    let pid = child.id().map(|id| id as i32).unwrap_or_default();

    tokio::select! {
        exited = child.wait() => match exited {
            Ok(status) => StepOutcome::Exit {
                code: status.code().unwrap_or(1),
                stdout: stdout_path.display().to_string(),
                stderr: stderr_path.display().to_string(),
            },
            Err(e) => StepOutcome::SpawnError(e),
        },
        _ = stop.cancelled() => {
            signal_group(pid);
            let _ = child.wait().await;
            StepOutcome::Cancelled
        }
    }
}

fn step_log_files(log_dir: &PathBuf, step: &str) -> std::io::Result<(PathBuf, PathBuf)> {
    std::fs::create_dir_all(log_dir)?;
    Ok((
        log_dir.join(format!("{step}.stdout.log")),
        log_dir.join(format!("{step}.stderr.log")),
    ))
}

#[cfg(unix)]
fn signal_group(pid: i32) {
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;
    if pid <= 0 {
        return;
    }
    if let Err(e) = killpg(Pid::from_raw(pid), Signal::SIGTERM) {
        warn!(pid, error = %e, "step process group signal failed");
    }
}

#[cfg(not(unix))]
fn signal_group(_pid: i32) {}

fn set_node(shared: &Arc<Mutex<DagRunStatus>>, name: &str, update: impl FnOnce(&mut lx_core::Node)) {
    let mut status = shared.lock();
    if let Some(node) = status.node_mut(name) {
        update(node);
    }
}

/// Persist the current shared status through one open/write/close cycle.
async fn save(
    attempt: &mut Box<dyn RunAttempt>,
    shared: &Arc<Mutex<DagRunStatus>>,
) -> anyhow::Result<()> {
    let snapshot = shared.lock().clone();
    attempt.open().await.context("opening attempt")?;
    let write_result = attempt.write(&snapshot).await;
    let close_result = attempt.close().await;
    write_result.context("writing status")?;
    close_result.context("closing attempt")?;
    Ok(())
}

/// SIGTERM/SIGINT map to the same graceful stop the control socket delivers.
fn forward_signals(stop: CancellationToken) {
    tokio::spawn(async move {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            let mut term = match signal(SignalKind::terminate()) {
                Ok(term) => term,
                Err(_) => return,
            };
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = term.recv() => {}
            }
        }
        #[cfg(not(unix))]
        {
            let _ = tokio::signal::ctrl_c().await;
        }
        stop.cancel();
    });
}

#[cfg(test)]
#[path = "agent_tests.rs"]
mod tests;
