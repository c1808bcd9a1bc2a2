// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Lattice Authors

//! Run manager: the facade for starting, enqueuing, stopping, and
//! inspecting DAG runs.
//!
//! Live state comes from each run's control socket; persisted state from the
//! run store. When the two disagree (a stored `running` whose owner no
//! longer answers) the caller observes `failed`, the dead-holder rule.

use crate::builder::{CmdBuilder, EnqueueOptions, RestartOptions, RetryOptions, StartOptions};
use crate::error::ExecError;
use crate::limits::LimitController;
use crate::runner;
use crate::tracker::ProcessTracker;
use lx_core::{
    Clock, Dag, DagRunId, DagRunRef, DagRunStatus, Operation, RunStatus, SystemClock, Task,
};
use lx_sock::{socket_path, SockError, SocketClient};
use lx_store::{CreateAttemptOptions, RunAttempt, RunStore};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(1);

/// Facade over run processes and their persisted attempts.
pub struct RunManager<C: Clock = SystemClock> {
    builder: CmdBuilder,
    run_store: Arc<dyn RunStore>,
    tracker: Arc<ProcessTracker>,
    limits: LimitController,
    state_dir: PathBuf,
    probe_timeout: Duration,
    clock: C,
}

impl RunManager<SystemClock> {
    pub fn new(builder: CmdBuilder, run_store: Arc<dyn RunStore>, state_dir: PathBuf) -> Self {
        Self::with_clock(builder, run_store, state_dir, SystemClock)
    }
}

impl<C: Clock + 'static> RunManager<C> {
    pub fn with_clock(
        builder: CmdBuilder,
        run_store: Arc<dyn RunStore>,
        state_dir: PathBuf,
        clock: C,
    ) -> Self {
        Self {
            builder,
            run_store,
            tracker: Arc::new(ProcessTracker::new()),
            limits: LimitController::default(),
            state_dir,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            clock,
        }
    }

    pub fn with_limits(mut self, limits: LimitController) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    /// Fresh run ID, monotonic by issuance time.
    pub fn gen_dag_run_id(&self) -> DagRunId {
        DagRunId::new()
    }

    fn socket(&self, name: &str, run_id: &DagRunId) -> SocketClient {
        SocketClient::new(socket_path(&self.state_dir, name, run_id.as_str()))
            .with_timeout(self.probe_timeout)
    }

    /// Spawn a `start` sub-command asynchronously. The returned ID identifies
    /// the run; completion is observed through status probes.
    pub fn start_dag_run(&self, dag: &Dag, opts: StartOptions) -> Result<DagRunId, ExecError> {
        let run_id = opts.run_id.clone().unwrap_or_else(DagRunId::new);
        let opts = StartOptions { run_id: Some(run_id.clone()), ..opts };
        let spec = self.builder.start(&dag.location, dag.working_dir.clone(), &opts);
        let spawned = runner::start(&spec)?;

        if !dag.limits.is_empty() {
            if let Err(e) = self.limits.apply(&dag.name, run_id.as_str(), spawned.pid, &dag.limits)
            {
                warn!(dag = %dag.name, error = %e, "resource limits not applied");
            }
        }
        self.track(&dag.name, &run_id, spawned);
        Ok(run_id)
    }

    /// Run an `enqueue` sub-command to completion; a failure surfaces the
    /// child's exit code.
    pub async fn enqueue_dag_run(
        &self,
        dag: &Dag,
        opts: EnqueueOptions,
    ) -> Result<DagRunId, ExecError> {
        let run_id = opts.run_id.clone().unwrap_or_else(DagRunId::new);
        let opts = EnqueueOptions { run_id: Some(run_id.clone()), ..opts };
        let spec = self.builder.enqueue(&dag.location, &opts);
        runner::run(&spec).await?;
        Ok(run_id)
    }

    pub async fn dequeue_dag_run(&self, dag_run: &DagRunRef) -> Result<(), ExecError> {
        runner::run(&self.builder.dequeue(dag_run)).await
    }

    pub fn restart_dag(&self, dag: &Dag, opts: RestartOptions) -> Result<(), ExecError> {
        let spec = self.builder.restart(&dag.location, &opts);
        runner::start(&spec)?.reap_detached();
        Ok(())
    }

    pub fn retry_dag_run(
        &self,
        dag: &Dag,
        run_id: &DagRunId,
        opts: RetryOptions,
    ) -> Result<(), ExecError> {
        let spec = self.builder.retry(&dag.name, run_id, &opts);
        let spawned = runner::start(&spec)?;
        self.track(&dag.name, run_id, spawned);
        Ok(())
    }

    /// Deliver graceful cancellation. Idempotent: a run that is not running
    /// is already stopped.
    pub async fn stop(&self, dag: &Dag, run_id: &DagRunId) -> Result<(), ExecError> {
        let client = self.socket(&dag.name, run_id);
        if !client.exists() {
            return Ok(());
        }
        match client.stop().await {
            Ok(()) => Ok(()),
            // A stale file or a dead owner means the run is not running.
            Err(SockError::Gone(_)) | Err(SockError::Io(_)) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn is_running(&self, dag: &Dag, run_id: &DagRunId) -> bool {
        self.socket(&dag.name, run_id).is_running().await
    }

    /// Live status if the owner answers, else persisted status with the
    /// dead-holder downgrade, else a synthesized initial status. Never fails.
    pub async fn get_current_status(&self, dag: &Dag, run_id: &DagRunId) -> DagRunStatus {
        let client = self.socket(&dag.name, run_id);
        match client.status().await {
            Ok(live) => live,
            Err(e) => {
                debug!(dag = %dag.name, run_id = %run_id, error = %e, "live probe failed, falling back to store");
                self.stored_with_downgrade(&DagRunRef::new(&dag.name, run_id.clone())).await
            }
        }
    }

    async fn stored_with_downgrade(&self, dag_run: &DagRunRef) -> DagRunStatus {
        let stored = match self.run_store.find_attempt(dag_run).await {
            Ok(attempt) => attempt.read_status().await,
            Err(e) => Err(e),
        };
        match stored {
            Ok(mut status) => {
                if status.status == RunStatus::Running {
                    // Socket already failed to answer: the holder is dead.
                    status.mark_dead(self.clock.utc());
                }
                status
            }
            Err(_) => DagRunStatus::synthesized(dag_run.name.clone(), dag_run.id.clone()),
        }
    }

    /// Most recent status of `dag`: a live instance if any process this
    /// manager spawned still runs, else the latest persisted attempt.
    pub async fn get_latest_status(&self, dag: &Dag) -> DagRunStatus {
        if let Some(run_id) = self.tracker.live_runs(&dag.name).into_iter().next() {
            return self.get_current_status(dag, &run_id).await;
        }

        let stored = match self.run_store.latest_attempt(&dag.name).await {
            Ok(attempt) => attempt.read_status().await,
            Err(e) => Err(e),
        };
        match stored {
            Ok(status) if status.status == RunStatus::Running => {
                // Verify the holder still answers before trusting "running".
                self.get_current_status(dag, &status.run_id).await
            }
            Ok(status) => status,
            Err(_) => DagRunStatus::initial(dag, DagRunId::new(), ""),
        }
    }

    pub async fn get_saved_status(&self, dag_run: &DagRunRef) -> Result<DagRunStatus, ExecError> {
        Ok(self.run_store.find_attempt(dag_run).await?.read_status().await?)
    }

    pub async fn find_child_status(
        &self,
        root: &DagRunRef,
        child_run_id: &DagRunId,
    ) -> Result<DagRunStatus, ExecError> {
        Ok(self.run_store.find_child_attempt(root, child_run_id).await?.read_status().await?)
    }

    pub async fn list_recent_status(&self, name: &str, n: usize) -> Vec<DagRunStatus> {
        let mut out = Vec::new();
        for attempt in self.run_store.recent_attempts(name, n).await {
            if let Ok(status) = attempt.read_status().await {
                out.push(status);
            }
        }
        out
    }

    /// Persist `status` onto the attempt it belongs to. The attempt is
    /// resolved as the root itself or a child of it by comparing run IDs, and
    /// is closed on every path.
    pub async fn update_status(
        &self,
        cancel: &CancellationToken,
        root: &DagRunRef,
        status: &DagRunStatus,
    ) -> Result<(), ExecError> {
        if cancel.is_cancelled() {
            return Err(ExecError::Canceled);
        }
        let mut attempt = if root.id == status.run_id {
            self.run_store.find_attempt(root).await?
        } else {
            self.run_store.find_child_attempt(root, &status.run_id).await?
        };
        attempt.open().await?;
        let write_result = attempt.write(status).await;
        let close_result = attempt.close().await;
        write_result?;
        close_result?;
        Ok(())
    }

    /// Execute a dispatched task to completion. `Unspecified` operations are
    /// rejected, never defaulted to start.
    pub async fn handle_task(
        &self,
        cancel: &CancellationToken,
        task: &Task,
    ) -> Result<(), ExecError> {
        let spec = match task.operation {
            Operation::Start => self.builder.task_start(task),
            Operation::Retry => self.builder.task_retry(task),
            Operation::Unspecified => return Err(ExecError::InvalidOperation),
        };
        runner::run_cancellable(&spec, cancel).await
    }

    /// Create a fresh attempt for a run this manager is about to record.
    pub async fn create_attempt(
        &self,
        dag: &Dag,
        run_id: &DagRunId,
        opts: CreateAttemptOptions,
    ) -> Result<Box<dyn lx_store::RunAttempt>, ExecError> {
        Ok(self.run_store.create_attempt(dag, self.clock.utc(), run_id, opts).await?)
    }

    fn track(&self, name: &str, run_id: &DagRunId, spawned: runner::SpawnedRun) {
        self.tracker.insert(name, run_id.clone(), spawned.pid);
        let tracker = Arc::clone(&self.tracker);
        let limits = self.limits.clone();
        let name = name.to_string();
        let run_id = run_id.clone();
        tokio::spawn(async move {
            if let Err(e) = spawned.wait().await {
                debug!(dag = %name, run_id = %run_id, error = %e, "run process exited with error");
            }
            tracker.remove(&name, &run_id);
            limits.cleanup(&name, run_id.as_str());
        });
    }
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
