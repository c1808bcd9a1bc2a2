// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Lattice Authors

//! Worker: poller slots, slot tracking, and heartbeats.

use crate::executor::TaskExecutor;
use crate::WorkerError;
use chrono::Utc;
use lx_coord::{CoordError, CoordinatorClient, HeartbeatStats};
use lx_core::{new_poller_id, RunningTask, Task};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// `hostname@pid`, the conventional worker identity.
pub fn default_worker_id() -> String {
    let host = gethostname::gethostname().to_string_lossy().into_owned();
    format!("{host}@{}", std::process::id())
}

/// Static worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub worker_id: String,
    /// Number of poller slots; each slot executes at most one task at a time.
    pub max_active_runs: usize,
    pub labels: HashMap<String, String>,
    pub heartbeat_interval: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            worker_id: default_worker_id(),
            max_active_runs: 1,
            labels: HashMap::new(),
            heartbeat_interval: Duration::from_secs(5),
        }
    }
}

// Per-slot state: idle (absent) or executing (present in the table).
type RunningTable = Arc<Mutex<HashMap<usize, RunningTask>>>;

/// A running worker instance.
pub struct Worker {
    config: WorkerConfig,
    clients: Vec<Arc<CoordinatorClient>>,
    executor: Arc<dyn TaskExecutor>,
    running: RunningTable,
    cancel: CancellationToken,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Worker {
    pub fn new(
        config: WorkerConfig,
        clients: Vec<Arc<CoordinatorClient>>,
        executor: Arc<dyn TaskExecutor>,
    ) -> Result<Self, WorkerError> {
        if clients.is_empty() {
            return Err(WorkerError::NoCoordinators);
        }
        if config.max_active_runs == 0 {
            return Err(WorkerError::NoSlots);
        }
        Ok(Self {
            config,
            clients,
            executor,
            running: Arc::new(Mutex::new(HashMap::new())),
            cancel: CancellationToken::new(),
            handles: Mutex::new(Vec::new()),
        })
    }

    /// Current heartbeat payload.
    pub fn stats(&self) -> HeartbeatStats {
        let running = self.running.lock();
        HeartbeatStats {
            total_pollers: self.config.max_active_runs as u32,
            busy_pollers: running.len() as u32,
            running_tasks: running.values().cloned().collect(),
        }
    }

    pub fn worker_id(&self) -> &str {
        &self.config.worker_id
    }

    /// Wait for coordinator health, then launch the poller and heartbeat
    /// loops. Returns once everything is running.
    pub async fn start(&self) -> Result<(), WorkerError> {
        for client in &self.clients {
            client.wait_for_health(&self.cancel).await?;
        }
        info!(
            worker_id = %self.config.worker_id,
            pollers = self.config.max_active_runs,
            coordinators = self.clients.len(),
            "worker starting"
        );

        let mut handles = self.handles.lock();
        for slot in 0..self.config.max_active_runs {
            // Slots spread across coordinators round-robin.
            let client = Arc::clone(&self.clients[slot % self.clients.len()]);
            handles.push(tokio::spawn(poller_loop(
                slot,
                self.config.worker_id.clone(),
                self.config.labels.clone(),
                client,
                Arc::clone(&self.executor),
                Arc::clone(&self.running),
                self.cancel.clone(),
            )));
        }
        handles.push(tokio::spawn(heartbeat_loop(
            self.config.clone(),
            self.clients.clone(),
            Arc::clone(&self.running),
            self.cancel.clone(),
        )));
        Ok(())
    }

    /// Cancel pollers and in-flight executions, then drain connections.
    pub async fn stop(&self) {
        self.cancel.cancel();
        let handles: Vec<JoinHandle<()>> = std::mem::take(&mut *self.handles.lock());
        for handle in handles {
            if let Err(e) = handle.await {
                warn!(error = %e, "worker loop ended abnormally");
            }
        }
        for client in &self.clients {
            client.cleanup().await;
        }
        info!(worker_id = %self.config.worker_id, "worker stopped");
    }
}

/// One slot: `idle → polling → executing → idle`, forever.
async fn poller_loop(
    slot: usize,
    worker_id: String,
    labels: HashMap<String, String>,
    client: Arc<CoordinatorClient>,
    executor: Arc<dyn TaskExecutor>,
    running: RunningTable,
    cancel: CancellationToken,
) {
    // One tracking decorator per slot; the executor itself never learns
    // about the worker.
    let executor = TrackingExecutor { slot, inner: executor, table: running };
    while !cancel.is_cancelled() {
        let poller_id = new_poller_id();
        match client.poll(&cancel, &worker_id, &poller_id, &labels).await {
            Ok(Some(task)) => match executor.execute(&cancel, &task).await {
                Ok(()) => debug!(slot, run_id = %task.run_id, "task finished"),
                Err(e) => error!(slot, run_id = %task.run_id, error = %e, "task failed"),
            },
            Ok(None) => {
                // Empty poll response; go straight back to polling.
            }
            Err(CoordError::Canceled) => break,
            Err(e) => {
                // Non-transport errors are not retried inside poll; pause
                // briefly so a persistently failing coordinator cannot spin
                // this slot.
                error!(slot, error = %e, "poll failed");
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(Duration::from_secs(1)) => {}
                }
            }
        }
    }
    debug!(slot, "poller loop exited");
}

/// Slot-tracking wrapper around the task executor. The table entry is
/// cleared on every path so `executing → idle` always happens, executor
/// errors included.
struct TrackingExecutor {
    slot: usize,
    inner: Arc<dyn TaskExecutor>,
    table: RunningTable,
}

#[async_trait::async_trait]
impl TaskExecutor for TrackingExecutor {
    async fn execute(
        &self,
        cancel: &CancellationToken,
        task: &Task,
    ) -> Result<(), lx_exec::ExecError> {
        self.table.lock().insert(
            self.slot,
            RunningTask {
                dag_run_id: task.run_id.clone(),
                dag_name: dag_name_of(task),
                started_at: Utc::now().timestamp(),
                root: task.root.clone(),
                parent: task.parent.clone(),
            },
        );
        let result = self.inner.execute(cancel, task).await;
        self.table.lock().remove(&self.slot);
        result
    }
}

/// Best-effort DAG name for tracking: the retry target is already a name;
/// start targets are definition paths.
fn dag_name_of(task: &Task) -> String {
    let target = std::path::Path::new(&task.target);
    target
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| task.target.clone())
}

async fn heartbeat_loop(
    config: WorkerConfig,
    clients: Vec<Arc<CoordinatorClient>>,
    running: RunningTable,
    cancel: CancellationToken,
) {
    let mut tick = tokio::time::interval(config.heartbeat_interval);
    tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = tick.tick() => {}
        }
        let stats = {
            let table = running.lock();
            HeartbeatStats {
                total_pollers: config.max_active_runs as u32,
                busy_pollers: table.len() as u32,
                running_tasks: table.values().cloned().collect(),
            }
        };
        for client in &clients {
            if let Err(e) = client.heartbeat(&config.worker_id, &config.labels, stats.clone()).await
            {
                debug!(endpoint = client.endpoint(), error = %e, "heartbeat failed");
            }
        }
    }
}

#[cfg(test)]
#[path = "worker_tests.rs"]
mod tests;
