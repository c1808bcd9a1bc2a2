// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Lattice Authors

//! Queue scheduler: drains queued runs into coordinator dispatches.
//!
//! Items are inspected in place and only removed after a successful dispatch,
//! so a failed dispatch leaves the queue exactly as it was. Round-robin
//! across queues prevents one busy workflow from starving the rest.

use crate::catalog::DagCatalog;
use lx_coord::{BackoffPolicy, CoordError, CoordinatorClient};
use lx_core::{Dag, DagRunRef, QueuedItem, RunStatus, Task};
use lx_store::{ListStatusOptions, QueueStore, RunAttempt, RunStore};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// How long a dispatched run may take to reach `running` before its
/// in-flight reservation lapses.
const INFLIGHT_TTL: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct QueueSchedulerConfig {
    /// Fallback rescan cadence; capacity freed by finishing runs produces no
    /// queue event, so the drain loop re-checks on this interval too.
    pub rescan_interval: Duration,
    pub backoff: BackoffPolicy,
}

impl Default for QueueSchedulerConfig {
    fn default() -> Self {
        Self {
            rescan_interval: Duration::from_secs(1),
            backoff: BackoffPolicy::default(),
        }
    }
}

/// Background drain loop.
pub struct QueueScheduler {
    queues: Arc<dyn QueueStore>,
    runs: Arc<dyn RunStore>,
    catalog: Arc<dyn DagCatalog>,
    client: Arc<CoordinatorClient>,
    config: QueueSchedulerConfig,
    // Dispatched runs that have not been observed `running` yet. Counted
    // against max_active_runs so the dispatch→running window cannot
    // overshoot the cap.
    inflight: Mutex<HashMap<DagRunRef, Instant>>,
}

impl QueueScheduler {
    pub fn new(
        queues: Arc<dyn QueueStore>,
        runs: Arc<dyn RunStore>,
        catalog: Arc<dyn DagCatalog>,
        client: Arc<CoordinatorClient>,
    ) -> Self {
        Self {
            queues,
            runs,
            catalog,
            client,
            config: QueueSchedulerConfig::default(),
            inflight: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_config(mut self, config: QueueSchedulerConfig) -> Self {
        self.config = config;
        self
    }

    /// Run until cancelled, waking on queue events and the rescan interval.
    pub async fn run(&self, cancel: CancellationToken) {
        info!("queue scheduler started");
        let mut watcher = self.queues.watch();
        let mut cursor: usize = 0;
        let mut backoff_attempt: u32 = 0;

        while !cancel.is_cancelled() {
            let outcome = self.drain(&mut cursor, &cancel).await;
            match outcome {
                DrainOutcome::NoPoller => {
                    // Nobody can take work right now; back off before the
                    // next pass so dispatches do not hammer the coordinator.
                    let delay = self.config.backoff.delay(backoff_attempt);
                    backoff_attempt = backoff_attempt.saturating_add(1);
                    debug!(delay_ms = delay.as_millis() as u64, "no eligible poller, backing off");
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = tokio::time::sleep(delay) => {}
                    }
                    continue;
                }
                DrainOutcome::Dispatched => {
                    backoff_attempt = 0;
                    continue;
                }
                DrainOutcome::Idle => {}
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.config.rescan_interval) => {}
                event = watcher.recv() => {
                    if event.is_err() {
                        // Lagged or closed: treat as "rescan everything".
                        watcher = self.queues.watch();
                    }
                }
            }
        }
        info!("queue scheduler stopped");
    }

    /// One pass over the non-empty queues in round-robin order.
    async fn drain(&self, cursor: &mut usize, cancel: &CancellationToken) -> DrainOutcome {
        let names = self.queues.queue_list();
        if names.is_empty() {
            return DrainOutcome::Idle;
        }
        let offset = *cursor % names.len();
        *cursor = cursor.wrapping_add(1);

        for index in 0..names.len() {
            if cancel.is_cancelled() {
                return DrainOutcome::Idle;
            }
            let queue = &names[(offset + index) % names.len()];
            match self.drain_queue_head(queue).await {
                DrainOutcome::Idle => continue,
                other => return other,
            }
        }
        DrainOutcome::Idle
    }

    /// Try to move the head item of `queue` into a dispatch.
    async fn drain_queue_head(&self, queue: &str) -> DrainOutcome {
        let Some(head) = self.queues.list(queue).into_iter().next() else {
            return DrainOutcome::Idle;
        };
        let name = head.dag_run.name.clone();

        let Some(dag) = self.catalog.get(&name) else {
            warn!(dag = %name, queue, "queued run has no known dag, dropping");
            let _ = self.queues.dequeue_by_run(queue, &head.dag_run);
            return DrainOutcome::Idle;
        };

        // A run that already left `queued` must never be dispatched again.
        if self.already_started(&head).await {
            debug!(dag_run = %head.dag_run, "queued item already started, dropping duplicate");
            let _ = self.queues.dequeue_by_run(queue, &head.dag_run);
            return DrainOutcome::Idle;
        }

        if self.at_capacity(&dag).await {
            return DrainOutcome::Idle;
        }

        let task = task_for(&dag, &head);
        match self.client.dispatch(task).await {
            Ok(()) => {
                let _ = self.queues.dequeue_by_run(queue, &head.dag_run);
                self.inflight.lock().insert(head.dag_run.clone(), Instant::now());
                info!(dag_run = %head.dag_run, queue, "queued run dispatched");
                DrainOutcome::Dispatched
            }
            Err(CoordError::NoEligiblePoller) => {
                // Left in place: the item keeps its original position.
                DrainOutcome::NoPoller
            }
            Err(e) => {
                error!(dag_run = %head.dag_run, queue, error = %e, "dispatch failed, item requeued");
                DrainOutcome::NoPoller
            }
        }
    }

    async fn at_capacity(&self, dag: &Dag) -> bool {
        if dag.max_active_runs == 0 {
            return false;
        }
        let opts = ListStatusOptions::default().name(&dag.name).statuses([RunStatus::Running]);
        let running = match self.runs.list_statuses(opts).await {
            Ok(running) => running,
            Err(e) => {
                warn!(dag = %dag.name, error = %e, "running count unavailable, skipping queue");
                return true;
            }
        };

        // In-flight reservations lapse once the run shows up as running (or
        // never does within the TTL).
        let inflight = {
            let mut inflight = self.inflight.lock();
            inflight.retain(|dag_run, dispatched_at| {
                dispatched_at.elapsed() < INFLIGHT_TTL
                    && !running.iter().any(|s| s.run_id == dag_run.id)
            });
            inflight.keys().filter(|dag_run| dag_run.name == dag.name).count()
        };

        running.len() + inflight >= dag.max_active_runs as usize
    }

    async fn already_started(&self, item: &QueuedItem) -> bool {
        match self.runs.find_attempt(&item.dag_run).await {
            Ok(attempt) => match attempt.read_status().await {
                Ok(status) => {
                    status.status != RunStatus::Queued && status.status != RunStatus::None
                }
                Err(_) => false,
            },
            Err(_) => false,
        }
    }
}

enum DrainOutcome {
    /// Nothing runnable anywhere.
    Idle,
    /// One item moved to a worker; drain again immediately.
    Dispatched,
    /// Dispatch could not place the item; caller backs off.
    NoPoller,
}

fn task_for(dag: &Dag, item: &QueuedItem) -> Task {
    let mut task = Task::start(item.dag_run.id.clone(), dag.location.display().to_string());
    task.params = dag.params.clone();
    task.selector = dag.labels.clone();
    task
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
