// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Lattice Authors

//! Cron scheduler: injects runs for scheduled workflows.
//!
//! Each workflow carries three independent cron series; within one
//! evaluation `stop` fires before `start` before `restart`. Replicas
//! coexist through the service registry: every member ticks, but only the
//! leader (lexically smallest active host) injects.

use crate::catalog::DagCatalog;
use crate::SchedError;
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use cron::Schedule;
use lx_core::{
    CatchUp, Clock, CronEntry, Dag, DagRunId, HostInfo, RunStatus, ServiceName, SystemClock,
};
use lx_exec::ExecError;
use lx_store::{ListStatusOptions, QueueStore, RunStore, ServiceRegistry, WatermarkStore};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Cap on catch-up evaluation per entry per tick.
const MAX_FIRES_PER_TICK: usize = 100;

#[derive(Debug, Clone)]
pub struct CronSchedulerConfig {
    /// Registry identity of this replica, `host:port` style.
    pub host: String,
    pub tick_interval: Duration,
    /// Catch-up never reaches further back than this, whatever the policy.
    pub catchup_window: ChronoDuration,
}

impl Default for CronSchedulerConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            tick_interval: Duration::from_secs(10),
            catchup_window: ChronoDuration::hours(1),
        }
    }
}

/// Run operations the cron scheduler needs; production wires these to the
/// run manager.
#[async_trait]
pub trait RunOps: Send + Sync {
    async fn enqueue(&self, dag: &Dag) -> Result<DagRunId, ExecError>;
    async fn stop(&self, dag: &Dag, run_id: &DagRunId) -> Result<(), ExecError>;
    async fn restart(&self, dag: &Dag) -> Result<(), ExecError>;
}

/// Watermark key for the single cron evaluation series.
const CRON_WATERMARK: &str = "cron";

pub struct CronScheduler<C: Clock = SystemClock> {
    catalog: Arc<dyn DagCatalog>,
    ops: Arc<dyn RunOps>,
    queues: Arc<dyn QueueStore>,
    runs: Arc<dyn RunStore>,
    registry: Arc<dyn ServiceRegistry>,
    watermarks: Arc<dyn WatermarkStore>,
    config: CronSchedulerConfig,
    clock: C,
}

impl<C: Clock> CronScheduler<C> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        catalog: Arc<dyn DagCatalog>,
        ops: Arc<dyn RunOps>,
        queues: Arc<dyn QueueStore>,
        runs: Arc<dyn RunStore>,
        registry: Arc<dyn ServiceRegistry>,
        watermarks: Arc<dyn WatermarkStore>,
        config: CronSchedulerConfig,
        clock: C,
    ) -> Self {
        Self { catalog, ops, queues, runs, registry, watermarks, config, clock }
    }

    /// Tick until cancelled. Registers with the service registry for the
    /// duration of the loop.
    pub async fn run(&self, cancel: CancellationToken) {
        self.registry.register(
            ServiceName::Scheduler,
            HostInfo::active(&self.config.host, self.clock.utc()),
        );
        info!(host = %self.config.host, "cron scheduler started");

        let mut tick = tokio::time::interval(self.config.tick_interval);
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        tick.tick().await; // immediate first tick

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tick.tick() => {}
            }
            self.tick().await;
        }

        self.registry.unregister(ServiceName::Scheduler, &self.config.host);
        info!(host = %self.config.host, "cron scheduler stopped");
    }

    /// One evaluation pass.
    ///
    /// The window starts at the persisted watermark, so missed ticks from a
    /// scheduler outage (or a dead leader this replica just took over from)
    /// are still visible to the catch-up policies. A first-ever tick has no
    /// watermark and starts at `now`: nothing before the first deployment is
    /// treated as missed. Standbys neither evaluate nor advance the mark.
    pub async fn tick(&self) {
        let now = self.clock.utc();
        self.registry.heartbeat(ServiceName::Scheduler, &self.config.host);
        if !self.is_leader() {
            debug!(host = %self.config.host, "standing by, another scheduler leads");
            return;
        }
        let last = self.watermarks.load(CRON_WATERMARK).unwrap_or(now);
        self.evaluate(last, now).await;
        self.watermarks.save(CRON_WATERMARK, now);
    }

    /// Leader = lexically smallest active member. Standbys promote once the
    /// leader's registry entry ages past the TTL.
    pub fn is_leader(&self) -> bool {
        let active_min = self
            .registry
            .members(ServiceName::Scheduler)
            .into_iter()
            .filter(|m| m.status == lx_core::ServiceStatus::Active)
            .map(|m| m.host)
            .min();
        active_min.as_deref() == Some(self.config.host.as_str())
    }

    /// Evaluate every scheduled workflow over `(last, now]`.
    ///
    /// The scan never reaches further back than the catch-up window,
    /// whatever the policy; an arbitrarily old watermark cannot trigger an
    /// unbounded replay.
    pub async fn evaluate(&self, last: DateTime<Utc>, now: DateTime<Utc>) {
        let last = last.max(now - self.config.catchup_window);
        let grace = self.grace();
        for dag in self.catalog.all() {
            let Some(schedule) = dag.schedule.clone() else { continue };
            // stop < start < restart within the same evaluation window.
            if self.any_due(&schedule.stop, &dag.name, last, now, grace) {
                self.fire_stop(&dag).await;
            }
            for entry in &schedule.start {
                for due in self.due_times(entry, &dag.name, last, now, grace) {
                    self.fire_start(&dag, due).await;
                }
            }
            if self.any_due(&schedule.restart, &dag.name, last, now, grace) {
                self.fire_restart(&dag).await;
            }
        }
    }

    fn grace(&self) -> ChronoDuration {
        let doubled = self.config.tick_interval.as_secs().saturating_mul(2).max(60);
        ChronoDuration::seconds(doubled as i64)
    }

    /// Due times of one entry under its catch-up policy.
    fn due_times(
        &self,
        entry: &CronEntry,
        dag_name: &str,
        last: DateTime<Utc>,
        now: DateTime<Utc>,
        grace: ChronoDuration,
    ) -> Vec<DateTime<Utc>> {
        let schedule = match parse_cron(&entry.expression) {
            Ok(schedule) => schedule,
            Err(e) => {
                warn!(dag = dag_name, error = %e, "unschedulable cron entry");
                return Vec::new();
            }
        };
        let fires: Vec<DateTime<Utc>> = schedule
            .after(&last)
            .take(MAX_FIRES_PER_TICK)
            .take_while(|t| *t <= now)
            .collect();
        if fires.is_empty() {
            return Vec::new();
        }
        match entry.catch_up {
            // Only the freshest fire, and only if it is not already stale.
            CatchUp::None => fires
                .into_iter()
                .next_back()
                .filter(|t| now - *t <= grace)
                .into_iter()
                .collect(),
            CatchUp::Latest => fires.into_iter().next_back().into_iter().collect(),
            CatchUp::All => {
                let window_start = now - self.config.catchup_window;
                fires.into_iter().filter(|t| *t >= window_start).collect()
            }
        }
    }

    fn any_due(
        &self,
        entries: &[CronEntry],
        dag_name: &str,
        last: DateTime<Utc>,
        now: DateTime<Utc>,
        grace: ChronoDuration,
    ) -> bool {
        entries.iter().any(|e| !self.due_times(e, dag_name, last, now, grace).is_empty())
    }

    /// Enqueue a fresh run unless one is already queued or running.
    async fn fire_start(&self, dag: &Dag, due: DateTime<Utc>) {
        if !self.queues.list_by_dag_name(dag.queue_name(), &dag.name).is_empty() {
            debug!(dag = %dag.name, "cron start skipped, run already queued");
            return;
        }
        if !self.running_ids(&dag.name).await.is_empty() {
            debug!(dag = %dag.name, "cron start skipped, run already running");
            return;
        }
        match self.ops.enqueue(dag).await {
            Ok(run_id) => {
                info!(dag = %dag.name, run_id = %run_id, due = %due, "cron start enqueued")
            }
            Err(e) => error!(dag = %dag.name, error = %e, "cron start failed"),
        }
    }

    /// Stop every currently running instance.
    async fn fire_stop(&self, dag: &Dag) {
        for run_id in self.running_ids(&dag.name).await {
            match self.ops.stop(dag, &run_id).await {
                Ok(()) => info!(dag = %dag.name, run_id = %run_id, "cron stop delivered"),
                Err(e) => error!(dag = %dag.name, run_id = %run_id, error = %e, "cron stop failed"),
            }
        }
    }

    async fn fire_restart(&self, dag: &Dag) {
        match self.ops.restart(dag).await {
            Ok(()) => info!(dag = %dag.name, "cron restart issued"),
            Err(e) => error!(dag = %dag.name, error = %e, "cron restart failed"),
        }
    }

    async fn running_ids(&self, name: &str) -> Vec<DagRunId> {
        let opts = ListStatusOptions::default()
            .name(name)
            .statuses([RunStatus::Running])
            .since(self.clock.utc() - ChronoDuration::hours(24));
        match self.runs.list_statuses(opts).await {
            Ok(statuses) => statuses.into_iter().map(|s| s.run_id).collect(),
            Err(e) => {
                warn!(dag = name, error = %e, "running instances unavailable");
                Vec::new()
            }
        }
    }
}

/// Parse a cron expression, accepting both the 5-field classic form and the
/// 6/7-field form with seconds.
pub fn parse_cron(expr: &str) -> Result<Schedule, SchedError> {
    let normalized = if expr.split_whitespace().count() == 5 {
        format!("0 {expr}")
    } else {
        expr.to_string()
    };
    Schedule::from_str(&normalized).map_err(|e| SchedError::InvalidCron {
        expr: expr.to_string(),
        message: e.to_string(),
    })
}

#[cfg(test)]
#[path = "cron_tests.rs"]
mod tests;
