// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Lattice Authors

//! `lattice scheduler`: run the queue and cron schedulers.

use crate::catalog::DirCatalog;
use crate::context::{shutdown_signal, Context};
use async_trait::async_trait;
use lx_core::{Dag, DagRunId, SystemClock};
use lx_exec::{EnqueueOptions, ExecError, RestartOptions, RunManager};
use lx_sched::{CronScheduler, CronSchedulerConfig, QueueScheduler, RunOps};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::info;

#[derive(clap::Args)]
pub struct SchedulerArgs {
    /// Registry identity of this replica; defaults to `hostname@pid`.
    #[arg(long, value_name = "HOST")]
    pub host: Option<String>,
}

/// Run-manager-backed operations for the cron scheduler.
struct ManagerRunOps {
    manager: Arc<RunManager>,
}

#[async_trait]
impl RunOps for ManagerRunOps {
    async fn enqueue(&self, dag: &Dag) -> Result<DagRunId, ExecError> {
        self.manager.enqueue_dag_run(dag, EnqueueOptions::default().quiet(true)).await
    }

    async fn stop(&self, dag: &Dag, run_id: &DagRunId) -> Result<(), ExecError> {
        self.manager.stop(dag, run_id).await
    }

    async fn restart(&self, dag: &Dag) -> Result<(), ExecError> {
        self.manager.restart_dag(dag, RestartOptions::default().quiet(true))
    }
}

pub async fn run(ctx: &Context, args: SchedulerArgs) -> anyhow::Result<ExitCode> {
    let catalog = Arc::new(DirCatalog::new(&ctx.config.dags_dir));
    let manager = ctx.manager()?;
    let registry = ctx.registry();

    let queue_scheduler = QueueScheduler::new(
        Arc::clone(&ctx.queue_store),
        Arc::clone(&ctx.run_store) as _,
        Arc::clone(&catalog) as _,
        ctx.dispatch_client(),
    );

    let cron_scheduler = CronScheduler::new(
        catalog as _,
        Arc::new(ManagerRunOps { manager }) as _,
        Arc::clone(&ctx.queue_store),
        Arc::clone(&ctx.run_store) as _,
        registry,
        Arc::new(lx_store::FileWatermarkStore::new(&ctx.config.state_dir)) as _,
        CronSchedulerConfig {
            host: args.host.unwrap_or_else(lx_worker::default_worker_id),
            tick_interval: std::time::Duration::from_secs(
                ctx.config.scheduler.tick_interval_secs.max(1),
            ),
            catchup_window: chrono::Duration::minutes(
                ctx.config.scheduler.catchup_window_minutes.max(1),
            ),
        },
        SystemClock,
    );

    let cancel = shutdown_signal().await;
    info!(dags_dir = %ctx.config.dags_dir.display(), "scheduler running");
    tokio::join!(queue_scheduler.run(cancel.clone()), cron_scheduler.run(cancel));
    info!("scheduler shut down");
    Ok(ExitCode::SUCCESS)
}
