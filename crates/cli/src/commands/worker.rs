// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Lattice Authors

//! `lattice worker`: poll coordinators and execute dispatched tasks.

use crate::context::{shutdown_signal, Context};
use lx_worker::{default_worker_id, ManagerExecutor, Worker, WorkerConfig};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::info;

#[derive(clap::Args)]
pub struct WorkerArgs {
    /// Worker identity; defaults to `hostname@pid`.
    #[arg(long, value_name = "ID")]
    pub worker_id: Option<String>,

    /// Number of poller slots; overrides the configuration file.
    #[arg(long, value_name = "N")]
    pub max_active_runs: Option<usize>,

    /// Additional labels as `key=value`; repeatable.
    #[arg(long, value_name = "KEY=VALUE")]
    pub label: Vec<String>,
}

pub async fn run(ctx: &Context, args: WorkerArgs) -> anyhow::Result<ExitCode> {
    let mut labels = ctx.config.worker.labels.clone();
    for pair in &args.label {
        match pair.split_once('=') {
            Some((key, value)) => {
                labels.insert(key.to_string(), value.to_string());
            }
            None => anyhow::bail!("label {pair:?} is not key=value"),
        }
    }

    let config = WorkerConfig {
        worker_id: args
            .worker_id
            .or_else(|| ctx.config.worker.id.clone())
            .unwrap_or_else(default_worker_id),
        max_active_runs: args.max_active_runs.unwrap_or(ctx.config.worker.max_active_runs),
        labels,
        heartbeat_interval: std::time::Duration::from_secs(
            ctx.config.worker.heartbeat_interval_secs.max(1),
        ),
    };

    let executor = Arc::new(ManagerExecutor::new(ctx.manager()?));
    let worker = Worker::new(config, ctx.coordinator_clients(), executor)?;

    worker.start().await?;
    info!(worker_id = worker.worker_id(), "worker running");

    shutdown_signal().await.cancelled().await;
    info!("shutdown requested, draining");
    worker.stop().await;
    Ok(ExitCode::SUCCESS)
}
