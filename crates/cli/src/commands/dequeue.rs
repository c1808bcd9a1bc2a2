// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Lattice Authors

//! `lattice dequeue`: remove a queued run and mark it cancelled.

use crate::commands::parse_ref;
use crate::context::Context;
use lx_core::{DagRunRef, RunStatus};
use lx_store::{QueueStore, RunAttempt, RunStore};
use std::process::ExitCode;
use tracing::info;

#[derive(clap::Args)]
pub struct DequeueArgs {
    /// The queued run, as `name:id`.
    #[arg(long = "dag-run", value_parser = parse_ref)]
    pub dag_run: DagRunRef,
}

pub async fn run(ctx: &Context, args: DequeueArgs) -> anyhow::Result<ExitCode> {
    let mut removed = Vec::new();
    // The item lives in the workflow's queue, but a `--queue` override at
    // enqueue time may have put it elsewhere: search every queue.
    for queue in ctx.queue_store.queue_list() {
        removed.extend(ctx.queue_store.dequeue_by_run(&queue, &args.dag_run)?);
    }

    if removed.is_empty() {
        info!(dag_run = %args.dag_run, "nothing queued for run");
        return Ok(ExitCode::SUCCESS);
    }

    // Leave the run terminal so it never reads as pending.
    let attempt = ctx.run_store.find_attempt(&args.dag_run).await?;
    let mut status = attempt.read_status().await?;
    if status.status == RunStatus::Queued {
        status.finish(RunStatus::Cancelled, chrono::Utc::now());
        let mut attempt = attempt;
        attempt.open().await?;
        let write = attempt.write(&status).await;
        let close = attempt.close().await;
        write?;
        close?;
    }

    info!(dag_run = %args.dag_run, items = removed.len(), "run dequeued");
    Ok(ExitCode::SUCCESS)
}
