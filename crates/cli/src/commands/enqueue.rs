// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Lattice Authors

//! `lattice enqueue`: add a run to the workflow's queue.

use crate::context::Context;
use crate::dagfile;
use lx_core::{DagRunId, DagRunRef, DagRunStatus, Priority};
use lx_store::{CreateAttemptOptions, QueueStore, RunAttempt, RunStore};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;

#[derive(clap::Args)]
pub struct EnqueueArgs {
    /// Parameter string recorded on the queued run.
    #[arg(short, value_name = "PARAMS")]
    pub params: Option<String>,

    /// Use this run ID instead of generating one.
    #[arg(long, value_name = "ID")]
    pub run_id: Option<String>,

    /// Queue name override; defaults to the workflow's queue.
    #[arg(long, value_name = "NAME")]
    pub queue: Option<String>,

    /// Path to the workflow definition.
    pub location: PathBuf,
}

pub async fn run(ctx: &Context, args: EnqueueArgs) -> anyhow::Result<ExitCode> {
    let dag = dagfile::load(&args.location)?;
    let run_id = match &args.run_id {
        Some(id) => DagRunId::from_string(id),
        None => DagRunId::new(),
    };
    let params = args.params.unwrap_or_else(|| dag.params.clone());
    let queue = args.queue.as_deref().unwrap_or_else(|| dag.queue_name());

    // The queued attempt exists before the item does, so every queued item
    // resolves to a readable status.
    let mut attempt = ctx
        .run_store
        .create_attempt(&dag, chrono::Utc::now(), &run_id, CreateAttemptOptions::default())
        .await?;
    let mut status = DagRunStatus::initial(&dag, run_id.clone(), params);
    status.mark_queued();
    attempt.open().await?;
    let write = attempt.write(&status).await;
    let close = attempt.close().await;
    write?;
    close?;

    let dag_run = DagRunRef::new(&dag.name, run_id);
    ctx.queue_store.enqueue(queue, Priority::Low, dag_run.clone())?;
    info!(dag_run = %dag_run, queue, "run enqueued");
    if !ctx.quiet {
        println!("{dag_run}");
    }
    Ok(ExitCode::SUCCESS)
}
