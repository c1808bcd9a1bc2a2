// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Lattice Authors

//! `lattice start`: execute a workflow run in this process.

use crate::agent::{self, AgentParams};
use crate::commands::parse_ref;
use crate::context::Context;
use crate::dagfile;
use lx_core::{DagRunId, DagRunRef, Priority, RunStatus};
use lx_store::{CreateAttemptOptions, QueueStore, RunAttempt, RunStore};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;

#[derive(clap::Args)]
pub struct StartArgs {
    /// Parameter string passed to the run.
    #[arg(short, value_name = "PARAMS")]
    pub params: Option<String>,

    /// Run immediately even when the workflow queue is at capacity.
    #[arg(long)]
    pub no_queue: bool,

    /// Use this run ID instead of generating one.
    #[arg(long, value_name = "ID")]
    pub run_id: Option<String>,

    /// Root run when this is a child run, as `name:id`.
    #[arg(long, value_parser = parse_ref)]
    pub root: Option<DagRunRef>,

    /// Parent run when this is a child run, as `name:id`.
    #[arg(long, value_parser = parse_ref)]
    pub parent: Option<DagRunRef>,

    /// Path to the workflow definition.
    pub location: PathBuf,

    /// Trailing parameters after `--`.
    #[arg(last = true)]
    pub params_tail: Vec<String>,
}

pub async fn run(ctx: &Context, args: StartArgs) -> anyhow::Result<ExitCode> {
    let dag = dagfile::load(&args.location)?;
    let run_id = match &args.run_id {
        Some(id) => DagRunId::from_string(id),
        None => DagRunId::new(),
    };
    let params = match args.params {
        Some(p) => p,
        None if !args.params_tail.is_empty() => args.params_tail.join(" "),
        None => dag.params.clone(),
    };

    // Root runs respect the queue unless told otherwise: at capacity the run
    // is enqueued instead of started, so max_active_runs holds.
    if !args.no_queue && args.root.is_none() && at_capacity(ctx, &dag.name, dag.max_active_runs).await
    {
        let mut attempt = ctx
            .run_store
            .create_attempt(&dag, chrono::Utc::now(), &run_id, CreateAttemptOptions::default())
            .await?;
        let mut status = lx_core::DagRunStatus::initial(&dag, run_id.clone(), params);
        status.mark_queued();
        attempt.open().await?;
        let write = attempt.write(&status).await;
        let close = attempt.close().await;
        write?;
        close?;
        ctx.queue_store.enqueue(dag.queue_name(), Priority::Low, DagRunRef::new(&dag.name, run_id.clone()))?;
        info!(dag = %dag.name, run_id = %run_id, "workflow at capacity, run queued");
        if !ctx.quiet {
            println!("{}", DagRunRef::new(&dag.name, run_id));
        }
        return Ok(ExitCode::SUCCESS);
    }

    let final_status = agent::run_dag(
        ctx,
        AgentParams {
            dag,
            run_id,
            params,
            root: args.root,
            parent: args.parent,
            step_filter: None,
            retry: false,
        },
    )
    .await?;

    Ok(match final_status {
        RunStatus::Succeeded | RunStatus::PartialSuccess => ExitCode::SUCCESS,
        _ => ExitCode::FAILURE,
    })
}

async fn at_capacity(ctx: &Context, name: &str, max_active_runs: u32) -> bool {
    if max_active_runs == 0 {
        return false;
    }
    let opts = lx_store::ListStatusOptions::default()
        .name(name)
        .statuses([RunStatus::Running]);
    match ctx.run_store.list_statuses(opts).await {
        Ok(running) => running.len() >= max_active_runs as usize,
        Err(_) => false,
    }
}
