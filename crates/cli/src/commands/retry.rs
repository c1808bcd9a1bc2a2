// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Lattice Authors

//! `lattice retry`: re-execute an existing run as a new attempt.

use crate::agent::{self, AgentParams};
use crate::context::Context;
use lx_core::{DagRunId, DagRunRef, RunStatus};
use lx_store::{ListStatusOptions, RunAttempt, RunStore};
use std::process::ExitCode;

#[derive(clap::Args)]
pub struct RetryArgs {
    /// Run to retry.
    #[arg(long, value_name = "ID")]
    pub run_id: String,

    /// Re-execute only this step.
    #[arg(long, value_name = "NAME")]
    pub step: Option<String>,

    /// Skip the max-active-runs capacity check.
    #[arg(long)]
    pub disable_max_active_runs: bool,

    /// Workflow name.
    pub name: String,
}

pub async fn run(ctx: &Context, args: RetryArgs) -> anyhow::Result<ExitCode> {
    let dag_run = DagRunRef::new(&args.name, DagRunId::from_string(&args.run_id));
    let attempt = ctx.run_store.find_attempt(&dag_run).await?;
    // The stored definition, not the current file: retries re-run what ran.
    let dag = attempt.read_dag().await?;
    let previous = attempt.read_status().await?;

    if !args.disable_max_active_runs && dag.max_active_runs > 0 {
        let opts = ListStatusOptions::default()
            .name(&dag.name)
            .statuses([RunStatus::Running]);
        let running = ctx.run_store.list_statuses(opts).await?.len();
        if running >= dag.max_active_runs as usize {
            anyhow::bail!(
                "workflow {:?} already has {running} running instance(s); \
                 use --disable-max-active-runs to retry anyway",
                dag.name
            );
        }
    }

    let final_status = agent::run_dag(
        ctx,
        AgentParams {
            dag,
            run_id: dag_run.id,
            params: previous.params,
            root: previous.root,
            parent: previous.parent,
            step_filter: args.step,
            retry: true,
        },
    )
    .await?;

    Ok(match final_status {
        RunStatus::Succeeded | RunStatus::PartialSuccess => ExitCode::SUCCESS,
        _ => ExitCode::FAILURE,
    })
}
