// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Lattice Authors

//! `lattice restart`: stop the running instance, then run afresh.

use crate::agent::{self, AgentParams};
use crate::context::Context;
use crate::dagfile;
use lx_core::{DagRunId, RunStatus};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing::info;

const STOP_DEADLINE: Duration = Duration::from_secs(60);

#[derive(clap::Args)]
pub struct RestartArgs {
    /// Path to the workflow definition.
    pub location: PathBuf,
}

pub async fn run(ctx: &Context, args: RestartArgs) -> anyhow::Result<ExitCode> {
    let dag = dagfile::load(&args.location)?;
    let manager = ctx.manager()?;

    // Stop whatever is currently running, then wait for it to let go.
    let latest = manager.get_latest_status(&dag).await;
    if latest.status == RunStatus::Running {
        info!(dag = %dag.name, run_id = %latest.run_id, "stopping running instance");
        manager.stop(&dag, &latest.run_id).await?;
        let deadline = std::time::Instant::now() + STOP_DEADLINE;
        while manager.is_running(&dag, &latest.run_id).await {
            if std::time::Instant::now() > deadline {
                anyhow::bail!(
                    "run {}:{} did not stop within {STOP_DEADLINE:?}",
                    dag.name,
                    latest.run_id
                );
            }
            tokio::time::sleep(Duration::from_millis(200)).await;
        }
    }

    let params =
        if latest.params.is_empty() { dag.params.clone() } else { latest.params.clone() };
    let final_status = agent::run_dag(
        ctx,
        AgentParams {
            dag,
            run_id: DagRunId::new(),
            params,
            root: None,
            parent: None,
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
