// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Lattice Authors

//! `lattice stop`: deliver graceful cancellation.

use crate::context::Context;
use crate::dagfile;
use lx_core::{DagRunId, RunStatus};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;

#[derive(clap::Args)]
pub struct StopArgs {
    /// Path to the workflow definition.
    pub location: PathBuf,

    /// Run to stop; defaults to the latest running instance.
    #[arg(long, value_name = "ID")]
    pub run_id: Option<String>,
}

pub async fn run(ctx: &Context, args: StopArgs) -> anyhow::Result<ExitCode> {
    let dag = dagfile::load(&args.location)?;
    let manager = ctx.manager()?;

    let run_id = match args.run_id {
        Some(id) => DagRunId::from_string(id),
        None => {
            let latest = manager.get_latest_status(&dag).await;
            if latest.status != RunStatus::Running {
                info!(dag = %dag.name, "no running instance to stop");
                return Ok(ExitCode::SUCCESS);
            }
            latest.run_id
        }
    };

    // Idempotent: stopping a run that is not running succeeds.
    manager.stop(&dag, &run_id).await?;
    info!(dag = %dag.name, run_id = %run_id, "stop delivered");
    Ok(ExitCode::SUCCESS)
}
