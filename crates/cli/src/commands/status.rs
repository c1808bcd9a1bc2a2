// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Lattice Authors

//! `lattice status`: print the current status as JSON.

use crate::context::Context;
use crate::dagfile;
use lx_core::DagRunId;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(clap::Args)]
pub struct StatusArgs {
    /// Path to the workflow definition.
    pub location: PathBuf,

    /// Specific run; defaults to the latest.
    #[arg(long, value_name = "ID")]
    pub run_id: Option<String>,

    /// Print the last N runs instead of one.
    #[arg(long, value_name = "N")]
    pub recent: Option<usize>,
}

pub async fn run(ctx: &Context, args: StatusArgs) -> anyhow::Result<ExitCode> {
    let dag = dagfile::load(&args.location)?;
    let manager = ctx.manager()?;

    let rendered = if let Some(n) = args.recent {
        serde_json::to_string_pretty(&manager.list_recent_status(&dag.name, n).await)?
    } else {
        let status = match args.run_id {
            Some(id) => manager.get_current_status(&dag, &DagRunId::from_string(id)).await,
            None => manager.get_latest_status(&dag).await,
        };
        serde_json::to_string_pretty(&status)?
    };
    println!("{rendered}");
    Ok(ExitCode::SUCCESS)
}
