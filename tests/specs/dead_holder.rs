// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Lattice Authors

//! The dead-holder rule: a stored `running` whose owner is gone reads as
//! `failed`.

use crate::prelude::*;
use chrono::Utc;
use lx_exec::{CmdBuilder, RunManager};
use std::sync::Arc;

#[tokio::test]
async fn stored_running_with_dead_pid_reads_failed() {
    let plane = Plane::boot().await;
    let dag = plane_dag("w1");

    // Persist a running status owned by a PID that cannot exist, with no
    // control socket on disk.
    let run_id = DagRunId::from_string("r1");
    let mut attempt = plane
        .runs
        .create_attempt(&dag, Utc::now(), &run_id, CreateAttemptOptions::default())
        .await
        .unwrap();
    let mut status = lx_core::DagRunStatus::initial(&dag, run_id.clone(), "");
    status.mark_running(99_999_999, Utc::now());
    write_status(&mut attempt, &status).await;

    let manager = RunManager::new(
        CmdBuilder::new("/bin/false"),
        Arc::clone(&plane.runs) as _,
        plane.state.path().to_path_buf(),
    );

    let latest = manager.get_latest_status(&dag).await;
    assert_eq!(latest.status, RunStatus::Failed);
    assert!(latest.finished_at.is_some());

    let current = manager.get_current_status(&dag, &run_id).await;
    assert_eq!(current.status, RunStatus::Failed);

    plane.cancel.cancel();
}
