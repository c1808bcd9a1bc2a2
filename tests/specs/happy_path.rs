// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Lattice Authors

//! Enqueue → dispatch → execute → persisted history, end to end.

use crate::prelude::*;
use lx_core::RunStatus;
use lx_worker::{Worker, WorkerConfig};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn enqueued_run_executes_and_lands_in_history() {
    let plane = Plane::boot().await;
    let mut dag = plane_dag("w1");
    dag.queue = Some("q1".to_string());
    plane.catalog.insert(dag.clone());

    plane.enqueue(&dag, "R1", "env=prod").await;

    let agent = InlineAgent::new(Arc::clone(&plane.runs), Duration::from_millis(20));
    let worker = Worker::new(
        WorkerConfig {
            worker_id: "spec-worker@1".to_string(),
            max_active_runs: 1,
            labels: HashMap::new(),
            heartbeat_interval: Duration::from_millis(100),
        },
        vec![plane.client()],
        Arc::clone(&agent) as _,
    )
    .unwrap();
    worker.start().await.unwrap();

    let scheduler_cancel = plane.start_scheduler();

    // The run executes within a scheduling interval and history shows one
    // succeeded entry with the original run ID and params.
    eventually(Duration::from_secs(10), || agent.completed.lock().len() == 1).await;

    let recent = plane.runs.recent_attempts("w1", 1).await;
    assert_eq!(recent.len(), 1);
    let status = recent[0].read_status().await.unwrap();
    assert_eq!(status.status, RunStatus::Succeeded);
    assert_eq!(status.run_id, "R1");
    assert_eq!(status.params, "env=prod");

    // The queue drained and nothing else is pending.
    assert_eq!(plane.queues.len("q1"), 0);

    scheduler_cancel.cancel();
    worker.stop().await;
    plane.cancel.cancel();
}
