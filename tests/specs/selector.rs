// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Lattice Authors

//! Label routing: a selector only matches workers carrying its labels.

use crate::prelude::*;
use lx_coord::CoordError;
use lx_worker::{Worker, WorkerConfig};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

fn labels(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
}

fn gpu_task(run_id: &str) -> Task {
    let mut task = Task::start(DagRunId::from_string(run_id), "/dags/train.yaml");
    task.selector = labels(&[("gpu", "true")]);
    task
}

async fn worker_with_labels(
    plane: &Plane,
    agent: &Arc<InlineAgent>,
    worker_labels: HashMap<String, String>,
) -> Worker {
    let worker = Worker::new(
        WorkerConfig {
            worker_id: "spec-worker@1".to_string(),
            max_active_runs: 1,
            labels: worker_labels,
            heartbeat_interval: Duration::from_millis(100),
        },
        vec![plane.client()],
        Arc::clone(agent) as _,
    )
    .unwrap();
    worker.start().await.unwrap();
    worker
}

#[tokio::test]
async fn mismatched_selector_fails_until_worker_relabels() {
    let plane = Plane::boot().await;
    let dag = plane_dag("train");
    plane.enqueue(&dag, "R1", "").await;

    let agent = InlineAgent::new(Arc::clone(&plane.runs), Duration::from_millis(10));
    let client = plane.client();

    // A cpu-only worker is parked; the gpu selector cannot match it.
    let cpu_worker = worker_with_labels(&plane, &agent, labels(&[("gpu", "false")])).await;
    eventually(Duration::from_secs(5), || plane.coordinator.waiting_pollers() == 1).await;

    let err = client.dispatch(gpu_task("R1")).await.unwrap_err();
    assert!(matches!(err, CoordError::NoEligiblePoller));
    assert!(agent.started.lock().is_empty());

    // The worker relabels and rejoins; a fresh dispatch succeeds.
    cpu_worker.stop().await;
    let gpu_worker = worker_with_labels(&plane, &agent, labels(&[("gpu", "true")])).await;
    eventually(Duration::from_secs(5), || plane.coordinator.waiting_pollers() >= 1).await;

    client.dispatch(gpu_task("R1")).await.unwrap();
    eventually(Duration::from_secs(5), || agent.completed.lock().len() == 1).await;

    gpu_worker.stop().await;
    plane.cancel.cancel();
}
