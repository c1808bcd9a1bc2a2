// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Lattice Authors

//! max_active_runs holds while a burst of queued runs drains.

use crate::prelude::*;
use lx_worker::{Worker, WorkerConfig};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn burst_of_five_drains_two_at_a_time_in_order() {
    let plane = Plane::boot().await;
    let mut dag = plane_dag("w2");
    dag.max_active_runs = 2;
    plane.catalog.insert(dag.clone());

    for i in 1..=5 {
        plane.enqueue(&dag, &format!("r{i}"), "").await;
    }

    // Five slots: worker capacity never constrains the scheduler's gate.
    let agent = InlineAgent::new(Arc::clone(&plane.runs), Duration::from_millis(150));
    let worker = Worker::new(
        WorkerConfig {
            worker_id: "spec-worker@1".to_string(),
            max_active_runs: 5,
            labels: HashMap::new(),
            heartbeat_interval: Duration::from_millis(100),
        },
        vec![plane.client()],
        Arc::clone(&agent) as _,
    )
    .unwrap();
    worker.start().await.unwrap();

    let scheduler_cancel = plane.start_scheduler();

    // Sample concurrency the whole time the burst drains.
    let sampler_runs = Arc::clone(&plane.runs);
    let sampler_cancel = CancellationToken::new();
    let sampler_stop = sampler_cancel.clone();
    let sampler = tokio::spawn(async move {
        let mut max_seen = 0usize;
        loop {
            if sampler_stop.is_cancelled() {
                return max_seen;
            }
            let opts = lx_store::ListStatusOptions::default()
                .name("w2")
                .statuses([RunStatus::Running]);
            if let Ok(running) = sampler_runs.list_statuses(opts).await {
                max_seen = max_seen.max(running.len());
            }
            tokio::time::sleep(Duration::from_millis(15)).await;
        }
    });

    eventually(Duration::from_secs(30), || agent.completed.lock().len() == 5).await;
    sampler_cancel.cancel();
    let max_running = sampler.await.unwrap();

    assert!(max_running <= 2, "observed {max_running} concurrent runs, cap is 2");
    // Strict FIFO: execution begins in enqueue order.
    let started: Vec<String> =
        agent.started.lock().iter().map(|id| id.to_string()).collect();
    assert_eq!(started, ["r1", "r2", "r3", "r4", "r5"]);

    // Every run landed terminal and the queue is empty.
    assert_eq!(plane.statuses("w2", RunStatus::Succeeded).await, 5);
    assert_eq!(plane.queues.len("w2"), 0);

    scheduler_cancel.cancel();
    worker.stop().await;
    plane.cancel.cancel();
}
