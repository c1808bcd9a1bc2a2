// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Lattice Authors

use super::*;
use std::collections::HashMap;

fn domain_task() -> Task {
    Task::start(DagRunId::from_string("r1"), "/dags/w1.yaml")
        .params("env=prod")
        .root(DagRunRef::new("p", "p1"))
        .parent(DagRunRef::new("p", "p1"))
}

#[test]
fn task_round_trips_through_wire() {
    let t = domain_task();
    let wire: v1::Task = t.clone().into();
    let back: Task = wire.into();
    assert_eq!(back, t);
}

#[test]
fn wire_task_without_refs_converts_to_none() {
    let wire = v1::Task {
        operation: v1::Operation::Retry as i32,
        dag_run_id: "r9".to_string(),
        target: "w1".to_string(),
        ..Default::default()
    };
    let t: Task = wire.into();
    assert_eq!(t.operation, Operation::Retry);
    assert_eq!(t.root, None);
    assert_eq!(t.parent, None);
}

#[test]
fn half_empty_ref_pair_is_dropped() {
    let wire = v1::Task {
        dag_run_id: "r1".to_string(),
        root_dag_run_name: "p".to_string(),
        // root_dag_run_id left empty
        ..Default::default()
    };
    let t: Task = wire.into();
    assert_eq!(t.root, None);
}

#[test]
fn unknown_refs_preserved_on_running_task() {
    let rt = RunningTask {
        dag_run_id: DagRunId::from_string("c1"),
        dag_name: "child".to_string(),
        started_at: 1_700_000_000,
        root: Some(DagRunRef::new("p", "p1")),
        parent: Some(DagRunRef::new("mid", "m1")),
    };
    let back = running_task_from_proto(running_task_to_proto(&rt));
    assert_eq!(back, rt);
}

#[test]
fn worker_info_from_proto_defaults_missing_stats() {
    let wire = v1::WorkerInfo {
        worker_id: "w@1".to_string(),
        labels: HashMap::new(),
        stats: None,
        last_heartbeat_at: 1_700_000_000,
    };
    let info = worker_info_from_proto(wire);
    assert_eq!(info.total_pollers, 0);
    assert_eq!(info.busy_pollers, 0);
    assert!(info.running_tasks.is_empty());
    assert_eq!(info.last_heartbeat_at.timestamp(), 1_700_000_000);
}

#[test]
fn operation_enum_maps_both_ways() {
    for (domain, wire) in [
        (Operation::Unspecified, v1::Operation::Unspecified),
        (Operation::Start, v1::Operation::Start),
        (Operation::Retry, v1::Operation::Retry),
    ] {
        assert_eq!(v1::Operation::from(domain), wire);
        assert_eq!(Operation::from(wire), domain);
    }
}
