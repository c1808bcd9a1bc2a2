// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Lattice Authors

//! Conversions between wire messages and lx-core domain types.
//!
//! Root/parent references travel as separate name/id string pairs on the wire;
//! a pair is only meaningful when both halves are non-empty.

use crate::v1;
use chrono::{DateTime, TimeZone, Utc};
use lx_core::{DagRunId, DagRunRef, Operation, RunningTask, Task, WorkerInfo};

fn ref_from_pair(name: &str, id: &str) -> Option<DagRunRef> {
    if name.is_empty() || id.is_empty() {
        None
    } else {
        Some(DagRunRef::new(name, id))
    }
}

fn ref_to_pair(r: &Option<DagRunRef>) -> (String, String) {
    match r {
        Some(r) => (r.name.clone(), r.id.to_string()),
        None => (String::new(), String::new()),
    }
}

impl From<v1::Operation> for Operation {
    fn from(op: v1::Operation) -> Self {
        match op {
            v1::Operation::Unspecified => Operation::Unspecified,
            v1::Operation::Start => Operation::Start,
            v1::Operation::Retry => Operation::Retry,
        }
    }
}

impl From<Operation> for v1::Operation {
    fn from(op: Operation) -> Self {
        match op {
            Operation::Unspecified => v1::Operation::Unspecified,
            Operation::Start => v1::Operation::Start,
            Operation::Retry => v1::Operation::Retry,
        }
    }
}

impl From<v1::Task> for Task {
    fn from(t: v1::Task) -> Self {
        Task {
            operation: t.operation().into(),
            run_id: DagRunId::from_string(t.dag_run_id),
            target: t.target,
            params: t.params,
            step: t.step,
            root: ref_from_pair(&t.root_dag_run_name, &t.root_dag_run_id),
            parent: ref_from_pair(&t.parent_dag_run_name, &t.parent_dag_run_id),
            selector: t.selector,
        }
    }
}

impl From<Task> for v1::Task {
    fn from(t: Task) -> Self {
        let (root_name, root_id) = ref_to_pair(&t.root);
        let (parent_name, parent_id) = ref_to_pair(&t.parent);
        v1::Task {
            operation: v1::Operation::from(t.operation) as i32,
            dag_run_id: t.run_id.to_string(),
            target: t.target,
            params: t.params,
            step: t.step,
            root_dag_run_name: root_name,
            root_dag_run_id: root_id,
            parent_dag_run_name: parent_name,
            parent_dag_run_id: parent_id,
            selector: t.selector,
        }
    }
}

pub fn running_task_from_proto(t: v1::RunningTask) -> RunningTask {
    RunningTask {
        dag_run_id: DagRunId::from_string(t.dag_run_id),
        dag_name: t.dag_name,
        started_at: t.started_at,
        root: ref_from_pair(&t.root_dag_run_name, &t.root_dag_run_id),
        parent: ref_from_pair(&t.parent_dag_run_name, &t.parent_dag_run_id),
    }
}

pub fn running_task_to_proto(t: &RunningTask) -> v1::RunningTask {
    let (root_name, root_id) = ref_to_pair(&t.root);
    let (parent_name, parent_id) = ref_to_pair(&t.parent);
    v1::RunningTask {
        dag_run_id: t.dag_run_id.to_string(),
        dag_name: t.dag_name.clone(),
        started_at: t.started_at,
        root_dag_run_name: root_name,
        root_dag_run_id: root_id,
        parent_dag_run_name: parent_name,
        parent_dag_run_id: parent_id,
    }
}

fn utc_from_unix(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).single().unwrap_or_default()
}

pub fn worker_info_from_proto(w: v1::WorkerInfo) -> WorkerInfo {
    let stats = w.stats.unwrap_or_default();
    WorkerInfo {
        worker_id: w.worker_id,
        labels: w.labels,
        total_pollers: stats.total_pollers,
        busy_pollers: stats.busy_pollers,
        running_tasks: stats.running_tasks.into_iter().map(running_task_from_proto).collect(),
        last_heartbeat_at: utc_from_unix(w.last_heartbeat_at),
    }
}

#[cfg(test)]
#[path = "convert_tests.rs"]
mod tests;
