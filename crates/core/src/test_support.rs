// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Lattice Authors

//! Test fixtures shared across crates.

use crate::dag::{Dag, ResourceLimits, Step};
use crate::run::DagRunId;
use crate::status::DagRunStatus;
use std::collections::HashMap;

/// Minimal DAG with the given name and no steps.
pub fn dag(name: &str) -> Dag {
    Dag {
        name: name.to_string(),
        location: format!("/dags/{name}.yaml").into(),
        working_dir: None,
        max_active_runs: 1,
        schedule: None,
        queue: None,
        params: String::new(),
        labels: HashMap::new(),
        limits: ResourceLimits::default(),
        steps: Vec::new(),
    }
}

/// DAG whose steps form a linear chain in the given order.
pub fn dag_with_steps(name: &str, steps: &[&str]) -> Dag {
    let mut d = dag(name);
    d.steps = steps
        .iter()
        .enumerate()
        .map(|(i, s)| Step {
            name: s.to_string(),
            command: format!("echo {s}"),
            depends: if i == 0 { Vec::new() } else { vec![steps[i - 1].to_string()] },
        })
        .collect();
    d
}

/// Status for a run of `dag(name)` with the given run ID.
pub fn status(name: &str, run_id: &str) -> DagRunStatus {
    DagRunStatus::initial(&dag(name), DagRunId::from_string(run_id), "")
}
