// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Lattice Authors

//! Task handed from a dispatcher to a worker.
//!
//! Tasks are ephemeral: they exist between `Dispatch` and `Poll` delivery and
//! are never persisted. The wire encoding lives in lx-proto.

use crate::run::{DagRunId, DagRunRef};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// What the receiving worker should do with the run.
///
/// The default is [`Operation::Unspecified`], which every consumer must
/// reject; it is never treated as an implicit `start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    #[default]
    Unspecified,
    Start,
    Retry,
}

crate::simple_display! {
    Operation {
        Unspecified => "unspecified",
        Start => "start",
        Retry => "retry",
    }
}

/// A unit of work dispatched to a worker.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Task {
    pub operation: Operation,
    pub run_id: DagRunId,
    /// DAG location for `start`, DAG name for `retry`.
    pub target: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub params: String,
    /// Step filter for `retry`; empty retries the whole run.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub step: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<DagRunRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<DagRunRef>,
    /// Worker-selector labels; empty matches any poller.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub selector: HashMap<String, String>,
}

impl Task {
    pub fn start(run_id: DagRunId, target: impl Into<String>) -> Self {
        Self {
            operation: Operation::Start,
            run_id,
            target: target.into(),
            ..Default::default()
        }
    }

    pub fn retry(run_id: DagRunId, dag_name: impl Into<String>) -> Self {
        Self {
            operation: Operation::Retry,
            run_id,
            target: dag_name.into(),
            ..Default::default()
        }
    }

    /// True when every selector pair is present in `labels`.
    pub fn matches(&self, labels: &HashMap<String, String>) -> bool {
        self.selector.iter().all(|(k, v)| labels.get(k) == Some(v))
    }

    crate::setters! {
        into { params: String, step: String }
        set { selector: HashMap<String, String> }
        option { root: DagRunRef, parent: DagRunRef }
    }
}

#[cfg(test)]
#[path = "task_tests.rs"]
mod tests;
