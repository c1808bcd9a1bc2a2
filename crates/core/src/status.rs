// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Lattice Authors

//! Run and node status model.
//!
//! [`DagRunStatus`] is the document written by the owning run process and read
//! back by the run manager, both through the control socket (live) and through
//! the run store (persisted).

use crate::dag::Dag;
use crate::run::{DagRunId, DagRunRef};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status of a whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunStatus {
    /// No attempt has produced a status yet.
    #[default]
    None,
    Queued,
    Running,
    Succeeded,
    Failed,
    Cancelled,
    /// Some nodes failed but the run was allowed to finish.
    PartialSuccess,
}

impl RunStatus {
    /// Queued or running: the run still owns (or will own) a process.
    pub fn is_active(&self) -> bool {
        matches!(self, RunStatus::Queued | RunStatus::Running)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunStatus::Succeeded
                | RunStatus::Failed
                | RunStatus::Cancelled
                | RunStatus::PartialSuccess
        )
    }
}

crate::simple_display! {
    RunStatus {
        None => "none",
        Queued => "queued",
        Running => "running",
        Succeeded => "succeeded",
        Failed => "failed",
        Cancelled => "cancelled",
        PartialSuccess => "partial-success",
    }
}

/// Status of a single node (step) within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeState {
    #[default]
    Pending,
    Running,
    Succeeded,
    Failed,
    Cancelled,
    Skipped,
}

crate::simple_display! {
    NodeState {
        Pending => "pending",
        Running => "running",
        Succeeded => "succeeded",
        Failed => "failed",
        Cancelled => "cancelled",
        Skipped => "skipped",
    }
}

/// Per-node execution record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub name: String,
    pub state: NodeState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stdout: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stderr: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Node {
    pub fn pending(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: NodeState::Pending,
            stdout: None,
            stderr: None,
            exit_code: None,
            started_at: None,
            finished_at: None,
            error: None,
        }
    }
}

/// The status document of one run attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DagRunStatus {
    pub name: String,
    #[serde(rename = "runID")]
    pub run_id: DagRunId,
    pub status: RunStatus,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nodes: Vec<Node>,
    /// PID of the owning process; present while the run is running.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pid: Option<i32>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub params: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    /// Outermost ancestor for child runs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<DagRunRef>,
    /// Direct parent for child runs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<DagRunRef>,
}

impl DagRunStatus {
    /// Fresh status for a run that has not been attempted yet.
    pub fn initial(dag: &Dag, run_id: DagRunId, params: impl Into<String>) -> Self {
        Self {
            name: dag.name.clone(),
            run_id,
            status: RunStatus::None,
            nodes: dag.steps.iter().map(|s| Node::pending(&s.name)).collect(),
            pid: None,
            params: params.into(),
            started_at: None,
            finished_at: None,
            root: None,
            parent: None,
        }
    }

    /// Synthesized status for callers that must always receive an answer.
    pub fn synthesized(name: impl Into<String>, run_id: DagRunId) -> Self {
        Self {
            name: name.into(),
            run_id,
            status: RunStatus::None,
            nodes: Vec::new(),
            pid: None,
            params: String::new(),
            started_at: None,
            finished_at: None,
            root: None,
            parent: None,
        }
    }

    pub fn run_ref(&self) -> DagRunRef {
        DagRunRef::new(&self.name, self.run_id.clone())
    }

    pub fn mark_queued(&mut self) {
        self.status = RunStatus::Queued;
    }

    pub fn mark_running(&mut self, pid: i32, at: DateTime<Utc>) {
        self.status = RunStatus::Running;
        self.pid = Some(pid);
        self.started_at = Some(at);
        self.finished_at = None;
    }

    pub fn finish(&mut self, status: RunStatus, at: DateTime<Utc>) {
        self.status = status;
        self.finished_at = Some(at);
    }

    /// Downgrade a `running` status whose owning process is gone.
    pub fn mark_dead(&mut self, at: DateTime<Utc>) {
        if self.status == RunStatus::Running {
            self.status = RunStatus::Failed;
            self.finished_at = Some(at);
        }
    }

    pub fn node_mut(&mut self, name: &str) -> Option<&mut Node> {
        self.nodes.iter_mut().find(|n| n.name == name)
    }

    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
