// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Lattice Authors

//! Service membership and worker fleet records.

use crate::run::{DagRunId, DagRunRef};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Services that register in the service registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceName {
    Coordinator,
    Scheduler,
}

crate::simple_display! {
    ServiceName {
        Coordinator => "coordinator",
        Scheduler => "scheduler",
    }
}

/// Liveness of a registered service member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStatus {
    Active,
    Inactive,
}

crate::simple_display! {
    ServiceStatus {
        Active => "active",
        Inactive => "inactive",
    }
}

/// One registered instance of a service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostInfo {
    /// `host:port` (or another stable per-instance address).
    pub host: String,
    pub status: ServiceStatus,
    pub heartbeat_at: DateTime<Utc>,
}

impl HostInfo {
    pub fn active(host: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self { host: host.into(), status: ServiceStatus::Active, heartbeat_at: at }
    }
}

/// A task currently executing on a worker slot, as reported by heartbeats.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunningTask {
    pub dag_run_id: DagRunId,
    pub dag_name: String,
    /// Unix seconds.
    pub started_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<DagRunRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<DagRunRef>,
}

/// Snapshot of one worker, refreshed by heartbeats and evicted after TTL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerInfo {
    pub worker_id: String,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub labels: HashMap<String, String>,
    pub total_pollers: u32,
    pub busy_pollers: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub running_tasks: Vec<RunningTask>,
    pub last_heartbeat_at: DateTime<Utc>,
}

#[cfg(test)]
#[path = "host_tests.rs"]
mod tests;
