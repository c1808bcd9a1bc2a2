// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Lattice Authors

//! Run store contract: per-attempt history of DAG runs.

use crate::error::StoreError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lx_core::{Dag, DagRunId, DagRunRef, DagRunStatus, RunStatus};

/// Options for [`RunStore::create_attempt`].
#[derive(Debug, Clone, Default)]
pub struct CreateAttemptOptions {
    /// Root run when the new attempt belongs to a child run.
    pub root: Option<DagRunRef>,
    /// True when this attempt retries an existing run.
    pub retry: bool,
}

/// Filters for [`RunStore::list_statuses`].
///
/// With no explicit window the listing covers the last 24 hours.
#[derive(Debug, Clone, Default)]
pub struct ListStatusOptions {
    pub name: Option<String>,
    pub statuses: Vec<RunStatus>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

impl ListStatusOptions {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn statuses(mut self, statuses: impl Into<Vec<RunStatus>>) -> Self {
        self.statuses = statuses.into();
        self
    }

    pub fn since(mut self, at: DateTime<Utc>) -> Self {
        self.since = Some(at);
        self
    }
}

/// One persisted execution attempt of a run.
///
/// Status writes follow an open/write/close cycle: at most one write per
/// cycle, and the write replaces the visible status atomically so a reader
/// sees either the previous or the new document, never a torn one.
#[async_trait]
pub trait RunAttempt: Send + Sync + std::fmt::Debug {
    /// Stable attempt identifier, unique within its run.
    fn id(&self) -> String;

    async fn open(&mut self) -> Result<(), StoreError>;
    async fn write(&mut self, status: &DagRunStatus) -> Result<(), StoreError>;
    async fn close(&mut self) -> Result<(), StoreError>;

    async fn read_status(&self) -> Result<DagRunStatus, StoreError>;
    async fn read_dag(&self) -> Result<Dag, StoreError>;
}

/// Durable history of run attempts, keyed by DAG name and run ID.
#[async_trait]
pub trait RunStore: Send + Sync {
    async fn create_attempt(
        &self,
        dag: &Dag,
        at: DateTime<Utc>,
        run_id: &DagRunId,
        opts: CreateAttemptOptions,
    ) -> Result<Box<dyn RunAttempt>, StoreError>;

    /// Most recent attempt of the most recent run of `name`.
    async fn latest_attempt(&self, name: &str) -> Result<Box<dyn RunAttempt>, StoreError>;

    /// Latest attempts of the `n` most recent runs of `name`, newest first.
    async fn recent_attempts(&self, name: &str, n: usize) -> Vec<Box<dyn RunAttempt>>;

    async fn find_attempt(&self, dag_run: &DagRunRef) -> Result<Box<dyn RunAttempt>, StoreError>;

    /// Attempt of a child run stored under `root`.
    async fn find_child_attempt(
        &self,
        root: &DagRunRef,
        child_run_id: &DagRunId,
    ) -> Result<Box<dyn RunAttempt>, StoreError>;

    async fn list_statuses(&self, opts: ListStatusOptions) -> Result<Vec<DagRunStatus>, StoreError>;

    /// Remove runs of `name` whose last activity is older than the retention
    /// window. Returns the removed run IDs. `retention_days < 0` disables
    /// pruning; `0` removes everything not currently active.
    async fn remove_old_runs(
        &self,
        name: &str,
        retention_days: i64,
    ) -> Result<Vec<DagRunId>, StoreError>;

    /// Move all run history from `old_name` to `new_name`.
    async fn rename_runs(&self, old_name: &str, new_name: &str) -> Result<(), StoreError>;

    async fn remove_run(&self, dag_run: &DagRunRef) -> Result<(), StoreError>;
}
