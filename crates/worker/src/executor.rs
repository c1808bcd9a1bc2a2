// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Lattice Authors

//! Task execution seam.
//!
//! The executor knows nothing about the worker; slot tracking wraps it from
//! the worker side. Production workers execute through the run manager,
//! which spawns the run sub-command and waits for its exit.

use async_trait::async_trait;
use lx_core::Task;
use lx_exec::{ExecError, RunManager};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Executes one dispatched task to completion.
#[async_trait]
pub trait TaskExecutor: Send + Sync {
    async fn execute(&self, cancel: &CancellationToken, task: &Task) -> Result<(), ExecError>;
}

/// Executor backed by the run manager's `handle_task`.
pub struct ManagerExecutor {
    manager: Arc<RunManager>,
}

impl ManagerExecutor {
    pub fn new(manager: Arc<RunManager>) -> Self {
        Self { manager }
    }
}

#[async_trait]
impl TaskExecutor for ManagerExecutor {
    async fn execute(&self, cancel: &CancellationToken, task: &Task) -> Result<(), ExecError> {
        self.manager.handle_task(cancel, task).await
    }
}
