// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Lattice Authors

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! lx-sched: the queue scheduler and the cron scheduler.
//!
//! The queue scheduler drains named queues into coordinator dispatches while
//! honouring per-workflow `max_active_runs`. The cron scheduler evaluates
//! each workflow's start/stop/restart series and injects runs at their due
//! times, with registry-based active/standby leadership.

mod catalog;
mod cron;
mod queue;

pub use catalog::{DagCatalog, MemoryCatalog};
pub use cron::{parse_cron, CronScheduler, CronSchedulerConfig, RunOps};
pub use queue::{QueueScheduler, QueueSchedulerConfig};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchedError {
    #[error("invalid cron expression {expr:?}: {message}")]
    InvalidCron { expr: String, message: String },

    #[error(transparent)]
    Exec(#[from] lx_exec::ExecError),

    #[error(transparent)]
    Store(#[from] lx_store::StoreError),

    #[error(transparent)]
    Coord(#[from] lx_coord::CoordError),
}
