// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Lattice Authors

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! lx-worker: long-polling task execution.
//!
//! A worker owns `N` slots, each driven by an independent poller loop against
//! a coordinator. Received tasks execute one at a time per slot; a heartbeat
//! loop reports `busyPollers ≤ totalPollers` and the running-task table to
//! every configured coordinator.

mod executor;
mod worker;

pub use executor::{ManagerExecutor, TaskExecutor};
pub use worker::{default_worker_id, Worker, WorkerConfig};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("worker has no coordinator endpoints")]
    NoCoordinators,

    #[error("worker requires at least one poller slot")]
    NoSlots,

    #[error(transparent)]
    Coord(#[from] lx_coord::CoordError),
}
