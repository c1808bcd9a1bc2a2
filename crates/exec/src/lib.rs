// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Lattice Authors

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! lx-exec: child-process plumbing and the run manager.
//!
//! The command builder turns run operations into argument vectors for the
//! `lattice` binary; the runner spawns them in their own process group; the
//! run manager is the facade the rest of the plane calls to start, enqueue,
//! stop, and inspect runs.

mod builder;
mod error;
mod limits;
mod manager;
mod runner;
mod tracker;

pub use builder::{
    CmdBuilder, CmdSpec, EnqueueOptions, RestartOptions, RetryOptions, StartOptions,
};
pub use error::ExecError;
pub use limits::LimitController;
pub use manager::RunManager;
pub use runner::{run, run_cancellable, start, SpawnedRun};
pub use tracker::{pid_alive, ProcessTracker};
