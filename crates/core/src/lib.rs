// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Lattice Authors

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! lx-core: Domain model for the lattice execution plane

pub mod macros;

pub mod clock;
pub mod dag;
pub mod host;
pub mod queue;
pub mod run;
pub mod status;
pub mod task;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use clock::{Clock, FakeClock, SystemClock};
pub use dag::{CatchUp, CronEntry, Dag, DagError, ResourceLimits, ScheduleSpec, Step};
pub use host::{HostInfo, RunningTask, ServiceName, ServiceStatus, WorkerInfo};
pub use queue::{Priority, QueuedItem};
pub use run::{new_poller_id, DagRunId, DagRunRef, RefError};
pub use status::{DagRunStatus, Node, NodeState, RunStatus};
pub use task::{Operation, Task};
