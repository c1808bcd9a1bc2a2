// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Lattice Authors

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! lx-store: storage contracts the execution plane depends on.
//!
//! Independent surfaces: the run store (per-attempt history), the queue
//! store (pending runs), the service registry (coordinator/scheduler
//! liveness), and scheduler watermarks (catch-up state). The plane only sees
//! the traits; each surface ships a crash-safe file implementation plus an
//! in-memory one for tests and single-process embedding.

mod error;
mod file_queue;
mod file_registry;
mod file_store;
mod queue;
mod registry;
mod run_store;
mod watermark;

pub use error::StoreError;
pub use file_queue::FileQueueStore;
pub use file_registry::FileServiceRegistry;
pub use file_store::FileRunStore;
pub use queue::{MemoryQueueStore, QueueEvent, QueueStore};
pub use registry::{MemoryServiceRegistry, ServiceRegistry};
pub use run_store::{CreateAttemptOptions, ListStatusOptions, RunAttempt, RunStore};
pub use watermark::{FileWatermarkStore, MemoryWatermarkStore, WatermarkStore};
