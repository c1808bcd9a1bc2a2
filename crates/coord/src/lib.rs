// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Lattice Authors

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! lx-coord: the coordinator broker and its client.
//!
//! The coordinator matches dispatched tasks to long-polling workers. It is a
//! stateless broker: nothing is queued inside it, and a dispatch with no
//! eligible waiting poller fails with `FailedPrecondition` so the caller's
//! queue layer can retry.

mod backoff;
mod client;
mod error;
mod service;
mod tls;

pub use backoff::BackoffPolicy;
pub use client::{ClientMetrics, CoordinatorClient};
pub use error::CoordError;
pub use service::{serve, Coordinator};
pub use tls::TlsConfig;
