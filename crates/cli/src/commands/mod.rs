// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Lattice Authors

//! Sub-command implementations.

pub mod coordinator;
pub mod dequeue;
pub mod enqueue;
pub mod restart;
pub mod retry;
pub mod scheduler;
pub mod start;
pub mod status;
pub mod stop;
pub mod worker;

use lx_core::DagRunRef;
use std::str::FromStr;

/// Parse `name:id` flags (`--root`, `--parent`, `--dag-run`).
pub(crate) fn parse_ref(value: &str) -> Result<DagRunRef, String> {
    DagRunRef::from_str(value).map_err(|e| e.to_string())
}
