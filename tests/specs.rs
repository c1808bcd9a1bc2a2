// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Lattice Authors

//! Workspace-level execution-plane specs.
//!
//! These wire real components together in one process: an actual
//! coordinator gRPC server, workers long-polling it, the queue scheduler
//! draining real stores, and an inline agent standing in for the spawned
//! run process.

#[path = "specs/prelude.rs"]
mod prelude;

#[path = "specs/happy_path.rs"]
mod happy_path;

#[path = "specs/selector.rs"]
mod selector;

#[path = "specs/capacity.rs"]
mod capacity;

#[path = "specs/dead_holder.rs"]
mod dead_holder;
