// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Lattice Authors

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! lx-proto: coordinator wire types and their domain conversions.

pub mod v1 {
    #![allow(clippy::all)]
    tonic::include_proto!("lattice.coordinator.v1");
}

mod convert;

pub use convert::{running_task_from_proto, running_task_to_proto, worker_info_from_proto};
