// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Lattice Authors

//! Exit-code mapping.
//!
//! `0` success, `1` generic failure, `2` invalid argument, `3` target not
//! found, `4` operation not specified. Clap's own parse errors already exit
//! with `2`.

use lx_core::{DagError, RefError};
use lx_exec::ExecError;
use lx_sched::SchedError;
use std::process::ExitCode;

pub const INVALID_ARGUMENT: u8 = 2;
pub const NOT_FOUND: u8 = 3;
pub const OPERATION_UNSPECIFIED: u8 = 4;

pub fn code_for(err: &anyhow::Error) -> ExitCode {
    for cause in err.chain() {
        if let Some(exec) = cause.downcast_ref::<ExecError>() {
            if matches!(exec, ExecError::InvalidOperation) {
                return ExitCode::from(OPERATION_UNSPECIFIED);
            }
            if exec.is_not_found() {
                return ExitCode::from(NOT_FOUND);
            }
        }
        if let Some(store) = cause.downcast_ref::<lx_store::StoreError>() {
            if store.is_not_found() {
                return ExitCode::from(NOT_FOUND);
            }
        }
        if cause.downcast_ref::<DagError>().is_some()
            || cause.downcast_ref::<RefError>().is_some()
            || matches!(cause.downcast_ref::<SchedError>(), Some(SchedError::InvalidCron { .. }))
        {
            return ExitCode::from(INVALID_ARGUMENT);
        }
        if let Some(io) = cause.downcast_ref::<std::io::Error>() {
            if io.kind() == std::io::ErrorKind::NotFound {
                return ExitCode::from(NOT_FOUND);
            }
        }
    }
    ExitCode::FAILURE
}
