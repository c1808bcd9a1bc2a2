// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Lattice Authors

//! Execution error taxonomy.

use lx_sock::SockError;
use lx_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("failed to spawn child process")]
    Spawn(#[source] std::io::Error),

    #[error("command exited with code {code}: {output}")]
    CommandFailed { code: i32, output: String },

    #[error("command terminated by signal")]
    Signalled,

    #[error("task operation not specified")]
    InvalidOperation,

    #[error("operation canceled")]
    Canceled,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Sock(#[from] SockError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ExecError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ExecError::Store(e) if e.is_not_found())
    }

    /// Exit code of a failed command, when one was observed.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            ExecError::CommandFailed { code, .. } => Some(*code),
            _ => None,
        }
    }
}
