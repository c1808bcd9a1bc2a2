// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Lattice Authors

//! Coordinator client error taxonomy.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoordError {
    /// RPC-level failure worth retrying: connection refused, server gone,
    /// handshake failure.
    #[error("coordinator transport error: {0}")]
    Transport(String),

    /// Dispatch found no eligible idle poller. The queue layer requeues.
    #[error("no eligible poller waiting")]
    NoEligiblePoller,

    #[error("invalid request: {0}")]
    Invalid(String),

    #[error("operation canceled")]
    Canceled,

    #[error("coordinator rejected request: {0}")]
    Status(#[from] tonic::Status),
}

impl CoordError {
    /// Classify a gRPC status. `Unavailable` is transport-shaped and
    /// retriable; `FailedPrecondition` is the no-poller signal.
    pub fn from_status(status: tonic::Status) -> Self {
        match status.code() {
            tonic::Code::Unavailable => CoordError::Transport(status.message().to_string()),
            tonic::Code::FailedPrecondition => CoordError::NoEligiblePoller,
            tonic::Code::InvalidArgument => CoordError::Invalid(status.message().to_string()),
            tonic::Code::Cancelled => CoordError::Canceled,
            _ => CoordError::Status(status),
        }
    }

    pub fn is_retriable(&self) -> bool {
        matches!(self, CoordError::Transport(_))
    }
}

impl From<tonic::transport::Error> for CoordError {
    fn from(e: tonic::transport::Error) -> Self {
        CoordError::Transport(e.to_string())
    }
}
