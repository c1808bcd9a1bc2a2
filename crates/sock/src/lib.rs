// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Lattice Authors

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! lx-sock: per-run control socket.
//!
//! Every running workflow process serves a tiny HTTP surface on a Unix
//! socket at a path derived from `(dag name, run ID)`:
//!
//! - `GET /status`: JSON of the live run status
//! - `POST /stop`: queue graceful cancellation, respond once delivered
//!
//! Socket existence is the liveness signal: the file is removed on clean
//! shutdown, and callers treat connect failures on a leftover file as
//! "not running".

mod client;
mod http;
mod server;

use std::path::{Path, PathBuf};

pub use client::SocketClient;
pub use server::{ControlSocket, StatusSource};

use thiserror::Error;

/// Errors from control socket I/O.
#[derive(Debug, Error)]
pub enum SockError {
    #[error("socket does not exist: {0}")]
    Gone(PathBuf),

    #[error("control socket I/O timed out")]
    Timeout,

    #[error("malformed http payload: {0}")]
    Malformed(String),

    #[error("unexpected http status {0}")]
    Status(u16),

    #[error("corrupt status document: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Deterministic socket path for a run: `⟨stateDir⟩/⟨name⟩/⟨runID⟩.sock`.
pub fn socket_path(state_dir: &Path, name: &str, run_id: &str) -> PathBuf {
    state_dir.join(name).join(format!("{run_id}.sock"))
}
