// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Lattice Authors

//! Control socket server owned by the workflow process.

use crate::http::{read_request, write_response, Request};
use crate::SockError;
use lx_core::DagRunStatus;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{UnixListener, UnixStream};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Per-connection I/O deadline. Keeps a stuck peer from pinning the task.
const IO_TIMEOUT: Duration = Duration::from_secs(1);

/// Live view of the owning run's status.
pub trait StatusSource: Send + Sync {
    fn status(&self) -> DagRunStatus;
}

/// The per-run control endpoint.
///
/// Binds eagerly so the caller learns about claim conflicts immediately; a
/// leftover socket file from a crashed run is unlinked before binding.
pub struct ControlSocket {
    path: PathBuf,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl ControlSocket {
    /// Bind and start serving. Cancelling `stop` is the signal `POST /stop`
    /// delivers to the in-process step scheduler.
    pub fn bind(
        path: PathBuf,
        source: Arc<dyn StatusSource>,
        stop: CancellationToken,
    ) -> Result<Self, SockError> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        // A stale file from a dead owner would fail the bind; callers verify
        // liveness by connecting, never by existence alone.
        if path.exists() {
            fs::remove_file(&path)?;
        }
        let listener = UnixListener::bind(&path)?;
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(serve(listener, source, stop, cancel.clone()));
        debug!(path = %path.display(), "control socket bound");
        Ok(Self { path, cancel, handle })
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Stop serving and remove the socket file.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(e) = self.handle.await {
            warn!(error = %e, "control socket task ended abnormally");
        }
        if let Err(e) = fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %self.path.display(), error = %e, "socket cleanup failed");
            }
        }
    }
}

async fn serve(
    listener: UnixListener,
    source: Arc<dyn StatusSource>,
    stop: CancellationToken,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, _)) => {
                        let source = Arc::clone(&source);
                        let stop = stop.clone();
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(stream, source, stop).await {
                                debug!(error = %e, "control connection error");
                            }
                        });
                    }
                    Err(e) => {
                        warn!(error = %e, "control socket accept error");
                        return;
                    }
                }
            }
        }
    }
}

async fn handle_connection(
    mut stream: UnixStream,
    source: Arc<dyn StatusSource>,
    stop: CancellationToken,
) -> Result<(), SockError> {
    let request = tokio::time::timeout(IO_TIMEOUT, read_request(&mut stream))
        .await
        .map_err(|_| SockError::Timeout)??;

    let write = async {
        match request {
            Request { ref method, ref path } if method == "GET" && path == "/status" => {
                let body = serde_json::to_vec(&source.status())?;
                write_response(&mut stream, 200, "OK", &body).await
            }
            Request { ref method, ref path } if method == "POST" && path == "/stop" => {
                // Respond only after the cancel signal is queued.
                stop.cancel();
                write_response(&mut stream, 200, "OK", b"{}").await
            }
            other => {
                debug!(method = %other.method, path = %other.path, "unknown control request");
                write_response(&mut stream, 404, "Not Found", b"").await
            }
        }
    };
    tokio::time::timeout(IO_TIMEOUT, write).await.map_err(|_| SockError::Timeout)?
}

#[cfg(test)]
#[path = "server_tests.rs"]
mod tests;
