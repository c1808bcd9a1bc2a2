// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Lattice Authors

//! Probe client for another process's control socket.

use crate::http::round_trip;
use crate::SockError;
use lx_core::{DagRunStatus, RunStatus};
use std::path::PathBuf;
use std::time::Duration;
use tokio::net::UnixStream;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);

/// Client for one run's control socket.
#[derive(Debug, Clone)]
pub struct SocketClient {
    path: PathBuf,
    timeout: Duration,
}

impl SocketClient {
    pub fn new(path: PathBuf) -> Self {
        Self { path, timeout: DEFAULT_TIMEOUT }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Socket file exists. Not a liveness proof; use [`SocketClient::status`]
    /// to verify the owner answers.
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Fetch the live status from the owning process.
    pub async fn status(&self) -> Result<DagRunStatus, SockError> {
        if !self.exists() {
            return Err(SockError::Gone(self.path.clone()));
        }
        let body = self.request("GET", "/status").await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Deliver graceful cancellation. Succeeds once the owner acknowledged.
    pub async fn stop(&self) -> Result<(), SockError> {
        if !self.exists() {
            return Err(SockError::Gone(self.path.clone()));
        }
        self.request("POST", "/stop").await?;
        Ok(())
    }

    /// Socket exists, owner answers, and the answer says running.
    pub async fn is_running(&self) -> bool {
        matches!(self.status().await, Ok(s) if s.status == RunStatus::Running)
    }

    async fn request(&self, method: &str, path: &str) -> Result<Vec<u8>, SockError> {
        let io = async {
            let mut stream = UnixStream::connect(&self.path).await?;
            let (status, body) = round_trip(&mut stream, method, path).await?;
            if status != 200 {
                return Err(SockError::Status(status));
            }
            Ok(body)
        };
        tokio::time::timeout(self.timeout, io).await.map_err(|_| SockError::Timeout)?
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
