// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Lattice Authors

//! Outbound coordinator client shared by dispatchers and workers.
//!
//! `poll` retries transport failures indefinitely with full-jitter backoff;
//! `dispatch` surfaces every error to its caller so the queue layer can
//! classify and requeue. Connection-state transitions are logged once per
//! transition: ERROR on the first failure, DEBUG while failing, INFO on
//! recovery.

use crate::backoff::BackoffPolicy;
use crate::error::CoordError;
use crate::tls::TlsConfig;
use lx_core::{RunningTask, Task, WorkerInfo};
use lx_proto::v1::coordinator_service_client::CoordinatorServiceClient;
use lx_proto::v1::{DispatchRequest, GetWorkersRequest, HeartbeatRequest, PollRequest};
use lx_proto::{running_task_to_proto, worker_info_from_proto};
use std::collections::HashMap;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tonic::transport::{Channel, Endpoint};
use tonic_health::pb::health_check_response::ServingStatus;
use tonic_health::pb::health_client::HealthClient;
use tonic_health::pb::HealthCheckRequest;
use tracing::{debug, error, info};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Connection observability snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientMetrics {
    pub is_connected: bool,
    pub consecutive_fails: u32,
    pub last_error: Option<String>,
}

/// Worker-side stats carried on heartbeats.
#[derive(Debug, Clone, Default)]
pub struct HeartbeatStats {
    pub total_pollers: u32,
    pub busy_pollers: u32,
    pub running_tasks: Vec<RunningTask>,
}

/// Client for one coordinator endpoint.
pub struct CoordinatorClient {
    endpoint: String,
    tls: Option<TlsConfig>,
    policy: BackoffPolicy,
    channel: tokio::sync::Mutex<Option<Channel>>,
    metrics: parking_lot::Mutex<ClientMetrics>,
}

impl CoordinatorClient {
    /// `endpoint` is a full URI, e.g. `http://10.0.0.5:50055`.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            tls: None,
            policy: BackoffPolicy::default(),
            channel: tokio::sync::Mutex::new(None),
            metrics: parking_lot::Mutex::new(ClientMetrics::default()),
        }
    }

    pub fn with_tls(mut self, tls: TlsConfig) -> Self {
        if !tls.is_empty() || tls.skip_verify {
            self.tls = Some(tls);
        }
        self
    }

    pub fn with_policy(mut self, policy: BackoffPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn metrics(&self) -> ClientMetrics {
        self.metrics.lock().clone()
    }

    /// Drop the cached channel and its connections.
    pub async fn cleanup(&self) {
        *self.channel.lock().await = None;
    }

    async fn channel(&self) -> Result<Channel, CoordError> {
        let mut slot = self.channel.lock().await;
        if let Some(channel) = slot.as_ref() {
            return Ok(channel.clone());
        }
        let mut endpoint = Endpoint::from_shared(self.endpoint.clone())
            .map_err(|e| CoordError::Invalid(format!("bad endpoint {:?}: {e}", self.endpoint)))?
            .connect_timeout(CONNECT_TIMEOUT);
        if let Some(tls) = &self.tls {
            let config = tls.client_config().map_err(|e| CoordError::Transport(e.to_string()))?;
            endpoint = endpoint.tls_config(config)?;
        }
        let channel = endpoint.connect().await?;
        *slot = Some(channel.clone());
        Ok(channel)
    }

    fn record_success(&self) {
        let mut metrics = self.metrics.lock();
        if !metrics.is_connected && metrics.consecutive_fails > 0 {
            info!(endpoint = %self.endpoint, "coordinator connection recovered");
        }
        metrics.is_connected = true;
        metrics.consecutive_fails = 0;
        metrics.last_error = None;
    }

    fn record_failure(&self, err: &CoordError) {
        let mut metrics = self.metrics.lock();
        metrics.consecutive_fails = metrics.consecutive_fails.saturating_add(1);
        metrics.last_error = Some(err.to_string());
        if metrics.is_connected || metrics.consecutive_fails == 1 {
            error!(endpoint = %self.endpoint, error = %err, "coordinator connection lost");
        } else {
            debug!(
                endpoint = %self.endpoint,
                error = %err,
                fails = metrics.consecutive_fails,
                "coordinator still unreachable"
            );
        }
        metrics.is_connected = false;
    }

    async fn reset_channel(&self) {
        *self.channel.lock().await = None;
    }

    /// Long-poll for one task. Transport failures retry forever with jittered
    /// backoff; cancellation aborts within one backoff interval.
    pub async fn poll(
        &self,
        cancel: &CancellationToken,
        worker_id: &str,
        poller_id: &str,
        labels: &HashMap<String, String>,
    ) -> Result<Option<Task>, CoordError> {
        let mut attempt: u32 = 0;
        loop {
            if cancel.is_cancelled() {
                return Err(CoordError::Canceled);
            }
            let call = self.try_poll(worker_id, poller_id, labels);
            let result = tokio::select! {
                _ = cancel.cancelled() => return Err(CoordError::Canceled),
                result = call => result,
            };
            match result {
                Ok(task) => {
                    self.record_success();
                    return Ok(task);
                }
                Err(e) if e.is_retriable() => {
                    self.record_failure(&e);
                    self.reset_channel().await;
                    let delay = self.policy.delay(attempt);
                    attempt = attempt.saturating_add(1);
                    tokio::select! {
                        _ = cancel.cancelled() => return Err(CoordError::Canceled),
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn try_poll(
        &self,
        worker_id: &str,
        poller_id: &str,
        labels: &HashMap<String, String>,
    ) -> Result<Option<Task>, CoordError> {
        let mut client = CoordinatorServiceClient::new(self.channel().await?);
        let response = client
            .poll(PollRequest {
                worker_id: worker_id.to_string(),
                poller_id: poller_id.to_string(),
                labels: labels.clone(),
            })
            .await
            .map_err(CoordError::from_status)?;
        Ok(response.into_inner().task.map(Task::from))
    }

    /// Hand a task to the coordinator. Not retried here: the queue scheduler
    /// owns requeue-and-backoff.
    pub async fn dispatch(&self, task: Task) -> Result<(), CoordError> {
        let channel = match self.channel().await {
            Ok(channel) => channel,
            Err(e) => {
                self.record_failure(&e);
                return Err(e);
            }
        };
        let mut client = CoordinatorServiceClient::new(channel);
        match client.dispatch(DispatchRequest { task: Some(task.into()) }).await {
            Ok(_) => {
                self.record_success();
                Ok(())
            }
            Err(status) => {
                let err = CoordError::from_status(status);
                if err.is_retriable() {
                    self.record_failure(&err);
                    self.reset_channel().await;
                } else {
                    // The round-trip itself worked; only the answer was no.
                    self.record_success();
                }
                Err(err)
            }
        }
    }

    pub async fn heartbeat(
        &self,
        worker_id: &str,
        labels: &HashMap<String, String>,
        stats: HeartbeatStats,
    ) -> Result<(), CoordError> {
        let mut client = CoordinatorServiceClient::new(self.channel().await?);
        client
            .heartbeat(HeartbeatRequest {
                worker_id: worker_id.to_string(),
                labels: labels.clone(),
                stats: Some(lx_proto::v1::WorkerStats {
                    total_pollers: stats.total_pollers,
                    busy_pollers: stats.busy_pollers,
                    running_tasks: stats.running_tasks.iter().map(running_task_to_proto).collect(),
                }),
            })
            .await
            .map_err(CoordError::from_status)?;
        Ok(())
    }

    pub async fn get_workers(&self) -> Result<Vec<WorkerInfo>, CoordError> {
        let mut client = CoordinatorServiceClient::new(self.channel().await?);
        let response =
            client.get_workers(GetWorkersRequest {}).await.map_err(CoordError::from_status)?;
        Ok(response.into_inner().workers.into_iter().map(worker_info_from_proto).collect())
    }

    /// Block until the coordinator's health endpoint reports serving, with
    /// the same retry policy as `poll`.
    pub async fn wait_for_health(&self, cancel: &CancellationToken) -> Result<(), CoordError> {
        let mut attempt: u32 = 0;
        loop {
            if cancel.is_cancelled() {
                return Err(CoordError::Canceled);
            }
            match self.check_health().await {
                Ok(true) => {
                    self.record_success();
                    return Ok(());
                }
                Ok(false) => debug!(endpoint = %self.endpoint, "coordinator not serving yet"),
                Err(e) => {
                    self.record_failure(&e);
                    self.reset_channel().await;
                }
            }
            let delay = self.policy.delay(attempt);
            attempt = attempt.saturating_add(1);
            tokio::select! {
                _ = cancel.cancelled() => return Err(CoordError::Canceled),
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    async fn check_health(&self) -> Result<bool, CoordError> {
        let mut client = HealthClient::new(self.channel().await?);
        let response = client
            .check(HealthCheckRequest { service: String::new() })
            .await
            .map_err(CoordError::from_status)?;
        Ok(response.into_inner().status() == ServingStatus::Serving)
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
