// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Lattice Authors

//! Coordinator gRPC service.
//!
//! Pollers park in a waiter table until a dispatch hands exactly one of them
//! a task. Matching requires every selector pair to be present in the
//! poller's labels; ties go to the oldest waiter. Worker heartbeats refresh
//! an in-memory table evicted after a TTL of 3× the heartbeat interval.

use chrono::Duration as ChronoDuration;
use lx_core::{Clock, SystemClock, WorkerInfo};
use lx_proto::v1::coordinator_service_server::{CoordinatorService, CoordinatorServiceServer};
use lx_proto::v1::{
    DispatchRequest, DispatchResponse, GetWorkersRequest, GetWorkersResponse, HeartbeatRequest,
    HeartbeatResponse, PollRequest, PollResponse,
};
use lx_proto::{running_task_from_proto, running_task_to_proto};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::oneshot;
use tonic::{Request, Response, Status};
use tracing::{debug, info};

const DEFAULT_WORKER_TTL_SECS: i64 = 30;

struct Waiter {
    id: u64,
    worker_id: String,
    poller_id: String,
    labels: HashMap<String, String>,
    tx: oneshot::Sender<lx_core::Task>,
}

#[derive(Default)]
struct State {
    // Waiters in arrival order; dispatch scans front-to-back.
    waiters: Vec<Waiter>,
    workers: HashMap<String, WorkerInfo>,
    next_waiter_id: u64,
}

/// The broker itself. Cheap to clone via [`Arc`] into the tonic server.
pub struct Coordinator<C: Clock = SystemClock> {
    state: Mutex<State>,
    worker_ttl: ChronoDuration,
    clock: C,
}

impl Coordinator<SystemClock> {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for Coordinator<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> Coordinator<C> {
    pub fn with_clock(clock: C) -> Self {
        Self {
            state: Mutex::new(State::default()),
            worker_ttl: ChronoDuration::seconds(DEFAULT_WORKER_TTL_SECS),
            clock,
        }
    }

    pub fn with_worker_ttl(mut self, ttl: ChronoDuration) -> Self {
        self.worker_ttl = ttl;
        self
    }

    /// Hand `task` to the oldest eligible waiter. Errors with
    /// `FailedPrecondition` when nobody matches: the coordinator never queues.
    pub fn dispatch_task(&self, task: lx_core::Task) -> Result<(), Status> {
        if task.run_id.is_empty() {
            return Err(Status::invalid_argument("task has no dag-run id"));
        }
        if task.operation == lx_core::Operation::Unspecified {
            return Err(Status::invalid_argument("task operation not specified"));
        }

        let mut task = task;
        loop {
            let waiter = {
                let mut state = self.state.lock();
                let index = state.waiters.iter().position(|w| task.matches(&w.labels));
                match index {
                    Some(index) => state.waiters.remove(index),
                    None => {
                        return Err(Status::failed_precondition("no eligible poller waiting"))
                    }
                }
            };
            debug!(
                run_id = %task.run_id,
                worker = %waiter.worker_id,
                poller = %waiter.poller_id,
                "task dispatched"
            );
            // The poller may have vanished between matching and send; try the
            // next one rather than failing the dispatch.
            match waiter.tx.send(task) {
                Ok(()) => return Ok(()),
                Err(returned) => task = returned,
            }
        }
    }

    /// Number of parked pollers. Diagnostic surface for tests and metrics.
    pub fn waiting_pollers(&self) -> usize {
        self.state.lock().waiters.len()
    }

    fn record_heartbeat(&self, req: HeartbeatRequest) {
        let now = self.clock.utc();
        let stats = req.stats.unwrap_or_default();
        let info = WorkerInfo {
            worker_id: req.worker_id.clone(),
            labels: req.labels,
            total_pollers: stats.total_pollers,
            busy_pollers: stats.busy_pollers,
            running_tasks: stats.running_tasks.into_iter().map(running_task_from_proto).collect(),
            last_heartbeat_at: now,
        };
        let cutoff = now - self.worker_ttl;
        let mut state = self.state.lock();
        state.workers.insert(req.worker_id, info);
        state.workers.retain(|_, w| w.last_heartbeat_at >= cutoff);
    }

    /// Worker table snapshot with expired entries evicted.
    pub fn workers(&self) -> Vec<WorkerInfo> {
        let cutoff = self.clock.utc() - self.worker_ttl;
        let mut state = self.state.lock();
        state.workers.retain(|_, w| w.last_heartbeat_at >= cutoff);
        let mut out: Vec<WorkerInfo> = state.workers.values().cloned().collect();
        out.sort_by(|a, b| a.worker_id.cmp(&b.worker_id));
        out
    }
}

/// Removes a parked waiter when its poll call goes away un-served.
struct WaiterGuard<'a, C: Clock> {
    coordinator: &'a Coordinator<C>,
    id: u64,
}

impl<C: Clock> Drop for WaiterGuard<'_, C> {
    fn drop(&mut self) {
        let mut state = self.coordinator.state.lock();
        if let Some(index) = state.waiters.iter().position(|w| w.id == self.id) {
            state.waiters.remove(index);
        }
    }
}

#[tonic::async_trait]
impl<C: Clock + 'static> CoordinatorService for Arc<Coordinator<C>> {
    async fn poll(&self, request: Request<PollRequest>) -> Result<Response<PollResponse>, Status> {
        let req = request.into_inner();
        let (tx, rx) = oneshot::channel();

        let id = {
            let mut state = self.state.lock();
            let id = state.next_waiter_id;
            state.next_waiter_id += 1;
            state.waiters.push(Waiter {
                id,
                worker_id: req.worker_id,
                poller_id: req.poller_id,
                labels: req.labels,
                tx,
            });
            id
        };
        // Dropped when the call is cancelled mid-await, freeing the slot.
        let guard = WaiterGuard { coordinator: self, id };

        match rx.await {
            Ok(task) => {
                // Served: the dispatcher already removed the waiter entry.
                std::mem::forget(guard);
                Ok(Response::new(PollResponse { task: Some(task.into()) }))
            }
            Err(_) => Err(Status::cancelled("poll aborted")),
        }
    }

    async fn dispatch(
        &self,
        request: Request<DispatchRequest>,
    ) -> Result<Response<DispatchResponse>, Status> {
        let task = request
            .into_inner()
            .task
            .ok_or_else(|| Status::invalid_argument("dispatch carries no task"))?;
        self.dispatch_task(task.into())?;
        Ok(Response::new(DispatchResponse {}))
    }

    async fn heartbeat(
        &self,
        request: Request<HeartbeatRequest>,
    ) -> Result<Response<HeartbeatResponse>, Status> {
        self.record_heartbeat(request.into_inner());
        Ok(Response::new(HeartbeatResponse {}))
    }

    async fn get_workers(
        &self,
        _request: Request<GetWorkersRequest>,
    ) -> Result<Response<GetWorkersResponse>, Status> {
        let workers = self
            .workers()
            .into_iter()
            .map(|w| lx_proto::v1::WorkerInfo {
                worker_id: w.worker_id.clone(),
                labels: w.labels.clone(),
                stats: Some(lx_proto::v1::WorkerStats {
                    total_pollers: w.total_pollers,
                    busy_pollers: w.busy_pollers,
                    running_tasks: w.running_tasks.iter().map(running_task_to_proto).collect(),
                }),
                last_heartbeat_at: w.last_heartbeat_at.timestamp(),
            })
            .collect();
        Ok(Response::new(GetWorkersResponse { workers }))
    }
}

/// Serve the coordinator plus the standard health surface until `shutdown`
/// resolves.
pub async fn serve<C: Clock + 'static>(
    addr: SocketAddr,
    coordinator: Arc<Coordinator<C>>,
    shutdown: impl std::future::Future<Output = ()> + Send,
) -> Result<(), tonic::transport::Error> {
    let (mut health_reporter, health_service) = tonic_health::server::health_reporter();
    health_reporter
        .set_serving::<CoordinatorServiceServer<Arc<Coordinator<C>>>>()
        .await;

    info!(%addr, "coordinator listening");
    tonic::transport::Server::builder()
        .add_service(health_service)
        .add_service(CoordinatorServiceServer::new(coordinator))
        .serve_with_shutdown(addr, shutdown)
        .await
}

#[cfg(test)]
#[path = "service_tests.rs"]
mod tests;
