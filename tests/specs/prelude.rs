// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Lattice Authors

//! Shared fixtures for the execution-plane specs.

use async_trait::async_trait;
use chrono::Utc;
use lx_proto::v1::coordinator_service_server::CoordinatorServiceServer;
use parking_lot::Mutex;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tonic::transport::server::TcpIncoming;

// Everything the individual spec modules reach through the prelude glob.
pub use lx_coord::{BackoffPolicy, Coordinator, CoordinatorClient};
pub use lx_core::test_support::dag;
pub use lx_core::{Dag, DagRunId, DagRunRef, Priority, RunStatus, Task};
pub use lx_exec::ExecError;
pub use lx_sched::{MemoryCatalog, QueueScheduler, QueueSchedulerConfig};
pub use lx_store::{
    CreateAttemptOptions, FileQueueStore, FileRunStore, QueueStore, RunAttempt, RunStore,
};
pub use lx_worker::TaskExecutor;
pub use tokio_util::sync::CancellationToken;

pub struct Plane {
    pub state: TempDir,
    pub runs: Arc<FileRunStore>,
    pub queues: Arc<FileQueueStore>,
    pub catalog: Arc<MemoryCatalog>,
    pub coordinator: Arc<Coordinator>,
    pub addr: SocketAddr,
    pub cancel: CancellationToken,
}

impl Plane {
    /// Boot a coordinator (with health) on an ephemeral port plus fresh
    /// stores under a temp state dir.
    pub async fn boot() -> Self {
        let state = TempDir::new().unwrap();
        let coordinator = Arc::new(Coordinator::new());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let incoming = TcpIncoming::from_listener(listener, true, None).unwrap();

        let cancel = CancellationToken::new();
        let shutdown = cancel.clone();
        let service = Arc::clone(&coordinator);
        tokio::spawn(async move {
            let (mut reporter, health) = tonic_health::server::health_reporter();
            reporter.set_serving::<CoordinatorServiceServer<Arc<Coordinator>>>().await;
            tonic::transport::Server::builder()
                .add_service(health)
                .add_service(CoordinatorServiceServer::new(service))
                .serve_with_incoming_shutdown(incoming, shutdown.cancelled())
                .await
                .unwrap();
        });

        Self {
            runs: Arc::new(FileRunStore::new(state.path())),
            queues: Arc::new(FileQueueStore::new(state.path())),
            catalog: Arc::new(MemoryCatalog::new()),
            state,
            coordinator,
            addr,
            cancel,
        }
    }

    pub fn client(&self) -> Arc<CoordinatorClient> {
        Arc::new(CoordinatorClient::new(format!("http://{}", self.addr)).with_policy(
            BackoffPolicy {
                base: Duration::from_millis(10),
                factor: 2.0,
                max: Duration::from_millis(100),
            },
        ))
    }

    /// Queue scheduler with a fast rescan, started in the background.
    pub fn start_scheduler(&self) -> CancellationToken {
        let scheduler = QueueScheduler::new(
            Arc::clone(&self.queues) as _,
            Arc::clone(&self.runs) as _,
            Arc::clone(&self.catalog) as _,
            self.client(),
        )
        .with_config(QueueSchedulerConfig {
            rescan_interval: Duration::from_millis(25),
            backoff: BackoffPolicy {
                base: Duration::from_millis(10),
                factor: 2.0,
                max: Duration::from_millis(50),
            },
        });
        let cancel = CancellationToken::new();
        let loop_cancel = cancel.clone();
        tokio::spawn(async move { scheduler.run(loop_cancel).await });
        cancel
    }

    /// Enqueue a run the way the enqueue sub-command does: queued attempt
    /// first, then the queue item.
    pub async fn enqueue(&self, dag: &Dag, run_id: &str, params: &str) {
        let id = DagRunId::from_string(run_id);
        let mut attempt = self
            .runs
            .create_attempt(dag, Utc::now(), &id, CreateAttemptOptions::default())
            .await
            .unwrap();
        let mut status = lx_core::DagRunStatus::initial(dag, id.clone(), params);
        status.mark_queued();
        write_status(&mut attempt, &status).await;
        self.queues
            .enqueue(dag.queue_name(), Priority::Low, DagRunRef::new(&dag.name, id))
            .unwrap();
    }

    pub async fn statuses(&self, name: &str, status: RunStatus) -> usize {
        let opts =
            lx_store::ListStatusOptions::default().name(name).statuses([status]);
        self.runs.list_statuses(opts).await.unwrap().len()
    }
}

pub async fn write_status(
    attempt: &mut Box<dyn RunAttempt>,
    status: &lx_core::DagRunStatus,
) {
    attempt.open().await.unwrap();
    attempt.write(status).await.unwrap();
    attempt.close().await.unwrap();
}

/// Stand-in for the spawned run process: drives the persisted status
/// through queued → running → succeeded against the real run store.
pub struct InlineAgent {
    pub runs: Arc<FileRunStore>,
    pub hold: Duration,
    pub started: Mutex<Vec<DagRunId>>,
    pub completed: Mutex<Vec<DagRunId>>,
}

impl InlineAgent {
    pub fn new(runs: Arc<FileRunStore>, hold: Duration) -> Arc<Self> {
        Arc::new(Self {
            runs,
            hold,
            started: Mutex::new(Vec::new()),
            completed: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl TaskExecutor for InlineAgent {
    async fn execute(&self, cancel: &CancellationToken, task: &Task) -> Result<(), ExecError> {
        let name = std::path::Path::new(&task.target)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| task.target.clone());
        let dag_run = DagRunRef::new(&name, task.run_id.clone());

        let mut attempt = self.runs.find_attempt(&dag_run).await?;
        let mut status = attempt.read_status().await?;
        status.mark_running(std::process::id() as i32, Utc::now());
        write_status(&mut attempt, &status).await;
        self.started.lock().push(task.run_id.clone());

        tokio::select! {
            _ = tokio::time::sleep(self.hold) => {}
            _ = cancel.cancelled() => {
                status.finish(RunStatus::Cancelled, Utc::now());
                write_status(&mut attempt, &status).await;
                return Err(ExecError::Canceled);
            }
        }

        status.finish(RunStatus::Succeeded, Utc::now());
        write_status(&mut attempt, &status).await;
        self.completed.lock().push(task.run_id.clone());
        Ok(())
    }
}

pub async fn eventually(deadline: Duration, mut check: impl FnMut() -> bool) {
    let started = std::time::Instant::now();
    while !check() {
        assert!(started.elapsed() < deadline, "condition not reached in time");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// A minimal dag whose location stem matches its name, as the inline agent
/// expects.
pub fn plane_dag(name: &str) -> Dag {
    dag(name)
}
