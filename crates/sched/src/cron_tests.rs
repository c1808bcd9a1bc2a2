// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Lattice Authors

use super::*;
use chrono::TimeZone;
use lx_core::test_support::dag;
use lx_core::{FakeClock, Priority, ScheduleSpec, ServiceStatus};
use lx_store::{
    CreateAttemptOptions, FileRunStore, FileWatermarkStore, MemoryQueueStore,
    MemoryServiceRegistry, RunAttempt,
};
use parking_lot::Mutex;
use tempfile::TempDir;

/// Records every operation in order; optionally mirrors enqueues into the
/// queue store the way the real enqueue sub-command does.
struct RecordingOps {
    calls: Mutex<Vec<String>>,
    queues: Option<Arc<MemoryQueueStore>>,
}

impl RecordingOps {
    fn new() -> Arc<Self> {
        Arc::new(Self { calls: Mutex::new(Vec::new()), queues: None })
    }

    fn mirroring(queues: Arc<MemoryQueueStore>) -> Arc<Self> {
        Arc::new(Self { calls: Mutex::new(Vec::new()), queues: Some(queues) })
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl RunOps for RecordingOps {
    async fn enqueue(&self, dag: &Dag) -> Result<DagRunId, ExecError> {
        let run_id = DagRunId::new();
        self.calls.lock().push(format!("enqueue:{}", dag.name));
        if let Some(queues) = &self.queues {
            queues
                .enqueue(
                    dag.queue_name(),
                    Priority::Low,
                    lx_core::DagRunRef::new(&dag.name, run_id.clone()),
                )
                .map_err(lx_exec::ExecError::Store)?;
        }
        Ok(run_id)
    }

    async fn stop(&self, dag: &Dag, run_id: &DagRunId) -> Result<(), ExecError> {
        self.calls.lock().push(format!("stop:{}:{run_id}", dag.name));
        Ok(())
    }

    async fn restart(&self, dag: &Dag) -> Result<(), ExecError> {
        self.calls.lock().push(format!("restart:{}", dag.name));
        Ok(())
    }
}

struct Fixture {
    _state: TempDir,
    clock: FakeClock,
    catalog: Arc<crate::MemoryCatalog>,
    queues: Arc<MemoryQueueStore>,
    runs: Arc<FileRunStore>,
    registry: Arc<MemoryServiceRegistry<FakeClock>>,
    watermarks: Arc<FileWatermarkStore>,
}

fn fixture() -> Fixture {
    let state = TempDir::new().unwrap();
    let clock = FakeClock::new();
    // Pin to a known wall-clock instant: 2024-01-02 03:00:00 UTC.
    let pinned = Utc.with_ymd_and_hms(2024, 1, 2, 3, 0, 0).single().unwrap();
    clock.set_epoch_ms(pinned.timestamp_millis() as u64);
    Fixture {
        runs: Arc::new(FileRunStore::new(state.path())),
        watermarks: Arc::new(FileWatermarkStore::new(state.path())),
        _state: state,
        catalog: Arc::new(crate::MemoryCatalog::new()),
        queues: Arc::new(MemoryQueueStore::new()),
        registry: Arc::new(MemoryServiceRegistry::with_clock(
            clock.clone(),
            ChronoDuration::seconds(30),
        )),
        clock,
    }
}

impl Fixture {
    fn scheduler(&self, ops: Arc<RecordingOps>, host: &str) -> CronScheduler<FakeClock> {
        self.registry.register(
            ServiceName::Scheduler,
            HostInfo::active(host, self.clock.utc()),
        );
        CronScheduler::new(
            Arc::clone(&self.catalog) as _,
            ops as _,
            Arc::clone(&self.queues) as _,
            Arc::clone(&self.runs) as _,
            Arc::clone(&self.registry) as _,
            Arc::clone(&self.watermarks) as _,
            CronSchedulerConfig { host: host.to_string(), ..Default::default() },
            self.clock.clone(),
        )
    }

    async fn persist_running(&self, name: &str, run_id: &str) {
        let d = dag(name);
        let id = DagRunId::from_string(run_id);
        let mut attempt = self
            .runs
            .create_attempt(&d, self.clock.utc(), &id, CreateAttemptOptions::default())
            .await
            .unwrap();
        let mut s = lx_core::test_support::status(name, run_id);
        s.mark_running(std::process::id() as i32, self.clock.utc());
        attempt.open().await.unwrap();
        attempt.write(&s).await.unwrap();
        attempt.close().await.unwrap();
    }
}

fn scheduled_dag(name: &str, spec: ScheduleSpec) -> Dag {
    let mut d = dag(name);
    d.schedule = Some(spec);
    d
}

fn every_minute_start() -> ScheduleSpec {
    ScheduleSpec { start: vec![CronEntry::new("* * * * *")], ..Default::default() }
}

#[tokio::test]
async fn start_fires_for_due_tick() {
    let fx = fixture();
    fx.catalog.insert(scheduled_dag("w1", every_minute_start()));
    let ops = RecordingOps::new();
    let scheduler = fx.scheduler(Arc::clone(&ops), "a:1");

    let now = fx.clock.utc();
    scheduler.evaluate(now - ChronoDuration::seconds(61), now).await;
    assert_eq!(ops.calls(), ["enqueue:w1"]);
}

#[tokio::test]
async fn start_skipped_when_nothing_due() {
    let fx = fixture();
    fx.catalog.insert(scheduled_dag(
        "w1",
        ScheduleSpec { start: vec![CronEntry::new("0 4 * * *")], ..Default::default() },
    ));
    let ops = RecordingOps::new();
    let scheduler = fx.scheduler(Arc::clone(&ops), "a:1");

    // 03:00:00 → 03:00:30; the 04:00 entry is not due.
    let now = fx.clock.utc() + ChronoDuration::seconds(30);
    scheduler.evaluate(fx.clock.utc(), now).await;
    assert!(ops.calls().is_empty());
}

#[tokio::test]
async fn start_skipped_when_run_already_queued() {
    let fx = fixture();
    fx.catalog.insert(scheduled_dag("w1", every_minute_start()));
    let ops = RecordingOps::mirroring(Arc::clone(&fx.queues));
    let scheduler = fx.scheduler(Arc::clone(&ops), "a:1");

    let now = fx.clock.utc();
    scheduler.evaluate(now - ChronoDuration::seconds(61), now).await;
    // Second evaluation: the first enqueue is still pending in the queue.
    scheduler
        .evaluate(now + ChronoDuration::seconds(59), now + ChronoDuration::seconds(120))
        .await;
    assert_eq!(ops.calls(), ["enqueue:w1"]);
}

#[tokio::test]
async fn start_skipped_when_run_already_running() {
    let fx = fixture();
    fx.catalog.insert(scheduled_dag("w1", every_minute_start()));
    fx.persist_running("w1", "r-live").await;
    let ops = RecordingOps::new();
    let scheduler = fx.scheduler(Arc::clone(&ops), "a:1");

    let now = fx.clock.utc();
    scheduler.evaluate(now - ChronoDuration::seconds(61), now).await;
    assert!(ops.calls().is_empty());
}

#[tokio::test]
async fn catchup_policies_differ_on_missed_ticks() {
    let fx = fixture();
    let now = fx.clock.utc();
    // Fires at minute 30 of every hour; the last due tick (02:30) is half an
    // hour stale by now (03:00).
    let entry = |catch_up| CronEntry { expression: "30 * * * *".to_string(), catch_up };

    for (name, policy, expected) in [
        ("w-none", CatchUp::None, 0usize),
        ("w-latest", CatchUp::Latest, 1),
    ] {
        fx.catalog.insert(scheduled_dag(
            name,
            ScheduleSpec { start: vec![entry(policy)], ..Default::default() },
        ));
        let ops = RecordingOps::new();
        let scheduler = fx.scheduler(Arc::clone(&ops), "a:1");
        scheduler.evaluate(now - ChronoDuration::hours(2), now).await;
        assert_eq!(ops.calls().len(), expected, "policy {policy}");
        fx.catalog.remove(name);
    }
}

#[tokio::test]
async fn catchup_all_replays_within_window() {
    let fx = fixture();
    let now = fx.clock.utc();
    fx.catalog.insert(scheduled_dag(
        "w-all",
        ScheduleSpec {
            start: vec![CronEntry {
                expression: "*/10 * * * *".to_string(),
                catch_up: CatchUp::All,
            }],
            ..Default::default()
        },
    ));
    // No queue mirroring: every fire reaches the ops layer.
    let ops = RecordingOps::new();
    let scheduler = fx.scheduler(Arc::clone(&ops), "a:1");

    // 35 minutes of downtime → 02:30, 02:40, 02:50, 03:00 are all due and
    // inside the one-hour window.
    scheduler.evaluate(now - ChronoDuration::minutes(35), now).await;
    assert_eq!(ops.calls().len(), 4);
}

#[tokio::test]
async fn stop_fires_before_start_in_same_window() {
    let fx = fixture();
    fx.catalog.insert(scheduled_dag(
        "w1",
        ScheduleSpec {
            start: vec![CronEntry::new("* * * * *")],
            stop: vec![CronEntry::new("* * * * *")],
            ..Default::default()
        },
    ));
    fx.persist_running("w1", "r-live").await;
    let ops = RecordingOps::new();
    let scheduler = fx.scheduler(Arc::clone(&ops), "a:1");

    let now = fx.clock.utc();
    scheduler.evaluate(now - ChronoDuration::seconds(61), now).await;

    let calls = ops.calls();
    assert_eq!(calls.first().map(String::as_str), Some("stop:w1:r-live"));
    // The stopped instance still reads as running in the store, so the
    // start guard suppresses the enqueue this tick.
    assert_eq!(calls.len(), 1);
}

#[tokio::test]
async fn restart_fires_when_due() {
    let fx = fixture();
    fx.catalog.insert(scheduled_dag(
        "w1",
        ScheduleSpec { restart: vec![CronEntry::new("* * * * *")], ..Default::default() },
    ));
    let ops = RecordingOps::new();
    let scheduler = fx.scheduler(Arc::clone(&ops), "a:1");

    let now = fx.clock.utc();
    scheduler.evaluate(now - ChronoDuration::seconds(61), now).await;
    assert_eq!(ops.calls(), ["restart:w1"]);
}

#[tokio::test]
async fn only_the_leader_injects() {
    let fx = fixture();
    fx.catalog.insert(scheduled_dag("w1", every_minute_start()));

    let leader_ops = RecordingOps::new();
    let leader = fx.scheduler(Arc::clone(&leader_ops), "a:1");
    let standby_ops = RecordingOps::new();
    let standby = fx.scheduler(Arc::clone(&standby_ops), "b:1");

    assert!(leader.is_leader());
    assert!(!standby.is_leader());

    // Leader goes silent; its registry entry ages past the TTL while the
    // standby keeps heartbeating.
    fx.clock.advance(std::time::Duration::from_secs(31));
    fx.registry.heartbeat(ServiceName::Scheduler, "b:1");
    assert!(standby.is_leader());
    assert!(!leader.is_leader());
}

#[tokio::test]
async fn first_tick_initializes_watermark_without_catchup() {
    let fx = fixture();
    fx.catalog.insert(scheduled_dag("w1", every_minute_start()));
    let ops = RecordingOps::new();
    let scheduler = fx.scheduler(Arc::clone(&ops), "a:1");

    // No watermark yet: the window is empty and nothing fires.
    scheduler.tick().await;
    assert!(ops.calls().is_empty());

    // The mark advanced; the next tick picks up exactly the elapsed minute.
    fx.clock.advance(std::time::Duration::from_secs(61));
    scheduler.tick().await;
    assert_eq!(ops.calls(), ["enqueue:w1"]);
}

#[tokio::test]
async fn watermark_survives_scheduler_restart() {
    let fx = fixture();
    fx.catalog.insert(scheduled_dag(
        "w-all",
        ScheduleSpec {
            start: vec![CronEntry {
                expression: "*/10 * * * *".to_string(),
                catch_up: CatchUp::All,
            }],
            ..Default::default()
        },
    ));

    // First instance establishes the watermark, then the process "dies".
    let ops = RecordingOps::new();
    let first = fx.scheduler(Arc::clone(&ops), "a:1");
    first.tick().await;
    assert!(ops.calls().is_empty());
    drop(first);

    // 35 minutes of downtime; a fresh instance over the same state dir
    // replays the missed ticks (03:10, 03:20, 03:30) from the stored mark.
    fx.clock.advance(std::time::Duration::from_secs(35 * 60));
    let ops = RecordingOps::new();
    let second = fx.scheduler(Arc::clone(&ops), "a:1");
    second.tick().await;
    assert_eq!(ops.calls().len(), 3);
}

#[tokio::test]
async fn standby_tick_does_not_advance_the_watermark() {
    let fx = fixture();
    fx.catalog.insert(scheduled_dag("w1", every_minute_start()));

    let leader_ops = RecordingOps::new();
    let leader = fx.scheduler(Arc::clone(&leader_ops), "a:1");
    let standby_ops = RecordingOps::new();
    let standby = fx.scheduler(Arc::clone(&standby_ops), "b:1");

    leader.tick().await;
    fx.clock.advance(std::time::Duration::from_secs(61));
    // Keep the leader's registry entry fresh so the standby stays a standby.
    fx.registry.heartbeat(ServiceName::Scheduler, "a:1");
    // The standby ticks but must neither inject nor move the mark.
    standby.tick().await;
    assert!(standby_ops.calls().is_empty());

    // The leader still sees the elapsed minute as due.
    leader.tick().await;
    assert_eq!(leader_ops.calls(), ["enqueue:w1"]);
}

#[tokio::test]
async fn ancient_watermark_is_bounded_by_the_window() {
    let fx = fixture();
    let now = fx.clock.utc();
    fx.catalog.insert(scheduled_dag(
        "w-all",
        ScheduleSpec {
            start: vec![CronEntry {
                expression: "*/10 * * * *".to_string(),
                catch_up: CatchUp::All,
            }],
            ..Default::default()
        },
    ));
    let ops = RecordingOps::new();
    let scheduler = fx.scheduler(Arc::clone(&ops), "a:1");

    // A week-old window still replays at most one catch-up window (1h of
    // ten-minute ticks: 02:10 through 03:00).
    scheduler.evaluate(now - ChronoDuration::days(7), now).await;
    assert_eq!(ops.calls().len(), 6);
}

#[test]
fn five_field_expressions_are_normalized() {
    assert!(parse_cron("* * * * *").is_ok());
    assert!(parse_cron("0 2 * * *").is_ok());
    assert!(parse_cron("0 0 2 * * *").is_ok());
    assert!(parse_cron("not a cron").is_err());
}
