// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Lattice Authors

use super::*;
use chrono::TimeZone;
use tempfile::TempDir;

fn stamp(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).single().unwrap()
}

#[test]
fn memory_store_round_trips_per_key() {
    let store = MemoryWatermarkStore::new();
    assert_eq!(store.load("cron"), None);

    store.save("cron", stamp(1_700_000_000));
    store.save("other", stamp(1_700_000_100));
    assert_eq!(store.load("cron"), Some(stamp(1_700_000_000)));
    assert_eq!(store.load("other"), Some(stamp(1_700_000_100)));

    store.save("cron", stamp(1_700_000_200));
    assert_eq!(store.load("cron"), Some(stamp(1_700_000_200)));
}

#[test]
fn file_store_survives_reopen() {
    let dir = TempDir::new().unwrap();
    {
        let store = FileWatermarkStore::new(dir.path());
        store.save("cron", stamp(1_700_000_000));
    }

    let reopened = FileWatermarkStore::new(dir.path());
    assert_eq!(reopened.load("cron"), Some(stamp(1_700_000_000)));
    assert_eq!(reopened.load("unknown"), None);
}

#[test]
fn corrupt_watermark_reads_as_absent() {
    let dir = TempDir::new().unwrap();
    let store = FileWatermarkStore::new(dir.path());
    store.save("cron", stamp(1_700_000_000));

    std::fs::write(dir.path().join("scheduler/cron.json"), b"{ partial").unwrap();
    assert_eq!(store.load("cron"), None);
}
