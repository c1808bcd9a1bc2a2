// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Lattice Authors

use super::*;

#[test]
fn system_clock_reads_a_plausible_epoch() {
    let clock = SystemClock;
    let a = clock.epoch_ms();
    let b = clock.epoch_ms();
    // After 2020-01-01 and never moving backwards between two reads.
    assert!(a > 1_577_836_800_000);
    assert!(b >= a);
}

#[test]
fn fake_clock_advance_accumulates() {
    let clock = FakeClock::new();
    let start = clock.epoch_ms();

    clock.advance(Duration::from_secs(90));
    assert_eq!(clock.epoch_ms() - start, 90_000);

    clock.advance(Duration::from_millis(5));
    assert_eq!(clock.epoch_ms() - start, 90_005);
}

#[test]
fn fake_clock_pins_to_explicit_epoch() {
    let clock = FakeClock::new();
    clock.set_epoch_ms(1_000_000);
    assert_eq!(clock.epoch_ms(), 1_000_000);
}

#[test]
fn utc_matches_epoch_ms() {
    let clock = FakeClock::new();
    clock.set_epoch_ms(0);
    assert_eq!(clock.utc().timestamp(), 0);

    clock.set_epoch_ms(1_700_000_000_000);
    assert_eq!(clock.utc().timestamp(), 1_700_000_000);
    assert_eq!(clock.utc().timestamp_millis() as u64, clock.epoch_ms());
}

#[test]
fn clones_share_the_counter() {
    let clock = FakeClock::new();
    let other = clock.clone();
    clock.advance(Duration::from_secs(5));
    assert_eq!(other.epoch_ms(), clock.epoch_ms());

    other.set_epoch_ms(42);
    assert_eq!(clock.epoch_ms(), 42);
}
