// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![allow(clippy::unwrap_used)] // test scaffolding

use super::{WaitsetDriver, WaitsetWaitError};
use std::thread;
use std::time::{Duration, Instant};

#[test]
fn test_register_slot_reports_position() {
    let driver = WaitsetDriver::new(8).expect("driver");
    assert_eq!(driver.active_slots(), 0);

    let (_slot, _id, signal) = driver.register_slot(5).expect("register").into_trait();
    assert_eq!(driver.active_slots(), 1);
    signal.signal();

    let signaled = driver.wait(Some(Duration::from_millis(10))).expect("wait");
    assert_eq!(signaled, vec![5]);
}

#[test]
fn test_unregistered_slot_wakes_without_positions() {
    let driver = WaitsetDriver::new(4).expect("driver");
    let (slot_index, slot_id, signal) = driver.register_slot(0).expect("register").into_trait();

    assert!(driver.unregister_slot(slot_index, slot_id));
    signal.signal();
    let signaled = driver.wait(Some(Duration::from_millis(10))).expect("wait");
    assert!(signaled.is_empty());

    assert!(!driver.unregister_slot(slot_index, slot_id));
    assert_eq!(driver.active_slots(), 0);
}

#[test]
fn test_signal_multiple_slots_coalesced() {
    let driver = WaitsetDriver::new(16).expect("driver");

    let (_, _, signal_a) = driver.register_slot(2).expect("slot a").into_trait();
    let (_, _, signal_b) = driver.register_slot(0).expect("slot b").into_trait();

    signal_a.signal();
    signal_a.signal();
    signal_b.signal();

    let signaled = driver.wait(Some(Duration::from_millis(10))).expect("wait");
    assert_eq!(signaled, vec![0, 2]);
}

#[test]
fn test_wait_times_out_without_signal() {
    let driver = WaitsetDriver::new(2).expect("driver");
    let _reg = driver.register_slot(0).expect("register");

    let start = Instant::now();
    let result = driver.wait(Some(Duration::from_millis(30)));
    assert!(matches!(result, Err(WaitsetWaitError::Timeout)));
    assert!(start.elapsed() >= Duration::from_millis(30));
}

#[test]
fn test_capacity_is_enforced() {
    let driver = WaitsetDriver::new(1).expect("driver");
    let _first = driver.register_slot(0).expect("first slot");
    assert!(driver.register_slot(1).is_err());
}

#[test]
fn test_zero_capacity_rejected() {
    assert!(WaitsetDriver::new(0).is_err());
}

#[test]
fn test_signal_from_other_thread_wakes_wait() {
    let driver = WaitsetDriver::new(4).expect("driver");
    let (_, _, signal) = driver.register_slot(3).expect("register").into_trait();

    let handle = thread::spawn(move || {
        thread::sleep(Duration::from_millis(20));
        signal.signal();
    });

    let signaled = driver.wait(Some(Duration::from_secs(2))).expect("wait");
    assert_eq!(signaled, vec![3]);
    handle.join().unwrap();
}

#[test]
fn test_signal_after_driver_drop_is_noop() {
    let driver = WaitsetDriver::new(1).expect("driver");
    let (_, _, signal) = driver.register_slot(0).expect("register").into_trait();
    drop(driver);
    signal.signal();
}
