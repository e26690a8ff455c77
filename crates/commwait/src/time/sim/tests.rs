// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use super::*;
use crate::comm::Activity;
use std::sync::atomic::{AtomicUsize, Ordering};

fn secs(value: u64) -> Duration {
    Duration::from_secs(value)
}

#[test]
fn test_starts_at_zero() {
    let sim = SimClock::new();
    assert_eq!(sim.now(), Duration::ZERO);
    assert_eq!(sim.pending_actions(), 0);
}

#[test]
fn test_park_advances_to_deadline_exactly() {
    let sim = SimClock::new();
    let mut parker = Clock::parker(&sim, 1).expect("parker");
    let _signal = parker.signal(0).expect("signal");

    let wakeup = parker.park(Some(secs(3))).expect("park");
    assert_eq!(wakeup, Wakeup::DeadlineElapsed);
    assert_eq!(sim.now(), secs(3));
}

#[test]
fn test_park_wakes_on_scheduled_signal() {
    let sim = SimClock::new();
    let mut parker = Clock::parker(&sim, 2).expect("parker");
    let _first = parker.signal(0).expect("first");
    let second = parker.signal(1).expect("second");

    sim.schedule_at(secs(2), move || second.signal());

    let wakeup = parker.park(Some(secs(10))).expect("park");
    assert_eq!(wakeup, Wakeup::Signalled(vec![1]));
    assert_eq!(sim.now(), secs(2));
}

#[test]
fn test_signal_before_park_returns_immediately() {
    let sim = SimClock::new();
    let mut parker = Clock::parker(&sim, 1).expect("parker");
    let signal = parker.signal(0).expect("signal");
    signal.signal();

    let wakeup = parker.park(None).expect("park");
    assert_eq!(wakeup, Wakeup::Signalled(vec![0]));
    assert_eq!(sim.now(), Duration::ZERO);
}

#[test]
fn test_signal_and_deadline_at_same_instant_reports_signal() {
    let sim = SimClock::new();
    let mut parker = Clock::parker(&sim, 1).expect("parker");
    let signal = parker.signal(0).expect("signal");

    sim.schedule_at(secs(3), move || signal.signal());

    let wakeup = parker.park(Some(secs(3))).expect("park");
    assert_eq!(wakeup, Wakeup::Signalled(vec![0]));
    assert_eq!(sim.now(), secs(3));
}

#[test]
fn test_park_without_deadline_or_events_deadlocks() {
    let sim = SimClock::new();
    let mut parker = Clock::parker(&sim, 1).expect("parker");
    let _signal = parker.signal(0).expect("signal");

    assert!(matches!(parker.park(None), Err(Error::Deadlock)));
    assert_eq!(sim.now(), Duration::ZERO);
}

#[test]
fn test_same_instant_actions_run_in_schedule_order() {
    let sim = SimClock::new();
    let order = Arc::new(Mutex::new(Vec::new()));

    for tag in 0..4 {
        let order = Arc::clone(&order);
        sim.schedule_at(secs(1), move || order.lock().push(tag));
    }
    let later = Arc::clone(&order);
    sim.schedule_at(secs(2), move || later.lock().push(99));

    let mut parker = Clock::parker(&sim, 1).expect("parker");
    let _signal = parker.signal(0).expect("signal");
    parker.park(Some(secs(5))).expect("park");

    assert_eq!(*order.lock(), vec![0, 1, 2, 3, 99]);
    assert_eq!(sim.now(), secs(5));
    assert_eq!(sim.pending_actions(), 0);
}

#[test]
fn test_schedule_in_past_runs_at_current_instant() {
    let sim = SimClock::new();
    let mut parker = Clock::parker(&sim, 1).expect("parker");
    let _signal = parker.signal(0).expect("signal");
    parker.park(Some(secs(4))).expect("park");
    drop(parker);

    let ran_at = Arc::new(Mutex::new(None));
    let observed = Arc::clone(&ran_at);
    let clock = sim.clone();
    sim.schedule_at(secs(1), move || {
        *observed.lock() = Some(clock.now());
    });

    let mut parker = Clock::parker(&sim, 1).expect("parker");
    let _signal = parker.signal(0).expect("signal");
    parker.park(Some(secs(6))).expect("park");

    assert_eq!(*ran_at.lock(), Some(secs(4)));
}

#[test]
fn test_schedule_after_is_relative_to_now() {
    let sim = SimClock::new();
    let fired = Arc::new(AtomicUsize::new(0));

    let mut parker = Clock::parker(&sim, 1).expect("parker");
    let _signal = parker.signal(0).expect("signal");
    parker.park(Some(secs(2))).expect("park");
    drop(parker);

    let counter = Arc::clone(&fired);
    let clock = sim.clone();
    sim.schedule_after(secs(3), move || {
        assert_eq!(clock.now(), Duration::from_secs(5));
        counter.fetch_add(1, Ordering::SeqCst);
    });

    let mut parker = Clock::parker(&sim, 1).expect("parker");
    let _signal = parker.signal(0).expect("signal");
    parker.park(Some(secs(10))).expect("park");
    assert_eq!(fired.load(Ordering::SeqCst), 1);
}

#[test]
fn test_completion_at_finishes_comm() {
    let sim = SimClock::new();
    let comm = sim.completion_at(secs(2), ActivityState::Failed);
    let never = sim.completion_at(Duration::MAX, ActivityState::Done);
    assert_eq!(sim.pending_actions(), 1);

    let mut parker = Clock::parker(&sim, 1).expect("parker");
    let _signal = parker.signal(0).expect("signal");
    parker.park(Some(secs(3))).expect("park");

    assert_eq!(comm.state().expect("state"), ActivityState::Failed);
    assert_eq!(never.state().expect("state"), ActivityState::Pending);
}

#[test]
fn test_actor_holds_time_until_it_parks() {
    let sim = SimClock::new();
    let comm = Comm::shared();

    let target = Arc::clone(&comm);
    let handle = sim.spawn_actor(move |actor| {
        actor.sleep_for(Duration::from_secs(2));
        let at = actor.now();
        target.complete();
        at
    });

    let mut parker = Clock::parker(&sim, 1).expect("parker");
    let signal = parker.signal(0).expect("signal");
    comm.subscribe(signal).expect("subscribe");

    let wakeup = parker.park(Some(secs(10))).expect("park");
    assert_eq!(wakeup, Wakeup::Signalled(vec![0]));
    assert_eq!(sim.now(), secs(2));
    assert_eq!(handle.join().expect("actor"), secs(2));
}

#[test]
fn test_actor_guard_reuses_context_for_waits() {
    let sim = SimClock::new();
    let actor = sim.actor();
    assert_eq!(sim.inner.state.lock().running, 1);

    {
        let mut parker = Clock::parker(&sim, 1).expect("parker");
        let _signal = parker.signal(0).expect("signal");
        assert_eq!(sim.inner.state.lock().contexts.len(), 1);
        parker.park(Some(secs(1))).expect("park");
    }

    assert_eq!(sim.inner.state.lock().running, 1);
    actor.sleep_until(secs(2));
    assert_eq!(sim.now(), secs(2));

    drop(actor);
    let state = sim.inner.state.lock();
    assert_eq!(state.running, 0);
    assert!(state.contexts.is_empty());
}

#[test]
fn test_parker_drop_releases_context() {
    let sim = SimClock::new();
    let parker = Clock::parker(&sim, 4).expect("parker");
    assert_eq!(sim.inner.state.lock().running, 1);
    drop(parker);
    assert_eq!(sim.inner.state.lock().running, 0);
}

#[test]
fn test_signal_position_outside_capacity_rejected() {
    let sim = SimClock::new();
    let mut parker = Clock::parker(&sim, 2).expect("parker");
    assert!(matches!(
        parker.signal(2),
        Err(Error::ResourceLimitExceeded(_))
    ));
}

#[test]
fn test_sleeping_actors_wake_in_deadline_order() {
    let sim = SimClock::new();
    let log = Arc::new(Mutex::new(Vec::new()));
    // Hold time at zero until every actor is registered.
    let gate = sim.actor();

    let handles: Vec<_> = [3u64, 1, 2]
        .into_iter()
        .map(|delay| {
            let log = Arc::clone(&log);
            sim.spawn_actor(move |actor| {
                actor.sleep_for(Duration::from_secs(delay));
                log.lock().push((delay, actor.now()));
            })
        })
        .collect();
    drop(gate);

    for handle in handles {
        handle.join().expect("actor");
    }

    let mut entries = log.lock().clone();
    entries.sort();
    assert_eq!(entries, vec![(1, secs(1)), (2, secs(2)), (3, secs(3))]);
    assert_eq!(sim.now(), secs(3));
}
