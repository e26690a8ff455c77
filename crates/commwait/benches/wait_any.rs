// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![allow(clippy::uninlined_format_args)] // Test/bench code readability over pedantic
#![allow(clippy::doc_markdown)] // Test documentation
#![allow(clippy::missing_panics_doc)] // Tests/examples panic on failure
#![allow(clippy::semicolon_if_nothing_returned)] // Benchmark code formatting
#![allow(clippy::redundant_closure_for_method_calls)] // Test code clarity

use commwait::{Activity, ActivityState, Comm, SimClock, Timeout, WaitAnySet};
use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use std::sync::Arc;
use std::time::Duration;

fn pending_set(len: usize) -> Vec<Arc<dyn Activity>> {
    (0..len)
        .map(|_| Comm::shared() as Arc<dyn Activity>)
        .collect()
}

// ============================================================================
// Fast path
// ============================================================================

/// Benchmark: wait_any with the last of 64 activities already done
/// Target: < 2 us (scan only, no parker)
fn bench_fast_path_last_done(c: &mut Criterion) {
    let set = WaitAnySet::system();
    let mut activities = pending_set(63);
    let done = Comm::shared();
    done.complete();
    activities.push(done);

    c.bench_function("wait_any_fast_path_64", |b| {
        b.iter(|| set.wait_any(black_box(&activities), Timeout::Forever).unwrap())
    });
}

/// Benchmark: poll over 64 pending activities
/// Target: < 2 us
fn bench_poll_all_pending(c: &mut Criterion) {
    let set = WaitAnySet::system();
    let activities = pending_set(64);

    c.bench_function("wait_any_poll_64", |b| {
        b.iter(|| set.wait_any(black_box(&activities), Timeout::POLL).unwrap())
    });
}

// ============================================================================
// Park / wake cycle
// ============================================================================

/// Benchmark: full subscribe, park, wake, release cycle on simulated time
/// Target: < 50 us for 16 activities
fn bench_sim_park_cycle(c: &mut Criterion) {
    c.bench_function("wait_any_sim_park_16", |b| {
        b.iter_batched(
            || {
                let sim = Arc::new(SimClock::new());
                let mut activities = pending_set(15);
                activities.push(sim.completion_at(Duration::from_secs(1), ActivityState::Done));
                (WaitAnySet::new(sim), activities)
            },
            |(set, activities)| set.wait_any(&activities, Timeout::Forever).unwrap(),
            BatchSize::SmallInput,
        )
    });
}

/// Benchmark: timeout path on simulated time
/// Target: < 50 us for 16 activities
fn bench_sim_timeout(c: &mut Criterion) {
    c.bench_function("wait_any_sim_timeout_16", |b| {
        b.iter_batched(
            || {
                let sim = Arc::new(SimClock::new());
                (WaitAnySet::new(sim), pending_set(16))
            },
            |(set, activities)| {
                set.wait_any(&activities, Duration::from_secs(3)).unwrap()
            },
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(
    benches,
    bench_fast_path_last_done,
    bench_poll_all_pending,
    bench_sim_park_cycle,
    bench_sim_timeout
);
criterion_main!(benches);
