// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Simulated virtual time.
//!
//! Time starts at zero and only moves when no registered context is
//! running. Contexts are parkers (one per in-flight wait) and
//! [`SimActor`]s. When every context is parked, the clock jumps to the
//! earliest of the next scheduled action and the earliest parked deadline,
//! runs every action due at that instant, and only then releases the
//! contexts whose signal fired or whose deadline passed.
//!
//! # Example
//!
//! ```
//! use commwait::{Activity, ActivityState, SimClock, Timeout, WaitAnySet};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let sim = SimClock::new();
//! let never: Arc<dyn Activity> = sim.completion_at(Duration::MAX, ActivityState::Done);
//! let set = WaitAnySet::new(Arc::new(sim.clone()));
//!
//! let result = set.wait_any(&[never], Timeout::from_secs_f64(3.0)).unwrap();
//! assert_eq!(result, None);
//! assert_eq!(sim.now(), Duration::from_secs(3));
//! ```

use super::{Clock, Parker, Wakeup};
use crate::comm::{ActivityState, Comm, Error, Result};
use crate::core::rt::waitset::bitmap::AtomicBitset;
use crate::core::rt::waitset::WaitsetSignal;
use parking_lot::{Condvar, Mutex, MutexGuard};
use std::cell::Cell;
use std::collections::{BTreeMap, HashMap};
use std::marker::PhantomData;
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};
use std::time::Duration;

type Action = Box<dyn FnOnce() + Send>;

thread_local! {
    /// (clock identity, context id) of the actor bound to this thread.
    static CURRENT_ACTOR: Cell<Option<(usize, u64)>> = const { Cell::new(None) };
}

/// Deterministic virtual clock.
///
/// Cloning is cheap and every clone drives the same timeline.
#[derive(Clone)]
pub struct SimClock {
    inner: Arc<SimInner>,
}

struct SimInner {
    state: Mutex<SimState>,
    cond: Condvar,
}

struct SimState {
    now: Duration,
    /// Contexts currently running (not parked).
    running: usize,
    /// Set while due actions run with the lock released.
    advancing: bool,
    /// Scheduled actions keyed by (time, sequence) for FIFO order per instant.
    timers: BTreeMap<(Duration, u64), Action>,
    next_seq: u64,
    contexts: HashMap<u64, ContextEntry>,
    next_context: u64,
}

#[derive(Default)]
struct ContextEntry {
    parked: bool,
    deadline: Option<Duration>,
    notified: bool,
    deadlocked: bool,
}

impl ContextEntry {
    fn runnable(&self, now: Duration) -> bool {
        self.notified || self.deadlocked || self.deadline.is_some_and(|d| d <= now)
    }
}

impl SimState {
    fn register_context(&mut self) -> u64 {
        let id = self.next_context;
        self.next_context += 1;
        self.contexts.insert(id, ContextEntry::default());
        self.running += 1;
        id
    }

    fn release_context(&mut self, id: u64) {
        if self.contexts.remove(&id).is_some() {
            self.running = self.running.saturating_sub(1);
        }
    }

    fn entry(&mut self, id: u64) -> &mut ContextEntry {
        self.contexts.entry(id).or_default()
    }

    fn any_parked_runnable(&self) -> bool {
        let now = self.now;
        self.contexts
            .values()
            .any(|entry| entry.parked && entry.runnable(now))
    }

    /// Earliest instant at which something can happen.
    fn next_event(&self) -> Option<Duration> {
        let next_timer = self.timers.keys().next().map(|(at, _)| *at);
        let next_deadline = self
            .contexts
            .values()
            .filter(|entry| entry.parked)
            .filter_map(|entry| entry.deadline)
            .min();

        match (next_timer, next_deadline) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    fn take_due(&mut self) -> Vec<Action> {
        let mut due = Vec::new();
        while let Some(entry) = self.timers.first_entry() {
            if entry.key().0 > self.now {
                break;
            }
            due.push(entry.remove());
        }
        due
    }
}

impl SimInner {
    fn identity(self: &Arc<Self>) -> usize {
        Arc::as_ptr(self) as usize
    }

    /// Move time forward once. Called with the lock held and no context
    /// running.
    fn advance(&self, state: &mut MutexGuard<'_, SimState>) {
        let Some(target) = state.next_event() else {
            log::debug!(
                "[sim] deadlock at {:?}: every context parked, nothing scheduled",
                state.now
            );
            for entry in state.contexts.values_mut().filter(|entry| entry.parked) {
                entry.deadlocked = true;
            }
            self.cond.notify_all();
            return;
        };

        if target > state.now {
            log::debug!("[sim] advance {:?} -> {:?}", state.now, target);
            state.now = target;
        }

        state.advancing = true;
        loop {
            let due = state.take_due();
            if due.is_empty() {
                break;
            }
            MutexGuard::unlocked(state, || {
                for action in due {
                    action();
                }
            });
        }
        state.advancing = false;
        self.cond.notify_all();
    }

    /// Park context `id` until it is notified, deadlocked, or `deadline`
    /// passes. The caller must count as running on entry.
    fn park(&self, id: u64, deadline: Option<Duration>) -> ParkOutcome {
        let mut state = self.state.lock();
        {
            let entry = state.entry(id);
            entry.parked = true;
            entry.deadline = deadline;
        }
        state.running = state.running.saturating_sub(1);

        let outcome = loop {
            if !state.advancing {
                let now = state.now;
                let entry = state.entry(id);
                if entry.notified {
                    entry.notified = false;
                    break ParkOutcome::Notified;
                }
                if entry.deadlocked {
                    entry.deadlocked = false;
                    break ParkOutcome::Deadlocked;
                }
                if deadline.is_some_and(|d| d <= now) {
                    break ParkOutcome::DeadlineElapsed;
                }
                if state.running == 0 && !state.any_parked_runnable() {
                    self.advance(&mut state);
                    continue;
                }
            }
            self.cond.wait(&mut state);
        };

        let entry = state.entry(id);
        entry.parked = false;
        entry.deadline = None;
        state.running += 1;
        outcome
    }

    fn notify(&self, id: u64) {
        let mut state = self.state.lock();
        if let Some(entry) = state.contexts.get_mut(&id) {
            entry.notified = true;
            self.cond.notify_all();
        }
    }

    fn release(&self, id: u64) {
        let mut state = self.state.lock();
        state.release_context(id);
        self.cond.notify_all();
    }
}

enum ParkOutcome {
    Notified,
    DeadlineElapsed,
    Deadlocked,
}

impl SimClock {
    /// Create a clock at virtual time zero.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(SimInner {
                state: Mutex::new(SimState {
                    now: Duration::ZERO,
                    running: 0,
                    advancing: false,
                    timers: BTreeMap::new(),
                    next_seq: 0,
                    contexts: HashMap::new(),
                    next_context: 1,
                }),
                cond: Condvar::new(),
            }),
        }
    }

    /// Current virtual time.
    pub fn now(&self) -> Duration {
        self.inner.state.lock().now
    }

    /// Run `action` when virtual time reaches `at`.
    ///
    /// Instants in the past run at the next advance. Actions scheduled for
    /// the same instant run in scheduling order. Actions run on whichever
    /// thread advances the clock and must not block on the simulation.
    pub fn schedule_at<F>(&self, at: Duration, action: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let mut state = self.inner.state.lock();
        let at = at.max(state.now);
        let seq = state.next_seq;
        state.next_seq += 1;
        state.timers.insert((at, seq), Box::new(action));
        self.inner.cond.notify_all();
    }

    /// Run `action` after `delay` of virtual time.
    pub fn schedule_after<F>(&self, delay: Duration, action: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let at = self.now().saturating_add(delay);
        self.schedule_at(at, action);
    }

    /// A pending communication that reaches `state` at virtual time `at`.
    ///
    /// `Duration::MAX` (or a non-terminal `state`) yields a communication
    /// that never completes on its own.
    pub fn completion_at(&self, at: Duration, state: ActivityState) -> Arc<Comm> {
        let comm = Comm::shared();
        if at != Duration::MAX && state.is_terminal() {
            let target = Arc::clone(&comm);
            self.schedule_at(at, move || {
                target.finish(state);
            });
        }
        comm
    }

    /// Number of scheduled actions not yet run.
    pub fn pending_actions(&self) -> usize {
        self.inner.state.lock().timers.len()
    }

    /// Register the current thread as a running actor.
    ///
    /// While the returned guard lives, time only advances when this actor
    /// is parked (in [`SimActor::sleep_until`] or in a wait on this clock).
    pub fn actor(&self) -> SimActor {
        let id = self.inner.state.lock().register_context();
        SimActor::bind(Arc::clone(&self.inner), id)
    }

    /// Spawn a thread running `body` as an actor of this clock.
    ///
    /// The actor is registered before this call returns, so the clock
    /// cannot advance past the actor's start.
    pub fn spawn_actor<F, T>(&self, body: F) -> JoinHandle<T>
    where
        F: FnOnce(&SimActor) -> T + Send + 'static,
        T: Send + 'static,
    {
        let id = self.inner.state.lock().register_context();
        let inner = Arc::clone(&self.inner);
        thread::spawn(move || {
            let actor = SimActor::bind(inner, id);
            body(&actor)
        })
    }
}

impl Default for SimClock {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SimClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("SimClock")
            .field("now", &state.now)
            .field("running", &state.running)
            .field("pending_actions", &state.timers.len())
            .finish()
    }
}

impl Clock for SimClock {
    fn now(&self) -> Duration {
        SimClock::now(self)
    }

    fn parker(&self, slots: usize) -> Result<Box<dyn Parker>> {
        let identity = self.inner.identity();
        let actor_context = CURRENT_ACTOR
            .with(Cell::get)
            .filter(|(clock, _)| *clock == identity)
            .map(|(_, id)| id);

        // An actor thread waits under its own context; anyone else gets a
        // fresh context for the duration of the wait.
        let (context, owns_context) = match actor_context {
            Some(id) => (id, false),
            None => (self.inner.state.lock().register_context(), true),
        };

        Ok(Box::new(SimParker {
            inner: Arc::clone(&self.inner),
            context,
            owns_context,
            fired: Arc::new(AtomicBitset::new(slots)),
            slots,
            signals: Vec::with_capacity(slots),
        }))
    }
}

struct SimParker {
    inner: Arc<SimInner>,
    context: u64,
    owns_context: bool,
    fired: Arc<AtomicBitset>,
    slots: usize,
    signals: Vec<Arc<dyn WaitsetSignal>>,
}

impl Parker for SimParker {
    fn signal(&mut self, position: usize) -> Result<Arc<dyn WaitsetSignal>> {
        if position >= self.slots {
            return Err(Error::ResourceLimitExceeded(format!(
                "position {} outside parker capacity {}",
                position, self.slots
            )));
        }

        let signal: Arc<dyn WaitsetSignal> = Arc::new(SimSignal {
            inner: Arc::downgrade(&self.inner),
            context: self.context,
            position,
            fired: Arc::downgrade(&self.fired),
        });
        self.signals.push(Arc::clone(&signal));
        Ok(signal)
    }

    fn park(&mut self, deadline: Option<Duration>) -> Result<Wakeup> {
        match self.inner.park(self.context, deadline) {
            ParkOutcome::Notified => Ok(Wakeup::Signalled(self.fired.take_all())),
            ParkOutcome::DeadlineElapsed if self.fired.any() => {
                Ok(Wakeup::Signalled(self.fired.take_all()))
            }
            ParkOutcome::DeadlineElapsed => Ok(Wakeup::DeadlineElapsed),
            ParkOutcome::Deadlocked => Err(Error::Deadlock),
        }
    }
}

impl Drop for SimParker {
    fn drop(&mut self) {
        if self.owns_context {
            self.inner.release(self.context);
        } else {
            let mut state = self.inner.state.lock();
            if let Some(entry) = state.contexts.get_mut(&self.context) {
                entry.notified = false;
            }
        }
    }
}

struct SimSignal {
    inner: Weak<SimInner>,
    context: u64,
    position: usize,
    fired: Weak<AtomicBitset>,
}

impl WaitsetSignal for SimSignal {
    fn signal(&self) {
        let Some(fired) = self.fired.upgrade() else {
            return;
        };
        if fired.test_and_set(self.position) {
            return;
        }
        if let Some(inner) = self.inner.upgrade() {
            inner.notify(self.context);
        }
    }
}

/// A running context of a [`SimClock`], bound to one thread.
///
/// Dropping the guard deregisters the actor.
pub struct SimActor {
    inner: Arc<SimInner>,
    context: u64,
    previous: Option<(usize, u64)>,
    _not_send: PhantomData<*const ()>,
}

impl SimActor {
    fn bind(inner: Arc<SimInner>, context: u64) -> Self {
        let identity = inner.identity();
        let previous = CURRENT_ACTOR.with(|current| current.replace(Some((identity, context))));
        Self {
            inner,
            context,
            previous,
            _not_send: PhantomData,
        }
    }

    /// Current virtual time.
    pub fn now(&self) -> Duration {
        self.inner.state.lock().now
    }

    /// Park until virtual time reaches `at`.
    pub fn sleep_until(&self, at: Duration) {
        loop {
            match self.inner.park(self.context, Some(at)) {
                ParkOutcome::DeadlineElapsed => return,
                // Stray notifications from an earlier wait on this thread.
                ParkOutcome::Notified | ParkOutcome::Deadlocked => {
                    if self.now() >= at {
                        return;
                    }
                }
            }
        }
    }

    /// Park for `delay` of virtual time.
    pub fn sleep_for(&self, delay: Duration) {
        let at = self.now().saturating_add(delay);
        self.sleep_until(at);
    }
}

impl Drop for SimActor {
    fn drop(&mut self) {
        CURRENT_ACTOR.with(|current| current.set(self.previous));
        self.inner.release(self.context);
    }
}

#[cfg(test)]
mod tests;
