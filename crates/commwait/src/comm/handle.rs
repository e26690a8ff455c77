// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Comm - externally driven communication activity.
//!
//! The transport (or a simulation action, or a test) owns the transition:
//! it calls [`Comm::complete`], [`Comm::fail`] or [`Comm::cancel`] once the
//! communication ends. Waiters only observe.

use super::activity::{Activity, ActivityState, SubscriptionId};
use super::{Error, Result};
use crate::core::rt::waitset::WaitsetSignal;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Communication handle whose terminal transition happens exactly once.
pub struct Comm {
    /// Unique identifier for this activity
    id: u64,

    /// Optional human-readable name (diagnostics only)
    label: Option<String>,

    /// State, validity and subscriber hooks under one lock so a transition
    /// and a concurrent subscribe never miss each other
    inner: Mutex<CommInner>,
}

struct CommInner {
    state: ActivityState,
    closed: bool,
    hooks: Vec<SubscriberHook>,
    next_subscription: SubscriptionId,
}

struct SubscriberHook {
    id: SubscriptionId,
    signal: Weak<dyn WaitsetSignal>,
}

impl Comm {
    /// Create a pending communication.
    pub fn new() -> Self {
        Self {
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
            label: None,
            inner: Mutex::new(CommInner {
                state: ActivityState::Pending,
                closed: false,
                hooks: Vec::new(),
                next_subscription: 1,
            }),
        }
    }

    /// Create a pending communication with a diagnostic label.
    pub fn with_label(label: &str) -> Self {
        Self {
            label: Some(label.to_string()),
            ..Self::new()
        }
    }

    /// Create a pending communication wrapped in `Arc`.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Diagnostic label, if any.
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Mark the communication as successfully completed.
    ///
    /// Returns `false` if it already reached a terminal state or was closed.
    pub fn complete(&self) -> bool {
        self.finish(ActivityState::Done)
    }

    /// Mark the communication as failed.
    pub fn fail(&self) -> bool {
        self.finish(ActivityState::Failed)
    }

    /// Mark the communication as cancelled.
    pub fn cancel(&self) -> bool {
        self.finish(ActivityState::Cancelled)
    }

    /// Move to `state` if still pending, then fire every subscriber once.
    ///
    /// # Example
    ///
    /// ```
    /// use commwait::{ActivityState, Comm};
    ///
    /// let comm = Comm::new();
    /// assert!(comm.finish(ActivityState::Failed));
    /// assert!(!comm.complete()); // first transition wins
    /// ```
    pub fn finish(&self, state: ActivityState) -> bool {
        if !state.is_terminal() {
            return false;
        }

        let hooks = {
            let mut inner = self.lock_inner();
            if inner.closed || inner.state.is_terminal() {
                return false;
            }
            inner.state = state;
            std::mem::take(&mut inner.hooks)
        };

        log::debug!(
            "[comm] id={} -> {} notifying {} subscriber(s)",
            self.id,
            state,
            hooks.len()
        );
        fire(hooks);
        true
    }

    /// Invalidate the handle, as when the underlying communication is
    /// destroyed.
    ///
    /// Current subscribers are woken so parked waiters observe the failure;
    /// afterwards every [`Activity`] call returns
    /// [`Error::InvalidActivity`].
    pub fn close(&self) {
        let hooks = {
            let mut inner = self.lock_inner();
            if inner.closed {
                return;
            }
            inner.closed = true;
            std::mem::take(&mut inner.hooks)
        };

        log::debug!("[comm] id={} closed", self.id);
        fire(hooks);
    }

    /// Whether [`Comm::close`] has been called.
    pub fn is_closed(&self) -> bool {
        self.lock_inner().closed
    }

    /// Number of registrations still waiting to fire.
    pub fn subscriber_count(&self) -> usize {
        let mut inner = self.lock_inner();
        inner.hooks.retain(|hook| hook.signal.upgrade().is_some());
        inner.hooks.len()
    }

    fn invalid(&self) -> Error {
        Error::InvalidActivity {
            activity_id: self.id,
            index: None,
        }
    }

    fn lock_inner(&self) -> MutexGuard<'_, CommInner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::debug!("[comm] inner mutex poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }
}

fn fire(hooks: Vec<SubscriberHook>) {
    for hook in hooks {
        if let Some(signal) = hook.signal.upgrade() {
            signal.signal();
        }
    }
}

impl Activity for Comm {
    fn activity_id(&self) -> u64 {
        self.id
    }

    fn state(&self) -> Result<ActivityState> {
        let inner = self.lock_inner();
        if inner.closed {
            return Err(self.invalid());
        }
        Ok(inner.state)
    }

    fn subscribe(&self, signal: Arc<dyn WaitsetSignal>) -> Result<SubscriptionId> {
        let mut inner = self.lock_inner();
        if inner.closed {
            return Err(self.invalid());
        }

        let id = inner.next_subscription;
        inner.next_subscription = inner.next_subscription.wrapping_add(1).max(1);

        if inner.state.is_terminal() {
            drop(inner);
            log::debug!(
                "[comm] id={} already terminal, firing subscription {} inline",
                self.id,
                id
            );
            signal.signal();
            return Ok(id);
        }

        inner.hooks.retain(|hook| hook.signal.upgrade().is_some());
        inner.hooks.push(SubscriberHook {
            id,
            signal: Arc::downgrade(&signal),
        });
        Ok(id)
    }

    fn unsubscribe(&self, subscription: SubscriptionId) -> Result<()> {
        let mut inner = self.lock_inner();
        if inner.closed {
            return Err(self.invalid());
        }
        inner.hooks.retain(|hook| hook.id != subscription);
        Ok(())
    }
}

impl Default for Comm {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Comm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.lock_inner();
        f.debug_struct("Comm")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("state", &inner.state)
            .field("closed", &inner.closed)
            .field("subscribers", &inner.hooks.len())
            .finish()
    }
}
