// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Activities - the completion contract consumed by waiters.

use super::Result;
use crate::core::rt::waitset::WaitsetSignal;
use std::sync::Arc;

/// Lifecycle state of an [`Activity`].
///
/// `Pending` is initial. The three other states are terminal and mutually
/// exclusive; an activity leaves `Pending` exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActivityState {
    /// Still in flight.
    Pending,
    /// Completed successfully.
    Done,
    /// Completed with a failure reported by the transport.
    Failed,
    /// Cancelled before completion.
    Cancelled,
}

impl ActivityState {
    /// `true` for `Done`, `Failed` and `Cancelled`.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, ActivityState::Pending)
    }
}

impl std::fmt::Display for ActivityState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ActivityState::Pending => "pending",
            ActivityState::Done => "done",
            ActivityState::Failed => "failed",
            ActivityState::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// Identifier of one subscription, unique per activity.
pub type SubscriptionId = u64;

/// Activity trait - capability interface for one outstanding communication.
///
/// Implemented by whatever moves the data (network, disk, timers). Waiters
/// only query the state and register one-shot notifications; they never
/// drive transitions.
pub trait Activity: Send + Sync {
    /// Stable identifier of this activity (for diagnostics and errors).
    fn activity_id(&self) -> u64;

    /// Current state. Non-blocking and idempotent.
    ///
    /// Fails with [`super::Error::InvalidActivity`] once the handle is no
    /// longer usable.
    fn state(&self) -> Result<ActivityState>;

    /// Register a one-shot notification fired the first time this activity
    /// leaves `Pending`.
    ///
    /// When the activity is already terminal the signal fires synchronously,
    /// before this call returns.
    fn subscribe(&self, signal: Arc<dyn WaitsetSignal>) -> Result<SubscriptionId>;

    /// Remove a registration.
    ///
    /// A registration that already fired, or was already removed, is a
    /// no-op. Safe to call after the activity became terminal.
    fn unsubscribe(&self, subscription: SubscriptionId) -> Result<()>;
}

/// Live registration of a waiter on one activity.
///
/// Released explicitly with [`Subscription::cancel`] so failures can be
/// reported, or best-effort on drop.
pub struct Subscription {
    activity: Arc<dyn Activity>,
    id: SubscriptionId,
    index: usize,
    released: bool,
}

impl Subscription {
    /// Subscribe `signal` on `activity`, remembering the slice position.
    pub fn register(
        activity: Arc<dyn Activity>,
        index: usize,
        signal: Arc<dyn WaitsetSignal>,
    ) -> Result<Self> {
        let id = activity
            .subscribe(signal)
            .map_err(|err| err.with_index(index))?;
        Ok(Self {
            activity,
            id,
            index,
            released: false,
        })
    }

    /// Identifier assigned by the activity.
    #[must_use]
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Position of the activity in the waited slice.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Release the registration, reporting the activity's error if any.
    pub fn cancel(mut self) -> Result<()> {
        self.released = true;
        self.activity
            .unsubscribe(self.id)
            .map_err(|err| err.with_index(self.index))
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(err) = self.activity.unsubscribe(self.id) {
            log::warn!(
                "[activity] release of subscription {} at index {} failed: {}",
                self.id,
                self.index,
                err
            );
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("activity_id", &self.activity.activity_id())
            .field("id", &self.id)
            .field("index", &self.index)
            .finish()
    }
}
