// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! WaitAnySet - block until the first of an ordered set of activities
//! reaches a terminal state.
//!
//! # Wait loop
//!
//! 1. Scan the slice in order; an already-terminal activity wins without
//!    subscribing or parking.
//! 2. A zero timeout stops here. Otherwise the deadline is computed on the
//!    injected clock.
//! 3. One signal per position is registered on its activity. A failure
//!    unwinds the registrations already made.
//! 4. Park. On every wakeup the whole slice is re-scanned, so the lowest
//!    terminal index wins regardless of notification order.
//! 5. Every subscription is released on every exit path.

use super::activity::{Activity, Subscription};
use super::{Error, Result};
use crate::config::WaitConfig;
use crate::time::{Clock, Parker, SystemClock, Timeout, Wakeup};
use std::sync::Arc;
use std::time::Duration;

/// Wait-any coordinator bound to one clock.
///
/// Stateless between calls: every wait owns its parker and subscriptions,
/// so one set may serve any number of concurrent callers, on disjoint or
/// overlapping activities.
///
/// # Example
///
/// ```
/// use commwait::{Activity, Comm, Timeout, WaitAnySet};
/// use std::sync::Arc;
///
/// let pending: Arc<dyn Activity> = Comm::shared();
/// let done = Comm::shared();
/// done.complete();
///
/// let set = WaitAnySet::system();
/// let activities: [Arc<dyn Activity>; 2] = [pending, done];
/// assert_eq!(set.wait_any(&activities, Timeout::from_secs_f64(5.0)).unwrap(), Some(1));
/// ```
#[derive(Clone)]
pub struct WaitAnySet {
    clock: Arc<dyn Clock>,
    config: WaitConfig,
}

impl WaitAnySet {
    /// Bind a set to `clock` with the default configuration.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            config: WaitConfig::default(),
        }
    }

    /// Bind a set to `clock` with a custom configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if `config` does not validate.
    pub fn with_config(clock: Arc<dyn Clock>, config: WaitConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { clock, config })
    }

    /// Set bound to a fresh wall clock.
    pub fn system() -> Self {
        Self::new(SystemClock::shared())
    }

    /// The clock this set reads and parks on.
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Active configuration.
    pub fn config(&self) -> &WaitConfig {
        &self.config
    }

    /// Wait until any activity in `activities` completes or `timeout`
    /// elapses.
    ///
    /// Returns the lowest index whose activity is terminal (under the
    /// configured [`crate::CompletionPolicy`]), or `None` on timeout. An
    /// empty slice returns `None` immediately. `Timeout::POLL` never
    /// blocks.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidActivity`] if a status query, subscribe or release
    ///   fails; `index` names the position.
    /// - [`Error::ResourceLimitExceeded`] if the slice is larger than the
    ///   configured limit.
    /// - [`Error::Deadlock`] on a simulated clock that can no longer advance.
    pub fn wait_any(
        &self,
        activities: &[Arc<dyn Activity>],
        timeout: impl Into<Timeout>,
    ) -> Result<Option<usize>> {
        let timeout = timeout.into();
        self.check_len(activities)?;

        if activities.is_empty() {
            log::debug!("[wait-any] empty activity set");
            return Ok(None);
        }

        if let Some(index) = self.scan(activities)? {
            log::debug!("[wait-any] index {} already terminal", index);
            return Ok(Some(index));
        }

        if timeout.is_poll() {
            return Ok(None);
        }

        let started = self.clock.now();
        let deadline = timeout.deadline_from(started);
        log::debug!(
            "[wait-any] parking on {} activities, timeout={} deadline={:?}",
            activities.len(),
            timeout,
            deadline
        );

        let mut parker = self.clock.parker(activities.len())?;
        let mut subscriptions = Vec::with_capacity(activities.len());

        let outcome = subscribe_all(parker.as_mut(), activities, &mut subscriptions)
            .and_then(|()| self.park_until_ready(parker.as_mut(), activities, deadline));

        let released = release_all(subscriptions);
        drop(parker);

        match (outcome, released) {
            (Err(err), _) => {
                log::debug!("[wait-any] aborted: {}", err);
                Err(err)
            }
            (Ok(_), Err(err)) => Err(err),
            (Ok(found), Ok(())) => {
                log::debug!(
                    "[wait-any] resolved {:?} after {:?}",
                    found,
                    self.clock.now().saturating_sub(started)
                );
                Ok(found)
            }
        }
    }

    /// Non-blocking check: lowest terminal index, or `None`.
    ///
    /// Equivalent to `wait_any(activities, Timeout::POLL)`.
    pub fn test_any(&self, activities: &[Arc<dyn Activity>]) -> Result<Option<usize>> {
        self.check_len(activities)?;
        self.scan(activities)
    }

    pub(super) fn check_len(&self, activities: &[Arc<dyn Activity>]) -> Result<()> {
        if activities.len() > self.config.max_activities {
            return Err(Error::ResourceLimitExceeded(format!(
                "{} activities, limit is {}",
                activities.len(),
                self.config.max_activities
            )));
        }
        Ok(())
    }

    /// Lowest index whose state ends a wait.
    pub(super) fn scan(&self, activities: &[Arc<dyn Activity>]) -> Result<Option<usize>> {
        for (index, activity) in activities.iter().enumerate() {
            if self.accepts(&**activity, index)? {
                return Ok(Some(index));
            }
        }
        Ok(None)
    }

    pub(super) fn accepts(&self, activity: &dyn Activity, index: usize) -> Result<bool> {
        let state = activity.state().map_err(|err| err.with_index(index))?;
        Ok(self.config.policy.accepts(state))
    }

    fn park_until_ready(
        &self,
        parker: &mut dyn Parker,
        activities: &[Arc<dyn Activity>],
        deadline: Option<Duration>,
    ) -> Result<Option<usize>> {
        loop {
            // Covers completions that landed between the first scan and
            // the subscriptions becoming live.
            if let Some(index) = self.scan(activities)? {
                return Ok(Some(index));
            }

            match parker.park(deadline)? {
                Wakeup::Signalled(positions) => {
                    log::trace!("[wait-any] woken by positions {:?}", positions);
                }
                Wakeup::DeadlineElapsed => {
                    log::debug!("[wait-any] deadline {:?} elapsed", deadline);
                    return self.scan(activities);
                }
            }
        }
    }
}

impl std::fmt::Debug for WaitAnySet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WaitAnySet")
            .field("now", &self.clock.now())
            .field("config", &self.config)
            .finish()
    }
}

/// Register one signal per position, in slice order.
///
/// On failure `subscriptions` holds the registrations made so far, which
/// the caller releases.
pub(super) fn subscribe_all(
    parker: &mut dyn Parker,
    activities: &[Arc<dyn Activity>],
    subscriptions: &mut Vec<Subscription>,
) -> Result<()> {
    for (index, activity) in activities.iter().enumerate() {
        let signal = parker.signal(index)?;
        let subscription = Subscription::register(Arc::clone(activity), index, signal)?;
        subscriptions.push(subscription);
    }
    Ok(())
}

/// Release every subscription. Keeps going past failures and returns the
/// first one.
pub(super) fn release_all(subscriptions: Vec<Subscription>) -> Result<()> {
    let mut first_error = None;
    for subscription in subscriptions {
        let index = subscription.index();
        if let Err(err) = subscription.cancel() {
            log::warn!("[wait-any] release at index {} failed: {}", index, err);
            first_error.get_or_insert(err);
        }
    }
    first_error.map_or(Ok(()), Err)
}
