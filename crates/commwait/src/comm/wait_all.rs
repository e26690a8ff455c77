// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Wait for every activity of a slice.

use super::activity::Activity;
use super::wait_any::{release_all, subscribe_all, WaitAnySet};
use super::Result;
use crate::time::{Parker, Timeout, Wakeup};
use std::sync::Arc;
use std::time::Duration;

impl WaitAnySet {
    /// Wait until every activity in `activities` is terminal or `timeout`
    /// elapses, and return how many are terminal.
    ///
    /// Any terminal state counts here; the completion policy only applies
    /// to [`WaitAnySet::wait_any`]. An empty slice returns `Ok(0)`
    /// immediately. Subscription, teardown and error rules are those of
    /// `wait_any`.
    ///
    /// ```
    /// use commwait::{Activity, ActivityState, Comm, SimClock, Timeout, WaitAnySet};
    /// use std::sync::Arc;
    /// use std::time::Duration;
    ///
    /// let sim = Arc::new(SimClock::new());
    /// let a: Arc<dyn Activity> = sim.completion_at(Duration::from_secs(1), ActivityState::Done);
    /// let b: Arc<dyn Activity> = Comm::shared();
    ///
    /// let set = WaitAnySet::new(sim.clone());
    /// assert_eq!(set.wait_all(&[a, b], Timeout::from_secs_f64(4.0)).unwrap(), 1);
    /// assert_eq!(sim.now(), Duration::from_secs(4));
    /// ```
    pub fn wait_all(
        &self,
        activities: &[Arc<dyn Activity>],
        timeout: impl Into<Timeout>,
    ) -> Result<usize> {
        let timeout = timeout.into();
        self.check_len(activities)?;

        if activities.is_empty() {
            return Ok(0);
        }

        let terminal = count_terminal(activities)?;
        if terminal == activities.len() || timeout.is_poll() {
            return Ok(terminal);
        }

        let deadline = timeout.deadline_from(self.clock().now());
        log::debug!(
            "[wait-all] {} of {} terminal, deadline={:?}",
            terminal,
            activities.len(),
            deadline
        );

        let mut parker = self.clock().parker(activities.len())?;
        let mut subscriptions = Vec::with_capacity(activities.len());

        let outcome = subscribe_all(parker.as_mut(), activities, &mut subscriptions)
            .and_then(|()| park_until_all(parker.as_mut(), activities, deadline));

        let released = release_all(subscriptions);
        drop(parker);

        match (outcome, released) {
            (Err(err), _) | (Ok(_), Err(err)) => Err(err),
            (Ok(count), Ok(())) => {
                log::debug!("[wait-all] {} of {} terminal", count, activities.len());
                Ok(count)
            }
        }
    }
}

fn count_terminal(activities: &[Arc<dyn Activity>]) -> Result<usize> {
    let mut count = 0;
    for (index, activity) in activities.iter().enumerate() {
        if activity
            .state()
            .map_err(|err| err.with_index(index))?
            .is_terminal()
        {
            count += 1;
        }
    }
    Ok(count)
}

fn park_until_all(
    parker: &mut dyn Parker,
    activities: &[Arc<dyn Activity>],
    deadline: Option<Duration>,
) -> Result<usize> {
    loop {
        let terminal = count_terminal(activities)?;
        if terminal == activities.len() {
            return Ok(terminal);
        }

        if parker.park(deadline)? == Wakeup::DeadlineElapsed {
            return count_terminal(activities);
        }
    }
}
