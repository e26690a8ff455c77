// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Clocks and parking - the time source a waiter is bound to.
//!
//! A [`Clock`] supplies "now" and hands out [`Parker`]s. A parker owns the
//! signals given to activities during one wait and blocks the caller until
//! one of them fires or a deadline (expressed on the same clock) passes.
//!
//! Two clocks are provided:
//! - [`SystemClock`]: wall clock, parks on the eventfd waitset driver.
//! - [`SimClock`]: virtual time that advances only when every context is
//!   parked, for deterministic simulation and tests.

mod sim;
mod system;

pub use sim::{SimActor, SimClock};
pub use system::SystemClock;

use crate::comm::Result;
use crate::core::rt::waitset::WaitsetSignal;
use std::sync::Arc;
use std::time::Duration;

/// Time source plus suspend primitive, injected into waiters.
pub trait Clock: Send + Sync {
    /// Time elapsed since this clock's origin. Monotonic.
    fn now(&self) -> Duration;

    /// Open a parker able to track `slots` activity positions for one wait.
    fn parker(&self, slots: usize) -> Result<Box<dyn Parker>>;
}

/// One waiting context's parking slot.
///
/// The parker keeps every signal it hands out alive until it is dropped;
/// activities only hold weak references.
pub trait Parker: Send {
    /// Signal to register on the activity at `position`.
    fn signal(&mut self, position: usize) -> Result<Arc<dyn WaitsetSignal>>;

    /// Block until a signal fires or the clock reaches `deadline`.
    ///
    /// `None` waits without a deadline. Signals that fired before the call
    /// are reported immediately.
    fn park(&mut self, deadline: Option<Duration>) -> Result<Wakeup>;
}

/// Why [`Parker::park`] returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Wakeup {
    /// Positions whose signals fired (possibly empty for a bare wakeup).
    Signalled(Vec<usize>),
    /// The deadline passed with no signal.
    DeadlineElapsed,
}

/// How long a wait may block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Timeout {
    /// No deadline.
    Forever,
    /// Relative deadline. `Duration::ZERO` polls without blocking.
    After(Duration),
}

impl Timeout {
    /// Check once, never block.
    pub const POLL: Timeout = Timeout::After(Duration::ZERO);

    /// Build from seconds, where a negative or NaN value means
    /// [`Timeout::Forever`]. Values too large for a `Duration` (including
    /// `+inf`) saturate to `Duration::MAX`.
    ///
    /// ```
    /// use commwait::Timeout;
    /// use std::time::Duration;
    ///
    /// assert_eq!(Timeout::from_secs_f64(-1.0), Timeout::Forever);
    /// assert_eq!(Timeout::from_secs_f64(0.0), Timeout::POLL);
    /// assert_eq!(Timeout::from_secs_f64(2.5), Timeout::After(Duration::from_millis(2500)));
    /// assert_eq!(Timeout::from_secs_f64(1e20), Timeout::After(Duration::MAX));
    /// ```
    #[must_use]
    pub fn from_secs_f64(secs: f64) -> Self {
        if secs.is_nan() || secs < 0.0 {
            return Timeout::Forever;
        }
        Timeout::After(Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX))
    }

    /// Whether this timeout only polls.
    #[must_use]
    pub fn is_poll(&self) -> bool {
        matches!(self, Timeout::After(d) if d.is_zero())
    }

    /// Absolute deadline for a wait starting at `now`.
    ///
    /// Only [`Timeout::Forever`] has no deadline; a sum that overflows
    /// saturates to `Duration::MAX`.
    #[must_use]
    pub fn deadline_from(&self, now: Duration) -> Option<Duration> {
        match self {
            Timeout::Forever => None,
            Timeout::After(d) => Some(now.saturating_add(*d)),
        }
    }
}

impl From<Duration> for Timeout {
    fn from(duration: Duration) -> Self {
        Timeout::After(duration)
    }
}

impl From<Option<Duration>> for Timeout {
    fn from(duration: Option<Duration>) -> Self {
        duration.map_or(Timeout::Forever, Timeout::After)
    }
}

impl std::fmt::Display for Timeout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Timeout::Forever => f.write_str("forever"),
            Timeout::After(d) => write!(f, "{:?}", d),
        }
    }
}
