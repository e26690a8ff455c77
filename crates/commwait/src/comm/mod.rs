// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Communication activities and the wait-any coordinator.
//!
//! An [`Activity`] is one outstanding asynchronous communication. A
//! [`WaitAnySet`] blocks until the first activity of an ordered slice
//! reaches a terminal state, or until a deadline passes.

mod activity;
mod handle;
mod wait_all;
mod wait_any;

pub use activity::{Activity, ActivityState, Subscription, SubscriptionId};
pub use handle::Comm;
pub use wait_any::WaitAnySet;

/// Errors returned by commwait operations.
///
/// A timeout is never an error: waits report it as `Ok(None)`.
///
/// # Example
///
/// ```rust
/// use commwait::{Activity, Comm, Error, Timeout, WaitAnySet};
/// use std::sync::Arc;
///
/// let comm = Comm::shared();
/// comm.close();
///
/// let set = WaitAnySet::system();
/// match set.wait_any(&[comm as Arc<dyn Activity>], Timeout::POLL) {
///     Err(Error::InvalidActivity { index, .. }) => assert_eq!(index, Some(0)),
///     other => panic!("unexpected: {:?}", other),
/// }
/// ```
#[derive(Debug)]
pub enum Error {
    /// Activity handle is stale, closed or otherwise unusable.
    ///
    /// `index` is the position in the caller's slice when the failure
    /// happened during a wait.
    InvalidActivity {
        /// Identifier of the offending activity.
        activity_id: u64,
        /// Position of the activity in the waited slice, if known.
        index: Option<usize>,
    },
    /// Too many activities or slots for one wait.
    ResourceLimitExceeded(String),
    /// Configuration rejected by [`crate::WaitConfig::validate`].
    InvalidConfig(String),
    /// Simulated time cannot advance: every context is parked without a
    /// deadline and nothing is scheduled.
    Deadlock,
    /// I/O error from the parking driver.
    IoError(std::io::Error),
}

impl Error {
    /// Attach the slice position to an [`Error::InvalidActivity`].
    #[must_use]
    pub fn with_index(self, position: usize) -> Self {
        match self {
            Error::InvalidActivity {
                activity_id,
                index: None,
            } => Error::InvalidActivity {
                activity_id,
                index: Some(position),
            },
            other => other,
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::InvalidActivity {
                activity_id,
                index: Some(index),
            } => write!(f, "Invalid activity {} at index {}", activity_id, index),
            Error::InvalidActivity {
                activity_id,
                index: None,
            } => write!(f, "Invalid activity {}", activity_id),
            Error::ResourceLimitExceeded(msg) => write!(f, "Resource limit exceeded: {}", msg),
            Error::InvalidConfig(msg) => write!(f, "Invalid configuration: {}", msg),
            Error::Deadlock => write!(f, "Simulation deadlock: no context can make progress"),
            Error::IoError(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::IoError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::IoError(err)
    }
}

/// Convenient alias for API results using the public `Error` type.
pub type Result<T> = std::result::Result<T, Error>;
