// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # commwait - wait for the first of many communications
//!
//! Blocks a caller until any one of an ordered set of outstanding
//! communications reaches a terminal state, or until a deadline elapses.
//! The same primitive runs against the wall clock or against simulated
//! virtual time.
//!
//! ## Quick Start
//!
//! ```rust
//! use commwait::{Activity, Comm, SimClock, Timeout, WaitAnySet};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # fn main() -> commwait::Result<()> {
//! let sim = Arc::new(SimClock::new());
//! let a: Arc<dyn Activity> = Comm::shared();
//! let b = Comm::shared();
//!
//! let b_done = Arc::clone(&b);
//! sim.schedule_at(Duration::from_secs(2), move || {
//!     b_done.complete();
//! });
//!
//! let activities: [Arc<dyn Activity>; 2] = [a, b];
//! let set = WaitAnySet::new(sim.clone());
//! let first = set.wait_any(&activities, Timeout::from_secs_f64(10.0))?;
//!
//! assert_eq!(first, Some(1));
//! assert_eq!(sim.now(), Duration::from_secs(2));
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +---------------------------------------------------------------------+
//! |                           Callers                                   |
//! |        WaitAnySet::wait_any / test_any / wait_all                   |
//! +---------------------------------------------------------------------+
//! |                         Activities                                  |
//! |   Activity trait (state + one-shot subscribe) | Comm                |
//! +---------------------------------------------------------------------+
//! |                        Clocks / Parkers                             |
//! |   SystemClock (eventfd waitset driver) | SimClock (virtual time)    |
//! +---------------------------------------------------------------------+
//! ```
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`WaitAnySet`] | Wait-any / wait-all coordinator bound to a clock |
//! | [`Activity`] | Capability trait for an outstanding communication |
//! | [`Comm`] | Externally driven Activity implementation |
//! | [`Timeout`] | `Forever`, poll, or a relative duration |
//! | [`SimClock`] | Deterministic virtual clock |
//! | [`SystemClock`] | Wall clock backed by the eventfd waitset driver |

/// Global constants and wait configuration.
pub mod config;
/// Activities, subscriptions and the wait-any coordinator.
pub mod comm;
/// Runtime primitives (waitset driver, slot bitmap).
pub mod core;
/// Clock and parking abstractions (wall clock and simulated time).
pub mod time;

pub use comm::{
    Activity, ActivityState, Comm, Error, Result, Subscription, SubscriptionId, WaitAnySet,
};
pub use config::{CompletionPolicy, WaitConfig};
pub use time::{Clock, Parker, SimActor, SimClock, SystemClock, Timeout, Wakeup};
