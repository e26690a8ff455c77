// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! commwait scenario runner
//!
//! Builds a set of simulated communications, runs one wait over them on a
//! [`commwait::SimClock`] and reports which one completed and when the
//! wait resumed.
//!
//! # Quick Start
//!
//! ```bash
//! # B completes at t=2.0, A never does
//! commwait-sim --activity a:never --activity b:done@2.0 --timeout 10
//!
//! # Using a scenario file
//! commwait-sim --config scenario.toml
//! ```
//!
//! # Scenario File
//!
//! ```toml
//! name = "first-of-two"
//! mode = "any"
//! timeout_secs = 10.0
//!
//! [wait]
//! policy = "any_terminal"
//!
//! [[activities]]
//! name = "a"
//! state = "never"
//!
//! [[activities]]
//! name = "b"
//! state = "done"
//! at_secs = 2.0
//! ```

pub mod config;
pub mod runner;

pub use config::{ActivityConfig, ConfigError, FinalState, ScenarioConfig, WaitMode};
pub use runner::{run, Outcome, RunError, RunReport};
