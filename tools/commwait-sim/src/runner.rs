// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Scenario execution on simulated time.

use crate::config::{ConfigError, ScenarioConfig, WaitMode};
use commwait::{Activity, ActivityState, Comm, SimClock, Timeout, WaitAnySet};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Scenario run errors.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Wait failed: {0}")]
    Wait(#[from] commwait::Error),
}

/// What the wait reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// `wait_any` / `test_any` found a completed activity.
    Completed { index: usize, name: String },
    /// Deadline passed (or the poll found nothing).
    NoCompletion,
    /// `wait_all` result.
    Count { completed: usize, total: usize },
}

/// Result of one scenario run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub scenario: String,
    pub mode: WaitMode,
    pub timeout: Timeout,
    pub outcome: Outcome,
    /// Virtual time at which the wait returned.
    pub resumed_at: Duration,
    /// State of every activity when the wait returned, in input order.
    pub states: Vec<(String, ActivityState)>,
}

impl std::fmt::Display for RunReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Scenario: {} (mode {}, timeout {})", self.scenario, self.mode, self.timeout)?;
        match &self.outcome {
            Outcome::Completed { index, name } => {
                writeln!(f, "Result:   index {} ({})", index, name)?;
            }
            Outcome::NoCompletion => writeln!(f, "Result:   no completion")?,
            Outcome::Count { completed, total } => {
                writeln!(f, "Result:   {} of {} completed", completed, total)?;
            }
        }
        writeln!(f, "Resumed:  t={:.3}s", self.resumed_at.as_secs_f64())?;
        for (i, (name, state)) in self.states.iter().enumerate() {
            writeln!(f, "  [{}] {:<12} {}", i, name, state)?;
        }
        Ok(())
    }
}

/// Run `config` on a fresh simulated clock starting at t=0.
pub fn run(config: &ScenarioConfig) -> Result<RunReport, RunError> {
    config.validate()?;

    let sim = SimClock::new();
    let comms: Vec<Arc<Comm>> = config
        .activities
        .iter()
        .map(|activity| match activity.state.terminal() {
            Some(state) => {
                let at = activity.completes_at().unwrap_or(Duration::MAX);
                tracing::debug!("{} -> {} at {:?}", activity.name, state, at);
                sim.completion_at(at, state)
            }
            None => Comm::shared(),
        })
        .collect();
    let activities: Vec<Arc<dyn Activity>> = comms
        .iter()
        .map(|comm| Arc::clone(comm) as Arc<dyn Activity>)
        .collect();

    let set = WaitAnySet::with_config(Arc::new(sim.clone()), config.wait)?;
    let timeout = Timeout::from_secs_f64(config.timeout_secs);

    tracing::info!(
        "Running '{}': {} activities, mode {}, timeout {}",
        config.name,
        activities.len(),
        config.mode,
        timeout
    );

    let outcome = match config.mode {
        WaitMode::Any => completed(config, set.wait_any(&activities, timeout)?),
        WaitMode::Test => completed(config, set.test_any(&activities)?),
        WaitMode::All => Outcome::Count {
            completed: set.wait_all(&activities, timeout)?,
            total: activities.len(),
        },
    };

    let states = config
        .activities
        .iter()
        .zip(&activities)
        .map(|(cfg, activity)| Ok((cfg.name.clone(), activity.state()?)))
        .collect::<Result<Vec<_>, commwait::Error>>()?;

    Ok(RunReport {
        scenario: config.name.clone(),
        mode: config.mode,
        timeout,
        outcome,
        resumed_at: sim.now(),
        states,
    })
}

fn completed(config: &ScenarioConfig, found: Option<usize>) -> Outcome {
    match found {
        Some(index) => Outcome::Completed {
            index,
            name: config
                .activities
                .get(index)
                .map(|a| a.name.clone())
                .unwrap_or_default(),
        },
        None => Outcome::NoCompletion,
    }
}
