// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Scenario configuration.
//!
//! Supports both file-based (TOML) and command-line configuration.

use commwait::config::FOREVER_SECS;
use commwait::{ActivityState, WaitConfig};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Which wait the scenario runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WaitMode {
    /// `wait_any`: first completion wins.
    #[default]
    Any,
    /// `wait_all`: count completions at the deadline.
    All,
    /// `test_any`: single poll at time zero.
    Test,
}

impl FromStr for WaitMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "any" => Ok(WaitMode::Any),
            "all" => Ok(WaitMode::All),
            "test" => Ok(WaitMode::Test),
            other => Err(ConfigError::Invalid(format!(
                "Unknown mode '{}' (expected any, all or test)",
                other
            ))),
        }
    }
}

impl std::fmt::Display for WaitMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            WaitMode::Any => "any",
            WaitMode::All => "all",
            WaitMode::Test => "test",
        })
    }
}

/// How a simulated activity ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FinalState {
    Done,
    Failed,
    Cancelled,
    /// Stays pending forever.
    Never,
}

impl FinalState {
    /// Terminal state reached, or `None` for [`FinalState::Never`].
    pub fn terminal(self) -> Option<ActivityState> {
        match self {
            FinalState::Done => Some(ActivityState::Done),
            FinalState::Failed => Some(ActivityState::Failed),
            FinalState::Cancelled => Some(ActivityState::Cancelled),
            FinalState::Never => None,
        }
    }
}

impl FromStr for FinalState {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "done" => Ok(FinalState::Done),
            "failed" => Ok(FinalState::Failed),
            "cancelled" | "canceled" => Ok(FinalState::Cancelled),
            "never" | "pending" => Ok(FinalState::Never),
            other => Err(ConfigError::Invalid(format!(
                "Unknown state '{}' (expected done, failed, cancelled or never)",
                other
            ))),
        }
    }
}

/// One simulated communication.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityConfig {
    /// Label printed in the report.
    pub name: String,

    /// State the activity reaches.
    pub state: FinalState,

    /// Virtual time (seconds) of the transition. Ignored for `never`.
    #[serde(default)]
    pub at_secs: f64,
}

impl ActivityConfig {
    /// Virtual instant of the transition, if any.
    pub fn completes_at(&self) -> Option<Duration> {
        self.state.terminal()?;
        Duration::try_from_secs_f64(self.at_secs).ok()
    }
}

/// Parses `name:state@secs`, e.g. `b:done@2.0`. `@secs` may be omitted for
/// `never` and defaults to 0 otherwise.
impl FromStr for ActivityConfig {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, rest) = s.split_once(':').ok_or_else(|| {
            ConfigError::Invalid(format!(
                "Invalid activity '{}' (expected name:state@secs)",
                s
            ))
        })?;

        let (state, at_secs) = match rest.split_once('@') {
            Some((state, secs)) => {
                let secs = secs.trim().parse::<f64>().map_err(|_| {
                    ConfigError::Invalid(format!("Invalid time '{}' in activity '{}'", secs, s))
                })?;
                (state, secs)
            }
            None => (rest, 0.0),
        };

        Ok(Self {
            name: name.trim().to_string(),
            state: state.trim().parse()?,
            at_secs,
        })
    }
}

/// A complete scenario: activities, wait mode and timeout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioConfig {
    /// Scenario name (for identification).
    #[serde(default = "default_scenario_name")]
    pub name: String,

    /// Wait operation to run.
    #[serde(default)]
    pub mode: WaitMode,

    /// Timeout in seconds; negative waits forever.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: f64,

    /// Limits and completion policy of the wait set.
    #[serde(default)]
    pub wait: WaitConfig,

    /// Activities, in wait order.
    #[serde(default)]
    pub activities: Vec<ActivityConfig>,
}

fn default_scenario_name() -> String {
    "scenario".to_string()
}

fn default_timeout_secs() -> f64 {
    FOREVER_SECS
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            name: default_scenario_name(),
            mode: WaitMode::default(),
            timeout_secs: default_timeout_secs(),
            wait: WaitConfig::default(),
            activities: Vec::new(),
        }
    }
}

impl ScenarioConfig {
    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        content.parse()
    }

    /// Example scenario written by `gen-config`: B completes at 2.0.
    pub fn example() -> Self {
        Self {
            name: "first-of-two".into(),
            mode: WaitMode::Any,
            timeout_secs: 10.0,
            wait: WaitConfig::default(),
            activities: vec![
                ActivityConfig {
                    name: "a".into(),
                    state: FinalState::Never,
                    at_secs: 0.0,
                },
                ActivityConfig {
                    name: "b".into(),
                    state: FinalState::Done,
                    at_secs: 2.0,
                },
            ],
        }
    }

    /// Serialize to TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_secs.is_nan() {
            return Err(ConfigError::Invalid("timeout_secs is NaN".into()));
        }

        self.wait
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        if self.activities.len() > self.wait.max_activities {
            return Err(ConfigError::Invalid(format!(
                "{} activities exceed max_activities {}",
                self.activities.len(),
                self.wait.max_activities
            )));
        }

        let mut names = HashSet::new();
        for (i, activity) in self.activities.iter().enumerate() {
            if activity.name.is_empty() {
                return Err(ConfigError::Invalid(format!("Activity {} has empty name", i)));
            }
            if !names.insert(activity.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "Duplicate activity name '{}'",
                    activity.name
                )));
            }
            if activity.state != FinalState::Never
                && !(activity.at_secs.is_finite() && activity.at_secs >= 0.0)
            {
                return Err(ConfigError::Invalid(format!(
                    "Activity '{}' has invalid time {}",
                    activity.name, activity.at_secs
                )));
            }
        }

        Ok(())
    }
}

impl FromStr for ScenarioConfig {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }
}
