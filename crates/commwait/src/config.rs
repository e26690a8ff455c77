// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! commwait configuration - single source of truth for limits and policies.
//!
//! # Architecture
//!
//! - **Level 1 (Static)**: compile-time constants (slot limits, sentinels)
//! - **Level 2 (Dynamic)**: [`WaitConfig`] carried by each `WaitAnySet`
//!
//! # Example
//!
//! ```
//! use commwait::config::{CompletionPolicy, WaitConfig};
//!
//! let config = WaitConfig::default()
//!     .max_activities(64)
//!     .policy(CompletionPolicy::DoneOnly);
//! assert!(config.validate().is_ok());
//! ```

use crate::comm::{ActivityState, Error, Result};

/// Default maximum number of waitset slots per driver instance.
///
/// One slot is consumed per activity position during a wait.
pub const WAITSET_DEFAULT_MAX_SLOTS: usize = 2048;

/// Timeout value (seconds) meaning "wait forever" in the floating-point
/// convention accepted by [`crate::Timeout::from_secs_f64`].
///
/// Any negative value is treated the same way.
pub const FOREVER_SECS: f64 = -1.0;

/// Which terminal states end a wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum CompletionPolicy {
    /// Done, Failed and Cancelled all count as completion.
    #[default]
    AnyTerminal,
    /// Only Done counts; failed or cancelled activities never end a wait.
    DoneOnly,
}

impl CompletionPolicy {
    /// Whether `state` ends a wait under this policy.
    #[must_use]
    pub const fn accepts(self, state: ActivityState) -> bool {
        match self {
            CompletionPolicy::AnyTerminal => state.is_terminal(),
            CompletionPolicy::DoneOnly => matches!(state, ActivityState::Done),
        }
    }
}

/// Per-set wait configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct WaitConfig {
    /// Largest activity slice accepted by a single wait.
    pub max_activities: usize,
    /// Terminal states that end a wait.
    pub policy: CompletionPolicy,
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            max_activities: WAITSET_DEFAULT_MAX_SLOTS,
            policy: CompletionPolicy::AnyTerminal,
        }
    }
}

impl WaitConfig {
    /// Set the activity limit.
    #[must_use]
    pub fn max_activities(mut self, max: usize) -> Self {
        self.max_activities = max;
        self
    }

    /// Set the completion policy.
    #[must_use]
    pub fn policy(mut self, policy: CompletionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Check the configuration for values no wait could honour.
    pub fn validate(&self) -> Result<()> {
        if self.max_activities == 0 {
            return Err(Error::InvalidConfig(
                "max_activities must be > 0".to_string(),
            ));
        }
        if self.max_activities > WAITSET_DEFAULT_MAX_SLOTS {
            return Err(Error::InvalidConfig(format!(
                "max_activities {} exceeds waitset capacity {}",
                self.max_activities, WAITSET_DEFAULT_MAX_SLOTS
            )));
        }
        Ok(())
    }
}
