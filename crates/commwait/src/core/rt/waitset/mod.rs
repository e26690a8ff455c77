// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Waitset driver for multi-slot completion notification.
//!
//! Provides `WaitsetDriver` (eventfd-backed, used by the wall clock) and the
//! `WaitsetSignal` handle that activities fire when they turn terminal.

pub(crate) mod bitmap;
mod driver;

pub use crate::config::WAITSET_DEFAULT_MAX_SLOTS;
pub use driver::{WaitsetDriver, WaitsetRegistration, WaitsetSignal, WaitsetWaitError};

#[cfg(test)]
mod tests;
