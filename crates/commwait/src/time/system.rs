// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Wall clock backed by the eventfd waitset driver.

use super::{Clock, Parker, Wakeup};
use crate::comm::{Error, Result};
use crate::config::WAITSET_DEFAULT_MAX_SLOTS;
use crate::core::rt::waitset::{WaitsetDriver, WaitsetSignal, WaitsetWaitError};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Monotonic wall clock. `now()` is the time elapsed since construction.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    /// Create a clock whose origin is the current instant.
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }

    /// Create a clock wrapped in `Arc`, ready to inject.
    #[must_use]
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    fn parker(&self, slots: usize) -> Result<Box<dyn Parker>> {
        if slots > WAITSET_DEFAULT_MAX_SLOTS {
            return Err(Error::ResourceLimitExceeded(format!(
                "{} slots requested, waitset capacity is {}",
                slots, WAITSET_DEFAULT_MAX_SLOTS
            )));
        }

        let driver = WaitsetDriver::new(slots.max(1))?;
        Ok(Box::new(SystemParker {
            clock: *self,
            driver,
            registrations: Vec::with_capacity(slots),
        }))
    }
}

struct SystemParker {
    clock: SystemClock,
    driver: WaitsetDriver,
    registrations: Vec<SlotRegistration>,
}

struct SlotRegistration {
    slot_index: usize,
    slot_id: u64,
    // Keeps the signal alive: activities only hold weak references.
    _signal: Arc<dyn WaitsetSignal>,
}

impl Parker for SystemParker {
    fn signal(&mut self, position: usize) -> Result<Arc<dyn WaitsetSignal>> {
        let (slot_index, slot_id, signal) = self
            .driver
            .register_slot(position)
            .map_err(|err| Error::ResourceLimitExceeded(err.to_string()))?
            .into_trait();

        self.registrations.push(SlotRegistration {
            slot_index,
            slot_id,
            _signal: Arc::clone(&signal),
        });
        Ok(signal)
    }

    fn park(&mut self, deadline: Option<Duration>) -> Result<Wakeup> {
        loop {
            let remaining = match deadline {
                Some(deadline) => {
                    let now = self.clock.now();
                    if now >= deadline {
                        return Ok(Wakeup::DeadlineElapsed);
                    }
                    Some(deadline - now)
                }
                None => None,
            };

            match self.driver.wait(remaining) {
                Ok(positions) => return Ok(Wakeup::Signalled(positions)),
                // Re-check against the clock: poll(2) granularity may end early.
                Err(WaitsetWaitError::Timeout) => continue,
                Err(WaitsetWaitError::Io(err)) => return Err(Error::IoError(err)),
            }
        }
    }
}

impl Drop for SystemParker {
    fn drop(&mut self) {
        for registration in self.registrations.drain(..) {
            self.driver
                .unregister_slot(registration.slot_index, registration.slot_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_now_is_monotonic() {
        let clock = SystemClock::new();
        let first = clock.now();
        let second = clock.now();
        assert!(second >= first);
    }

    #[test]
    fn test_parker_deadline_not_early() {
        let clock = SystemClock::new();
        let mut parker = clock.parker(1).expect("parker");
        let _signal = parker.signal(0).expect("signal");

        let deadline = clock.now() + Duration::from_millis(40);
        let wakeup = parker.park(Some(deadline)).expect("park");

        assert_eq!(wakeup, Wakeup::DeadlineElapsed);
        assert!(clock.now() >= deadline);
    }

    #[test]
    fn test_parker_reports_signalled_position() {
        let clock = SystemClock::new();
        let mut parker = clock.parker(3).expect("parker");
        let _a = parker.signal(0).expect("a");
        let _b = parker.signal(1).expect("b");
        let c = parker.signal(2).expect("c");

        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(10));
            c.signal();
        });

        let wakeup = parker.park(None).expect("park");
        assert_eq!(wakeup, Wakeup::Signalled(vec![2]));
        handle.join().expect("signal thread");
    }

    #[test]
    fn test_parker_rejects_oversized_request() {
        let clock = SystemClock::new();
        assert!(matches!(
            clock.parker(WAITSET_DEFAULT_MAX_SLOTS + 1),
            Err(Error::ResourceLimitExceeded(_))
        ));
    }
}
