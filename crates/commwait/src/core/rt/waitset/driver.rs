// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Waitset driver for event-backed multi-slot notification.
//!
//! Each registered slot carries the caller's position (the index of the
//! activity in the waited slice). Signals set the slot's bit and write the
//! shared event once; `wait` blocks on the event and returns the positions
//! that fired.
//!
//! - On Unix: eventfd + poll.
//! - Elsewhere: a latched flag on a `parking_lot` condvar.

use super::bitmap::AtomicBitset;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

/// Errors returned by [`WaitsetDriver::wait`].
#[derive(Debug)]
pub enum WaitsetWaitError {
    Timeout,
    Io(io::Error),
}

/// Trait implemented by signals handed to activities.
///
/// Activities retain a weak reference to these handles and call `signal()`
/// when they leave the pending state.
pub trait WaitsetSignal: Send + Sync {
    /// Notify the waiter that the associated slot fired.
    fn signal(&self);
}

/// Driver responsible for managing event-backed notifications.
#[derive(Clone)]
pub struct WaitsetDriver {
    inner: Arc<WaitsetDriverInner>,
}

impl WaitsetDriver {
    /// Create a new waitset driver capable of tracking up to `max_slots`
    /// concurrent registrations.
    pub fn new(max_slots: usize) -> io::Result<Self> {
        if max_slots == 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "max_slots must be > 0",
            ));
        }

        let event_handle = platform::create_event()?;

        Ok(Self {
            inner: Arc::new(WaitsetDriverInner {
                event_handle,
                bitmap: AtomicBitset::new(max_slots),
                slots: Mutex::new(SlotTable::new(max_slots)),
                max_slots,
            }),
        })
    }

    /// Register a slot for `position` and obtain its [`WaitsetSignal`].
    pub fn register_slot(&self, position: usize) -> io::Result<WaitsetRegistration> {
        self.inner.register_slot(position)
    }

    /// Unregister a previously allocated slot. Returns `true` if the slot was
    /// successfully removed.
    pub fn unregister_slot(&self, slot_index: usize, slot_id: u64) -> bool {
        self.inner.unregister_slot(slot_index, slot_id)
    }

    /// Block until one or more slots have been signalled.
    ///
    /// Returns the registered positions that fired, ascending. The list is
    /// empty when the only fired slots were unregistered before the wake.
    pub fn wait(&self, timeout: Option<Duration>) -> Result<Vec<usize>, WaitsetWaitError> {
        self.inner.wait(timeout)
    }

    /// Number of live slot registrations.
    pub fn active_slots(&self) -> usize {
        self.inner.lock_slots().active()
    }
}

struct WaitsetDriverInner {
    event_handle: platform::EventHandle,
    bitmap: AtomicBitset,
    slots: Mutex<SlotTable>,
    max_slots: usize,
}

impl WaitsetDriverInner {
    fn lock_slots(&self) -> MutexGuard<'_, SlotTable> {
        match self.slots.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::debug!("[rt] waitset slot table poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    fn register_slot(self: &Arc<Self>, position: usize) -> io::Result<WaitsetRegistration> {
        let (slot_index, slot_id) = self.lock_slots().allocate_slot(self.max_slots, position)?;

        let signal = Arc::new(SignalHandle {
            inner: Arc::downgrade(self),
            slot_index,
        });

        Ok(WaitsetRegistration {
            slot_index,
            slot_id,
            signal,
        })
    }

    fn unregister_slot(&self, slot_index: usize, slot_id: u64) -> bool {
        self.lock_slots().release_slot(slot_index, slot_id)
    }

    fn wait(&self, timeout: Option<Duration>) -> Result<Vec<usize>, WaitsetWaitError> {
        platform::wait_event(&self.event_handle, timeout)?;
        platform::drain_event(&self.event_handle);

        let fired = self.bitmap.take_all();
        let table = self.lock_slots();
        let mut positions: Vec<usize> = fired
            .into_iter()
            .filter_map(|slot| table.position(slot))
            .collect();
        positions.sort_unstable();
        positions.dedup();
        Ok(positions)
    }

    fn signal_slot(&self, slot_index: usize) {
        if slot_index >= self.max_slots {
            return;
        }

        let already_set = self.bitmap.test_and_set(slot_index);
        if !already_set {
            self.write_event();
        }
    }

    fn write_event(&self) {
        platform::signal_event(&self.event_handle);
    }
}

impl Drop for WaitsetDriverInner {
    fn drop(&mut self) {
        platform::close_event(&self.event_handle);
    }
}

// =============================================================================
// Unix implementation (eventfd + poll)
// =============================================================================
#[cfg(unix)]
mod platform {
    use std::io;
    use std::os::fd::RawFd;
    use std::time::Duration;

    use super::WaitsetWaitError;

    const EVENTFD_FLAGS: libc::c_int = libc::EFD_NONBLOCK | libc::EFD_CLOEXEC;

    pub type EventHandle = RawFd;

    pub fn create_event() -> io::Result<EventHandle> {
        // SAFETY: eventfd is invoked with valid flags and no shared state.
        let fd = unsafe { libc::eventfd(0, EVENTFD_FLAGS) };
        if fd < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(fd)
    }

    /// Milliseconds for poll(2), rounded up so a wait never ends early.
    fn timeout_ms(timeout: Option<Duration>) -> libc::c_int {
        match timeout {
            None => -1,
            Some(d) => {
                let mut ms = d.as_millis();
                if Duration::from_millis(ms as u64) < d {
                    ms += 1;
                }
                libc::c_int::try_from(ms).unwrap_or(libc::c_int::MAX)
            }
        }
    }

    pub fn wait_event(
        handle: &EventHandle,
        timeout: Option<Duration>,
    ) -> Result<(), WaitsetWaitError> {
        let timeout_ms = timeout_ms(timeout);

        let mut pollfd = libc::pollfd {
            fd: *handle,
            events: libc::POLLIN,
            revents: 0,
        };

        loop {
            // SAFETY: poll_target points to our stack-allocated pollfd structure.
            let poll_target = std::ptr::addr_of_mut!(pollfd);
            let res = unsafe { libc::poll(poll_target, 1, timeout_ms) };
            if res == 0 {
                return Err(WaitsetWaitError::Timeout);
            }
            if res < 0 {
                let err = io::Error::last_os_error();
                if err.kind() == io::ErrorKind::Interrupted {
                    continue;
                }
                return Err(WaitsetWaitError::Io(err));
            }
            break;
        }
        Ok(())
    }

    pub fn signal_event(handle: &EventHandle) {
        let payload = 1u64.to_ne_bytes();
        loop {
            // SAFETY: payload references a stack buffer with the 8-byte eventfd payload.
            let ret = unsafe { libc::write(*handle, payload.as_ptr().cast(), payload.len()) };
            if ret >= 0 {
                break;
            }

            let err = io::Error::last_os_error();
            match err.kind() {
                io::ErrorKind::Interrupted => continue,
                io::ErrorKind::WouldBlock => break,
                _ => {
                    log::debug!("[rt] waitset eventfd write failed: {}", err);
                    break;
                }
            }
        }
    }

    pub fn drain_event(handle: &EventHandle) {
        let mut payload = [0u8; 8];
        loop {
            // SAFETY: payload is a stack buffer sized to the eventfd read requirements (8 bytes).
            let ret = unsafe { libc::read(*handle, payload.as_mut_ptr().cast(), payload.len()) };
            if ret >= 0 {
                break;
            }

            let err = io::Error::last_os_error();
            match err.kind() {
                io::ErrorKind::Interrupted => continue,
                io::ErrorKind::WouldBlock => break,
                _ => {
                    log::debug!("[rt] waitset eventfd read failed: {}", err);
                    break;
                }
            }
        }
    }

    pub fn close_event(handle: &EventHandle) {
        // SAFETY: eventfd was obtained via libc::eventfd and is closed once here.
        unsafe {
            libc::close(*handle);
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_timeout_rounds_up() {
            assert_eq!(timeout_ms(None), -1);
            assert_eq!(timeout_ms(Some(Duration::ZERO)), 0);
            assert_eq!(timeout_ms(Some(Duration::from_micros(1))), 1);
            assert_eq!(timeout_ms(Some(Duration::from_millis(7))), 7);
            assert_eq!(timeout_ms(Some(Duration::from_micros(7_001))), 8);
        }
    }
}

// =============================================================================
// Portable implementation (parking_lot Mutex + Condvar)
// =============================================================================
#[cfg(not(unix))]
use portable as platform;

#[cfg(any(not(unix), test))]
mod portable {
    use std::io;
    use std::time::{Duration, Instant};

    use parking_lot::{Condvar, Mutex};

    use super::WaitsetWaitError;

    /// Latched flag standing in for an eventfd counter.
    pub struct EventHandle {
        pending: Mutex<bool>,
        ready: Condvar,
    }

    pub fn create_event() -> io::Result<EventHandle> {
        Ok(EventHandle {
            pending: Mutex::new(false),
            ready: Condvar::new(),
        })
    }

    pub fn wait_event(
        handle: &EventHandle,
        timeout: Option<Duration>,
    ) -> Result<(), WaitsetWaitError> {
        // A timeout too large for `Instant` waits without a deadline.
        let deadline = timeout.and_then(|d| Instant::now().checked_add(d));
        let mut pending = handle.pending.lock();
        while !*pending {
            match deadline {
                Some(deadline) => {
                    if handle.ready.wait_until(&mut pending, deadline).timed_out() && !*pending {
                        return Err(WaitsetWaitError::Timeout);
                    }
                }
                None => handle.ready.wait(&mut pending),
            }
        }
        Ok(())
    }

    pub fn signal_event(handle: &EventHandle) {
        *handle.pending.lock() = true;
        handle.ready.notify_all();
    }

    pub fn drain_event(handle: &EventHandle) {
        *handle.pending.lock() = false;
    }

    pub fn close_event(_handle: &EventHandle) {}

    #[cfg(test)]
    mod tests {
        use super::*;
        use std::sync::Arc;
        use std::thread;

        #[test]
        fn test_signal_latches_until_drained() {
            let event = create_event().expect("event");
            signal_event(&event);
            signal_event(&event);
            assert!(wait_event(&event, Some(Duration::ZERO)).is_ok());
            assert!(wait_event(&event, Some(Duration::ZERO)).is_ok());

            drain_event(&event);
            assert!(matches!(
                wait_event(&event, Some(Duration::ZERO)),
                Err(WaitsetWaitError::Timeout)
            ));
            close_event(&event);
        }

        #[test]
        fn test_wait_times_out_not_early() {
            let event = create_event().expect("event");
            let timeout = Duration::from_millis(20);
            let start = Instant::now();
            assert!(matches!(
                wait_event(&event, Some(timeout)),
                Err(WaitsetWaitError::Timeout)
            ));
            assert!(start.elapsed() >= timeout);
        }

        #[test]
        fn test_signal_from_other_thread_wakes_wait() {
            let event = Arc::new(create_event().expect("event"));
            let signaller = Arc::clone(&event);
            let handle = thread::spawn(move || {
                thread::sleep(Duration::from_millis(10));
                signal_event(&signaller);
            });

            assert!(wait_event(&event, None).is_ok());
            handle.join().expect("signaller");
        }
    }
}

/// Registration details returned by [`WaitsetDriver::register_slot`].
pub struct WaitsetRegistration {
    slot_index: usize,
    slot_id: u64,
    signal: Arc<SignalHandle>,
}

impl WaitsetRegistration {
    /// Erase the concrete type so callers can store `Arc<dyn WaitsetSignal>`.
    pub fn into_trait(self) -> (usize, u64, Arc<dyn WaitsetSignal>) {
        (
            self.slot_index,
            self.slot_id,
            self.signal as Arc<dyn WaitsetSignal>,
        )
    }
}

struct SignalHandle {
    inner: Weak<WaitsetDriverInner>,
    slot_index: usize,
}

impl WaitsetSignal for SignalHandle {
    fn signal(&self) {
        if let Some(inner) = self.inner.upgrade() {
            inner.signal_slot(self.slot_index);
        }
    }
}

struct SlotTable {
    entries: Vec<Option<SlotEntry>>,
    free: Vec<usize>,
    next_id: u64,
}

#[derive(Clone, Copy)]
struct SlotEntry {
    id: u64,
    position: usize,
}

impl SlotTable {
    fn new(max_slots: usize) -> Self {
        Self {
            entries: Vec::with_capacity(max_slots.min(64)),
            free: Vec::new(),
            next_id: 1,
        }
    }

    fn allocate_slot(&mut self, max_slots: usize, position: usize) -> io::Result<(usize, u64)> {
        let slot_index = if let Some(index) = self.free.pop() {
            index
        } else {
            let index = self.entries.len();
            if index >= max_slots {
                return Err(io::Error::other(format!(
                    "waitset capacity exceeded (max {})",
                    max_slots
                )));
            }
            self.entries.push(None);
            index
        };

        let slot_id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1).max(1);
        self.entries[slot_index] = Some(SlotEntry {
            id: slot_id,
            position,
        });

        Ok((slot_index, slot_id))
    }

    fn release_slot(&mut self, slot_index: usize, slot_id: u64) -> bool {
        match self.entries.get(slot_index) {
            Some(Some(entry)) if entry.id == slot_id => {
                self.entries[slot_index] = None;
                self.free.push(slot_index);
                true
            }
            _ => false,
        }
    }

    fn position(&self, slot_index: usize) -> Option<usize> {
        self.entries
            .get(slot_index)
            .and_then(|entry| entry.as_ref())
            .map(|entry| entry.position)
    }

    fn active(&self) -> usize {
        self.entries.iter().flatten().count()
    }
}
