// Copyright (C) 2026 The KeyLight Authors
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

/// Represents the current cancel state.
#[derive(PartialEq)]
enum CancelState {
    Untouched,
    Cancelled,
}

/// A cancel handle is shared between the effect engine and its worker. The
/// worker sleeps on it between ticks so that cancellation interrupts the
/// inter-tick delay instead of waiting it out.
#[derive(Clone)]
pub(crate) struct CancelHandle {
    /// Set to cancelled when the worker should wind down.
    cancelled: Arc<Mutex<CancelState>>,
    /// Wakes sleeping workers on cancellation.
    condvar: Arc<Condvar>,
}

impl CancelHandle {
    /// Creates a new cancel handle.
    pub(crate) fn new() -> CancelHandle {
        CancelHandle {
            cancelled: Arc::new(Mutex::new(CancelState::Untouched)),
            condvar: Arc::new(Condvar::new()),
        }
    }

    /// Returns true if the worker has been cancelled.
    pub(crate) fn is_cancelled(&self) -> bool {
        *self.cancelled.lock().expect("Error getting lock") == CancelState::Cancelled
    }

    /// Sleeps for the given duration, waking early on cancellation. Returns
    /// true if the sleep was interrupted by a cancel.
    pub(crate) fn sleep(&self, duration: Duration) -> bool {
        let (state, _unused) = self
            .condvar
            .wait_timeout_while(
                self.cancelled.lock().expect("Error getting lock"),
                duration,
                |cancelled| *cancelled == CancelState::Untouched,
            )
            .expect("Error getting lock");
        *state == CancelState::Cancelled
    }

    /// Cancels the worker and wakes it if it is sleeping.
    pub(crate) fn cancel(&self) {
        let mut cancel_state = self.cancelled.lock().expect("Error getting lock");
        if *cancel_state == CancelState::Untouched {
            *cancel_state = CancelState::Cancelled;
            self.condvar.notify_all();
        }
    }
}

/// A one-shot latch the worker signals as its final action, letting the
/// engine wait for termination with a bound instead of an unbounded join.
#[derive(Clone)]
pub(crate) struct Completion {
    done: Arc<Mutex<bool>>,
    condvar: Arc<Condvar>,
}

impl Completion {
    /// Creates a new completion latch.
    pub(crate) fn new() -> Completion {
        Completion {
            done: Arc::new(Mutex::new(false)),
            condvar: Arc::new(Condvar::new()),
        }
    }

    /// Marks the latch as complete and wakes waiters.
    pub(crate) fn signal(&self) {
        *self.done.lock().expect("Error getting lock") = true;
        self.condvar.notify_all();
    }

    /// Waits for the latch to complete. Returns false if the timeout elapsed
    /// first.
    pub(crate) fn wait_timeout(&self, timeout: Duration) -> bool {
        let (done, _unused) = self
            .condvar
            .wait_timeout_while(
                self.done.lock().expect("Error getting lock"),
                timeout,
                |done| !*done,
            )
            .expect("Error getting lock");
        *done
    }
}
