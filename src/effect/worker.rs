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
use std::{
    sync::{
        atomic::{AtomicU8, Ordering},
        Arc, Mutex,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use crossbeam_channel::{Receiver, Sender, TrySendError};
use tracing::{debug, error};

use crate::backlight::{self, WriteOutcome};
use crate::color::Color;

use super::animation::Animation;
use super::cancel::{CancelHandle, Completion};
use super::engine::EffectError;
use super::{tick_delay, EffectKind};

const FEED_CAPACITY: usize = 16;

/// The channel observers drain for freshly computed colors. Bounded; when it
/// fills up the oldest entry is dropped, since only the latest color matters
/// to an observer.
pub(crate) struct ColorFeed {
    tx: Sender<Color>,
    rx: Receiver<Color>,
}

impl ColorFeed {
    /// Creates a feed and the receiver handed to the observer.
    pub(crate) fn new() -> (ColorFeed, Receiver<Color>) {
        let (tx, rx) = crossbeam_channel::bounded(FEED_CAPACITY);
        let feed = ColorFeed { tx, rx: rx.clone() };
        (feed, rx)
    }

    /// Publishes a color. Never blocks and never fails the caller: a full
    /// channel sheds its oldest entry, a disconnected observer is ignored.
    fn publish(&self, color: Color) {
        if let Err(TrySendError::Full(color)) = self.tx.try_send(color) {
            let _ = self.rx.try_recv();
            let _ = self.tx.try_send(color);
        }
    }
}

/// A running animation worker. Exactly one exists per engine at any time;
/// the engine's worker slot enforces that.
pub(crate) struct Worker {
    kind: EffectKind,
    cancel_handle: CancelHandle,
    completion: Completion,
    handle: JoinHandle<()>,
}

impl Worker {
    /// Spawns a worker that drives the given animation against the device
    /// until it is stopped.
    pub(crate) fn spawn(
        kind: EffectKind,
        animation: Box<dyn Animation>,
        device: Arc<dyn backlight::Device>,
        speed: Arc<AtomicU8>,
        feed: Arc<Mutex<Option<ColorFeed>>>,
    ) -> Worker {
        let cancel_handle = CancelHandle::new();
        let completion = Completion::new();

        let handle = {
            let cancel_handle = cancel_handle.clone();
            let completion = completion.clone();
            thread::spawn(move || {
                Self::run(kind, animation, device, speed, feed, cancel_handle);
                completion.signal();
            })
        };

        Worker {
            kind,
            cancel_handle,
            completion,
            handle,
        }
    }

    /// The tick loop: compute a frame, push it to the hardware, publish it
    /// to the observer, sleep until the next tick or cancellation.
    fn run(
        kind: EffectKind,
        mut animation: Box<dyn Animation>,
        device: Arc<dyn backlight::Device>,
        speed: Arc<AtomicU8>,
        feed: Arc<Mutex<Option<ColorFeed>>>,
        cancel_handle: CancelHandle,
    ) {
        debug!("{} effect worker started", kind);

        while !cancel_handle.is_cancelled() {
            let speed_delay = tick_delay(speed.load(Ordering::Relaxed));
            let frame = animation.tick(speed_delay);

            // A stop raised mid-tick means a replacement may already own the
            // device; the frame is stale and must not be written.
            if cancel_handle.is_cancelled() {
                break;
            }

            // Hardware write failures are transient (permissions, device
            // removal) and never terminate a running animation.
            if device.set_color(frame.color) == WriteOutcome::Failed {
                debug!("Dropped {} write to {}", frame.color, device);
            }

            if let Some(feed) = feed.lock().expect("Error getting lock").as_ref() {
                feed.publish(frame.color);
            }

            if cancel_handle.sleep(frame.delay) {
                break;
            }
        }

        debug!("{} effect worker finished", kind);
    }

    /// Gets the effect this worker is animating.
    pub(crate) fn kind(&self) -> EffectKind {
        self.kind
    }

    /// Stops the worker, waiting up to the given bound for it to wind down.
    /// A worker that misses the bound is abandoned and reported; it can no
    /// longer write once its current tick ends because it is cancelled.
    pub(crate) fn stop(self, timeout: Duration) -> Result<(), EffectError> {
        self.cancel_handle.cancel();

        if !self.completion.wait_timeout(timeout) {
            error!(
                "{} effect worker did not stop within {:?}, abandoning it",
                self.kind, timeout
            );
            return Err(EffectError::StopTimeout(self.kind));
        }

        // The completion fires as the worker's last action, so this join
        // returns immediately.
        if self.handle.join().is_err() {
            return Err(EffectError::WorkerPanic(self.kind));
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_full_feed_sheds_oldest_colors() {
        let (feed, receiver) = ColorFeed::new();

        // Publish past capacity without draining; each color is tagged by
        // its sequence number.
        let extra = 4;
        for i in 0..(FEED_CAPACITY + extra) {
            feed.publish(Color::new(i as u8, 0, 0));
        }

        let received: Vec<Color> = receiver.try_iter().collect();
        assert_eq!(received.len(), FEED_CAPACITY);
        for (slot, color) in received.iter().enumerate() {
            assert_eq!(color.r as usize, slot + extra, "slot {}", slot);
        }
    }

    #[test]
    fn test_publish_never_blocks_without_an_observer() {
        let (feed, receiver) = ColorFeed::new();
        drop(receiver);

        for i in 0..(FEED_CAPACITY * 2) {
            feed.publish(Color::new(i as u8, 0, 0));
        }
    }
}
