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
    time::Duration,
};

use crossbeam_channel::Receiver;
use tracing::{error, info};

use crate::backlight;
use crate::color::Color;

use super::animation::{Breathing, Candle, Police, Rainbow, Strobe, Wave};
use super::worker::{ColorFeed, Worker};
use super::{clamp_speed, EffectKind};

/// The default speed percentage.
pub const DEFAULT_SPEED: u8 = 50;

/// How long a stop waits for the worker before abandoning it.
const STOP_TIMEOUT: Duration = Duration::from_secs(1);

/// Errors from effect lifecycle transitions.
#[derive(Debug, thiserror::Error)]
pub enum EffectError {
    #[error("The {0} effect worker did not stop within the allowed bound")]
    StopTimeout(EffectKind),
    #[error("The {0} effect worker panicked")]
    WorkerPanic(EffectKind),
}

/// Runs at most one animation at a time against a backlight device. Starting
/// an effect stops and joins the previous worker before the new one spawns,
/// so writes from two effects never interleave.
pub struct EffectEngine {
    device: Arc<dyn backlight::Device>,
    speed: Arc<AtomicU8>,
    /// The single worker slot. Held across stop-join-spawn so concurrent
    /// starts serialize on the transition.
    worker: Mutex<Option<Worker>>,
    feed: Arc<Mutex<Option<ColorFeed>>>,
}

impl EffectEngine {
    /// Creates a new engine over the given device.
    pub fn new(device: Arc<dyn backlight::Device>) -> EffectEngine {
        EffectEngine {
            device,
            speed: Arc::new(AtomicU8::new(DEFAULT_SPEED)),
            worker: Mutex::new(None),
            feed: Arc::new(Mutex::new(None)),
        }
    }

    /// Starts the rainbow effect: a full cycle around the HSV hue wheel.
    pub fn start_rainbow(&self) -> Result<(), EffectError> {
        self.start(EffectKind::Rainbow, Box::new(Rainbow::new()))
    }

    /// Starts the breathing effect. Without an explicit color the device's
    /// current color is the base.
    pub fn start_breathing(&self, color: Option<Color>) -> Result<(), EffectError> {
        let base = color.unwrap_or_else(|| self.device.color());
        self.start(EffectKind::Breathing, Box::new(Breathing::new(base)))
    }

    /// Starts the color wave effect over the given palette, or a default
    /// rainbow palette when none is supplied.
    pub fn start_color_wave(&self, colors: Option<Vec<Color>>) -> Result<(), EffectError> {
        let palette = colors
            .filter(|colors| !colors.is_empty())
            .unwrap_or_else(Wave::default_palette);
        self.start(EffectKind::Wave, Box::new(Wave::new(palette)))
    }

    /// Starts the strobe effect. Without an explicit color the device's
    /// current color is flashed.
    pub fn start_strobe(&self, color: Option<Color>) -> Result<(), EffectError> {
        let base = color.unwrap_or_else(|| self.device.color());
        self.start(EffectKind::Strobe, Box::new(Strobe::new(base)))
    }

    /// Starts the candle flicker effect.
    pub fn start_candle(&self) -> Result<(), EffectError> {
        self.start(EffectKind::Candle, Box::new(Candle::new()))
    }

    /// Starts the police lights effect.
    pub fn start_police(&self) -> Result<(), EffectError> {
        self.start(EffectKind::Police, Box::new(Police::new()))
    }

    /// Equivalent to [`stop`](Self::stop): halts any animation and leaves
    /// the last written color in place.
    pub fn start_static(&self) -> Result<(), EffectError> {
        self.stop()
    }

    /// Stops the running effect, if any. Returns promptly from idle.
    pub fn stop(&self) -> Result<(), EffectError> {
        let mut worker = self.worker.lock().expect("Error getting lock");
        Self::stop_worker(&mut worker)
    }

    /// Sets the speed percentage, clamped into [1, 100]. Takes effect on the
    /// running worker's next tick; no restart.
    pub fn set_speed(&self, percent: u16) {
        self.speed.store(clamp_speed(percent), Ordering::Relaxed);
    }

    /// Gets the current speed percentage.
    pub fn speed(&self) -> u8 {
        self.speed.load(Ordering::Relaxed)
    }

    /// Returns true if an animation worker is running.
    pub fn is_running(&self) -> bool {
        self.worker.lock().expect("Error getting lock").is_some()
    }

    /// Gets the running effect, or `Static` when idle.
    pub fn current_effect(&self) -> EffectKind {
        self.worker
            .lock()
            .expect("Error getting lock")
            .as_ref()
            .map_or(EffectKind::Static, Worker::kind)
    }

    /// Registers the observer for computed colors, replacing any prior one.
    /// The previous receiver disconnects once its sender is dropped.
    pub fn observe(&self) -> Receiver<Color> {
        let (feed, receiver) = ColorFeed::new();
        *self.feed.lock().expect("Error getting lock") = Some(feed);
        receiver
    }

    fn start(
        &self,
        kind: EffectKind,
        animation: Box<dyn super::animation::Animation>,
    ) -> Result<(), EffectError> {
        let mut worker = self.worker.lock().expect("Error getting lock");
        Self::stop_worker(&mut worker)?;

        info!("Starting {} effect", kind);
        *worker = Some(Worker::spawn(
            kind,
            animation,
            self.device.clone(),
            self.speed.clone(),
            self.feed.clone(),
        ));
        Ok(())
    }

    /// Stops and joins the worker in the slot. The slot is cleared even on a
    /// stop timeout so a subsequent start is not blocked by a wedged worker.
    fn stop_worker(slot: &mut Option<Worker>) -> Result<(), EffectError> {
        match slot.take() {
            Some(worker) => {
                info!("Stopping {} effect", worker.kind());
                worker.stop(STOP_TIMEOUT)
            }
            None => Ok(()),
        }
    }
}

impl Drop for EffectEngine {
    fn drop(&mut self) {
        let mut worker = self.worker.lock().expect("Error getting lock");
        if let Err(e) = Self::stop_worker(&mut worker) {
            error!("Error stopping effect worker during teardown: {}", e);
        }
    }
}

#[cfg(test)]
mod test {
    use std::thread;
    use std::time::Instant;

    use super::super::animation::{Animation, Frame};
    use super::*;
    use crate::backlight::{test::Device as MockDevice, Device as _};

    fn engine_over_mock() -> (EffectEngine, MockDevice) {
        let device = MockDevice::get();
        let engine = EffectEngine::new(Arc::new(device.clone()));
        engine.set_speed(100);
        (engine, device)
    }

    #[test]
    fn test_stop_from_idle_is_a_fast_noop() {
        let (engine, _device) = engine_over_mock();

        let start = Instant::now();
        engine.stop().expect("stop failed");
        assert!(start.elapsed() < Duration::from_millis(100));
        assert!(!engine.is_running());
        assert_eq!(engine.current_effect(), EffectKind::Static);
    }

    #[test]
    fn test_speed_is_clamped_and_never_errors() {
        let (engine, _device) = engine_over_mock();

        engine.set_speed(0);
        assert_eq!(engine.speed(), 1);
        engine.set_speed(255);
        assert_eq!(engine.speed(), 100);
        engine.set_speed(500);
        assert_eq!(engine.speed(), 100);
        engine.set_speed(50);
        assert_eq!(engine.speed(), 50);
    }

    #[test]
    fn test_current_effect_tracks_lifecycle() {
        let (engine, _device) = engine_over_mock();

        engine.start_candle().expect("start failed");
        assert!(engine.is_running());
        assert_eq!(engine.current_effect(), EffectKind::Candle);

        engine.stop().expect("stop failed");
        assert!(!engine.is_running());
        assert_eq!(engine.current_effect(), EffectKind::Static);
    }

    #[test]
    fn test_start_replaces_running_effect() {
        let (engine, _device) = engine_over_mock();

        engine.start_rainbow().expect("start failed");
        engine.start_police().expect("start failed");
        assert_eq!(engine.current_effect(), EffectKind::Police);

        engine.stop().expect("stop failed");
    }

    #[test]
    fn test_replacement_leaves_no_stale_writes() {
        let (engine, device) = engine_over_mock();

        engine.start_rainbow().expect("start failed");
        thread::sleep(Duration::from_millis(50));

        // Once the strobe starts the rainbow worker is fully joined, so
        // everything written from here on is the strobe's white/black.
        engine
            .start_strobe(Some(Color::WHITE))
            .expect("start failed");
        let mark = device.color_writes().len();
        thread::sleep(Duration::from_millis(100));
        engine.stop().expect("stop failed");

        let writes = device.color_writes();
        assert!(writes.len() > mark, "expected strobe writes");
        for color in &writes[mark..] {
            assert!(
                *color == Color::WHITE || *color == Color::BLACK,
                "stale write {:?} observed after replacement",
                color
            );
        }
    }

    #[test]
    fn test_no_writes_after_stop() {
        let (engine, device) = engine_over_mock();

        engine.start_rainbow().expect("start failed");
        thread::sleep(Duration::from_millis(50));
        engine.stop().expect("stop failed");

        let writes_at_stop = device.color_writes().len();
        thread::sleep(Duration::from_millis(100));
        assert_eq!(device.color_writes().len(), writes_at_stop);
    }

    #[test]
    fn test_rainbow_traces_hue_in_two_degree_steps() {
        let (engine, device) = engine_over_mock();

        engine.start_rainbow().expect("start failed");
        thread::sleep(Duration::from_millis(80));
        engine.stop().expect("stop failed");

        let writes = device.color_writes();
        assert!(writes.len() >= 2, "expected several rainbow frames");
        for (i, color) in writes.iter().enumerate() {
            let expected = Color::from_hsv((i as f64) * 2.0, 1.0, 1.0);
            assert_eq!(*color, expected, "frame {}", i);
        }
        for pair in writes.windows(2) {
            assert_ne!(pair[0], pair[1], "duplicate consecutive rainbow frames");
        }
    }

    #[test]
    fn test_breathing_captures_device_color_at_start() {
        let (engine, device) = engine_over_mock();
        device.set_color(Color::RED);

        engine.start_breathing(None).expect("start failed");
        thread::sleep(Duration::from_millis(50));
        engine.stop().expect("stop failed");

        // The first frame is the captured base at the phase-zero envelope.
        let writes = device.color_writes();
        assert_eq!(writes[1], Color::RED.scaled(0.5));
    }

    #[test]
    fn test_effect_survives_failed_writes() {
        let (engine, device) = engine_over_mock();
        device.deny_direct_writes(true);
        device.deny_elevated_writes(true);

        engine.start_rainbow().expect("start failed");
        thread::sleep(Duration::from_millis(50));
        assert!(engine.is_running());
        assert!(device.color_writes().is_empty());

        engine.stop().expect("stop failed");
    }

    #[test]
    fn test_observer_receives_computed_colors() {
        let (engine, _device) = engine_over_mock();
        let receiver = engine.observe();

        engine.start_strobe(Some(Color::RED)).expect("start failed");
        let first = receiver
            .recv_timeout(Duration::from_secs(1))
            .expect("no color received");
        assert_eq!(first, Color::RED);

        engine.stop().expect("stop failed");
    }

    #[test]
    fn test_observe_replaces_prior_observer() {
        let (engine, _device) = engine_over_mock();

        let old = engine.observe();
        let new = engine.observe();

        engine.start_strobe(Some(Color::RED)).expect("start failed");
        assert!(new.recv_timeout(Duration::from_secs(1)).is_ok());
        // The old receiver's sender was dropped on replacement.
        assert!(old.recv_timeout(Duration::from_millis(100)).is_err());

        engine.stop().expect("stop failed");
    }

    #[test]
    fn test_stop_abandons_a_wedged_worker() {
        // A tick that outlasts the stop bound, pinning the worker thread.
        struct Stall;

        impl Animation for Stall {
            fn tick(&mut self, _speed_delay: Duration) -> Frame {
                thread::sleep(STOP_TIMEOUT + Duration::from_millis(300));
                Frame {
                    color: Color::RED,
                    delay: Duration::from_millis(1),
                }
            }
        }

        let (engine, device) = engine_over_mock();
        engine
            .start(EffectKind::Candle, Box::new(Stall))
            .expect("start failed");
        thread::sleep(Duration::from_millis(50));

        let begin = Instant::now();
        let err = engine.stop().expect_err("stop should have timed out");
        assert!(matches!(err, EffectError::StopTimeout(EffectKind::Candle)));
        assert!(begin.elapsed() < STOP_TIMEOUT + Duration::from_millis(200));

        // The slot is cleared despite the timeout, so a replacement starts.
        assert!(!engine.is_running());
        engine
            .start_strobe(Some(Color::WHITE))
            .expect("start failed");
        assert_eq!(engine.current_effect(), EffectKind::Strobe);
        engine.stop().expect("stop failed");

        // Once the stalled tick returns the abandoned worker sees the
        // cancellation and drops its frame; no red ever reaches the device.
        thread::sleep(STOP_TIMEOUT + Duration::from_millis(500));
        assert!(!device.color_writes().contains(&Color::RED));
    }

    #[test]
    fn test_drop_stops_the_worker() {
        let device = MockDevice::get();
        {
            let engine = EffectEngine::new(Arc::new(device.clone()));
            engine.set_speed(100);
            engine.start_rainbow().expect("start failed");
            thread::sleep(Duration::from_millis(30));
        }

        let writes_at_drop = device.color_writes().len();
        thread::sleep(Duration::from_millis(100));
        assert_eq!(device.color_writes().len(), writes_at_drop);
    }
}
