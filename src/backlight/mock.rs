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
    fmt,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
};

use crate::color::Color;

use super::WriteOutcome;

struct State {
    brightness: u32,
    color: Color,
}

/// A mock backlight. Keeps its state in memory and records every color
/// write so tests can assert on the exact sequence an effect produced.
#[derive(Clone)]
pub struct Device {
    max_brightness: u32,
    state: Arc<Mutex<State>>,
    color_writes: Arc<Mutex<Vec<Color>>>,
    deny_direct: Arc<AtomicBool>,
    deny_elevated: Arc<AtomicBool>,
}

impl Device {
    /// Gets a mock backlight with a maximum brightness of 255.
    pub fn get() -> Device {
        Device::with_max_brightness(255)
    }

    /// Gets a mock backlight with the given maximum brightness.
    pub fn with_max_brightness(max_brightness: u32) -> Device {
        Device {
            max_brightness,
            state: Arc::new(Mutex::new(State {
                brightness: 0,
                color: Color::BLACK,
            })),
            color_writes: Arc::new(Mutex::new(Vec::new())),
            deny_direct: Arc::new(AtomicBool::new(false)),
            deny_elevated: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Simulates the kernel denying direct writes. The elevation helper
    /// still succeeds unless it is denied as well.
    #[cfg(test)]
    pub fn deny_direct_writes(&self, deny: bool) {
        self.deny_direct.store(deny, Ordering::Relaxed);
    }

    /// Simulates the elevation helper failing.
    #[cfg(test)]
    pub fn deny_elevated_writes(&self, deny: bool) {
        self.deny_elevated.store(deny, Ordering::Relaxed);
    }

    /// Gets every color successfully written so far.
    #[cfg(test)]
    pub fn color_writes(&self) -> Vec<Color> {
        self.color_writes
            .lock()
            .expect("unable to get writes lock")
            .clone()
    }

    /// Records the write outcome given the current denial flags.
    fn write_outcome(&self) -> WriteOutcome {
        if !self.deny_direct.load(Ordering::Relaxed) {
            WriteOutcome::Direct
        } else if !self.deny_elevated.load(Ordering::Relaxed) {
            WriteOutcome::Elevated
        } else {
            WriteOutcome::Failed
        }
    }
}

impl super::Device for Device {
    fn is_available(&self) -> bool {
        true
    }

    fn max_brightness(&self) -> u32 {
        self.max_brightness
    }

    fn brightness(&self) -> u32 {
        self.state.lock().expect("unable to get state lock").brightness
    }

    fn set_brightness(&self, value: u32) -> WriteOutcome {
        let outcome = self.write_outcome();
        if outcome.is_ok() {
            let mut state = self.state.lock().expect("unable to get state lock");
            state.brightness = value.min(self.max_brightness);
        }
        outcome
    }

    fn color(&self) -> Color {
        self.state.lock().expect("unable to get state lock").color
    }

    fn set_color(&self, color: Color) -> WriteOutcome {
        let outcome = self.write_outcome();
        if outcome.is_ok() {
            self.state.lock().expect("unable to get state lock").color = color;
            self.color_writes
                .lock()
                .expect("unable to get writes lock")
                .push(color);
        }
        outcome
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "mock backlight")
    }
}

#[cfg(test)]
mod test {
    use crate::backlight::{BacklightError, Device as _, WriteOutcome};
    use crate::color::Color;

    use super::Device;

    #[test]
    fn test_brightness_clamp_round_trip() {
        let device = Device::with_max_brightness(200);

        assert_eq!(device.set_brightness(500), WriteOutcome::Direct);
        assert_eq!(device.brightness(), 200);

        device.set_brightness(0);
        assert_eq!(device.brightness(), 0);
    }

    #[test]
    fn test_failed_writes_leave_state_untouched() {
        let device = Device::get();
        device.set_color(Color::RED);

        device.deny_direct_writes(true);
        device.deny_elevated_writes(true);
        assert_eq!(device.set_color(Color::BLUE), WriteOutcome::Failed);
        assert_eq!(device.set_brightness(100), WriteOutcome::Failed);

        // Reads still reflect the last successful write.
        assert_eq!(device.color(), Color::RED);
        assert_eq!(device.brightness(), 0);
        assert_eq!(device.color_writes(), vec![Color::RED]);
    }

    #[test]
    fn test_cycle_color_surfaces_failed_writes() {
        let device = Device::get();
        let colors = vec!["#FF0000".to_string(), "#00FF00".to_string()];

        device.deny_direct_writes(true);
        device.deny_elevated_writes(true);
        let err = device.cycle_color(&colors).expect_err("cycle should fail");
        assert!(matches!(err, BacklightError::WriteFailed(entry) if entry == "#FF0000"));
        assert!(device.color_writes().is_empty());
    }

    #[test]
    fn test_elevated_writes_are_distinguished() {
        let device = Device::get();
        device.deny_direct_writes(true);

        assert_eq!(device.set_color(Color::BLUE), WriteOutcome::Elevated);
        assert_eq!(device.color(), Color::BLUE);
    }
}
