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
use std::{fmt, path::PathBuf, sync::Arc};

use crate::color::Color;

mod mock;
mod sysfs;

/// Errors from the convenience operations layered on a backlight device.
#[derive(Debug, thiserror::Error)]
pub enum BacklightError {
    #[error("Cannot cycle through an empty color list")]
    EmptyColorList,
    #[error("Color list entry '{0}' is not a hex color")]
    MalformedColor(String),
    #[error("The write of {0} failed, even with elevation")]
    WriteFailed(String),
}

/// The outcome of a backlight write. Writes that are denied by the kernel
/// are retried once through a privilege elevation helper; callers that care
/// about diagnostics can distinguish the two success paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The write went straight through.
    Direct,
    /// The direct write failed and the elevation helper succeeded.
    Elevated,
    /// Both the direct write and the elevation helper failed. Hardware state
    /// is unchanged.
    Failed,
}

impl WriteOutcome {
    /// Returns true if the write reached the hardware.
    pub fn is_ok(self) -> bool {
        self != WriteOutcome::Failed
    }
}

/// A keyboard backlight device exposing a single RGB zone and a brightness
/// scalar.
pub trait Device: fmt::Display + Send + Sync {
    /// Returns true if the device was present when this handle was created.
    /// Availability is probed once and cached; it is never re-checked.
    fn is_available(&self) -> bool;

    /// Gets the device-reported maximum brightness. Returns 255 if the value
    /// cannot be read.
    fn max_brightness(&self) -> u32;

    /// Gets the current brightness. Returns 0 if the value cannot be read.
    fn brightness(&self) -> u32;

    /// Sets the brightness, clamped to [0, max_brightness()].
    fn set_brightness(&self, value: u32) -> WriteOutcome;

    /// Gets the current color. Returns white if the value cannot be read or
    /// is malformed.
    fn color(&self) -> Color;

    /// Sets the color.
    fn set_color(&self, color: Color) -> WriteOutcome;

    /// Gets the current color as an uppercase `#RRGGBB` string.
    fn color_hex(&self) -> String {
        self.color().to_hex()
    }

    /// Sets the color from a hex string. Malformed input performs no write
    /// and returns None.
    fn set_color_hex(&self, hex: &str) -> Option<WriteOutcome> {
        match Color::from_hex(hex) {
            Ok(color) => Some(self.set_color(color)),
            Err(_) => None,
        }
    }

    /// Turns the backlight on at the given brightness.
    fn turn_on(&self, brightness: u32) -> WriteOutcome {
        self.set_brightness(brightness)
    }

    /// Turns the backlight off.
    fn turn_off(&self) -> WriteOutcome {
        self.set_brightness(0)
    }

    /// Toggles the backlight on or off and returns the new state. The
    /// brightness used when turning on is the caller's last known intent;
    /// there is deliberately no default so every call site states its policy.
    fn toggle(&self, on_brightness: u32) -> bool {
        if self.brightness() > 0 {
            self.turn_off();
            false
        } else {
            self.turn_on(on_brightness);
            true
        }
    }

    /// Advances the device color to the next entry of the given list and
    /// returns the new index. Matching of the current color is case and `#`
    /// insensitive; a current color that is not in the list is treated as
    /// sitting before index 0. A malformed list entry or a failed write is
    /// an error; the device keeps its previous color.
    fn cycle_color(&self, colors: &[String]) -> Result<usize, BacklightError> {
        if colors.is_empty() {
            return Err(BacklightError::EmptyColorList);
        }

        let current = self.color_hex();
        let current = current.trim_start_matches('#');
        let next_idx = colors
            .iter()
            .position(|c| c.trim_start_matches('#').eq_ignore_ascii_case(current))
            .map_or(0, |idx| (idx + 1) % colors.len());

        match self.set_color_hex(&colors[next_idx]) {
            Some(outcome) if outcome.is_ok() => Ok(next_idx),
            Some(_) => Err(BacklightError::WriteFailed(colors[next_idx].clone())),
            None => Err(BacklightError::MalformedColor(colors[next_idx].clone())),
        }
    }
}

/// Gets a backlight device. The string `"mock"` yields an in-memory device,
/// any other path a sysfs device rooted there, and no path the default
/// sysfs LED location.
pub fn get_device(led_path: Option<PathBuf>) -> Arc<dyn Device> {
    match led_path {
        Some(path) if path.as_os_str() == "mock" => Arc::new(mock::Device::get()),
        Some(path) => Arc::new(sysfs::Device::at(path)),
        None => Arc::new(sysfs::Device::new()),
    }
}
