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
    fmt, fs,
    io::Write,
    path::{Path, PathBuf},
    process::{Command, Stdio},
};

use tracing::{debug, warn};

use crate::color::Color;

use super::WriteOutcome;

/// The sysfs directory exposed by the tuxedo_keyboard driver.
pub const DEFAULT_LED_PATH: &str = "/sys/class/leds/rgb:kbd_backlight";

const BRIGHTNESS: &str = "brightness";
const MAX_BRIGHTNESS: &str = "max_brightness";
const MULTI_INTENSITY: &str = "multi_intensity";

/// A keyboard backlight behind a sysfs LED directory. Reads and writes the
/// `brightness`, `max_brightness` and `multi_intensity` entries directly;
/// writes denied by the kernel are retried once through `pkexec tee`.
pub struct Device {
    led_path: PathBuf,
    available: bool,
}

impl Device {
    /// Gets the backlight at the default sysfs location.
    pub fn new() -> Device {
        Device::at(PathBuf::from(DEFAULT_LED_PATH))
    }

    /// Gets the backlight rooted at the given LED directory.
    pub fn at(led_path: PathBuf) -> Device {
        let available = led_path.exists();
        if !available {
            debug!("No LED directory found at {}", led_path.display());
        }
        Device {
            led_path,
            available,
        }
    }

    /// Reads a sysfs entry, returning None on any error.
    fn read_entry(&self, name: &str) -> Option<String> {
        fs::read_to_string(self.led_path.join(name))
            .ok()
            .map(|contents| contents.trim().to_string())
    }

    /// Writes a sysfs entry, falling back to the elevation helper when the
    /// direct write fails.
    fn write_entry(&self, name: &str, value: &str) -> WriteOutcome {
        let path = self.led_path.join(name);
        match fs::write(&path, value) {
            Ok(()) => WriteOutcome::Direct,
            Err(e) => {
                debug!(
                    "Direct write to {} failed ({}), retrying with elevation",
                    path.display(),
                    e
                );
                if write_elevated(&path, value) {
                    WriteOutcome::Elevated
                } else {
                    warn!("Elevated write to {} failed", path.display());
                    WriteOutcome::Failed
                }
            }
        }
    }
}

/// Performs a privileged write by piping the value into `pkexec tee`.
fn write_elevated(path: &Path, value: &str) -> bool {
    let child = Command::new("pkexec")
        .arg("tee")
        .arg(path)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn();

    let mut child = match child {
        Ok(child) => child,
        Err(_) => return false,
    };

    if let Some(stdin) = child.stdin.as_mut() {
        if stdin.write_all(value.as_bytes()).is_err() {
            return false;
        }
    }

    child
        .wait()
        .map(|status| status.success())
        .unwrap_or(false)
}

impl super::Device for Device {
    fn is_available(&self) -> bool {
        self.available
    }

    fn max_brightness(&self) -> u32 {
        self.read_entry(MAX_BRIGHTNESS)
            .and_then(|val| val.parse().ok())
            .unwrap_or(255)
    }

    fn brightness(&self) -> u32 {
        self.read_entry(BRIGHTNESS)
            .and_then(|val| val.parse().ok())
            .unwrap_or(0)
    }

    fn set_brightness(&self, value: u32) -> WriteOutcome {
        let value = value.min(self.max_brightness());
        self.write_entry(BRIGHTNESS, &value.to_string())
    }

    fn color(&self) -> Color {
        let parse = |val: String| -> Option<Color> {
            let mut parts = val.split_whitespace();
            let r = parts.next()?.parse().ok()?;
            let g = parts.next()?.parse().ok()?;
            let b = parts.next()?.parse().ok()?;
            Some(Color::new(r, g, b))
        };

        self.read_entry(MULTI_INTENSITY)
            .and_then(parse)
            .unwrap_or(Color::WHITE)
    }

    fn set_color(&self, color: Color) -> WriteOutcome {
        self.write_entry(
            MULTI_INTENSITY,
            &format!("{} {} {}", color.r, color.g, color.b),
        )
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sysfs backlight ({})", self.led_path.display())
    }
}

#[cfg(test)]
mod test {
    use std::fs;

    use tempfile::tempdir;

    use crate::backlight::{BacklightError, Device as _, WriteOutcome};
    use crate::color::Color;

    use super::Device;

    /// Creates a fake LED directory mirroring the sysfs layout.
    fn create_led_dir(max_brightness: &str) -> tempfile::TempDir {
        let dir = tempdir().expect("unable to create temp dir");
        fs::write(dir.path().join("max_brightness"), max_brightness).expect("write failed");
        fs::write(dir.path().join("brightness"), "0").expect("write failed");
        fs::write(dir.path().join("multi_intensity"), "255 255 255").expect("write failed");
        dir
    }

    #[test]
    fn test_availability_is_cached() {
        let dir = create_led_dir("255");
        let device = Device::at(dir.path().to_path_buf());
        assert!(device.is_available());

        let missing = Device::at(dir.path().join("nonexistent"));
        assert!(!missing.is_available());
    }

    #[test]
    fn test_unreadable_defaults() {
        let device = Device::at("/nonexistent/led/path".into());
        assert_eq!(device.max_brightness(), 255);
        assert_eq!(device.brightness(), 0);
        assert_eq!(device.color(), Color::WHITE);
    }

    #[test]
    fn test_brightness_is_clamped_to_device_maximum() {
        let dir = create_led_dir("100");
        let device = Device::at(dir.path().to_path_buf());

        assert_eq!(device.set_brightness(150), WriteOutcome::Direct);
        assert_eq!(device.brightness(), 100);

        assert_eq!(device.set_brightness(42), WriteOutcome::Direct);
        assert_eq!(device.brightness(), 42);
    }

    #[test]
    fn test_color_round_trip() {
        let dir = create_led_dir("255");
        let device = Device::at(dir.path().to_path_buf());

        assert_eq!(device.set_color(Color::new(10, 20, 30)), WriteOutcome::Direct);
        assert_eq!(device.color(), Color::new(10, 20, 30));
        assert_eq!(
            fs::read_to_string(dir.path().join("multi_intensity")).expect("read failed"),
            "10 20 30"
        );
    }

    #[test]
    fn test_malformed_color_reads_as_white() {
        let dir = create_led_dir("255");
        fs::write(dir.path().join("multi_intensity"), "255 junk").expect("write failed");

        let device = Device::at(dir.path().to_path_buf());
        assert_eq!(device.color(), Color::WHITE);
    }

    #[test]
    fn test_hex_round_trip_is_idempotent() {
        let dir = create_led_dir("255");
        let device = Device::at(dir.path().to_path_buf());

        assert!(device.set_color_hex("#ff8000").is_some());
        assert_eq!(device.color_hex(), "#FF8000");

        let hex = device.color_hex();
        device.set_color_hex(&hex);
        assert_eq!(device.color_hex(), hex);
    }

    #[test]
    fn test_malformed_hex_is_a_no_op() {
        let dir = create_led_dir("255");
        let device = Device::at(dir.path().to_path_buf());
        device.set_color(Color::RED);

        assert!(device.set_color_hex("not-a-color").is_none());
        assert!(device.set_color_hex("#FFF").is_none());
        assert_eq!(device.color(), Color::RED);
    }

    #[test]
    fn test_toggle_uses_caller_intent() {
        let dir = create_led_dir("255");
        let device = Device::at(dir.path().to_path_buf());

        assert!(device.toggle(180));
        assert_eq!(device.brightness(), 180);

        assert!(!device.toggle(180));
        assert_eq!(device.brightness(), 0);
    }

    #[test]
    fn test_cycle_color() {
        let dir = create_led_dir("255");
        let device = Device::at(dir.path().to_path_buf());
        let colors: Vec<String> = ["#FF0000", "#00FF00", "#0000FF"]
            .iter()
            .map(|c| c.to_string())
            .collect();

        device.set_color_hex("#FF0000");
        assert_eq!(device.cycle_color(&colors).expect("cycle failed"), 1);
        assert_eq!(device.color_hex(), "#00FF00");
        assert_eq!(device.cycle_color(&colors).expect("cycle failed"), 2);
        assert_eq!(device.cycle_color(&colors).expect("cycle failed"), 0);
        assert_eq!(device.color_hex(), "#FF0000");
    }

    #[test]
    fn test_cycle_color_unknown_current_starts_at_zero() {
        let dir = create_led_dir("255");
        let device = Device::at(dir.path().to_path_buf());
        let colors = vec!["#123456".to_string(), "#654321".to_string()];

        device.set_color(Color::WHITE);
        assert_eq!(device.cycle_color(&colors).expect("cycle failed"), 0);
        assert_eq!(device.color_hex(), "#123456");
    }

    #[test]
    fn test_cycle_color_rejects_empty_list() {
        let dir = create_led_dir("255");
        let device = Device::at(dir.path().to_path_buf());
        assert!(device.cycle_color(&[]).is_err());
    }

    #[test]
    fn test_cycle_color_rejects_malformed_entry() {
        let dir = create_led_dir("255");
        let device = Device::at(dir.path().to_path_buf());
        let colors = vec!["#FF0000".to_string(), "not-a-color".to_string()];

        device.set_color(Color::RED);
        let err = device.cycle_color(&colors).expect_err("cycle should fail");
        assert!(matches!(err, BacklightError::MalformedColor(entry) if entry == "not-a-color"));
        // The device keeps its previous color.
        assert_eq!(device.color(), Color::RED);
    }
}
