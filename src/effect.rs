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
use std::{fmt, str::FromStr, time::Duration};

mod animation;
mod cancel;
mod engine;
mod worker;

pub use engine::{EffectEngine, EffectError};

/// The animations the engine can run. `Static` is the idle state: no worker
/// is running and the backlight keeps whatever was last written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectKind {
    Static,
    Rainbow,
    Breathing,
    Wave,
    Strobe,
    Candle,
    Police,
}

impl fmt::Display for EffectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EffectKind::Static => "static",
            EffectKind::Rainbow => "rainbow",
            EffectKind::Breathing => "breathing",
            EffectKind::Wave => "wave",
            EffectKind::Strobe => "strobe",
            EffectKind::Candle => "candle",
            EffectKind::Police => "police",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for EffectKind {
    type Err = String;

    fn from_str(s: &str) -> Result<EffectKind, String> {
        match s.to_lowercase().as_str() {
            "static" => Ok(EffectKind::Static),
            "rainbow" => Ok(EffectKind::Rainbow),
            "breathing" => Ok(EffectKind::Breathing),
            "wave" => Ok(EffectKind::Wave),
            "strobe" => Ok(EffectKind::Strobe),
            "candle" => Ok(EffectKind::Candle),
            "police" => Ok(EffectKind::Police),
            other => Err(format!("unknown effect '{}'", other)),
        }
    }
}

/// Maps a speed percentage to the inter-tick delay of the rate-driven
/// effects: 0.2s at speed 1 down to 0.01s at speed 100.
pub(crate) fn tick_delay(speed: u8) -> Duration {
    Duration::from_secs_f64(0.2 - (f64::from(speed) / 100.0) * 0.19)
}

/// Clamps a speed percentage into [1, 100]. Takes a wide integer so
/// out-of-range requests clamp instead of failing to parse.
pub(crate) fn clamp_speed(speed: u16) -> u8 {
    speed.clamp(1, 100) as u8
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_tick_delay_bounds() {
        let fast = tick_delay(100);
        assert!(fast >= Duration::from_millis(9) && fast <= Duration::from_millis(11));
        // Speed 1 is just under the 0.2s ceiling.
        let slow = tick_delay(1);
        assert!(slow > Duration::from_millis(195) && slow <= Duration::from_millis(200));
        assert!(tick_delay(50) < tick_delay(10));
    }

    #[test]
    fn test_clamp_speed() {
        assert_eq!(clamp_speed(0), 1);
        assert_eq!(clamp_speed(50), 50);
        assert_eq!(clamp_speed(200), 100);
        assert_eq!(clamp_speed(500), 100);
    }

    #[test]
    fn test_effect_kind_round_trips_through_display() {
        for kind in [
            EffectKind::Static,
            EffectKind::Rainbow,
            EffectKind::Breathing,
            EffectKind::Wave,
            EffectKind::Strobe,
            EffectKind::Candle,
            EffectKind::Police,
        ] {
            assert_eq!(kind.to_string().parse::<EffectKind>(), Ok(kind));
        }
    }
}
