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
use std::f64::consts::PI;
use std::time::Duration;

use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::color::Color;

/// One step of an animation: the color to show and how long to hold it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Frame {
    pub color: Color,
    pub delay: Duration,
}

/// A lighting animation, advanced one frame per tick. The speed-derived
/// delay is passed in every tick so speed changes apply without a restart;
/// animations with fixed internal timing ignore it.
pub(crate) trait Animation: Send {
    fn tick(&mut self, speed_delay: Duration) -> Frame;
}

/// Cycles the hue around the HSV wheel in 2 degree steps.
pub(crate) struct Rainbow {
    hue: f64,
}

impl Rainbow {
    pub(crate) fn new() -> Rainbow {
        Rainbow { hue: 0.0 }
    }
}

impl Animation for Rainbow {
    fn tick(&mut self, speed_delay: Duration) -> Frame {
        let color = Color::from_hsv(self.hue, 1.0, 1.0);
        self.hue = (self.hue + 2.0) % 360.0;
        Frame {
            color,
            delay: speed_delay,
        }
    }
}

/// Fades a base color in and out along a sine envelope.
pub(crate) struct Breathing {
    base: Color,
    phase: f64,
}

impl Breathing {
    pub(crate) fn new(base: Color) -> Breathing {
        Breathing { base, phase: 0.0 }
    }
}

impl Animation for Breathing {
    fn tick(&mut self, speed_delay: Duration) -> Frame {
        let envelope = (self.phase.sin() + 1.0) / 2.0;
        self.phase += 0.1;
        if self.phase > 2.0 * PI {
            self.phase = 0.0;
        }
        Frame {
            color: self.base.scaled(envelope),
            delay: speed_delay,
        }
    }
}

/// Fades smoothly through a palette of colors, wrapping at the end.
pub(crate) struct Wave {
    palette: Vec<Color>,
    index: usize,
    progress: f64,
}

impl Wave {
    pub(crate) fn new(palette: Vec<Color>) -> Wave {
        debug_assert!(!palette.is_empty());
        Wave {
            palette,
            index: 0,
            progress: 0.0,
        }
    }

    /// The palette used when the caller does not supply one.
    pub(crate) fn default_palette() -> Vec<Color> {
        [
            "#FF0000", "#FF8000", "#FFFF00", "#00FF00", "#00FFFF", "#0000FF", "#8000FF", "#FF00FF",
        ]
        .iter()
        .map(|hex| Color::from_hex(hex).expect("invalid default palette"))
        .collect()
    }
}

impl Animation for Wave {
    fn tick(&mut self, speed_delay: Duration) -> Frame {
        let current = self.palette[self.index];
        let next = self.palette[(self.index + 1) % self.palette.len()];
        let color = current.lerp(next, self.progress);

        self.progress += 0.02;
        if self.progress >= 1.0 {
            self.progress = 0.0;
            self.index = (self.index + 1) % self.palette.len();
        }

        Frame {
            color,
            delay: speed_delay,
        }
    }
}

/// Alternates between a fixed color and black at twice the tick delay.
pub(crate) struct Strobe {
    color: Color,
    on: bool,
}

impl Strobe {
    pub(crate) fn new(color: Color) -> Strobe {
        Strobe { color, on: true }
    }
}

impl Animation for Strobe {
    fn tick(&mut self, speed_delay: Duration) -> Frame {
        let color = if self.on { self.color } else { Color::BLACK };
        self.on = !self.on;
        Frame {
            color,
            delay: speed_delay * 2,
        }
    }
}

/// A warm base color with random flicker. Both the flicker intensity and the
/// frame delay are randomized; the speed setting has no influence.
pub(crate) struct Candle {
    rng: StdRng,
}

const CANDLE_BASE: (f64, f64, f64) = (255.0, 147.0, 41.0);

impl Candle {
    pub(crate) fn new() -> Candle {
        Candle {
            rng: StdRng::from_entropy(),
        }
    }

    #[cfg(test)]
    pub(crate) fn with_seed(seed: u64) -> Candle {
        Candle {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Animation for Candle {
    fn tick(&mut self, _speed_delay: Duration) -> Frame {
        let flicker = self.rng.gen_range(0.7..=1.0);
        let color = Color::new(
            (CANDLE_BASE.0 * flicker) as u8,
            (CANDLE_BASE.1 * flicker) as u8,
            // The blue channel is halved to keep the flame warm.
            (CANDLE_BASE.2 * flicker * 0.5) as u8,
        );
        Frame {
            color,
            delay: Duration::from_secs_f64(self.rng.gen_range(0.05..=0.15)),
        }
    }
}

/// Red and blue flashes with fixed timing: three flashes per side, a short
/// black gap between flashes, and a longer pause when switching sides.
pub(crate) struct Police {
    side: usize,
    flashes: u8,
    lit: bool,
}

const POLICE_COLORS: [Color; 2] = [Color::RED, Color::BLUE];
const POLICE_FLASHES_PER_SIDE: u8 = 3;
const POLICE_ON: Duration = Duration::from_millis(100);
const POLICE_OFF: Duration = Duration::from_millis(50);
const POLICE_SWITCH_PAUSE: Duration = Duration::from_millis(100);

impl Police {
    pub(crate) fn new() -> Police {
        Police {
            side: 0,
            flashes: 0,
            lit: true,
        }
    }
}

impl Animation for Police {
    fn tick(&mut self, _speed_delay: Duration) -> Frame {
        if self.lit {
            self.lit = false;
            return Frame {
                color: POLICE_COLORS[self.side],
                delay: POLICE_ON,
            };
        }

        self.lit = true;
        self.flashes += 1;
        let mut delay = POLICE_OFF;
        if self.flashes >= POLICE_FLASHES_PER_SIDE {
            self.flashes = 0;
            self.side = (self.side + 1) % POLICE_COLORS.len();
            delay += POLICE_SWITCH_PAUSE;
        }
        Frame {
            color: Color::BLACK,
            delay,
        }
    }
}
