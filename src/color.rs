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
use std::fmt;
use std::str::FromStr;

/// An error parsing a color from its hex representation.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ParseColorError {
    #[error("Expected 6 hex digits, got {0:?}")]
    Length(String),
    #[error("Invalid hex digits: {0}")]
    Digits(#[from] std::num::ParseIntError),
}

/// An RGB color as understood by the backlight hardware.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Color = Color { r: 0, g: 0, b: 0 };
    pub const WHITE: Color = Color {
        r: 255,
        g: 255,
        b: 255,
    };
    pub const RED: Color = Color { r: 255, g: 0, b: 0 };
    pub const BLUE: Color = Color { r: 0, g: 0, b: 255 };

    /// Creates a new color from its channel values.
    pub fn new(r: u8, g: u8, b: u8) -> Color {
        Color { r, g, b }
    }

    /// Parses a color from a hex string such as `#FF0000` or `ff0000`. The
    /// leading `#` is optional; anything other than 6 hex digits is an error.
    pub fn from_hex(hex: &str) -> Result<Color, ParseColorError> {
        let hex = hex.trim_start_matches('#');
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(ParseColorError::Length(hex.to_string()));
        }

        let r = u8::from_str_radix(&hex[0..2], 16)?;
        let g = u8::from_str_radix(&hex[2..4], 16)?;
        let b = u8::from_str_radix(&hex[4..6], 16)?;

        Ok(Color { r, g, b })
    }

    /// Formats the color as an uppercase `#RRGGBB` hex string.
    pub fn to_hex(self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }

    /// Converts an HSV value to a color. The hue is in degrees and is
    /// normalized into [0, 360); saturation and value are in [0, 1].
    pub fn from_hsv(h: f64, s: f64, v: f64) -> Color {
        let h = h.rem_euclid(360.0);
        let c = v * s;
        let x = c * (1.0 - ((h / 60.0) % 2.0 - 1.0).abs());
        let m = v - c;

        let (r, g, b) = match h {
            h if h < 60.0 => (c, x, 0.0),
            h if h < 120.0 => (x, c, 0.0),
            h if h < 180.0 => (0.0, c, x),
            h if h < 240.0 => (0.0, x, c),
            h if h < 300.0 => (x, 0.0, c),
            _ => (c, 0.0, x),
        };

        Color {
            r: ((r + m) * 255.0) as u8,
            g: ((g + m) * 255.0) as u8,
            b: ((b + m) * 255.0) as u8,
        }
    }

    /// Linearly interpolates between this color and another. A `t` of 0.0
    /// yields this color, 1.0 yields the other.
    pub fn lerp(self, other: Color, t: f64) -> Color {
        let channel = |a: u8, b: u8| -> u8 {
            (f64::from(a) + (f64::from(b) - f64::from(a)) * t.clamp(0.0, 1.0)) as u8
        };

        Color {
            r: channel(self.r, other.r),
            g: channel(self.g, other.g),
            b: channel(self.b, other.b),
        }
    }

    /// Scales every channel by the given factor, saturating at the channel
    /// bounds.
    pub fn scaled(self, factor: f64) -> Color {
        let channel = |v: u8| -> u8 { (f64::from(v) * factor).clamp(0.0, 255.0) as u8 };

        Color {
            r: channel(self.r),
            g: channel(self.g),
            b: channel(self.b),
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl FromStr for Color {
    type Err = ParseColorError;

    fn from_str(s: &str) -> Result<Color, ParseColorError> {
        Color::from_hex(s)
    }
}
