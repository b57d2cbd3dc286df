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
use std::{fs, path::PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

/// The default brightness intent used when turning the backlight on.
pub const DEFAULT_BRIGHTNESS: u32 = 255;
pub const DEFAULT_CURRENT_COLOR: &str = "#FFFFFF";

const DEFAULT_FAVORITE_COLORS: [&str; 10] = [
    "#FFFFFF", "#FF0000", "#00FF00", "#0000FF", "#FFFF00", "#FF00FF", "#00FFFF", "#FF8000",
    "#8000FF", "#00FF80",
];

const DEFAULT_CYCLE_COLORS: [&str; 7] = [
    "#FFFFFF", "#FF0000", "#00FF00", "#0000FF", "#FFFF00", "#FF00FF", "#00FFFF",
];

/// Typed error for config persistence failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Config serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// A JSON representation of the persisted user preferences. Every field is
/// optional; getters merge in the defaults, so a partial or missing file
/// behaves like the default configuration.
#[derive(Serialize, Deserialize, Clone, Default)]
pub struct Config {
    /// The last brightness intent, restored when toggling on.
    brightness: Option<u32>,

    /// The last explicitly chosen color.
    current_color: Option<String>,

    /// Colors offered as favorites.
    favorite_colors: Option<Vec<String>>,

    /// The colors the cycle shortcut steps through.
    cycle_colors: Option<Vec<String>>,

    #[serde(skip)]
    path: Option<PathBuf>,
}

impl Config {
    /// Loads the configuration at the default location
    /// (`~/.config/keylight/config.json`).
    pub fn load_default() -> Config {
        match dirs::config_dir() {
            Some(dir) => Config::load(dir.join("keylight").join("config.json")),
            None => Config::default(),
        }
    }

    /// Loads the configuration at the given path. A missing or unparseable
    /// file falls back to the defaults rather than failing the caller.
    pub fn load(path: PathBuf) -> Config {
        let mut config = match fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|e| {
                warn!("Ignoring malformed config {}: {}", path.display(), e);
                Config::default()
            }),
            Err(_) => Config::default(),
        };
        config.path = Some(path);
        config
    }

    /// Saves the configuration back to where it was loaded from, creating
    /// parent directories as needed.
    pub fn save(&self) -> Result<(), ConfigError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Gets the brightness intent.
    pub fn brightness(&self) -> u32 {
        self.brightness.unwrap_or(DEFAULT_BRIGHTNESS)
    }

    /// Sets the brightness intent.
    pub fn set_brightness(&mut self, brightness: u32) {
        self.brightness = Some(brightness);
    }

    /// Gets the last chosen color.
    pub fn current_color(&self) -> String {
        self.current_color
            .clone()
            .unwrap_or_else(|| DEFAULT_CURRENT_COLOR.to_string())
    }

    /// Sets the last chosen color.
    pub fn set_current_color(&mut self, color: String) {
        self.current_color = Some(color);
    }

    /// Gets the favorite colors.
    pub fn favorite_colors(&self) -> Vec<String> {
        self.favorite_colors
            .clone()
            .unwrap_or_else(|| default_list(&DEFAULT_FAVORITE_COLORS))
    }

    /// Adds a color to the favorites if it is not already present.
    pub fn add_favorite_color(&mut self, color: &str) {
        let mut colors = self.favorite_colors();
        if !colors.iter().any(|c| c.eq_ignore_ascii_case(color)) {
            colors.push(color.to_string());
            self.favorite_colors = Some(colors);
        }
    }

    /// Removes a color from the favorites.
    pub fn remove_favorite_color(&mut self, color: &str) {
        let mut colors = self.favorite_colors();
        colors.retain(|c| !c.eq_ignore_ascii_case(color));
        self.favorite_colors = Some(colors);
    }

    /// Gets the colors the cycle operation steps through.
    pub fn cycle_colors(&self) -> Vec<String> {
        self.cycle_colors
            .clone()
            .unwrap_or_else(|| default_list(&DEFAULT_CYCLE_COLORS))
    }
}

fn default_list(colors: &[&str]) -> Vec<String> {
    colors.iter().map(|c| c.to_string()).collect()
}
