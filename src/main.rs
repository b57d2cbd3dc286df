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
mod backlight;
mod color;
mod config;
mod effect;

use std::error::Error;
use std::path::PathBuf;
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use clap::{crate_version, Parser, Subcommand};
use duration_string::DurationString;
use tracing::debug;

use crate::backlight::Device;
use crate::color::Color;
use crate::config::Config;
use crate::effect::{EffectEngine, EffectKind};

#[derive(Parser)]
#[clap(
    author = "The KeyLight Authors",
    version = crate_version!(),
    about = "A keyboard backlight controller."
)]
struct Cli {
    /// The sysfs LED directory to control, for non-default hardware.
    #[arg(long)]
    led_path: Option<PathBuf>,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Shows the current backlight state.
    Status {},
    /// Turns the backlight on.
    On {
        /// The brightness to turn on at. Defaults to the configured intent.
        #[arg(short, long)]
        brightness: Option<u32>,
    },
    /// Turns the backlight off.
    Off {},
    /// Toggles the backlight on or off.
    Toggle {},
    /// Sets the color from a hex value, e.g. #FF0000.
    Set {
        /// The color to set.
        color: String,
    },
    /// Sets the brightness.
    Brightness {
        /// The brightness value (0 up to the device maximum).
        value: u32,
    },
    /// Cycles to the next configured color.
    Cycle {},
    /// Runs an animated effect until interrupted.
    Effect {
        /// One of: rainbow, breathing, wave, strobe, candle, police.
        effect: String,
        /// The effect speed (1-100; values outside the range are clamped).
        #[arg(short, long)]
        speed: Option<u16>,
        /// The base color for breathing and strobe.
        #[arg(short, long)]
        color: Option<String>,
        /// The palette for wave as comma-separated hex colors.
        #[arg(long)]
        colors: Option<String>,
        /// How long to run, e.g. 30s or 5m. Runs until Ctrl-C when unset.
        #[arg(short, long)]
        duration: Option<String>,
    },
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let device = backlight::get_device(cli.led_path);
    let mut config = Config::load_default();

    match cli.command {
        Commands::Status {} => {
            println!("Device: {}", device);
            if !device.is_available() {
                println!("Available: no");
                return Ok(());
            }
            println!("Available: yes");
            println!(
                "Brightness: {} (max {})",
                device.brightness(),
                device.max_brightness()
            );
            println!("Color: {}", device.color_hex());
        }
        Commands::On { brightness } => {
            ensure_available(&device)?;
            let brightness = brightness.unwrap_or_else(|| config.brightness());
            check_write(device.turn_on(brightness))?;
        }
        Commands::Off {} => {
            ensure_available(&device)?;
            check_write(device.turn_off())?;
        }
        Commands::Toggle {} => {
            ensure_available(&device)?;
            let is_on = device.toggle(config.brightness());
            println!("{}", if is_on { "ON" } else { "OFF" });
        }
        Commands::Set { color } => {
            ensure_available(&device)?;
            let color: Color = color.parse()?;
            check_write(device.set_color(color))?;
            if device.brightness() == 0 {
                device.set_brightness(config.brightness());
            }
            config.set_current_color(color.to_hex());
            config.save()?;
            println!("Color set to {}", color);
        }
        Commands::Brightness { value } => {
            ensure_available(&device)?;
            check_write(device.set_brightness(value))?;
            config.set_brightness(value);
            config.save()?;
            println!("Brightness set to {}", device.brightness());
        }
        Commands::Cycle {} => {
            ensure_available(&device)?;
            let colors = config.cycle_colors();
            let idx = device.cycle_color(&colors)?;
            config.set_current_color(colors[idx].clone());
            config.save()?;
            println!("Color: {}", colors[idx]);
        }
        Commands::Effect {
            effect,
            speed,
            color,
            colors,
            duration,
        } => {
            ensure_available(&device)?;
            let kind: EffectKind = effect.parse()?;
            let color = color.map(|c| c.parse::<Color>()).transpose()?;
            let palette = colors
                .map(|list| {
                    list.split(',')
                        .map(|c| c.trim().parse::<Color>())
                        .collect::<Result<Vec<Color>, _>>()
                })
                .transpose()?;

            let engine = EffectEngine::new(device.clone());
            if let Some(speed) = speed {
                engine.set_speed(speed);
            }

            // Log the computed colors as they are written.
            let observer = engine.observe();
            thread::spawn(move || {
                for color in observer {
                    debug!("Backlight color is now {}", color);
                }
            });

            match kind {
                EffectKind::Static => return engine.start_static().map_err(Into::into),
                EffectKind::Rainbow => engine.start_rainbow()?,
                EffectKind::Breathing => engine.start_breathing(color)?,
                EffectKind::Wave => engine.start_color_wave(palette)?,
                EffectKind::Strobe => engine.start_strobe(color)?,
                EffectKind::Candle => engine.start_candle()?,
                EffectKind::Police => engine.start_police()?,
            }

            match duration {
                Some(duration) => {
                    let duration: Duration = DurationString::from_string(duration)?.into();
                    thread::sleep(duration);
                }
                None => {
                    println!("Running {} effect. Press Ctrl-C to stop.", kind);
                    let (interrupt_tx, interrupt_rx) = mpsc::channel();
                    ctrlc::set_handler(move || {
                        interrupt_tx.send(()).ok();
                    })?;
                    interrupt_rx.recv()?;
                }
            }

            engine.stop()?;
        }
    }

    Ok(())
}

/// Fails with pointers at the kernel module when the backlight is missing.
fn ensure_available(device: &Arc<dyn Device>) -> Result<(), Box<dyn Error>> {
    if device.is_available() {
        return Ok(());
    }

    eprintln!("Keyboard backlight not detected!");
    eprintln!();
    eprintln!("Make sure the tuxedo_keyboard module is loaded:");
    eprintln!("  sudo modprobe tuxedo_keyboard");
    Err("keyboard backlight not available".into())
}

/// Turns a failed hardware write into a CLI error.
fn check_write(outcome: backlight::WriteOutcome) -> Result<(), Box<dyn Error>> {
    if outcome.is_ok() {
        Ok(())
    } else {
        Err("writing to the backlight failed, even with elevation".into())
    }
}
