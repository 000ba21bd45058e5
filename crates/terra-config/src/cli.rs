//! Command-line arguments.

use std::path::PathBuf;

use clap::Parser;

use crate::{Config, NightMode};

/// Headless globe tile scheduler.
///
/// CLI values override settings loaded from `config.ron`.
#[derive(Parser, Debug, Default)]
#[command(name = "terra", about = "Frustum-adaptive globe tile scheduler")]
pub struct CliArgs {
    /// Viewport width in pixels.
    #[arg(long)]
    pub width: Option<u32>,

    /// Viewport height in pixels.
    #[arg(long)]
    pub height: Option<u32>,

    /// Camera longitude in degrees.
    #[arg(long, allow_negative_numbers = true)]
    pub lon: Option<f64>,

    /// Camera latitude in degrees.
    #[arg(long, allow_negative_numbers = true)]
    pub lat: Option<f64>,

    /// Camera altitude in meters.
    #[arg(long)]
    pub altitude: Option<f64>,

    /// Number of frames to run.
    #[arg(long)]
    pub frames: Option<u64>,

    /// Log filter (error, warn, info, debug, trace or a full directive).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Built-in tile source shown by default.
    #[arg(long)]
    pub source: Option<String>,

    /// Path to config directory (overrides default location).
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Night imagery mode.
    #[arg(long, value_enum)]
    pub night: Option<NightMode>,
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(w) = args.width {
            self.viewport.width = w;
        }
        if let Some(h) = args.height {
            self.viewport.height = h;
        }
        if let Some(lon) = args.lon {
            self.camera.longitude_deg = lon;
        }
        if let Some(lat) = args.lat {
            self.camera.latitude_deg = lat;
        }
        if let Some(alt) = args.altitude {
            self.camera.altitude_m = alt;
        }
        if let Some(frames) = args.frames {
            self.debug.frames = frames;
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
        if let Some(ref source) = args.source {
            self.tiles.default_source = source.clone();
        }
        if let Some(night) = args.night {
            self.clock.night_mode = night;
        }
    }
}
