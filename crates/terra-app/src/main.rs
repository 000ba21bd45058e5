//! Headless globe run.
//!
//! Configuration is loaded from `config.ron` and can be overridden via CLI
//! flags, e.g. `terra --altitude 20000 --frames 300 --night auto`.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use terra_app::{FIXED_DT, FrameLoop, GlobeSession, HeadlessRenderer, RunSummary};
use terra_config::{CliArgs, Config};
use tracing::{error, info};

fn main() -> ExitCode {
    let args = CliArgs::parse();

    let config_dir = args
        .config
        .clone()
        .or_else(Config::default_dir)
        .unwrap_or_else(|| PathBuf::from(".terra"));

    let mut config = Config::load_or_create(&config_dir).unwrap_or_else(|e| {
        eprintln!("Failed to load config: {e}, using defaults");
        Config::default()
    });
    config.apply_cli_overrides(&args);

    let log_dir = config
        .debug
        .log_dir
        .clone()
        .unwrap_or_else(|| config_dir.join("logs"));
    terra_log::init_logging(Some(&log_dir), cfg!(debug_assertions), Some(&config));

    let mut session = match GlobeSession::from_config(&config) {
        Ok(session) => session,
        Err(e) => {
            error!("cannot start globe: {e}");
            return ExitCode::FAILURE;
        }
    };
    info!(
        lon = config.camera.longitude_deg,
        lat = config.camera.latitude_deg,
        altitude = config.camera.altitude_m,
        providers = session.tiles().len(),
        frames = config.debug.frames,
        "globe ready"
    );

    let mut renderer = HeadlessRenderer::new();
    let mut frame_loop = FrameLoop::new();
    let mut summary = RunSummary::default();
    for _ in 0..config.debug.frames {
        frame_loop.advance(FIXED_DT, |dt, _| session.step(dt * 1000.0));
        renderer.begin_frame();
        summary.record(&session.render(&mut renderer));
    }

    info!(
        frames = summary.frames,
        skipped = summary.skipped,
        mean_tiles = %format!("{:.1}", summary.mean_tiles()),
        peak_tiles = summary.peak_tiles,
        fallbacks = summary.fallbacks,
        failed = summary.failed,
        pending = summary.pending,
        live_buffers = renderer.live_buffers(),
        live_textures = renderer.live_textures(),
        sim_seconds = frame_loop.total_sim_time(),
        "run finished"
    );
    ExitCode::SUCCESS
}
