//! Configuration for the globe viewer.
//!
//! Settings persist to disk as a RON file and can be overridden from the
//! command line. Every section falls back to its defaults when missing, so
//! older files keep loading.

mod cli;
mod config;
mod error;

pub use cli::CliArgs;
pub use config::{
    CONFIG_FILE, CameraConfig, ClockConfig, Config, DebugConfig, LoaderConfig, LoaderKind,
    LodConfig, LodMode, NightMode, SourceConfig, TilesConfig, ViewportConfig,
};
pub use error::ConfigError;
