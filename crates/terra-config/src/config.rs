//! Configuration sections, their defaults and RON persistence.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// File name inside the config directory.
pub const CONFIG_FILE: &str = "config.ron";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub viewport: ViewportConfig,
    /// Where the camera starts.
    pub camera: CameraConfig,
    /// Level-of-detail tuning.
    pub lod: LodConfig,
    pub tiles: TilesConfig,
    pub loader: LoaderConfig,
    /// Simulated time and night mode.
    pub clock: ClockConfig,
    pub debug: DebugConfig,
}

/// Drawing surface size.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ViewportConfig {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

/// Initial camera, looking at the earth center from above a point.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CameraConfig {
    pub longitude_deg: f64,
    pub latitude_deg: f64,
    /// Height above the ellipsoid in meters.
    pub altitude_m: f64,
    /// Vertical field of view in degrees.
    pub fovy_deg: f64,
    pub near: f64,
    pub far: f64,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            longitude_deg: 118.778869,
            latitude_deg: 32.043823,
            altitude_m: 1.0e7,
            fovy_deg: 60.0,
            near: 10.0,
            far: 1.0e8,
        }
    }
}

/// Traversal strategy.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum LodMode {
    /// Stop refining where tiles are already at native resolution.
    #[default]
    Dynamic,
    /// Always refine down to the target level.
    Fixed,
}

/// Level-of-detail constants.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LodConfig {
    /// Levels at or above this one are never culled.
    pub start_rec_level: u8,
    /// Camera deviation above which back-side tiles are culled.
    pub deviation_threshold: f64,
    /// Screen pixels per source pixel at which refinement stops.
    pub resolution_threshold: f64,
    /// The resolution test applies only deeper than this level.
    pub resolution_min_level: u8,
    /// Source tile edge in pixels.
    pub reference_tile_size: f64,
    /// Mesh grid resolution per tile edge.
    pub mesh_segments: u32,
    pub mode: LodMode,
}

impl Default for LodConfig {
    fn default() -> Self {
        Self {
            start_rec_level: 2,
            deviation_threshold: 0.5,
            resolution_threshold: 0.8,
            resolution_min_level: 3,
            reference_tile_size: 256.0,
            mesh_segments: 16,
            mode: LodMode::Dynamic,
        }
    }
}

/// A tile source. Either `builtin` names a catalogue entry or `url` gives a
/// template with `{x}`, `{y}` and `{z}` placeholders.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SourceConfig {
    pub name: String,
    pub builtin: Option<String>,
    pub url: Option<String>,
    pub min_level: u8,
    pub max_level: u8,
    /// Drawn only in night mode.
    pub night: bool,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            builtin: None,
            url: None,
            min_level: 1,
            max_level: 20,
            night: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TilesConfig {
    /// Built-in source shown while no other day source is active.
    pub default_source: String,
    /// Additional sources, drawn in order on top of each other.
    pub sources: Vec<SourceConfig>,
}

impl Default for TilesConfig {
    fn default() -> Self {
        Self {
            default_source: "debug".to_string(),
            sources: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum LoaderKind {
    /// Generated debug imagery.
    #[default]
    Mock,
    /// Encoded images under a local directory.
    Directory,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoaderConfig {
    pub kind: LoaderKind,
    /// Frames a mock request stays in flight.
    pub mock_latency_frames: u32,
    /// Mock requests deeper than this level fail.
    pub mock_fail_levels_above: Option<u8>,
    /// Root directory of the directory loader.
    pub root: PathBuf,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            kind: LoaderKind::Mock,
            mock_latency_frames: 2,
            mock_fail_levels_above: None,
            root: PathBuf::from("tiles"),
        }
    }
}

/// When night imagery is drawn.
#[derive(
    Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, clap::ValueEnum,
)]
pub enum NightMode {
    Off,
    On,
    /// Night whenever the sun is below the horizon under the camera.
    #[default]
    Auto,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClockConfig {
    /// Simulated milliseconds per real millisecond.
    pub multiplier: f64,
    /// Start time in unix milliseconds; the current time when unset.
    pub start_unix_ms: Option<i64>,
    /// Turn the camera with the earth's rotation.
    pub earth_rotation: bool,
    pub night_mode: NightMode,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            multiplier: 1.0,
            start_unix_ms: None,
            earth_rotation: false,
            night_mode: NightMode::Auto,
        }
    }
}

/// Debug/development configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Log filter (e.g. "debug", "info,terra_lod=trace").
    pub log_level: String,
    /// Frames to run before exiting.
    pub frames: u64,
    /// JSON log directory; `logs` under the config directory when unset.
    pub log_dir: Option<PathBuf>,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            frames: 120,
            log_dir: None,
        }
    }
}

impl Config {
    /// `terra` under the OS configuration directory.
    pub fn default_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("terra"))
    }

    /// Load config from the given directory, or create a default config file.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let path = config_dir.join(CONFIG_FILE);
        if path.exists() {
            let config = Self::read(&path)?;
            log::info!("Loaded config from {}", path.display());
            Ok(config)
        } else {
            let config = Config::default();
            config.save(config_dir)?;
            log::info!("Created default config at {}", path.display());
            Ok(config)
        }
    }

    /// Save config to the given directory as [`CONFIG_FILE`].
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        std::fs::create_dir_all(config_dir).map_err(|source| ConfigError::WriteError {
            path: config_dir.to_path_buf(),
            source,
        })?;

        let path = config_dir.join(CONFIG_FILE);
        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(3)
            .enumerate_arrays(false);
        let serialized =
            ron::ser::to_string_pretty(self, pretty).map_err(ConfigError::SerializeError)?;

        std::fs::write(&path, serialized).map_err(|source| ConfigError::WriteError { path, source })
    }

    /// Re-read the file. `Some` only when its content differs from `self`.
    pub fn reload(&self, config_dir: &Path) -> Result<Option<Self>, ConfigError> {
        let path = config_dir.join(CONFIG_FILE);
        let fresh = Self::read(&path)?;
        if &fresh != self {
            log::info!("Config reloaded with changes from {}", path.display());
            Ok(Some(fresh))
        } else {
            Ok(None)
        }
    }

    fn read(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;
        ron::from_str(&contents).map_err(|source| ConfigError::ParseError {
            path: path.to_path_buf(),
            source,
        })
    }
}
