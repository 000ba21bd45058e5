//! A globe session assembled from [`Config`]: scene, tile providers, the
//! loader they share, the simulated clock and night mode.

use terra_config::{
    ClockConfig, Config, LoaderConfig, LoaderKind, LodConfig, LodMode, NightMode, SourceConfig,
};
use terra_geo::{Geodetic, is_night_at, sun_position_ecef};
use terra_lod::{FrameStats, GlobeTiles, LodParams, TileProvider, TileRenderer, TraversalMode};
use terra_scene::{Camera, Scene, SceneError, SceneOptions, Viewport};
use terra_tiles::{DirectoryTileLoader, MockTileLoader, TileLoader, TileSourceInfo};
use tracing::{debug, info, warn};

use glam::DVec3;

use crate::clock::Clock;
use crate::earth_rotation::EarthRotation;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// The scene could not be built from the camera or viewport settings.
    #[error("invalid scene: {0}")]
    Scene(#[from] SceneError),

    /// A source names a built-in id that does not exist.
    #[error("unknown tile source {0:?}")]
    UnknownSource(String),

    /// A configured source has neither a built-in id nor a URL.
    #[error("tile source {0:?} has no url")]
    MissingUrl(String),
}

/// Traversal constants from the `lod` config section.
pub fn lod_params(lod: &LodConfig) -> LodParams {
    LodParams {
        start_rec_level: lod.start_rec_level,
        deviation_threshold: lod.deviation_threshold,
        resolution_threshold: lod.resolution_threshold,
        resolution_min_level: lod.resolution_min_level,
        reference_tile_size: lod.reference_tile_size,
        mode: match lod.mode {
            LodMode::Dynamic => TraversalMode::Dynamic,
            LodMode::Fixed => TraversalMode::Fixed,
        },
    }
}

/// Resolve a configured source. A built-in id takes its URL and level range
/// from the catalogue; `name` and `night` still apply.
pub fn source_info(config: &SourceConfig) -> Result<TileSourceInfo, AppError> {
    let mut source = match (&config.builtin, &config.url) {
        (Some(id), _) => {
            TileSourceInfo::builtin(id).ok_or_else(|| AppError::UnknownSource(id.clone()))?
        }
        (None, Some(url)) => {
            TileSourceInfo::new(&config.name, url.as_str(), config.min_level, config.max_level)
        }
        (None, None) => return Err(AppError::MissingUrl(config.name.clone())),
    };
    if !config.name.is_empty() {
        source.name = config.name.clone();
    }
    Ok(source.with_night(config.night))
}

fn build_loader(config: &LoaderConfig) -> Box<dyn TileLoader> {
    match config.kind {
        LoaderKind::Mock => Box::new(
            MockTileLoader::new(config.mock_latency_frames)
                .with_fail_levels_above(config.mock_fail_levels_above),
        ),
        LoaderKind::Directory => Box::new(DirectoryTileLoader::new(&config.root)),
    }
}

fn build_scene(config: &Config) -> Result<Scene, SceneError> {
    let camera = &config.camera;
    Scene::new(SceneOptions {
        from: Geodetic::new(camera.longitude_deg, camera.latitude_deg, camera.altitude_m)
            .to_ecef(),
        to: DVec3::ZERO,
        up: DVec3::Z,
        fovy: camera.fovy_deg.to_radians(),
        near: camera.near,
        far: camera.far,
        viewport: Viewport::new(
            f64::from(config.viewport.width),
            f64::from(config.viewport.height),
        )?,
    })
}

/// Everything needed to schedule and draw frames without a window.
pub struct GlobeSession {
    scene: Scene,
    tiles: GlobeTiles,
    loader: Box<dyn TileLoader>,
    clock: Clock,
    rotation: EarthRotation,
    night_mode: NightMode,
}

impl GlobeSession {
    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        let scene = build_scene(config)?;
        let params = lod_params(&config.lod);
        let segments = config.lod.mesh_segments;
        let provider = |source: TileSourceInfo, camera: &Camera| {
            TileProvider::new(source, camera)
                .with_params(params.clone())
                .with_mesh_segments(segments)
        };

        let default_source = TileSourceInfo::builtin(&config.tiles.default_source)
            .ok_or_else(|| AppError::UnknownSource(config.tiles.default_source.clone()))?;
        let mut tiles = GlobeTiles::with_default_provider(provider(default_source, scene.camera()));
        for source in &config.tiles.sources {
            let source = source_info(source)?;
            info!(name = %source.name, night = source.night, "adding tile source");
            tiles.add_provider(provider(source, scene.camera()));
        }

        Ok(Self {
            scene,
            tiles,
            loader: build_loader(&config.loader),
            clock: started_clock(&config.clock),
            rotation: EarthRotation::new(config.clock.earth_rotation),
            night_mode: config.clock.night_mode,
        })
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    pub fn tiles(&self) -> &GlobeTiles {
        &self.tiles
    }

    pub fn tiles_mut(&mut self) -> &mut GlobeTiles {
        &mut self.tiles
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    pub fn clock_mut(&mut self) -> &mut Clock {
        &mut self.clock
    }

    pub fn rotation_mut(&mut self) -> &mut EarthRotation {
        &mut self.rotation
    }

    pub fn night_mode(&self) -> NightMode {
        self.night_mode
    }

    pub fn set_night_mode(&mut self, mode: NightMode) {
        self.night_mode = mode;
    }

    /// Advance simulated time by `elapsed_ms` of real time and spin the
    /// camera with the earth.
    pub fn step(&mut self, elapsed_ms: f64) {
        let delta = self.clock.tick(elapsed_ms);
        if let Err(e) = self.rotation.apply(self.scene.camera_mut(), delta) {
            warn!("earth rotation rejected: {e}");
        }
    }

    /// Whether the ground below the camera is on the night side at the
    /// current simulated time.
    pub fn sun_below_horizon(&self) -> bool {
        let sun = sun_position_ecef(self.clock.now_ms());
        is_night_at(self.scene.camera().from(), sun)
    }

    /// Refresh the scene and schedule and draw one frame.
    pub fn render(&mut self, renderer: &mut dyn TileRenderer) -> FrameStats {
        let night = match self.night_mode {
            NightMode::Off => false,
            NightMode::On => true,
            NightMode::Auto => self.sun_below_horizon(),
        };
        if night != self.tiles.is_night() {
            debug!(night, "night mode changed");
            self.tiles.set_night(night);
        }

        // A failed rebuild keeps the scene unusable; render_frame skips.
        if let Err(e) = self.scene.refresh() {
            debug!("scene refresh failed: {e}");
        }
        self.tiles
            .render_frame(&self.scene, self.loader.as_mut(), renderer)
    }
}

fn started_clock(config: &ClockConfig) -> Clock {
    let mut clock = Clock::from_config(config);
    clock.start();
    clock
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::HeadlessRenderer;

    /// 2024-06-20T12:00:00Z: noon at Greenwich, night over the Pacific.
    const NOON_UTC: i64 = 1_718_884_800_000;

    fn test_config() -> Config {
        let mut config = Config::default();
        config.loader.mock_latency_frames = 0;
        config.lod.mesh_segments = 2;
        config.clock.start_unix_ms = Some(NOON_UTC);
        config.clock.night_mode = NightMode::Off;
        config
    }

    fn run(session: &mut GlobeSession, renderer: &mut HeadlessRenderer, frames: usize) -> FrameStats {
        let mut stats = FrameStats::default();
        for _ in 0..frames {
            renderer.begin_frame();
            session.step(1000.0 / 60.0);
            stats = session.render(renderer);
        }
        stats
    }

    #[test]
    fn test_lod_params_from_config() {
        let mut lod = LodConfig::default();
        assert_eq!(lod_params(&lod), LodParams::default());
        lod.mode = LodMode::Fixed;
        lod.resolution_threshold = 1.2;
        let params = lod_params(&lod);
        assert_eq!(params.mode, TraversalMode::Fixed);
        assert_eq!(params.resolution_threshold, 1.2);
    }

    #[test]
    fn test_source_info_builtin_and_url() {
        let builtin = source_info(&SourceConfig {
            builtin: Some("osm".to_string()),
            ..SourceConfig::default()
        })
        .unwrap();
        assert_eq!(builtin.name, "OSM");
        assert_eq!(builtin.min_level, 1);

        let custom = source_info(&SourceConfig {
            name: "lights".to_string(),
            url: Some("night/{z}/{x}/{y}.png".to_string()),
            max_level: 8,
            night: true,
            ..SourceConfig::default()
        })
        .unwrap();
        assert_eq!(custom.name, "lights");
        assert_eq!(custom.max_level, 8);
        assert!(custom.night);
    }

    #[test]
    fn test_source_info_errors() {
        let unknown = source_info(&SourceConfig {
            builtin: Some("nope".to_string()),
            ..SourceConfig::default()
        });
        assert!(matches!(unknown, Err(AppError::UnknownSource(_))));

        let missing = source_info(&SourceConfig {
            name: "empty".to_string(),
            ..SourceConfig::default()
        });
        assert!(matches!(missing, Err(AppError::MissingUrl(_))));
    }

    #[test]
    fn test_unknown_default_source_rejected() {
        let mut config = test_config();
        config.tiles.default_source = "atlantis".to_string();
        assert!(matches!(
            GlobeSession::from_config(&config),
            Err(AppError::UnknownSource(_))
        ));
    }

    #[test]
    fn test_invalid_viewport_rejected() {
        let mut config = test_config();
        config.viewport.width = 0;
        assert!(matches!(
            GlobeSession::from_config(&config),
            Err(AppError::Scene(SceneError::InvalidViewport { .. }))
        ));
    }

    #[test]
    fn test_session_draws_default_source() {
        let mut session = GlobeSession::from_config(&test_config()).unwrap();
        let mut renderer = HeadlessRenderer::new();
        let stats = run(&mut session, &mut renderer, 2);
        assert!(!stats.skipped);
        assert!(stats.tiles_drawn > 0);
        assert!(renderer.frame_draws().iter().all(|d| d.key.z <= 3));
    }

    /// Night-only sources draw only once the sun has set under the camera.
    #[test]
    fn test_auto_night_follows_sun() {
        let mut config = test_config();
        config.clock.night_mode = NightMode::Auto;
        config.tiles.sources.push(SourceConfig {
            name: "lights".to_string(),
            url: Some("mock://{x}/{y}/{z}".to_string()),
            min_level: 0,
            night: true,
            ..SourceConfig::default()
        });

        // Greenwich at noon.
        config.camera.longitude_deg = 0.0;
        config.camera.latitude_deg = 0.0;
        let mut session = GlobeSession::from_config(&config).unwrap();
        let mut renderer = HeadlessRenderer::new();
        run(&mut session, &mut renderer, 1);
        assert!(!session.sun_below_horizon());
        assert!(renderer.frame_draws().iter().all(|d| !d.night));

        // The antipode at the same instant.
        config.camera.longitude_deg = 180.0;
        let mut session = GlobeSession::from_config(&config).unwrap();
        let mut renderer = HeadlessRenderer::new();
        run(&mut session, &mut renderer, 1);
        assert!(session.sun_below_horizon());
        assert!(renderer.frame_draws().iter().any(|d| d.night));
    }

    #[test]
    fn test_earth_rotation_moves_camera() {
        let mut config = test_config();
        config.clock.earth_rotation = true;
        config.clock.multiplier = 3600.0;
        let mut session = GlobeSession::from_config(&config).unwrap();
        let before = Geodetic::from_ecef(session.scene().camera().from()).lon_deg;
        // One simulated hour.
        session.step(1000.0);
        let after = Geodetic::from_ecef(session.scene().camera().from()).lon_deg;
        assert!((before - after - 15.0).abs() < 1e-6, "{before} -> {after}");
    }

    #[test]
    fn test_stopped_clock_keeps_camera() {
        let mut config = test_config();
        config.clock.earth_rotation = true;
        let mut session = GlobeSession::from_config(&config).unwrap();
        session.clock_mut().stop();
        let revision = session.scene().camera().revision();
        session.step(1000.0);
        assert_eq!(session.scene().camera().revision(), revision);
    }

    /// An empty tile directory fails every load; nothing is drawn and
    /// nothing stays pending.
    #[test]
    fn test_directory_loader_missing_tiles() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = test_config();
        config.loader.kind = LoaderKind::Directory;
        config.loader.root = dir.path().to_path_buf();
        config.tiles.sources.push(SourceConfig {
            name: "local".to_string(),
            url: Some("{z}/{x}/{y}.png".to_string()),
            ..SourceConfig::default()
        });
        let mut session = GlobeSession::from_config(&config).unwrap();
        let mut renderer = HeadlessRenderer::new();
        let stats = run(&mut session, &mut renderer, 3);
        assert_eq!(stats.tiles_drawn, 0);
        assert!(stats.traversal.failed > 0);
        assert_eq!(stats.traversal.pending, 0);
        assert!(!session.tiles().is_default_active());
    }
}
