//! One imagery source bound to its own tile tree.

use terra_scene::Camera;
use terra_tiles::{DEFAULT_MESH_SEGMENTS, TileLoader, TileSourceInfo};
use tracing::{debug, info};

use crate::level::tile_level_for_altitude;
use crate::traversal::{self, FrameContext, LodParams, TraversalOutcome};
use crate::tree::{GpuHandles, NodeId, TileNode, TileTree};

/// Schedules the tiles of one [`TileSourceInfo`].
///
/// The target level follows the camera altitude; call
/// [`update`](Self::update) every frame before [`provide`](Self::provide).
#[derive(Debug)]
pub struct TileProvider {
    source: TileSourceInfo,
    tree: TileTree,
    level: u8,
    opacity: f32,
    stopped: bool,
    params: LodParams,
    mesh_segments: u32,
    camera_revision: Option<u64>,
}

impl TileProvider {
    pub fn new(source: TileSourceInfo, camera: &Camera) -> Self {
        let tree = TileTree::new(source.url.clone()).with_mesh_segments(DEFAULT_MESH_SEGMENTS);
        let mut provider = Self {
            level: source.min_level,
            source,
            tree,
            opacity: 1.0,
            stopped: false,
            params: LodParams::default(),
            mesh_segments: DEFAULT_MESH_SEGMENTS,
            camera_revision: None,
        };
        provider.update(camera);
        provider
    }

    /// Replace the traversal constants. The level is recomputed on the next
    /// [`update`](Self::update).
    pub fn with_params(mut self, params: LodParams) -> Self {
        self.set_params(params);
        self
    }

    /// Mesh resolution of tiles created from now on.
    pub fn with_mesh_segments(mut self, segments: u32) -> Self {
        self.mesh_segments = segments.max(1);
        self.tree = TileTree::new(self.source.url.clone()).with_mesh_segments(self.mesh_segments);
        self
    }

    pub fn params(&self) -> &LodParams {
        &self.params
    }

    pub fn set_params(&mut self, params: LodParams) {
        self.params = params;
        self.camera_revision = None;
    }

    pub fn source(&self) -> &TileSourceInfo {
        &self.source
    }

    pub fn tree(&self) -> &TileTree {
        &self.tree
    }

    pub(crate) fn tree_mut(&mut self) -> &mut TileTree {
        &mut self.tree
    }

    /// Current target level.
    pub fn level(&self) -> u8 {
        self.level
    }

    /// Override the target level until the camera moves again.
    pub fn set_level(&mut self, level: u8) {
        self.level = level.clamp(self.source.min_level, self.source.max_level);
    }

    /// Target level for the camera's altitude, within the source's range.
    pub fn tile_level_with_camera(&self, camera: &Camera) -> u8 {
        tile_level_for_altitude(
            camera.height_to_surface(),
            self.params.reference_tile_size,
            self.source.min_level,
            self.source.max_level,
        )
    }

    /// Recompute the target level if the camera changed since the last
    /// call. Returns whether the level changed.
    pub fn update(&mut self, camera: &Camera) -> bool {
        if self.camera_revision == Some(camera.revision()) {
            return false;
        }
        self.camera_revision = Some(camera.revision());
        let level = self.tile_level_with_camera(camera);
        if level == self.level {
            return false;
        }
        debug!(source = %self.source.name, from = self.level, to = level, "tile level changed");
        self.level = level;
        true
    }

    /// Switch to another source. The old tree is dropped; its GPU handles
    /// are returned for the caller to release.
    pub fn change_tile_source(&mut self, source: TileSourceInfo) -> Vec<GpuHandles> {
        info!(from = %self.source.name, to = %source.name, "tile source changed");
        let released = self.tree.release_gpu_resources();
        self.tree = TileTree::new(source.url.clone()).with_mesh_segments(self.mesh_segments);
        self.level = self.level.clamp(source.min_level, source.max_level);
        self.source = source;
        self.camera_revision = None;
        released
    }

    pub fn opacity(&self) -> f32 {
        self.opacity
    }

    /// Clamped to `[0, 1]`; NaN is ignored.
    pub fn set_opacity(&mut self, opacity: f32) {
        if !opacity.is_nan() {
            self.opacity = opacity.clamp(0.0, 1.0);
        }
    }

    pub fn stop(&mut self) {
        self.stopped = true;
    }

    pub fn start(&mut self) {
        self.stopped = false;
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Night imagery is drawn only while the globe is in night mode.
    pub fn is_night(&self) -> bool {
        self.source.night
    }

    pub fn set_night(&mut self, night: bool) {
        self.source.night = night;
    }

    /// Run the traversal at the current level.
    pub fn provide(
        &mut self,
        ctx: &FrameContext,
        loader: &mut dyn TileLoader,
        on_renderable: impl FnMut(NodeId, &TileNode),
    ) -> TraversalOutcome {
        traversal::provide(
            &mut self.tree,
            self.level,
            ctx,
            &self.params,
            loader,
            on_renderable,
        )
    }

    /// Handles of replaced tiles waiting to be released.
    pub fn take_stale_gpu(&mut self) -> Vec<GpuHandles> {
        self.tree.take_stale_gpu()
    }

    /// Detach every GPU handle of the tree.
    pub fn release_gpu_resources(&mut self) -> Vec<GpuHandles> {
        self.tree.release_gpu_resources()
    }
}
