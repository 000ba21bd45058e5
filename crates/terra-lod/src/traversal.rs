//! The per-frame level-of-detail walk over a [`TileTree`].
//!
//! Starting at the root, each node is culled against the frustum, tested
//! for sufficient on-screen resolution and either loaded as a leaf or
//! refined into its four children. A parent whose children are not all
//! settled is drawn in their place, so streaming never leaves holes.

use glam::{DMat4, DVec2, DVec3};
use terra_scene::{Frustum, Scene, SceneError};
use terra_tiles::{TileLoader, TileStatus};

use crate::level::REFERENCE_TILE_SIZE;
use crate::tree::{NodeId, TileNode, TileTree};

/// How the target level is reached.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TraversalMode {
    /// Refine toward the target level, stopping early wherever a tile is
    /// already shown at or below native resolution.
    #[default]
    Dynamic,
    /// Refine every visible branch down to exactly the target level.
    Fixed,
}

/// Tuning constants of the traversal.
#[derive(Clone, Debug, PartialEq)]
pub struct LodParams {
    /// Nodes at or above this level are never culled; they can span the
    /// whole visible hemisphere.
    pub start_rec_level: u8,
    /// Back-side culling applies only when the camera deviation exceeds
    /// this value (dynamic mode).
    pub deviation_threshold: f64,
    /// A tile shown at or below this many screen pixels per source pixel
    /// needs no refinement.
    pub resolution_threshold: f64,
    /// The resolution test applies only deeper than this level.
    pub resolution_min_level: u8,
    pub reference_tile_size: f64,
    pub mode: TraversalMode,
}

impl Default for LodParams {
    fn default() -> Self {
        Self {
            start_rec_level: 2,
            deviation_threshold: 0.5,
            resolution_threshold: 0.8,
            resolution_min_level: 3,
            reference_tile_size: REFERENCE_TILE_SIZE,
            mode: TraversalMode::Dynamic,
        }
    }
}

/// The scene state one traversal reads. Built once per frame.
#[derive(Clone, Debug)]
pub struct FrameContext {
    pub frustum: Frustum,
    pub world_to_screen: DMat4,
    pub camera_deviation: f64,
}

impl FrameContext {
    /// Snapshot the scene. Fails when the scene has not been refreshed
    /// since the last change or its last refresh failed.
    pub fn from_scene(scene: &Scene) -> Result<Self, SceneError> {
        scene.frame_ready()?;
        Ok(Self {
            frustum: scene.frustum().clone(),
            world_to_screen: scene.world_to_screen(),
            camera_deviation: scene.camera().deviation(),
        })
    }
}

/// Counters for one traversal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TraversalStats {
    pub visited: usize,
    pub culled_frustum: usize,
    pub culled_back: usize,
    /// Nodes handed to the render callback.
    pub rendered: usize,
    /// Parents loaded because a child was not settled.
    pub fallbacks: usize,
    /// Loads that returned [`TileStatus::Loading`].
    pub pending: usize,
    pub failed: usize,
}

impl TraversalStats {
    pub fn merge(&mut self, other: &TraversalStats) {
        self.visited += other.visited;
        self.culled_frustum += other.culled_frustum;
        self.culled_back += other.culled_back;
        self.rendered += other.rendered;
        self.fallbacks += other.fallbacks;
        self.pending += other.pending;
        self.failed += other.failed;
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TraversalOutcome {
    /// Status of the root: `Ready` or `Omitted` once everything visible is
    /// drawn at the intended detail.
    pub status: TileStatus,
    pub stats: TraversalStats,
}

/// Walk `tree` from its root toward `target_level`, calling
/// `on_renderable` for every node whose tile is ready and should be drawn
/// this frame.
pub fn provide(
    tree: &mut TileTree,
    target_level: u8,
    ctx: &FrameContext,
    params: &LodParams,
    loader: &mut dyn TileLoader,
    mut on_renderable: impl FnMut(NodeId, &TileNode),
) -> TraversalOutcome {
    let mut walk = Walk {
        target_level,
        ctx,
        params,
        loader,
        on_renderable: &mut on_renderable,
        stats: TraversalStats::default(),
    };
    let root = tree.root();
    let status = walk.visit(tree, root);
    TraversalOutcome {
        status,
        stats: walk.stats,
    }
}

/// Mean on-screen edge length of a tile in pixels, divided by the source
/// tile size. Infinite when any corner is behind the eye.
pub fn tile_screen_resolution(
    corners: &[DVec3; 4],
    world_to_screen: &DMat4,
    reference_tile_size: f64,
) -> f64 {
    let mut screen = [DVec2::ZERO; 4];
    for (slot, corner) in screen.iter_mut().zip(corners) {
        let p = *world_to_screen * corner.extend(1.0);
        if p.w <= 0.0 || !p.w.is_finite() {
            return f64::INFINITY;
        }
        *slot = DVec2::new(p.x / p.w, p.y / p.w);
    }
    let perimeter: f64 = (0..4)
        .map(|i| screen[i].distance(screen[(i + 1) % 4]))
        .sum();
    perimeter / 4.0 / reference_tile_size
}

struct Walk<'a> {
    target_level: u8,
    ctx: &'a FrameContext,
    params: &'a LodParams,
    loader: &'a mut dyn TileLoader,
    on_renderable: &'a mut dyn FnMut(NodeId, &TileNode),
    stats: TraversalStats,
}

impl Walk<'_> {
    fn visit(&mut self, tree: &mut TileTree, id: NodeId) -> TileStatus {
        let z = tree.node(id).key().z;
        if z > self.target_level {
            return TileStatus::Omitted;
        }
        self.stats.visited += 1;

        if z > self.params.start_rec_level {
            let frustum = &self.ctx.frustum;
            let tile = tree.ensure_tile(id);
            if !tile.intersects_frustum(frustum) {
                self.stats.culled_frustum += 1;
                return TileStatus::Omitted;
            }
            let check_back = match self.params.mode {
                TraversalMode::Dynamic => {
                    self.ctx.camera_deviation > self.params.deviation_threshold
                }
                TraversalMode::Fixed => true,
            };
            if check_back && tile.is_back(frustum) {
                self.stats.culled_back += 1;
                return TileStatus::Omitted;
            }
        }

        if self.is_leaf(tree, id, z) {
            return self.load_and_emit(tree, id);
        }

        let Some(children) = tree.ensure_children(id) else {
            return self.load_and_emit(tree, id);
        };
        let mut settled = true;
        for child in children {
            let status = self.visit(tree, child);
            settled &= status.is_settled();
        }
        if settled {
            TileStatus::Ready
        } else {
            self.stats.fallbacks += 1;
            self.load_and_emit(tree, id)
        }
    }

    fn is_leaf(&self, tree: &mut TileTree, id: NodeId, z: u8) -> bool {
        if z >= self.target_level {
            return true;
        }
        match self.params.mode {
            TraversalMode::Fixed => false,
            TraversalMode::Dynamic => {
                z > self.params.resolution_min_level
                    && tile_screen_resolution(
                        tree.ensure_tile(id).corners(),
                        &self.ctx.world_to_screen,
                        self.params.reference_tile_size,
                    ) <= self.params.resolution_threshold
            }
        }
    }

    fn load_and_emit(&mut self, tree: &mut TileTree, id: NodeId) -> TileStatus {
        let status = tree.ensure_tile(id).load(&mut *self.loader);
        match status {
            TileStatus::Ready => {
                self.stats.rendered += 1;
                (self.on_renderable)(id, tree.node(id));
            }
            TileStatus::Loading => self.stats.pending += 1,
            TileStatus::Failed => self.stats.failed += 1,
            TileStatus::Omitted => {}
        }
        status
    }
}
