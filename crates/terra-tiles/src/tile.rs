//! A single map tile: its address, resolved URL, geometry for culling and
//! its load state.

use glam::DVec3;
use terra_geo::TileKey;
use terra_scene::Frustum;
use tracing::warn;

use crate::mesh::DEFAULT_MESH_SEGMENTS;
use crate::loader::LoadTicket;
use crate::{TileError, TileImage, TileLoader, TileMesh, TileUrl};

/// Side length of the surface sample grid used for culling.
const CULL_GRID: usize = 3;

/// Load status as seen by the scheduler.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TileStatus {
    /// Imagery and mesh are available.
    Ready,
    /// Not requested yet, or requested and still in flight.
    Loading,
    /// The fetch failed. The tile is never retried.
    Failed,
    /// Skipped by the scheduler (culled or beyond the target level). Never
    /// stored on a tile.
    Omitted,
}

impl TileStatus {
    /// `Ready` and `Omitted` need no stand-in from a coarser tile.
    pub fn is_settled(self) -> bool {
        matches!(self, TileStatus::Ready | TileStatus::Omitted)
    }
}

/// Everything a renderer needs from a ready tile.
#[derive(Clone, Debug)]
pub struct TileData {
    pub mesh: TileMesh,
    pub image: TileImage,
}

#[derive(Debug)]
enum TileState {
    Idle,
    Pending(LoadTicket),
    Ready(TileData),
    Failed(TileError),
}

/// One tile of one source.
#[derive(Debug)]
pub struct Tile {
    key: TileKey,
    url: String,
    mesh_segments: u32,
    corners: [DVec3; 4],
    samples: [DVec3; CULL_GRID * CULL_GRID],
    sagitta: f64,
    state: TileState,
}

impl Tile {
    pub fn new(url: &TileUrl, key: TileKey) -> Self {
        let mut samples = [DVec3::ZERO; CULL_GRID * CULL_GRID];
        for (slot, p) in samples.iter_mut().zip(key.sample_grid_ecef(CULL_GRID)) {
            *slot = p;
        }
        Self {
            key,
            url: url.resolve(key),
            mesh_segments: DEFAULT_MESH_SEGMENTS,
            corners: key.corners_ecef(),
            samples,
            sagitta: key.sample_sagitta(CULL_GRID),
            state: TileState::Idle,
        }
    }

    /// Mesh resolution used once the imagery arrives.
    pub fn with_mesh_segments(mut self, segments: u32) -> Self {
        self.mesh_segments = segments.max(1);
        self
    }

    pub fn key(&self) -> TileKey {
        self.key
    }

    /// The resolved imagery URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Surface corners in the order north-west, north-east, south-east,
    /// south-west.
    pub fn corners(&self) -> &[DVec3; 4] {
        &self.corners
    }

    /// Web-Mercator extent `[xmin, ymin, xmax, ymax]`.
    pub fn extent(&self) -> [f64; 4] {
        self.key.extent()
    }

    pub fn status(&self) -> TileStatus {
        match self.state {
            TileState::Idle | TileState::Pending(_) => TileStatus::Loading,
            TileState::Ready(_) => TileStatus::Ready,
            TileState::Failed(_) => TileStatus::Failed,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, TileState::Ready(_))
    }

    pub fn data(&self) -> Option<&TileData> {
        match &self.state {
            TileState::Ready(data) => Some(data),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&TileError> {
        match &self.state {
            TileState::Failed(e) => Some(e),
            _ => None,
        }
    }

    /// Advance the load state by one step and report it.
    ///
    /// The first call issues the request; every call polls the loader while
    /// the request is in flight. Ready and failed tiles never touch the
    /// loader again.
    pub fn load(&mut self, loader: &mut dyn TileLoader) -> TileStatus {
        if matches!(self.state, TileState::Idle) {
            match loader.request(self.key, &self.url) {
                Ok(ticket) => self.state = TileState::Pending(ticket),
                Err(e) => {
                    warn!(key = %self.key, url = %self.url, "tile request failed: {e}");
                    self.state = TileState::Failed(e);
                }
            }
        }
        if let TileState::Pending(ticket) = self.state {
            match loader.poll(ticket) {
                None => {}
                Some(Ok(image)) => {
                    let mesh = TileMesh::build(self.key, self.mesh_segments);
                    self.state = TileState::Ready(TileData { mesh, image });
                }
                Some(Err(e)) => {
                    warn!(key = %self.key, url = %self.url, "tile load failed: {e}");
                    self.state = TileState::Failed(e);
                }
            }
        }
        self.status()
    }

    /// Conservative frustum test: `false` only if the curved tile surface
    /// lies entirely outside one of the frustum planes.
    pub fn intersects_frustum(&self, frustum: &Frustum) -> bool {
        frustum.normalized_planes().iter().all(|plane| {
            self.samples
                .iter()
                .any(|p| plane.dot(p.extend(1.0)) >= -self.sagitta)
        })
    }

    /// Whether the whole tile faces away from the viewpoint, i.e. lies on
    /// the far side of the globe.
    pub fn is_back(&self, frustum: &Frustum) -> bool {
        let eye = frustum.viewpoint();
        self.samples.iter().all(|&p| p.dot(eye - p) < 0.0)
    }
}
