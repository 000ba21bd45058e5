//! The scene: one camera, one projection, a viewport, and the per-frame
//! derived state (frustum and world-to-screen matrix).

use glam::{DMat4, DVec2, DVec3, DVec4};
use tracing::{debug, warn};

use crate::{Camera, Frustum, Projection, SceneError};

/// Drawing surface size in pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Result<Self, SceneError> {
        if !(width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0) {
            return Err(SceneError::InvalidViewport { width, height });
        }
        Ok(Self { width, height })
    }

    pub fn aspect(&self) -> f64 {
        self.width / self.height
    }

    /// Maps normalized device coordinates to pixels, origin at the top-left
    /// corner with `y` growing downward and depth in `[0, 1]`.
    pub fn matrix(&self) -> DMat4 {
        let (w, h) = (self.width, self.height);
        DMat4::from_cols(
            DVec4::new(w / 2.0, 0.0, 0.0, 0.0),
            DVec4::new(0.0, -h / 2.0, 0.0, 0.0),
            DVec4::new(0.0, 0.0, 0.5, 0.0),
            DVec4::new(w / 2.0, h / 2.0, 0.5, 1.0),
        )
    }
}

/// Everything needed to assemble a [`Scene`].
#[derive(Clone, Debug)]
pub struct SceneOptions {
    pub from: DVec3,
    pub to: DVec3,
    pub up: DVec3,
    /// Vertical field of view in radians.
    pub fovy: f64,
    pub near: f64,
    pub far: f64,
    pub viewport: Viewport,
}

/// Camera, projection and viewport plus the state derived from them.
///
/// Mutate the camera through [`Scene::camera_mut`] or the gesture helpers,
/// then call [`Scene::refresh`] once per frame before reading
/// [`Scene::frustum`] or [`Scene::world_to_screen`].
#[derive(Debug, Clone)]
pub struct Scene {
    camera: Camera,
    projection: Projection,
    viewport: Viewport,
    frustum: Frustum,
    world_to_screen: DMat4,
    camera_revision: u64,
    projection_revision: u64,
    viewport_dirty: bool,
    last_error: Option<SceneError>,
}

impl Scene {
    pub fn new(options: SceneOptions) -> Result<Self, SceneError> {
        let camera = Camera::new(options.from, options.to, options.up)?;
        let projection = Projection::new(
            options.fovy,
            options.viewport.aspect(),
            options.near,
            options.far,
        )?;
        Self::with_parts(camera, projection, options.viewport)
    }

    /// Assemble a scene from existing parts. The projection aspect is
    /// replaced by the viewport's.
    pub fn with_parts(
        camera: Camera,
        mut projection: Projection,
        viewport: Viewport,
    ) -> Result<Self, SceneError> {
        if (projection.aspect() - viewport.aspect()).abs() > f64::EPSILON {
            projection.set_aspect(viewport.aspect())?;
        }
        let frustum = Frustum::build(&projection, &camera)?;
        let world_to_screen = world_to_screen(&projection, &camera, &viewport);
        Ok(Self {
            camera_revision: camera.revision(),
            projection_revision: projection.revision(),
            camera,
            projection,
            viewport,
            frustum,
            world_to_screen,
            viewport_dirty: false,
            last_error: None,
        })
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    /// Mutable access to the camera. Changes take effect at the next
    /// [`refresh`](Self::refresh).
    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    pub fn projection_mut(&mut self) -> &mut Projection {
        &mut self.projection
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Resize the drawing surface and update the projection aspect.
    pub fn set_viewport(&mut self, width: f64, height: f64) -> Result<(), SceneError> {
        let viewport = Viewport::new(width, height)?;
        self.projection.set_aspect(viewport.aspect())?;
        self.viewport = viewport;
        self.viewport_dirty = true;
        Ok(())
    }

    pub fn viewport_matrix(&self) -> DMat4 {
        self.viewport.matrix()
    }

    /// Whether the camera, projection or viewport changed since the last
    /// [`refresh`](Self::refresh).
    pub fn is_stale(&self) -> bool {
        self.viewport_dirty
            || self.camera.revision() != self.camera_revision
            || self.projection.revision() != self.projection_revision
    }

    /// Rebuild the frustum and world-to-screen matrix if anything changed.
    ///
    /// Returns `Ok(true)` when derived state was rebuilt. On failure the
    /// previous frustum is kept and the error is reported by this method and
    /// by [`frame_ready`](Self::frame_ready) until the next change rebuilds
    /// successfully.
    pub fn refresh(&mut self) -> Result<bool, SceneError> {
        if !self.is_stale() {
            return match &self.last_error {
                Some(e) => Err(e.clone()),
                None => Ok(false),
            };
        }
        self.camera_revision = self.camera.revision();
        self.projection_revision = self.projection.revision();
        self.viewport_dirty = false;
        match Frustum::build(&self.projection, &self.camera) {
            Ok(frustum) => {
                self.frustum = frustum;
                self.world_to_screen =
                    world_to_screen(&self.projection, &self.camera, &self.viewport);
                self.last_error = None;
                debug!(
                    camera_revision = self.camera_revision,
                    change = ?self.camera.last_change(),
                    "scene refreshed"
                );
                Ok(true)
            }
            Err(e) => {
                warn!("frustum rebuild failed, keeping previous frame state: {e}");
                self.last_error = Some(e.clone());
                Err(e)
            }
        }
    }

    /// `Ok` when the derived state matches the current camera and
    /// projection and can be used to schedule tiles.
    pub fn frame_ready(&self) -> Result<(), SceneError> {
        if let Some(e) = &self.last_error {
            return Err(e.clone());
        }
        if self.is_stale() {
            return Err(SceneError::Stale);
        }
        Ok(())
    }

    /// The frustum built at the last successful refresh.
    pub fn frustum(&self) -> &Frustum {
        &self.frustum
    }

    /// `viewport * projection * view`, mapping world points to homogeneous
    /// pixel coordinates.
    pub fn world_to_screen(&self) -> DMat4 {
        self.world_to_screen
    }

    /// Pixel position of a world point, or `None` when it is behind the eye.
    pub fn project_to_screen(&self, p: DVec3) -> Option<DVec2> {
        let s = self.world_to_screen * p.extend(1.0);
        (s.w > 0.0).then(|| DVec2::new(s.x / s.w, s.y / s.w))
    }

    /// Orbit the camera around its target by a drag of `(dx, dy)` pixels.
    pub fn round(&mut self, dx: f64, dy: f64) -> Result<(), SceneError> {
        self.camera.round(dx, dy, &self.projection, &self.viewport)
    }

    pub fn zoom(&mut self, factor: f64) -> Result<(), SceneError> {
        self.camera.zoom(factor)
    }

    pub fn move_by(&mut self, dx: f64, dy: f64) -> Result<(), SceneError> {
        self.camera.move_by(dx, dy)
    }

    pub fn move_target(&mut self, ax: f64, ay: f64) -> Result<(), SceneError> {
        self.camera.move_target(ax, ay)
    }

    pub fn round_for_earth_self_rotation(&mut self, angle: f64) -> Result<(), SceneError> {
        self.camera.round_for_earth_self_rotation(angle)
    }

    /// Ground meters per pixel at the camera nadir.
    pub fn resolution(&self) -> DVec2 {
        self.camera.resolution(&self.projection, &self.viewport)
    }
}

fn world_to_screen(projection: &Projection, camera: &Camera, viewport: &Viewport) -> DMat4 {
    viewport.matrix() * projection.perspective_matrix() * camera.view_matrix()
}
