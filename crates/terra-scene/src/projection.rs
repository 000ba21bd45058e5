//! Perspective projection parameters.

use glam::DMat4;
use std::f64::consts::PI;

use crate::SceneError;

/// Symmetric perspective projection with an OpenGL-style clip volume
/// (`z` in `[-w, w]`).
#[derive(Debug, Clone)]
pub struct Projection {
    fovy: f64,
    aspect: f64,
    near: f64,
    far: f64,
    revision: u64,
}

impl Projection {
    /// Create a projection from the vertical field of view (radians), the
    /// width/height aspect and the clip distances.
    pub fn new(fovy: f64, aspect: f64, near: f64, far: f64) -> Result<Self, SceneError> {
        validate(fovy, aspect, near, far)?;
        Ok(Self {
            fovy,
            aspect,
            near,
            far,
            revision: 0,
        })
    }

    /// Vertical field of view in radians.
    pub fn fovy(&self) -> f64 {
        self.fovy
    }

    /// Horizontal field of view in radians, `2 * atan(tan(fovy / 2) * aspect)`.
    pub fn fovx(&self) -> f64 {
        2.0 * ((self.fovy * 0.5).tan() * self.aspect).atan()
    }

    pub fn aspect(&self) -> f64 {
        self.aspect
    }

    pub fn near(&self) -> f64 {
        self.near
    }

    pub fn far(&self) -> f64 {
        self.far
    }

    /// Incremented on every successful mutation.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// The clip-from-view matrix.
    pub fn perspective_matrix(&self) -> DMat4 {
        DMat4::perspective_rh_gl(self.fovy, self.aspect, self.near, self.far)
    }

    /// Constant for logarithmic depth encoding, `1 / log2(far + 1)`.
    pub fn log_depth_constant(&self) -> f64 {
        1.0 / (self.far + 1.0).log2()
    }

    pub fn set_fovy(&mut self, fovy: f64) -> Result<(), SceneError> {
        validate(fovy, self.aspect, self.near, self.far)?;
        self.fovy = fovy;
        self.revision += 1;
        Ok(())
    }

    pub fn set_aspect(&mut self, aspect: f64) -> Result<(), SceneError> {
        validate(self.fovy, aspect, self.near, self.far)?;
        self.aspect = aspect;
        self.revision += 1;
        Ok(())
    }

    /// Replace both clip distances at once so `near < far` is checked on
    /// the final pair.
    pub fn set_clip(&mut self, near: f64, far: f64) -> Result<(), SceneError> {
        validate(self.fovy, self.aspect, near, far)?;
        self.near = near;
        self.far = far;
        self.revision += 1;
        Ok(())
    }
}

impl Default for Projection {
    fn default() -> Self {
        Self {
            fovy: PI / 3.0,
            aspect: 1.0,
            near: 10.0,
            far: 1.0e8,
            revision: 0,
        }
    }
}

fn validate(fovy: f64, aspect: f64, near: f64, far: f64) -> Result<(), SceneError> {
    if !(fovy > 0.0 && fovy < PI) {
        return Err(SceneError::InvalidProjection("fovy must be in (0, pi)"));
    }
    if !(aspect.is_finite() && aspect > 0.0) {
        return Err(SceneError::InvalidProjection("aspect must be positive"));
    }
    if !(near.is_finite() && near > 0.0) {
        return Err(SceneError::InvalidProjection("near must be positive"));
    }
    if !(far.is_finite() && far > near) {
        return Err(SceneError::InvalidProjection("far must exceed near"));
    }
    Ok(())
}
