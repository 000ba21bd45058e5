//! Apparent earth spin. The world frame is earth-fixed, so the effect is
//! produced by turning the camera about the polar axis instead.

use std::f64::consts::PI;

use terra_scene::{Camera, SceneError};

/// One revolution per day, in radians per millisecond.
pub const DEFAULT_EARTH_ROTATION_VELOCITY: f64 = PI / (12.0 * 3600.0 * 1000.0);

#[derive(Debug, Clone, Copy)]
pub struct EarthRotation {
    velocity: f64,
    enabled: bool,
}

impl Default for EarthRotation {
    fn default() -> Self {
        Self {
            velocity: DEFAULT_EARTH_ROTATION_VELOCITY,
            enabled: false,
        }
    }
}

impl EarthRotation {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            ..Self::default()
        }
    }

    /// Angular velocity in radians per simulated millisecond.
    pub fn with_velocity(mut self, velocity: f64) -> Self {
        self.velocity = velocity;
        self
    }

    pub fn velocity(&self) -> f64 {
        self.velocity
    }

    pub fn enable(&mut self) {
        self.enabled = true;
    }

    pub fn disable(&mut self) {
        self.enabled = false;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Turn the camera by `velocity * delta_ms`. A disabled rotation or a
    /// zero delta leaves the camera (and its revision) untouched.
    pub fn apply(&self, camera: &mut Camera, delta_ms: f64) -> Result<(), SceneError> {
        if !self.enabled || delta_ms == 0.0 {
            return Ok(());
        }
        camera.round_for_earth_self_rotation(self.velocity * delta_ms)
    }
}
