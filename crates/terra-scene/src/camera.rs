//! Look-at camera in ECEF space and the gestures that move it around the
//! globe.
//!
//! Every mutation goes through a single commit step that rebuilds the view
//! matrix and its inverse. A mutation that would produce a degenerate view
//! (eye on target, up parallel to the view direction, non-finite values) is
//! rejected and leaves the camera untouched.

use glam::{DMat4, DQuat, DVec2, DVec3, DVec4};
use terra_geo::{EARTH_RADIUS, Geodetic, ecef_to_geodetic, geodetic_to_ecef};
use tracing::trace;

use crate::{Projection, SceneError, Viewport};

/// Zoom moves the eye toward the ground point at this altitude (meters).
const ZOOM_GROUND_ALTITUDE: f64 = 1.0;
/// Fraction of the eye-to-ground distance covered by one zoom step.
const ZOOM_STEP: f64 = 0.1;
/// Minimum eye-to-target distance and minimum sine between the view
/// direction and up vector.
const DEGENERATE_EPSILON: f64 = 1e-9;

/// What kind of mutation last changed the camera.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CameraChange {
    /// Explicit `from`/`to`/`up` assignment.
    Set,
    /// Orbit around the target.
    Round,
    /// Orbit around the polar axis simulating earth rotation.
    EarthRotation,
    /// Move toward or away from the ground.
    Zoom,
    /// Translate in the view plane.
    Move,
    /// Swing the target around the eye.
    PanTilt,
}

/// A look-at camera. `from` and `to` are homogeneous points (`w = 1`), `up`
/// is a direction (`w = 0`).
#[derive(Debug, Clone)]
pub struct Camera {
    from: DVec4,
    to: DVec4,
    up: DVec4,
    view_matrix: DMat4,
    inv_view_matrix: DMat4,
    revision: u64,
    last_change: CameraChange,
}

impl Camera {
    pub fn new(from: DVec3, to: DVec3, up: DVec3) -> Result<Self, SceneError> {
        let (view_matrix, inv_view_matrix) = look(from, to, up)?;
        Ok(Self {
            from: from.extend(1.0),
            to: to.extend(1.0),
            up: up.extend(0.0),
            view_matrix,
            inv_view_matrix,
            revision: 0,
            last_change: CameraChange::Set,
        })
    }

    /// Camera at the given geodetic position looking at the earth center
    /// with +Z (north) as up.
    pub fn looking_at_earth(position: Geodetic) -> Result<Self, SceneError> {
        Self::new(geodetic_to_ecef(position), DVec3::ZERO, DVec3::Z)
    }

    /// Eye position.
    pub fn from(&self) -> DVec3 {
        self.from.truncate()
    }

    /// Look-at target.
    pub fn to(&self) -> DVec3 {
        self.to.truncate()
    }

    pub fn up(&self) -> DVec3 {
        self.up.truncate()
    }

    /// Eye position as a homogeneous point.
    pub fn from_homogeneous(&self) -> DVec4 {
        self.from
    }

    pub fn view_matrix(&self) -> DMat4 {
        self.view_matrix
    }

    pub fn inv_view_matrix(&self) -> DMat4 {
        self.inv_view_matrix
    }

    /// Incremented on every successful mutation.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn last_change(&self) -> CameraChange {
        self.last_change
    }

    pub fn set_from(&mut self, from: DVec3) -> Result<(), SceneError> {
        self.commit(from, self.to(), self.up(), CameraChange::Set)
    }

    pub fn set_to(&mut self, to: DVec3) -> Result<(), SceneError> {
        self.commit(self.from(), to, self.up(), CameraChange::Set)
    }

    pub fn set_up(&mut self, up: DVec3) -> Result<(), SceneError> {
        self.commit(self.from(), self.to(), up, CameraChange::Set)
    }

    /// Replace all three vectors at once, validating only the final triple.
    pub fn set_look(&mut self, from: DVec3, to: DVec3, up: DVec3) -> Result<(), SceneError> {
        self.commit(from, to, up, CameraChange::Set)
    }

    /// Orbit the eye around the target by a screen-space drag of `(dx, dy)`
    /// pixels. The drag is converted to ground meters with the current
    /// [`resolution`](Self::resolution) and then to an angle on a sphere of
    /// [`EARTH_RADIUS`].
    pub fn round(
        &mut self,
        dx: f64,
        dy: f64,
        projection: &Projection,
        viewport: &Viewport,
    ) -> Result<(), SceneError> {
        let res = self.resolution(projection, viewport);
        let ax = (-dx * res.x / EARTH_RADIUS).atan();
        let ay = (-dy * res.y / EARTH_RADIUS).atan();

        let view_from = self.view_matrix.transform_point3(self.from());
        let view_to = self.view_matrix.transform_point3(self.to());
        let orbited = DQuat::from_rotation_y(ax) * (view_from - view_to) + view_to;
        let orbited = DQuat::from_rotation_x(ay) * (orbited - view_to) + view_to;

        let from = self.inv_view_matrix.transform_point3(orbited);
        self.commit(from, self.to(), self.up(), CameraChange::Round)
    }

    /// Rotate the eye by `-angle` radians about the polar axis and retarget
    /// the earth center, which looks like the earth spinning west to east.
    pub fn round_for_earth_self_rotation(&mut self, angle: f64) -> Result<(), SceneError> {
        let from = DMat4::from_rotation_z(-angle).transform_point3(self.from());
        self.commit(from, DVec3::ZERO, self.up(), CameraChange::EarthRotation)
    }

    /// Move the eye 10% of the way toward (`factor > 0`) or away from
    /// (`factor < 0`) the ground point below it. Only the sign of `factor`
    /// matters; zero leaves the eye in place.
    pub fn zoom(&mut self, factor: f64) -> Result<(), SceneError> {
        let sign = if factor > 0.0 {
            1.0
        } else if factor < 0.0 {
            -1.0
        } else {
            0.0
        };
        let geo = ecef_to_geodetic(self.from());
        let ground = geodetic_to_ecef(Geodetic::new(
            geo.lon_deg,
            geo.lat_deg,
            ZOOM_GROUND_ALTITUDE,
        ));
        let from = self.from() + (ground - self.from()) * (sign * ZOOM_STEP);
        self.commit(from, self.to(), self.up(), CameraChange::Zoom)
    }

    /// Translate eye and target together by `(dx, dy)` meters in the view
    /// plane.
    pub fn move_by(&mut self, dx: f64, dy: f64) -> Result<(), SceneError> {
        let offset = DVec3::new(dx, dy, 0.0);
        let from = self
            .inv_view_matrix
            .transform_point3(self.view_matrix.transform_point3(self.from()) + offset);
        let to = self
            .inv_view_matrix
            .transform_point3(self.view_matrix.transform_point3(self.to()) + offset);
        self.commit(from, to, self.up(), CameraChange::Move)
    }

    /// Swing the target around the eye: `ax` radians about the local
    /// vertical (pan), then `ay` radians about the view-space X axis (tilt).
    /// Afterwards `up` is the local vertical.
    pub fn move_target(&mut self, ax: f64, ay: f64) -> Result<(), SceneError> {
        let from = self.from();
        let pan_axis = from.try_normalize().ok_or(SceneError::DegenerateCamera(
            "eye at the earth center has no vertical",
        ))?;
        let tilt_axis = self.inv_view_matrix.transform_vector3(DVec3::X);

        let pan = rotation_about_line(from, pan_axis, ax);
        let tilt = rotation_about_line(from, tilt_axis, ay);
        let to = (pan * tilt).transform_point3(self.to());
        self.commit(from, to, pan_axis, CameraChange::PanTilt)
    }

    /// Eye altitude above the ellipsoid in meters.
    pub fn height_to_surface(&self) -> f64 {
        ecef_to_geodetic(self.from()).alt_m
    }

    /// Ground meters per screen pixel for a nadir view, horizontally and
    /// vertically.
    pub fn resolution(&self, projection: &Projection, viewport: &Viewport) -> DVec2 {
        let height = self.height_to_surface();
        let horizontal = 2.0 * height * (projection.fovx() * 0.5).tan();
        let vertical = 2.0 * height * (projection.fovy() * 0.5).tan();
        DVec2::new(horizontal / viewport.width, vertical / viewport.height)
    }

    /// Angle subtended at the earth center by the nadir view footprint,
    /// horizontally and vertically (radians).
    pub fn field_from_earth_center(&self, projection: &Projection) -> DVec2 {
        let height = self.height_to_surface();
        let half_width = height * (projection.fovx() * 0.5).tan();
        let half_height = height * (projection.fovy() * 0.5).tan();
        DVec2::new(
            (half_width / EARTH_RADIUS).atan() * 2.0,
            (half_height / EARTH_RADIUS).atan() * 2.0,
        )
    }

    /// How far the view direction deviates from straight down, in `[0, 2]`.
    /// Zero when looking at the earth center, one when looking at the
    /// horizon-perpendicular, two when looking straight up.
    pub fn deviation(&self) -> f64 {
        let Some(dir) = (self.to() - self.from()).try_normalize() else {
            return 0.0;
        };
        let Some(nadir) = (-self.from()).try_normalize() else {
            return 0.0;
        };
        (1.0 - dir.dot(nadir)).clamp(0.0, 2.0)
    }

    fn commit(
        &mut self,
        from: DVec3,
        to: DVec3,
        up: DVec3,
        change: CameraChange,
    ) -> Result<(), SceneError> {
        let (view_matrix, inv_view_matrix) = look(from, to, up)?;
        self.from = from.extend(1.0);
        self.to = to.extend(1.0);
        self.up = up.extend(0.0);
        self.view_matrix = view_matrix;
        self.inv_view_matrix = inv_view_matrix;
        self.revision += 1;
        self.last_change = change;
        trace!(?change, revision = self.revision, "camera changed");
        Ok(())
    }
}

/// Build the view matrix and its inverse, rejecting degenerate input.
fn look(from: DVec3, to: DVec3, up: DVec3) -> Result<(DMat4, DMat4), SceneError> {
    if !(from.is_finite() && to.is_finite() && up.is_finite()) {
        return Err(SceneError::DegenerateCamera("non-finite vector"));
    }
    let dir = to - from;
    if dir.length() <= DEGENERATE_EPSILON {
        return Err(SceneError::DegenerateCamera("eye coincides with target"));
    }
    let up_len = up.length();
    if up_len <= DEGENERATE_EPSILON {
        return Err(SceneError::DegenerateCamera("zero up vector"));
    }
    if dir.cross(up).length() <= DEGENERATE_EPSILON * dir.length() * up_len {
        return Err(SceneError::DegenerateCamera("up parallel to view direction"));
    }

    let view = DMat4::look_at_rh(from, to, up);
    let inverse = view.inverse();
    if !inverse.is_finite() {
        return Err(SceneError::SingularMatrix("view"));
    }
    Ok((view, inverse))
}

/// Rotation by `angle` radians about the line through `point` along `axis`.
pub fn rotation_about_line(point: DVec3, axis: DVec3, angle: f64) -> DMat4 {
    DMat4::from_translation(point)
        * DMat4::from_axis_angle(axis.normalize_or_zero(), angle)
        * DMat4::from_translation(-point)
}
