//! World-space view frustum extracted from the clip-from-world matrix.
//!
//! Planes come from the Gribb-Hartmann rows `row3 +/- row0..2` of
//! `M = P * V` and are kept unnormalized, so for a world point `p`
//! `dot(plane, p)` is a clip-space quantity: for the left plane it equals
//! `x_clip + w_clip`. A point is inside when all six values are
//! non-negative. [`Frustum::normalized_planes`] provides unit-normal copies
//! for metric distance tests.

use glam::{DMat4, DVec3, DVec4};

use crate::{Camera, Projection, SceneError};

/// One of the six frustum planes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Plane {
    Left,
    Right,
    Bottom,
    Top,
    Near,
    Far,
}

impl Plane {
    pub const ALL: [Plane; 6] = [
        Plane::Left,
        Plane::Right,
        Plane::Bottom,
        Plane::Top,
        Plane::Near,
        Plane::Far,
    ];

    fn index(self) -> usize {
        self as usize
    }
}

/// Signed plane values of one point, as returned by
/// [`Frustum::distance_of_point`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlaneDistances {
    pub left: f64,
    pub right: f64,
    pub bottom: f64,
    pub top: f64,
    pub near: f64,
    pub far: f64,
}

impl PlaneDistances {
    pub fn get(&self, plane: Plane) -> f64 {
        match plane {
            Plane::Left => self.left,
            Plane::Right => self.right,
            Plane::Bottom => self.bottom,
            Plane::Top => self.top,
            Plane::Near => self.near,
            Plane::Far => self.far,
        }
    }

    /// Smallest of the six values. Non-negative iff the point is inside.
    pub fn min(&self) -> f64 {
        Plane::ALL
            .iter()
            .map(|&p| self.get(p))
            .fold(f64::INFINITY, f64::min)
    }
}

/// Six inward-facing planes plus the reference points of the view.
#[derive(Clone, Debug)]
pub struct Frustum {
    planes: [DVec4; 6],
    normalized: [DVec4; 6],
    viewpoint: DVec3,
    targetpoint: DVec3,
    centerpoint: DVec3,
}

impl Frustum {
    /// Build the frustum for the current camera and projection.
    pub fn build(projection: &Projection, camera: &Camera) -> Result<Self, SceneError> {
        let clip_from_world = projection.perspective_matrix() * camera.view_matrix();
        Self::from_matrix(clip_from_world, camera.from(), camera.to())
    }

    /// Build from an explicit clip-from-world matrix.
    pub fn from_matrix(
        clip_from_world: DMat4,
        viewpoint: DVec3,
        targetpoint: DVec3,
    ) -> Result<Self, SceneError> {
        if !clip_from_world.is_finite() {
            return Err(SceneError::SingularMatrix("clip-from-world"));
        }
        let inverse = clip_from_world.inverse();
        if !inverse.is_finite() {
            return Err(SceneError::SingularMatrix("clip-from-world"));
        }
        let center = inverse * DVec4::W;
        if center.w.abs() <= f64::EPSILON {
            return Err(SceneError::SingularMatrix("clip-from-world"));
        }

        let m = &clip_from_world;
        let rows = [m.row(0), m.row(1), m.row(2), m.row(3)];
        let mut planes = [DVec4::ZERO; 6];
        planes[Plane::Left.index()] = rows[3] + rows[0];
        planes[Plane::Right.index()] = rows[3] - rows[0];
        planes[Plane::Bottom.index()] = rows[3] + rows[1];
        planes[Plane::Top.index()] = rows[3] - rows[1];
        planes[Plane::Near.index()] = rows[3] + rows[2];
        planes[Plane::Far.index()] = rows[3] - rows[2];

        let normalized = planes.map(|plane| {
            let len = plane.truncate().length();
            if len > 0.0 { plane / len } else { plane }
        });

        Ok(Self {
            planes,
            normalized,
            viewpoint,
            targetpoint,
            centerpoint: center.truncate() / center.w,
        })
    }

    /// The unnormalized plane coefficients `(a, b, c, d)`.
    pub fn plane(&self, plane: Plane) -> DVec4 {
        self.planes[plane.index()]
    }

    /// All six planes in [`Plane::ALL`] order.
    pub fn planes(&self) -> &[DVec4; 6] {
        &self.planes
    }

    /// Planes scaled to unit normals, so `dot(plane, p)` is a distance in
    /// meters.
    pub fn normalized_planes(&self) -> &[DVec4; 6] {
        &self.normalized
    }

    /// Per-plane dot products of the homogeneous point `p`.
    pub fn distance_of_point(&self, p: DVec4) -> PlaneDistances {
        let d = self.planes.map(|plane| plane.dot(p));
        PlaneDistances {
            left: d[0],
            right: d[1],
            bottom: d[2],
            top: d[3],
            near: d[4],
            far: d[5],
        }
    }

    /// Whether the world point lies inside or on the frustum.
    pub fn contains_point(&self, p: DVec3) -> bool {
        self.planes.iter().all(|plane| plane.dot(p.extend(1.0)) >= 0.0)
    }

    /// Camera eye position.
    pub fn viewpoint(&self) -> DVec3 {
        self.viewpoint
    }

    /// Camera look-at target.
    pub fn targetpoint(&self) -> DVec3 {
        self.targetpoint
    }

    /// World position of the clip-space origin, on the view axis between
    /// the near and far planes.
    pub fn centerpoint(&self) -> DVec3 {
        self.centerpoint
    }
}
