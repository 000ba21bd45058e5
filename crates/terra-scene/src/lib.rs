//! Camera, projection and view frustum of the globe scene.
//!
//! The [`Scene`] owns one [`Camera`] and one [`Projection`]. Gestures mutate
//! the camera; [`Scene::refresh`] notices the change through revision
//! counters and rebuilds the [`Frustum`] and world-to-screen matrix.

pub mod camera;
pub mod error;
pub mod frustum;
pub mod projection;
pub mod scene;

pub use camera::{Camera, CameraChange, rotation_about_line};
pub use error::SceneError;
pub use frustum::{Frustum, Plane, PlaneDistances};
pub use projection::Projection;
pub use scene::{Scene, SceneOptions, Viewport};
