//! Headless globe viewer: a simulated clock, earth rotation and a
//! fixed-timestep frame loop driving the tile scheduler against a renderer
//! that only counts what it is asked to draw.

pub mod clock;
pub mod earth_rotation;
pub mod frame_loop;
pub mod globe;
pub mod headless;

pub use clock::Clock;
pub use earth_rotation::{DEFAULT_EARTH_ROTATION_VELOCITY, EarthRotation};
pub use frame_loop::{FIXED_DT, FrameLoop, MAX_FRAME_TIME};
pub use globe::{AppError, GlobeSession, lod_params, source_info};
pub use headless::{DrawRecord, HeadlessRenderer, RunSummary};
