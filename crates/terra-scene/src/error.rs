//! Errors raised while building or mutating the scene.

/// Rejected scene parameters or a numerically degenerate camera.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SceneError {
    /// Projection parameters outside their valid ranges.
    #[error("invalid projection: {0}")]
    InvalidProjection(&'static str),

    /// The camera position, target and up vector do not define a view.
    #[error("degenerate camera: {0}")]
    DegenerateCamera(&'static str),

    /// A matrix required for the frame could not be inverted.
    #[error("singular {0} matrix")]
    SingularMatrix(&'static str),

    /// The camera or projection changed after the last refresh.
    #[error("scene changed since the last refresh")]
    Stale,

    /// Viewport width or height is not a positive finite number.
    #[error("invalid viewport {width}x{height}")]
    InvalidViewport { width: f64, height: f64 },
}
