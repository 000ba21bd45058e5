//! Target zoom level from camera altitude.

use std::f64::consts::PI;

use terra_geo::EARTH_RADIUS;

/// Edge length in pixels of the source tiles the level relation assumes.
pub const REFERENCE_TILE_SIZE: f64 = 256.0;

/// Continuous web-map zoom at which one source pixel covers the ground
/// seen by one screen pixel from `altitude` meters.
///
/// Non-positive altitudes give `+∞`.
pub fn zoom_for_altitude(altitude: f64, tile_size: f64) -> f64 {
    if altitude <= 0.0 {
        return f64::INFINITY;
    }
    let initial_resolution = 2.0 * PI * EARTH_RADIUS / tile_size;
    let ground_resolution = altitude * 2.0 / tile_size;
    (initial_resolution / ground_resolution).log2() + 1.0
}

/// [`zoom_for_altitude`] rounded up and clamped to `[min_level, max_level]`.
pub fn tile_level_for_altitude(altitude: f64, tile_size: f64, min_level: u8, max_level: u8) -> u8 {
    let zoom = zoom_for_altitude(altitude, tile_size);
    if zoom.is_nan() {
        return min_level;
    }
    zoom.ceil()
        .max(f64::from(min_level))
        .min(f64::from(max_level)) as u8
}
