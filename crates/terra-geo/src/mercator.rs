//! Spherical Web-Mercator (EPSG:3857) projection.

use glam::DVec2;
use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, PI};

use crate::EARTH_RADIUS;

/// Latitude (degrees) at which the Web-Mercator square is clipped.
pub const MERCATOR_MAX_LAT: f64 = 85.051_128_779_806_6;

/// Half the width of the Web-Mercator square (meters), about 20037508.34.
pub const MERCATOR_HALF_EXTENT: f64 = PI * EARTH_RADIUS;

/// Project longitude/latitude (degrees) to Web-Mercator meters. Latitude is
/// clamped to [`MERCATOR_MAX_LAT`].
pub fn lonlat_to_mercator(lon_deg: f64, lat_deg: f64) -> DVec2 {
    let lat = lat_deg.clamp(-MERCATOR_MAX_LAT, MERCATOR_MAX_LAT).to_radians();
    let x = EARTH_RADIUS * lon_deg.to_radians();
    let y = EARTH_RADIUS * (FRAC_PI_4 + lat * 0.5).tan().ln();
    DVec2::new(x, y)
}

/// Inverse of [`lonlat_to_mercator`]. Returns `(lon, lat)` in degrees.
pub fn mercator_to_lonlat(p: DVec2) -> DVec2 {
    DVec2::new((p.x / EARTH_RADIUS).to_degrees(), mercator_y_to_lat(p.y))
}

/// Latitude (degrees) of a Web-Mercator northing.
pub fn mercator_y_to_lat(y: f64) -> f64 {
    (2.0 * (y / EARTH_RADIUS).exp().atan() - FRAC_PI_2).to_degrees()
}
