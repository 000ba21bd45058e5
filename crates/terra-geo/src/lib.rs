//! Geodesy for the globe: the WGS84 ellipsoid, Web-Mercator projection,
//! slippy-map tile addressing and an approximate sun position.
//!
//! All world-space positions are earth-centered earth-fixed (ECEF) meters in
//! `f64`. Longitudes and latitudes are in degrees.

mod ellipsoid;
mod mercator;
mod sun;
mod tile_key;

pub use ellipsoid::{
    EARTH_RADIUS, Geodetic, WGS84_A, WGS84_B, WGS84_E2, WGS84_EP2, WGS84_F, ecef_to_geodetic,
    geodetic_to_ecef, surface_normal,
};
pub use mercator::{
    MERCATOR_HALF_EXTENT, MERCATOR_MAX_LAT, lonlat_to_mercator, mercator_to_lonlat,
    mercator_y_to_lat,
};
pub use sun::{is_night_at, sun_position_ecef};
pub use tile_key::{LonLatBounds, TileKey};
