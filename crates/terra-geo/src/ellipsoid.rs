//! WGS84 geodetic <-> earth-centered earth-fixed conversions.

use glam::DVec3;

/// WGS84 semi-major axis (meters).
pub const WGS84_A: f64 = 6_378_137.0;
/// WGS84 flattening.
pub const WGS84_F: f64 = 1.0 / 298.257_223_563;
/// WGS84 semi-minor axis (meters).
pub const WGS84_B: f64 = WGS84_A * (1.0 - WGS84_F);
/// WGS84 first eccentricity squared.
pub const WGS84_E2: f64 = WGS84_F * (2.0 - WGS84_F);
/// WGS84 second eccentricity squared.
pub const WGS84_EP2: f64 = (WGS84_A * WGS84_A - WGS84_B * WGS84_B) / (WGS84_B * WGS84_B);

/// Spherical earth radius used by camera gestures, Web-Mercator and zoom
/// selection. Equal to the WGS84 semi-major axis.
pub const EARTH_RADIUS: f64 = WGS84_A;

/// Distance from the polar axis below which a point is treated as polar.
const POLAR_EPSILON: f64 = 1e-9;

/// Geodetic coordinates: longitude and latitude in degrees, altitude in
/// meters above the ellipsoid.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Geodetic {
    pub lon_deg: f64,
    pub lat_deg: f64,
    pub alt_m: f64,
}

impl Geodetic {
    pub fn new(lon_deg: f64, lat_deg: f64, alt_m: f64) -> Self {
        Self {
            lon_deg,
            lat_deg,
            alt_m,
        }
    }

    /// Convert to an ECEF position.
    pub fn to_ecef(self) -> DVec3 {
        geodetic_to_ecef(self)
    }

    /// Convert from an ECEF position.
    pub fn from_ecef(ecef: DVec3) -> Self {
        ecef_to_geodetic(ecef)
    }
}

pub fn geodetic_to_ecef(geo: Geodetic) -> DVec3 {
    let (sin_lat, cos_lat) = geo.lat_deg.to_radians().sin_cos();
    let (sin_lon, cos_lon) = geo.lon_deg.to_radians().sin_cos();

    let n = WGS84_A / (1.0 - WGS84_E2 * sin_lat * sin_lat).sqrt();
    let x = (n + geo.alt_m) * cos_lat * cos_lon;
    let y = (n + geo.alt_m) * cos_lat * sin_lon;
    let z = (n * (1.0 - WGS84_E2) + geo.alt_m) * sin_lat;

    DVec3::new(x, y, z)
}

/// Bowring's closed-form inverse. Points on (or numerically at) the polar
/// axis resolve to latitude +/-90 with the altitude measured from the pole.
pub fn ecef_to_geodetic(ecef: DVec3) -> Geodetic {
    let p = (ecef.x * ecef.x + ecef.y * ecef.y).sqrt();
    if p < POLAR_EPSILON {
        let lat = if ecef.z < 0.0 { -90.0 } else { 90.0 };
        return Geodetic::new(0.0, lat, ecef.z.abs() - WGS84_B);
    }
    let lon = ecef.y.atan2(ecef.x);

    let theta = (ecef.z * WGS84_A).atan2(p * WGS84_B);
    let (sin_theta, cos_theta) = theta.sin_cos();

    let lat = (ecef.z + WGS84_EP2 * WGS84_B * sin_theta * sin_theta * sin_theta)
        .atan2(p - WGS84_E2 * WGS84_A * cos_theta * cos_theta * cos_theta);

    let (sin_lat, cos_lat) = lat.sin_cos();
    let n = WGS84_A / (1.0 - WGS84_E2 * sin_lat * sin_lat).sqrt();
    let alt = if cos_lat.abs() > 1e-10 {
        p / cos_lat - n
    } else {
        ecef.z.abs() - WGS84_B
    };

    Geodetic::new(lon.to_degrees(), lat.to_degrees(), alt)
}

/// Outward unit normal of the ellipsoid at the given geodetic longitude and
/// latitude.
pub fn surface_normal(lon_deg: f64, lat_deg: f64) -> DVec3 {
    let (sin_lat, cos_lat) = lat_deg.to_radians().sin_cos();
    let (sin_lon, cos_lon) = lon_deg.to_radians().sin_cos();
    DVec3::new(cos_lat * cos_lon, cos_lat * sin_lon, sin_lat)
}
