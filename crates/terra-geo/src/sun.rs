//! Low-precision solar ephemeris, good to a fraction of a degree. Used to
//! decide whether a point on the globe is on the night side.

use glam::DVec3;

const MILLIS_PER_DAY: f64 = 86_400_000.0;
/// Julian date of the Unix epoch.
const JD_UNIX_EPOCH: f64 = 2_440_587.5;
/// Julian date of J2000.0.
const JD_J2000: f64 = 2_451_545.0;
/// Mean earth-sun distance (meters).
const SUN_DISTANCE: f64 = 1.496e11;

fn julian_date(unix_millis: f64) -> f64 {
    unix_millis / MILLIS_PER_DAY + JD_UNIX_EPOCH
}

/// Greenwich mean sidereal time in radians.
fn gmst(jd: f64) -> f64 {
    let d = jd - JD_J2000;
    (280.460_618_37 + 360.985_647_366_29 * d)
        .rem_euclid(360.0)
        .to_radians()
}

fn sun_eci(jd: f64) -> DVec3 {
    let n = jd - JD_J2000;
    let mean_lon = (280.460 + 0.985_647_4 * n).rem_euclid(360.0);
    let anomaly = (357.528 + 0.985_600_3 * n).rem_euclid(360.0).to_radians();
    let ecliptic_lon = (mean_lon + 1.915 * anomaly.sin() + 0.020 * (2.0 * anomaly).sin())
        .rem_euclid(360.0)
        .to_radians();
    let obliquity = (23.439 - 0.000_000_4 * n).to_radians();

    DVec3::new(
        SUN_DISTANCE * ecliptic_lon.cos(),
        SUN_DISTANCE * obliquity.cos() * ecliptic_lon.sin(),
        SUN_DISTANCE * obliquity.sin() * ecliptic_lon.sin(),
    )
}

/// Sun position in ECEF meters at the given Unix time (milliseconds).
pub fn sun_position_ecef(unix_millis: f64) -> DVec3 {
    let jd = julian_date(unix_millis);
    let (sin_g, cos_g) = gmst(jd).sin_cos();
    let eci = sun_eci(jd);
    DVec3::new(
        eci.x * cos_g + eci.y * sin_g,
        -eci.x * sin_g + eci.y * cos_g,
        eci.z,
    )
}

/// Whether `point` (ECEF) lies on the hemisphere facing away from `sun`.
pub fn is_night_at(point: DVec3, sun: DVec3) -> bool {
    point.dot(sun) < 0.0
}
