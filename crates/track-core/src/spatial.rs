//! Great-circle math on a spherical earth.
//!
//! Distances are in meters, bearings in degrees clockwise from true north.

use crate::error::{Result, TrackError};
use crate::models::Waypoint;
use nalgebra::Vector3;

pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Points closer than this are considered coincident.
pub const COINCIDENT_M: f64 = 1e-6;

/// Segments shorter than this have no usable direction.
pub const MIN_SEGMENT_LENGTH_M: f64 = 1e-3;

/// Calculate distance between two points in meters using Haversine formula.
///
/// # Arguments
/// * `lat1`, `lon1` - First point coordinates in decimal degrees
/// * `lat2`, `lon2` - Second point coordinates in decimal degrees
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let dphi = (lat2 - lat1).to_radians();
    let dlambda = (lon2 - lon1).to_radians();
    let a = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * a.sqrt().atan2((1.0 - a).sqrt())
}

/// Great-circle distance between two waypoints, always >= 0.
pub fn distance(a: &Waypoint, b: &Waypoint) -> f64 {
    haversine_distance(a.lat, a.lon, b.lat, b.lon)
}

pub fn coincident(a: &Waypoint, b: &Waypoint) -> bool {
    distance(a, b) <= COINCIDENT_M
}

/// Normalize a bearing into [0, 360).
pub fn normalize_bearing(deg: f64) -> f64 {
    let b = deg.rem_euclid(360.0);
    if b >= 360.0 {
        0.0
    } else {
        b
    }
}

/// Signed change of course from `from_deg` to `to_deg`, in (-180, 180].
/// Positive is a right turn.
pub fn turn_angle(from_deg: f64, to_deg: f64) -> f64 {
    let delta = (to_deg - from_deg).rem_euclid(360.0);
    if delta > 180.0 {
        delta - 360.0
    } else {
        delta
    }
}

/// Initial bearing from `a` toward `b` in [0, 360).
pub fn initial_bearing(a: &Waypoint, b: &Waypoint) -> Result<f64> {
    a.ensure_located()?;
    b.ensure_located()?;
    if coincident(a, b) {
        return Err(TrackError::degenerate(format!(
            "bearing between coincident waypoints {} and {}",
            a.id, b.id
        )));
    }
    let phi1 = a.lat.to_radians();
    let phi2 = b.lat.to_radians();
    let delta_lambda = (b.lon - a.lon).to_radians();

    let x = delta_lambda.sin() * phi2.cos();
    let y = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * delta_lambda.cos();

    Ok(normalize_bearing(x.atan2(y).to_degrees()))
}

/// Course on arrival at `b` when flying the great circle from `a`.
pub fn final_bearing(a: &Waypoint, b: &Waypoint) -> Result<f64> {
    Ok(normalize_bearing(initial_bearing(b, a)? + 180.0))
}

/// Offset a position by distance and bearing.
///
/// # Returns
/// (new_lat, new_lon) in degrees
pub fn offset_by_bearing(lat: f64, lon: f64, distance_m: f64, bearing_rad: f64) -> (f64, f64) {
    if distance_m.abs() <= f64::EPSILON {
        return (lat, lon);
    }

    let lat1 = lat.to_radians();
    let lon1 = lon.to_radians();
    let angular_distance = distance_m / EARTH_RADIUS_M;

    let sin_lat1 = lat1.sin();
    let cos_lat1 = lat1.cos();
    let sin_ad = angular_distance.sin();
    let cos_ad = angular_distance.cos();

    let sin_lat2 = sin_lat1 * cos_ad + cos_lat1 * sin_ad * bearing_rad.cos();
    let lat2 = sin_lat2.clamp(-1.0, 1.0).asin();

    let y = bearing_rad.sin() * sin_ad * cos_lat1;
    let x = cos_ad - sin_lat1 * sin_lat2;
    let mut lon2 = lon1 + y.atan2(x);
    lon2 =
        (lon2 + std::f64::consts::PI).rem_euclid(2.0 * std::f64::consts::PI) - std::f64::consts::PI;

    (lat2.to_degrees(), lon2.to_degrees())
}

/// Waypoint reached from `a` after `dist_m` meters on `bearing_deg`.
/// The result keeps `a.id`.
pub fn destination_point(a: &Waypoint, bearing_deg: f64, dist_m: f64) -> Waypoint {
    let (lat, lon) = offset_by_bearing(a.lat, a.lon, dist_m, bearing_deg.to_radians());
    a.with_position(lat, lon)
}

/// Signed perpendicular distance of `p` from the great circle `a -> b`.
/// Positive when `p` lies to the right of the direction of travel.
pub fn cross_track_distance(a: &Waypoint, b: &Waypoint, p: &Waypoint) -> Result<f64> {
    let n = path_normal(a, b)?;
    p.ensure_located()?;
    let s = to_nvector(p).dot(&n).clamp(-1.0, 1.0);
    Ok(-s.asin() * EARTH_RADIUS_M)
}

/// Signed distance from `a` to the foot of the perpendicular from `p` onto
/// the great circle `a -> b`, positive in the direction of `b`.
///
/// Fails when `p` is a pole of the circle, where every point of the path is
/// equally far away.
pub fn along_track_distance(a: &Waypoint, b: &Waypoint, p: &Waypoint) -> Result<f64> {
    let n = path_normal(a, b)?;
    p.ensure_located()?;
    let foot = foot_vector(&to_nvector(p), &n).ok_or_else(|| {
        TrackError::degenerate(format!(
            "waypoint {} is a pole of path {} -> {}",
            p.id, a.id, b.id
        ))
    })?;
    let va = to_nvector(a);
    let angle = va.cross(&foot).dot(&n).atan2(va.dot(&foot));
    Ok(angle * EARTH_RADIUS_M)
}

/// Foot of the perpendicular from `p` onto the great circle `a -> b`.
/// The result keeps `p.id`.
pub fn project_onto_path(a: &Waypoint, b: &Waypoint, p: &Waypoint) -> Result<Waypoint> {
    let n = path_normal(a, b)?;
    p.ensure_located()?;
    let foot = foot_vector(&to_nvector(p), &n).ok_or_else(|| {
        TrackError::degenerate(format!("waypoint {} has no projection onto the path", p.id))
    })?;
    let (lat, lon) = from_nvector(&foot);
    Ok(p.with_position(lat, lon))
}

/// Intersection of great circles `a1 -> a2` and `b1 -> b2`.
///
/// Two antipodal candidates exist; the one nearer to `near` is returned.
/// The result carries `near.id`.
pub fn great_circle_intersection(
    a1: &Waypoint,
    a2: &Waypoint,
    b1: &Waypoint,
    b2: &Waypoint,
    near: &Waypoint,
) -> Result<Waypoint> {
    let n1 = path_normal(a1, a2)?;
    let n2 = path_normal(b1, b2)?;
    let mut i = n1.cross(&n2).try_normalize(1e-12).ok_or_else(|| {
        TrackError::degenerate("great circles coincide; no unique intersection")
    })?;
    near.ensure_located()?;
    if i.dot(&to_nvector(near)) < 0.0 {
        i = -i;
    }
    let (lat, lon) = from_nvector(&i);
    Ok(near.with_position(lat, lon))
}

/// Unit normal of the great circle through `a` and `b`.
fn path_normal(a: &Waypoint, b: &Waypoint) -> Result<Vector3<f64>> {
    a.ensure_located()?;
    b.ensure_located()?;
    let normal = if coincident(a, b) {
        None
    } else {
        to_nvector(a).cross(&to_nvector(b)).try_normalize(1e-15)
    };
    normal.ok_or_else(|| {
        TrackError::degenerate(format!(
            "no great circle through coincident or antipodal waypoints {} and {}",
            a.id, b.id
        ))
    })
}

fn foot_vector(p: &Vector3<f64>, n: &Vector3<f64>) -> Option<Vector3<f64>> {
    (p - n * p.dot(n)).try_normalize(1e-15)
}

fn to_nvector(w: &Waypoint) -> Vector3<f64> {
    let phi = w.lat.to_radians();
    let lambda = w.lon.to_radians();
    Vector3::new(phi.cos() * lambda.cos(), phi.cos() * lambda.sin(), phi.sin())
}

fn from_nvector(v: &Vector3<f64>) -> (f64, f64) {
    let lat = v.z.atan2(v.x.hypot(v.y));
    let lon = v.y.atan2(v.x);
    (lat.to_degrees(), lon.to_degrees())
}
