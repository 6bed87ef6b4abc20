//! Spherical-earth helpers shared by the filters, the estimator and the smoother.

use crate::types::{EastNorth, GeoFix};

pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Great-circle distance in meters.
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).max(0.0).sqrt());
    EARTH_RADIUS_M * c
}

pub fn fix_distance(a: &GeoFix, b: &GeoFix) -> f64 {
    haversine_distance(a.latitude, a.longitude, b.latitude, b.longitude)
}

/// Equirectangular projection around an origin. Good to well under a
/// meter over a walking route; longitudes must already be unwrapped.
pub fn latlon_to_meters(lat: f64, lon: f64, origin_lat: f64, origin_lon: f64) -> EastNorth {
    let d_lat = (lat - origin_lat).to_radians();
    let d_lon = (lon - origin_lon).to_radians();
    EastNorth::new(
        EARTH_RADIUS_M * d_lon * origin_lat.to_radians().cos(),
        EARTH_RADIUS_M * d_lat,
    )
}

/// Shift `lon` by whole turns until it lies within 180° of `reference`.
pub fn unwrap_longitude(lon: f64, reference: f64) -> f64 {
    let mut lon = lon;
    while lon - reference > 180.0 {
        lon -= 360.0;
    }
    while lon - reference < -180.0 {
        lon += 360.0;
    }
    lon
}

/// Wrap a longitude back into [-180, 180].
pub fn normalize_longitude(lon: f64) -> f64 {
    if (-180.0..=180.0).contains(&lon) {
        return lon;
    }
    let wrapped = ((lon + 180.0) % 360.0 + 360.0) % 360.0 - 180.0;
    // -180 and 180 are the same meridian; keep the sign the caller was heading toward
    if wrapped == -180.0 && lon > 0.0 {
        180.0
    } else {
        wrapped
    }
}
