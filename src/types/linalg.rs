//! Planar point types for route geometry
//!
//! Spline control points are (lat, lon) pairs blended component-wise,
//! so a 2-vector keeps the cubic blend as one expression.

use nalgebra::Vector2;

/// (latitude, longitude) in degrees
pub type LatLon = Vector2<f64>;

/// Local east/north offset in meters
pub type EastNorth = Vector2<f64>;

#[inline]
pub fn lat_lon(lat: f64, lon: f64) -> LatLon {
    LatLon::new(lat, lon)
}
