use geo::{Coord, LineString, SimplifyIdx};
use serde::{Deserialize, Serialize};

use crate::error::{ensure_finite, TrackerError, TrackerResult};
use crate::geodesy::{latlon_to_meters, normalize_longitude, unwrap_longitude};
use crate::types::{lat_lon, GeoFix, LatLon, SmoothedRoute};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmoothingConfig {
    /// Douglas-Peucker perpendicular distance threshold (m).
    pub simplify_tolerance_m: f64,
    /// Interpolated points generated per simplified segment.
    pub segments_per_interval: usize,
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            simplify_tolerance_m: 5.0,
            segments_per_interval: 8,
        }
    }
}

/// Post-session route smoothing: Douglas-Peucker simplification followed by
/// a Catmull-Rom spline through the surviving points.
///
/// Fail-soft: any numeric problem returns the input unchanged. The first
/// and last output points always equal the first and last input points.
#[derive(Clone, Debug, Default)]
pub struct RouteSmoother {
    config: SmoothingConfig,
}

impl RouteSmoother {
    pub fn new(config: SmoothingConfig) -> Self {
        Self { config }
    }

    pub fn smooth(&self, latitudes: &[f64], longitudes: &[f64]) -> (Vec<f64>, Vec<f64>) {
        self.smooth_with(
            latitudes,
            longitudes,
            self.config.simplify_tolerance_m,
            self.config.segments_per_interval,
        )
    }

    pub fn smooth_with(
        &self,
        latitudes: &[f64],
        longitudes: &[f64],
        simplify_tolerance_m: f64,
        segments_per_interval: usize,
    ) -> (Vec<f64>, Vec<f64>) {
        let identity = || (latitudes.to_vec(), longitudes.to_vec());

        if latitudes.len() != longitudes.len() || latitudes.len() < 2 {
            return identity();
        }

        match smooth_points(latitudes, longitudes, simplify_tolerance_m, segments_per_interval) {
            Ok(smoothed) => smoothed,
            Err(err) => {
                log::warn!("route smoothing failed, keeping raw route: {err}");
                identity()
            }
        }
    }

    pub fn smooth_route(&self, fixes: &[GeoFix]) -> SmoothedRoute {
        let latitudes: Vec<f64> = fixes.iter().map(|f| f.latitude).collect();
        let longitudes: Vec<f64> = fixes.iter().map(|f| f.longitude).collect();
        let (latitudes, longitudes) = self.smooth(&latitudes, &longitudes);
        SmoothedRoute {
            latitudes,
            longitudes,
        }
    }
}

fn smooth_points(
    latitudes: &[f64],
    longitudes: &[f64],
    simplify_tolerance_m: f64,
    segments_per_interval: usize,
) -> TrackerResult<(Vec<f64>, Vec<f64>)> {
    ensure_finite("route latitude", latitudes)?;
    ensure_finite("route longitude", longitudes)?;
    if !simplify_tolerance_m.is_finite() {
        return Err(TrackerError::InvalidParameters(format!(
            "simplify tolerance {simplify_tolerance_m}"
        )));
    }

    let points: Vec<LatLon> = latitudes
        .iter()
        .zip(longitudes)
        .map(|(&lat, &lon)| lat_lon(lat, lon))
        .collect();

    let kept = simplify(&points, simplify_tolerance_m);
    let control: Vec<LatLon> = kept.iter().map(|&i| points[i]).collect();

    let segments = segments_per_interval.max(1);
    let mut out_lat = Vec::with_capacity((control.len() - 1) * segments + 1);
    let mut out_lon = Vec::with_capacity(out_lat.capacity());

    for i in 0..control.len() - 1 {
        let p0 = control[i.saturating_sub(1)];
        let p1 = control[i];
        let p2 = control[i + 1];
        let p3 = control[(i + 2).min(control.len() - 1)];

        // blend in a longitude frame continuous around this segment's start
        let [p0, p2, p3] = [p0, p2, p3].map(|p| lat_lon(p.x, unwrap_longitude(p.y, p1.y)));

        for s in 0..segments {
            let t = s as f64 / segments as f64;
            let q = catmull_rom(p0, p1, p2, p3, t);
            out_lat.push(q.x.clamp(-90.0, 90.0));
            out_lon.push(normalize_longitude(q.y));
        }
    }
    out_lat.push(latitudes[latitudes.len() - 1]);
    out_lon.push(longitudes[longitudes.len() - 1]);

    ensure_finite("smoothed latitude", &out_lat)?;
    ensure_finite("smoothed longitude", &out_lon)?;

    out_lat[0] = latitudes[0];
    out_lon[0] = longitudes[0];
    Ok((out_lat, out_lon))
}

/// Indices of the points kept by Douglas-Peucker, run in a local metric
/// frame so the tolerance is in meters. Always includes both endpoints.
fn simplify(points: &[LatLon], tolerance_m: f64) -> Vec<usize> {
    let origin = points[0];
    let mut prev_lon = origin.y;
    let coords: Vec<Coord<f64>> = points
        .iter()
        .map(|p| {
            let lon = unwrap_longitude(p.y, prev_lon);
            prev_lon = lon;
            let en = latlon_to_meters(p.x, lon, origin.x, origin.y);
            Coord { x: en.x, y: en.y }
        })
        .collect();

    let kept = LineString::new(coords).simplify_idx(&tolerance_m);
    if kept.len() < 2 {
        // fully coincident input collapses; keep the endpoints
        return vec![0, points.len() - 1];
    }
    kept
}

/// Uniform Catmull-Rom: passes through `p1` at t=0 and `p2` at t=1.
fn catmull_rom(p0: LatLon, p1: LatLon, p2: LatLon, p3: LatLon, t: f64) -> LatLon {
    let t2 = t * t;
    let t3 = t2 * t;
    (p1 * 2.0
        + (p2 - p0) * t
        + (p0 * 2.0 - p1 * 5.0 + p2 * 4.0 - p3) * t2
        + (p1 * 3.0 - p0 - p2 * 3.0 + p3) * t3)
        * 0.5
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geodesy::haversine_distance;
    use approx::assert_abs_diff_eq;

    fn zigzag(n: usize) -> (Vec<f64>, Vec<f64>) {
        // ~20 m eastward steps with ±15 m north/south swings
        let lats = (0..n)
            .map(|i| 37.5 + if i % 2 == 0 { 0.0 } else { 0.000135 })
            .collect();
        let lons = (0..n).map(|i| 127.0 + i as f64 * 0.000226).collect();
        (lats, lons)
    }

    #[test]
    fn test_endpoints_preserved_exactly() {
        let (lats, lons) = zigzag(9);
        let (out_lat, out_lon) = RouteSmoother::default().smooth(&lats, &lons);
        assert!(out_lat.len() > lats.len());
        assert_eq!(out_lat[0], lats[0]);
        assert_eq!(out_lon[0], lons[0]);
        assert_eq!(*out_lat.last().unwrap(), *lats.last().unwrap());
        assert_eq!(*out_lon.last().unwrap(), *lons.last().unwrap());
    }

    #[test]
    fn test_degenerate_inputs_returned_unchanged() {
        let smoother = RouteSmoother::default();
        assert_eq!(smoother.smooth(&[], &[]), (vec![], vec![]));
        assert_eq!(smoother.smooth(&[1.0], &[2.0]), (vec![1.0], vec![2.0]));
        assert_eq!(
            smoother.smooth(&[1.0, 1.1], &[2.0]),
            (vec![1.0, 1.1], vec![2.0])
        );
    }

    #[test]
    fn test_collinear_points_simplify_to_single_segment() {
        let lats: Vec<f64> = (0..20).map(|i| 10.0 + i as f64 * 0.0001).collect();
        let lons = vec![20.0; 20];
        let (out_lat, out_lon) = RouteSmoother::default().smooth(&lats, &lons);
        // one interval * 8 segments + closing point
        assert_eq!(out_lat.len(), 9);
        for lon in &out_lon {
            assert_abs_diff_eq!(*lon, 20.0, epsilon = 1e-12);
        }
        for pair in out_lat.windows(2) {
            assert!(pair[1] >= pair[0]);
        }
    }

    #[test]
    fn test_spline_passes_through_control_points() {
        let (lats, lons) = zigzag(5);
        let (out_lat, out_lon) = RouteSmoother::default().smooth_with(&lats, &lons, 0.0, 4);
        assert_eq!(out_lat.len(), 4 * 4 + 1);
        for (k, (lat, lon)) in lats.iter().zip(&lons).enumerate() {
            assert_abs_diff_eq!(out_lat[k * 4], *lat, epsilon = 1e-12);
            assert_abs_diff_eq!(out_lon[k * 4], *lon, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_two_points_interpolate_along_chord() {
        let (out_lat, out_lon) =
            RouteSmoother::default().smooth(&[0.0, 0.0008], &[0.0, 0.0]);
        assert_eq!(out_lat.len(), 9);
        assert_abs_diff_eq!(out_lat[4], 0.0004, epsilon = 1e-12);
        assert!(out_lon.iter().all(|lon| *lon == 0.0));
    }

    #[test]
    fn test_antimeridian_crossing() {
        let lats = vec![0.0, 0.00005, 0.0001, 0.00015];
        let lons = vec![179.9997, 179.9999, -179.9998, -179.9996];
        let (out_lat, out_lon) = RouteSmoother::default().smooth_with(&lats, &lons, 0.0, 8);

        let total: f64 = lats
            .windows(2)
            .zip(lons.windows(2))
            .map(|(la, lo)| haversine_distance(la[0], lo[0], la[1], lo[1]))
            .sum();
        assert!(total < 100.0);

        assert!(out_lon.iter().all(|lon| (-180.0..=180.0).contains(lon)));
        for i in 1..out_lat.len() {
            let hop = haversine_distance(out_lat[i - 1], out_lon[i - 1], out_lat[i], out_lon[i]);
            assert!(hop < total, "hop {hop} m at {i}");
        }
        assert_eq!(out_lon[0], 179.9997);
        assert_eq!(*out_lon.last().unwrap(), -179.9996);
    }

    #[test]
    fn test_non_finite_input_falls_back_to_raw() {
        let lats = vec![1.0, f64::NAN, 1.2];
        let lons = vec![2.0, 2.1, 2.2];
        let (out_lat, out_lon) = RouteSmoother::default().smooth(&lats, &lons);
        assert_eq!(out_lon, lons);
        assert_eq!(out_lat.len(), 3);
        assert!(out_lat[1].is_nan());
    }

    #[test]
    fn test_coincident_points_keep_endpoints() {
        let (out_lat, out_lon) = RouteSmoother::default().smooth(&[5.0; 4], &[6.0; 4]);
        assert_eq!(out_lat.first(), Some(&5.0));
        assert_eq!(out_lon.last(), Some(&6.0));
        assert!(out_lat.iter().all(|lat| *lat == 5.0));
    }

    #[test]
    fn test_smooth_route_from_fixes() {
        let fixes: Vec<GeoFix> = (0..6)
            .map(|i| GeoFix::new(37.5 + i as f64 * 0.0001, 127.0, Some(5.0), i * 1_000))
            .collect();
        let route = RouteSmoother::default().smooth_route(&fixes);
        assert_eq!(route.first(), Some((37.5, 127.0)));
        assert_eq!(route.last(), Some(fixes[5].coordinate()));
    }
}
