//! # Geodetic Utilities
//!
//! The distance engine shared by every waypoint reducer.
//!
//! All reducers measure tolerances in meters on the Earth's surface, so the
//! quality/speed trade-off of the underlying distance formula matters. Three
//! variants are offered via [`DistanceAlgorithm`]:
//!
//! | Variant | Formula | Use case |
//! |---------|---------|----------|
//! | [`DistanceAlgorithm::SmallDistanceApproximation`] | flat-plane with cos(lat) scaling | adjacent points, sub-km spans |
//! | [`DistanceAlgorithm::Haversine`] | great-circle on a sphere | general purpose (default) |
//! | [`DistanceAlgorithm::Vincenty`] | ellipsoidal geodesic | long spans, highest accuracy |
//!
//! The spherical and ellipsoidal variants delegate to the `geo` crate
//! ([`geo::Haversine`] and [`geo::Geodesic`]); the flat-plane variant uses a
//! cheap-ruler style first-order correction over the WGS84 radii, which stays
//! within centimeters of the geodesic result for spans under a kilometer.
//!
//! When both points carry an elevation, the elevation difference is folded in
//! by Pythagoras; elevation-less points are treated as being at the same
//! height.
//!
//! All functions are pure and total: coincident or otherwise degenerate
//! inputs yield `0.0`, never NaN.

use geo::{Bearing, Distance, Geodesic, Haversine, Point};

use crate::GeoPoint;

/// Mean Earth radius used for spherical cross-track math, in meters.
pub const EARTH_AVERAGE_RADIUS: f64 = 6_372_795.477598;

/// WGS84 semi-major axis (equatorial radius), in meters.
pub const EARTH_LONG_RADIUS: f64 = 6_378_137.0;

/// WGS84 semi-minor axis (polar radius), in meters.
pub const EARTH_SHORT_RADIUS: f64 = EARTH_LONG_RADIUS * (1.0 - 1.0 / 298.257_223_563);

/// Selects the point-to-point distance formula.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DistanceAlgorithm {
    /// Flat-plane approximation, longitude scaled by cos(latitude).
    /// Cheapest; accurate enough for adjacent-point comparisons.
    SmallDistanceApproximation,
    /// Great-circle distance on a sphere of mean radius.
    #[default]
    Haversine,
    /// Ellipsoidal geodesic distance (Vincenty-class accuracy).
    Vincenty,
}

fn to_geo(p: &GeoPoint) -> Point {
    Point::new(p.longitude, p.latitude)
}

fn elevation_delta(p1: &GeoPoint, p2: &GeoPoint) -> f64 {
    match (p1.elevation, p2.elevation) {
        (Some(e1), Some(e2)) => e2 - e1,
        _ => 0.0,
    }
}

/// Distance between two points in meters, using the requested formula.
///
/// The elevation difference is included via Pythagoras when both points
/// carry one. Identical points always yield `0.0`.
///
/// # Example
///
/// ```rust
/// use track_reducer::{GeoPoint, geo_utils::{distance, DistanceAlgorithm}};
///
/// let london = GeoPoint::new(51.5074, -0.1278);
/// let paris = GeoPoint::new(48.8566, 2.3522);
///
/// let dist = distance(&london, &paris, DistanceAlgorithm::Haversine);
/// assert!((dist - 343_560.0).abs() < 2000.0); // ~344 km
/// ```
pub fn distance(p1: &GeoPoint, p2: &GeoPoint, algorithm: DistanceAlgorithm) -> f64 {
    match algorithm {
        DistanceAlgorithm::SmallDistanceApproximation => small_distance_approximation(p1, p2),
        DistanceAlgorithm::Haversine => {
            with_elevation(Haversine::distance(to_geo(p1), to_geo(p2)), p1, p2)
        }
        DistanceAlgorithm::Vincenty => {
            with_elevation(Geodesic::distance(to_geo(p1), to_geo(p2)), p1, p2)
        }
    }
}

fn with_elevation(surface_distance: f64, p1: &GeoPoint, p2: &GeoPoint) -> f64 {
    let dz = elevation_delta(p1, p2);
    if dz == 0.0 {
        surface_distance
    } else {
        (surface_distance * surface_distance + dz * dz).sqrt()
    }
}

/// Flat-plane distance with cheap-ruler style first-order corrections.
///
/// Reference: <https://github.com/mapbox/cheap-ruler> (first correction
/// term only).
fn small_distance_approximation(p1: &GeoPoint, p2: &GeoPoint) -> f64 {
    let lat1 = p1.latitude.to_radians();
    let lat2 = p2.latitude.to_radians();
    let dlat = lat2 - lat1;
    let dlon = (p2.longitude - p1.longitude).to_radians();
    let lat_avg = (lat1 + lat2) / 2.0;

    let cos_avg = lat_avg.cos();
    let cos_avg2 = cos_avg * cos_avg;
    let dx = EARTH_SHORT_RADIUS * (1.0 - 0.00509 * (2.0 * cos_avg2 - 1.0)) * dlat;
    let dy = EARTH_LONG_RADIUS * (cos_avg - 0.00085 * cos_avg * (4.0 * cos_avg2 - 3.0)) * dlon;
    let dz = elevation_delta(p1, p2);

    (dx * dx + dy * dy + dz * dz).sqrt()
}

/// Initial bearing from `p1` to `p2` in degrees, normalized to `[0, 360)`.
pub fn bearing(p1: &GeoPoint, p2: &GeoPoint) -> f64 {
    let raw = Haversine::bearing(to_geo(p1), to_geo(p2));
    (raw % 360.0 + 360.0) % 360.0
}

/// Shortest distance from `p` to the line through `a` and `b`, in meters.
///
/// For [`DistanceAlgorithm::SmallDistanceApproximation`] the three points
/// are projected into a local flat frame around `a` and the planar
/// point-to-line distance is returned. For the great-circle variants the
/// classic cross-track formula over bearings is used.
///
/// A degenerate chord (`a == b`) falls back to the distance from `p` to `a`.
pub fn perpendicular_distance(
    p: &GeoPoint,
    a: &GeoPoint,
    b: &GeoPoint,
    algorithm: DistanceAlgorithm,
) -> f64 {
    match algorithm {
        DistanceAlgorithm::SmallDistanceApproximation => planar_line_distance(p, a, b),
        _ => cross_track_distance(p, a, b, algorithm),
    }
}

/// Planar point-to-infinite-line distance in a local flat frame around `a`.
fn planar_line_distance(p: &GeoPoint, a: &GeoPoint, b: &GeoPoint) -> f64 {
    let cos_lat = a.latitude.to_radians().cos();
    let meters_per_degree = EARTH_AVERAGE_RADIUS.to_radians();

    let flat = |pt: &GeoPoint| -> (f64, f64) {
        (
            (pt.latitude - a.latitude) * meters_per_degree,
            (pt.longitude - a.longitude) * cos_lat * meters_per_degree,
        )
    };

    let (bx, by) = flat(b);
    let (px, py) = flat(p);

    let chord_len = (bx * bx + by * by).sqrt();
    if chord_len == 0.0 {
        return distance(p, a, DistanceAlgorithm::SmallDistanceApproximation);
    }

    (bx * py - by * px).abs() / chord_len
}

/// Spherical cross-track distance from `p` to the great circle through
/// `a` and `b`.
///
/// Reference: <https://github.com/chrisveness/geodesy/blob/master/latlon-spherical.js>
fn cross_track_distance(
    p: &GeoPoint,
    a: &GeoPoint,
    b: &GeoPoint,
    algorithm: DistanceAlgorithm,
) -> f64 {
    let dist_ap = distance(a, p, algorithm);
    if dist_ap == 0.0 {
        return 0.0;
    }
    // Zero-length chord: no great circle is defined, use plain distance.
    if a.latitude == b.latitude && a.longitude == b.longitude {
        return dist_ap;
    }

    let mean_elevation = (p.elevation.unwrap_or(0.0)
        + a.elevation.unwrap_or(0.0)
        + b.elevation.unwrap_or(0.0))
        / 3.0;
    let effective_radius = EARTH_AVERAGE_RADIUS + mean_elevation;

    let d13 = dist_ap / effective_radius;
    let t13 = bearing(a, p).to_radians();
    let t12 = bearing(a, b).to_radians();

    ((d13.sin() * (t13 - t12).sin()).asin() * effective_radius).abs()
}

/// Area of the triangle spanned by three points, in square meters.
///
/// Heron's formula over the three pairwise distances. Any coincident pair
/// of points, or a numerically negative discriminant from a near-degenerate
/// (colinear) triangle, yields `0.0`.
pub fn triangle_area(
    a: &GeoPoint,
    b: &GeoPoint,
    c: &GeoPoint,
    algorithm: DistanceAlgorithm,
) -> f64 {
    let dist_ab = distance(a, b, algorithm);
    let dist_ac = distance(a, c, algorithm);
    let dist_bc = distance(b, c, algorithm);
    if dist_ab == 0.0 || dist_ac == 0.0 || dist_bc == 0.0 {
        return 0.0;
    }

    let s = (dist_ab + dist_ac + dist_bc) / 2.0;
    let discriminant = s * (s - dist_ab) * (s - dist_ac) * (s - dist_bc);
    if discriminant <= 0.0 {
        return 0.0;
    }
    discriminant.sqrt()
}

/// Total length of a track in meters (haversine between consecutive points).
pub fn polyline_length(points: &[GeoPoint]) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }

    points
        .windows(2)
        .map(|w| distance(&w[0], &w[1], DistanceAlgorithm::Haversine))
        .sum()
}

/// Signed duration from `p1` to `p2` in seconds; `0.0` when either point
/// has no timestamp.
pub fn duration(p1: &GeoPoint, p2: &GeoPoint) -> f64 {
    match (p1.time, p2.time) {
        (Some(t1), Some(t2)) => {
            let millis = (t2 - t1).num_milliseconds();
            millis as f64 / 1000.0
        }
        _ => 0.0,
    }
}

/// Average speed between two points in km/h.
///
/// Always non-negative; `0.0` when timestamps are missing or equal.
pub fn speed(p1: &GeoPoint, p2: &GeoPoint) -> f64 {
    let seconds = duration(p1, p2);
    if seconds == 0.0 {
        return 0.0;
    }
    let meters = distance(p1, p2, DistanceAlgorithm::Haversine);
    (meters / seconds * 3.6).abs()
}

/// Elevation difference `p2 − p1` in meters; `0.0` when either is missing.
pub fn elevation_diff(p1: &GeoPoint, p2: &GeoPoint) -> f64 {
    elevation_delta(p1, p2)
}

/// Slope from `p1` to `p2` in percent; `0.0` over zero horizontal distance.
pub fn slope(p1: &GeoPoint, p2: &GeoPoint) -> f64 {
    let dist = distance(p1, p2, DistanceAlgorithm::Haversine);
    if dist == 0.0 {
        return 0.0;
    }
    elevation_delta(p1, p2) / dist * 100.0
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
        (a - b).abs() < epsilon
    }

    #[test]
    fn test_distance_same_point_all_algorithms() {
        let p = GeoPoint::new(51.5074, -0.1278);
        for algo in [
            DistanceAlgorithm::SmallDistanceApproximation,
            DistanceAlgorithm::Haversine,
            DistanceAlgorithm::Vincenty,
        ] {
            assert_eq!(distance(&p, &p, algo), 0.0);
        }
    }

    #[test]
    fn test_haversine_known_value() {
        // London to Paris is approximately 344 km
        let london = GeoPoint::new(51.5074, -0.1278);
        let paris = GeoPoint::new(48.8566, 2.3522);
        let dist = distance(&london, &paris, DistanceAlgorithm::Haversine);
        assert!(approx_eq(dist, 343_560.0, 1000.0));
    }

    #[test]
    fn test_small_distance_matches_haversine_at_short_range() {
        // ~100m apart, the flat approximation should agree within a meter
        let p1 = GeoPoint::new(51.5074, -0.1278);
        let p2 = GeoPoint::new(51.5083, -0.1278);
        let flat = distance(&p1, &p2, DistanceAlgorithm::SmallDistanceApproximation);
        let sphere = distance(&p1, &p2, DistanceAlgorithm::Haversine);
        assert!(approx_eq(flat, sphere, 1.0), "flat={flat} sphere={sphere}");
    }

    #[test]
    fn test_vincenty_close_to_haversine() {
        let london = GeoPoint::new(51.5074, -0.1278);
        let paris = GeoPoint::new(48.8566, 2.3522);
        let sphere = distance(&london, &paris, DistanceAlgorithm::Haversine);
        let ellipsoid = distance(&london, &paris, DistanceAlgorithm::Vincenty);
        // Within 0.5% of each other
        assert!((sphere - ellipsoid).abs() / sphere < 0.005);
    }

    #[test]
    fn test_elevation_folded_in() {
        let p1 = GeoPoint::new(51.5074, -0.1278).with_elevation(0.0);
        let p2 = GeoPoint::new(51.5074, -0.1278).with_elevation(100.0);
        // Same surface position, 100m apart vertically
        let dist = distance(&p1, &p2, DistanceAlgorithm::Haversine);
        assert!(approx_eq(dist, 100.0, 1e-6));
    }

    #[test]
    fn test_perpendicular_distance_on_chord() {
        // Point on the (equatorial) chord has ~zero perpendicular distance
        let a = GeoPoint::new(0.0, 0.0);
        let b = GeoPoint::new(0.0, 2.0);
        let p = GeoPoint::new(0.0, 1.0);
        for algo in [
            DistanceAlgorithm::SmallDistanceApproximation,
            DistanceAlgorithm::Haversine,
        ] {
            assert!(perpendicular_distance(&p, &a, &b, algo) < 1.0);
        }
    }

    #[test]
    fn test_perpendicular_distance_offset_point() {
        // 0.01 degrees of latitude off an equatorial chord is ~1.11 km
        let a = GeoPoint::new(0.0, 0.0);
        let b = GeoPoint::new(0.0, 2.0);
        let p = GeoPoint::new(0.01, 1.0);
        let d = perpendicular_distance(&p, &a, &b, DistanceAlgorithm::Haversine);
        assert!(approx_eq(d, 1113.0, 15.0), "d={d}");
    }

    #[test]
    fn test_perpendicular_distance_degenerate_chord() {
        let a = GeoPoint::new(51.5, -0.1);
        let p = GeoPoint::new(51.51, -0.1);
        let d = perpendicular_distance(&p, &a, &a, DistanceAlgorithm::Haversine);
        let expected = distance(&p, &a, DistanceAlgorithm::Haversine);
        assert!(approx_eq(d, expected, 1e-6));
    }

    #[test]
    fn test_triangle_area_degenerate() {
        let a = GeoPoint::new(51.5, -0.1);
        let b = GeoPoint::new(51.6, -0.2);
        // Coincident points span no area
        assert_eq!(triangle_area(&a, &a, &b, DistanceAlgorithm::Haversine), 0.0);
        // Colinear points span (numerically) no area
        let c1 = GeoPoint::new(0.0, 0.0);
        let c2 = GeoPoint::new(0.0, 0.001);
        let c3 = GeoPoint::new(0.0, 0.002);
        assert!(triangle_area(&c1, &c2, &c3, DistanceAlgorithm::SmallDistanceApproximation) < 1.0);
    }

    #[test]
    fn test_triangle_area_right_triangle() {
        // Legs of ~111m each at the equator, expect ~area of legs/2
        let a = GeoPoint::new(0.0, 0.0);
        let b = GeoPoint::new(0.001, 0.0);
        let c = GeoPoint::new(0.0, 0.001);
        let area = triangle_area(&a, &b, &c, DistanceAlgorithm::SmallDistanceApproximation);
        let leg = distance(&a, &b, DistanceAlgorithm::SmallDistanceApproximation);
        assert!(approx_eq(area, leg * leg / 2.0, leg * leg * 0.01));
    }

    #[test]
    fn test_bearing_normalized() {
        let p1 = GeoPoint::new(52.205, 0.119);
        let p2 = GeoPoint::new(48.857, 2.351);
        let b = bearing(&p1, &p2);
        assert!((0.0..360.0).contains(&b));
        assert!(approx_eq(b, 156.2, 0.5));
    }

    #[test]
    fn test_duration_and_speed() {
        let t1 = Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).unwrap();
        let t2 = Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 36).unwrap();
        let p1 = GeoPoint::new(0.0, 0.0).with_time(t1);
        // ~111m east over 36s -> ~11.1 km/h
        let p2 = GeoPoint::new(0.0, 0.001).with_time(t2);

        assert_eq!(duration(&p1, &p2), 36.0);
        assert!(approx_eq(speed(&p1, &p2), 11.1, 0.2));
    }

    #[test]
    fn test_speed_without_timestamps() {
        let p1 = GeoPoint::new(0.0, 0.0);
        let p2 = GeoPoint::new(0.0, 0.001);
        assert_eq!(speed(&p1, &p2), 0.0);
    }

    #[test]
    fn test_slope() {
        let p1 = GeoPoint::new(0.0, 0.0).with_elevation(100.0);
        let p2 = GeoPoint::new(0.0, 0.001).with_elevation(111.0);
        // ~11m rise over ~111m run is ~10%
        assert!(approx_eq(slope(&p1, &p2), 10.0, 0.3));
        // Coincident points: no slope rather than a division by zero
        assert_eq!(slope(&p1, &p1), 0.0);
    }

    #[test]
    fn test_polyline_length() {
        let empty: Vec<GeoPoint> = vec![];
        assert_eq!(polyline_length(&empty), 0.0);

        let track = vec![
            GeoPoint::new(51.5074, -0.1278),
            GeoPoint::new(51.5080, -0.1280),
        ];
        let length = polyline_length(&track);
        assert!(length > 0.0 && length < 100.0);
    }
}
