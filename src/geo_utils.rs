//! # Geographic Utilities
//!
//! Spherical helpers shared by the clusterer and the boundary builder.
//!
//! | Function | Description |
//! |----------|-------------|
//! | [`haversine_distance`] | Great-circle distance between two points (meters) |
//! | [`initial_bearing`] | Initial bearing from one point towards another (degrees) |
//! | [`destination_point`] | Point reached from an origin along a bearing |
//! | [`midpoint`] | Great-circle midpoint of two points |
//! | [`km_to_degrees`] | Fixed kilometer-to-degree conversion (111.32 km per degree) |
//! | [`search_window`] | Lat/lng half-widths of a box around a distance circle |
//! | [`compute_bounds`] | Bounding box of a point set |
//! | [`compute_center`] | Arithmetic-mean centroid of a point set |
//!
//! ## Example
//!
//! ```rust
//! use place_clusters::{GeoPoint, geo_utils};
//!
//! let oslo = GeoPoint::new(59.9139, 10.7522);
//! let bergen = GeoPoint::new(60.3913, 5.3221);
//!
//! let km = geo_utils::haversine_distance(&oslo, &bergen) / 1000.0;
//! assert!((km - 305.0).abs() < 10.0);
//!
//! let bearing = geo_utils::initial_bearing(&oslo, &bergen);
//! assert!(bearing > 270.0 && bearing < 300.0); // roughly west-north-west
//! ```
//!
//! ## Coordinate System
//!
//! All functions take WGS84 latitude/longitude in degrees and treat the Earth as
//! a sphere. `geo` works in (x, y) = (longitude, latitude), so conversions flip
//! the order at this boundary and nowhere else.

use geo::{Destination, Distance, Haversine, Point};

use crate::{Bounds, GeoPoint};

/// Kilometers per degree of latitude used for threshold conversion.
pub const KM_PER_DEGREE: f64 = 111.32;

/// Mean Earth radius in meters, matching `geo`'s haversine implementation.
pub const EARTH_RADIUS_M: f64 = 6_371_008.8;

// =============================================================================
// Distance and Direction
// =============================================================================

/// Great-circle distance between two points in meters (spherical Earth, r = 6371 km).
///
/// ```rust
/// use place_clusters::{GeoPoint, geo_utils};
///
/// let p = GeoPoint::new(63.4305, 10.3951);
/// assert_eq!(geo_utils::haversine_distance(&p, &p), 0.0);
/// ```
#[inline]
pub fn haversine_distance(p1: &GeoPoint, p2: &GeoPoint) -> f64 {
    Haversine::distance(to_geo(p1), to_geo(p2))
}

/// Initial bearing from `from` towards `to`, in degrees clockwise from north, in [0, 360).
///
/// Standard atan2 formulation on the sphere:
/// `θ = atan2(sin Δλ · cos φ2, cos φ1 · sin φ2 − sin φ1 · cos φ2 · cos Δλ)`.
pub fn initial_bearing(from: &GeoPoint, to: &GeoPoint) -> f64 {
    let phi1 = from.latitude.to_radians();
    let phi2 = to.latitude.to_radians();
    let delta_lambda = (to.longitude - from.longitude).to_radians();

    let y = delta_lambda.sin() * phi2.cos();
    let x = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * delta_lambda.cos();

    y.atan2(x).to_degrees().rem_euclid(360.0)
}

/// Point reached by travelling `distance_m` meters from `origin` along `bearing_deg`.
#[inline]
pub fn destination_point(origin: &GeoPoint, bearing_deg: f64, distance_m: f64) -> GeoPoint {
    from_geo(Haversine::destination(to_geo(origin), bearing_deg, distance_m))
}

/// Midpoint of the great-circle segment between two points.
///
/// Unlike the arithmetic mean of the coordinates, this lies on the shortest path
/// and is equidistant from both ends. Longitude is normalized to [-180, 180].
pub fn midpoint(p1: &GeoPoint, p2: &GeoPoint) -> GeoPoint {
    let phi1 = p1.latitude.to_radians();
    let phi2 = p2.latitude.to_radians();
    let lambda1 = p1.longitude.to_radians();
    let delta_lambda = (p2.longitude - p1.longitude).to_radians();

    let bx = phi2.cos() * delta_lambda.cos();
    let by = phi2.cos() * delta_lambda.sin();

    let phi_m = (phi1.sin() + phi2.sin()).atan2(((phi1.cos() + bx).powi(2) + by * by).sqrt());
    let lambda_m = lambda1 + by.atan2(phi1.cos() + bx);

    GeoPoint::new(phi_m.to_degrees(), normalize_longitude(lambda_m.to_degrees()))
}

fn normalize_longitude(lng: f64) -> f64 {
    if (-180.0..=180.0).contains(&lng) {
        lng
    } else {
        (lng + 180.0).rem_euclid(360.0) - 180.0
    }
}

// =============================================================================
// Unit Conversion
// =============================================================================

/// Convert kilometers to degrees using the fixed 111.32 km/degree approximation.
///
/// This is the conversion the grid clusterer uses for its cell size. It is exact
/// for latitude and increasingly generous for longitude away from the equator.
#[inline]
pub fn km_to_degrees(km: f64) -> f64 {
    km / KM_PER_DEGREE
}

/// Half-widths (latitude, longitude) in degrees of a box enclosing every point
/// within `distance_m` of a point at `latitude`.
///
/// The longitude half-width is the exact spherical bound
/// `asin(sin(d/R) / cos φ)`, which is wider than the distance measured along the
/// parallel because great circles bow towards the pole. Returns `None` for the
/// longitude when the circle reaches a pole and every longitude is in range.
pub fn search_window(distance_m: f64, latitude: f64) -> (f64, Option<f64>) {
    let angular = distance_m / EARTH_RADIUS_M;
    let lat_deg = angular.to_degrees();

    let cos_lat = latitude.to_radians().cos();
    let sin_angular = angular.min(std::f64::consts::FRAC_PI_2).sin();
    let lng_deg = if sin_angular >= cos_lat {
        None
    } else {
        Some((sin_angular / cos_lat).asin().to_degrees())
    };

    (lat_deg, lng_deg)
}

// =============================================================================
// Bounds and Centroid
// =============================================================================

/// Bounding box of a point set. `None` for empty input.
pub fn compute_bounds(points: &[GeoPoint]) -> Option<Bounds> {
    Bounds::from_points(points)
}

/// Arithmetic-mean centroid of a point set, summed in slice order.
///
/// Returns (0, 0) for empty input. Longitudes are averaged as plain numbers, so
/// sets straddling the antimeridian get a centroid near 0° longitude.
///
/// ```rust
/// use place_clusters::{GeoPoint, geo_utils};
///
/// let center = geo_utils::compute_center(&[
///     GeoPoint::new(60.0, 10.0),
///     GeoPoint::new(60.01, 10.01),
/// ]);
/// assert!((center.latitude - 60.005).abs() < 1e-9);
/// assert!((center.longitude - 10.005).abs() < 1e-9);
/// ```
pub fn compute_center(points: &[GeoPoint]) -> GeoPoint {
    if points.is_empty() {
        return GeoPoint::new(0.0, 0.0);
    }

    let sum_lat: f64 = points.iter().map(|p| p.latitude).sum();
    let sum_lng: f64 = points.iter().map(|p| p.longitude).sum();
    let n = points.len() as f64;

    GeoPoint::new(sum_lat / n, sum_lng / n)
}

#[inline]
pub(crate) fn to_geo(p: &GeoPoint) -> Point {
    Point::new(p.longitude, p.latitude)
}

#[inline]
pub(crate) fn from_geo(p: Point) -> GeoPoint {
    GeoPoint::new(p.y(), p.x())
}

// =============================================================================
// Unit Tests
// =============================================================================
