//! Cluster boundaries for map overlays.
//!
//! The shape depends on how many distinct coordinates a cluster has:
//!
//! | Members | Boundary |
//! |---------|----------|
//! | 1 | none (draw a marker) |
//! | 2+ at one coordinate | [`BoundaryKind::Point`] |
//! | 2 | [`BoundaryKind::Ellipse`] oriented along the bearing between them |
//! | 3+ | [`BoundaryKind::Hull`], or [`BoundaryKind::Circle`] when the hull degenerates |
//!
//! Hull degeneracy (collinear members, duplicates collapsing to a segment) is
//! handled here and never reaches the caller.

use std::f64::consts::TAU;

use geo::{Area, ConvexHull, Coord, Intersects, LineString, MultiPoint, Point, Polygon};
use log::debug;

use crate::error::{ClusterError, GeometryError, Result};
use crate::geo_utils::{destination_point, haversine_distance, initial_bearing, midpoint, to_geo};
use crate::{Bounds, Cluster, GeoPoint};

/// Hulls with a smaller area (square degrees) count as degenerate.
const HULL_AREA_EPSILON: f64 = 1e-12;

/// Coordinates closer than this (meters) are treated as the same spot.
const SAME_SPOT_METERS: f64 = 1e-3;

const MIN_SEGMENTS: u32 = 8;

/// Configuration for boundary geometry.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct BoundaryConfig {
    /// Radius of the circle used when a hull cannot be built (km).
    ///
    /// The radius is fixed. Members of a degenerate cluster wider than this,
    /// such as a long run of places on one meridian under a coarse grid, can
    /// lie outside the circle.
    /// Default: 200.0
    pub fallback_radius_km: f64,

    /// Semi-minor / semi-major ratio for two-member ellipses, in (0, 1].
    /// Default: 0.5
    pub ellipse_minor_ratio: f64,

    /// Vertices used to approximate ellipses and circles.
    /// Default: 64
    pub segments: u32,
}

impl Default for BoundaryConfig {
    fn default() -> Self {
        Self {
            fallback_radius_km: 200.0,
            ellipse_minor_ratio: 0.5,
            segments: 64,
        }
    }
}

impl BoundaryConfig {
    /// Check every parameter, reporting the first bad one.
    pub fn validate(&self) -> Result<()> {
        if !self.fallback_radius_km.is_finite() || self.fallback_radius_km <= 0.0 {
            return Err(ClusterError::invalid_parameter(
                "fallback_radius_km",
                self.fallback_radius_km,
                "fallback radius must be a positive number of kilometers",
            ));
        }
        if !(self.ellipse_minor_ratio > 0.0 && self.ellipse_minor_ratio <= 1.0) {
            return Err(ClusterError::invalid_parameter(
                "ellipse_minor_ratio",
                self.ellipse_minor_ratio,
                "ratio must be in (0, 1]",
            ));
        }
        if self.segments < MIN_SEGMENTS {
            return Err(ClusterError::invalid_parameter(
                "segments",
                self.segments,
                "at least 8 segments are needed for a usable outline",
            ));
        }
        Ok(())
    }
}

/// Which construction produced a boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BoundaryKind {
    /// All members share one coordinate
    Point,
    /// Two members: ellipse through both
    Ellipse,
    /// Convex hull of three or more members
    Hull,
    /// Fixed-radius circle around the centroid (degenerate hull).
    ///
    /// Encloses the members only when none is farther from the centroid than
    /// [`BoundaryConfig::fallback_radius_km`].
    Circle,
}

/// A closed outline around a cluster's members.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ClusterBoundary {
    pub kind: BoundaryKind,
    /// Closed ring (first == last). A `Point` boundary holds its single coordinate.
    pub ring: Vec<GeoPoint>,
    /// Cluster centroid, great-circle midpoint of an ellipse, or circle center
    pub center: GeoPoint,
    /// Set for `Circle` boundaries only
    pub radius_km: Option<f64>,
}

impl ClusterBoundary {
    /// The ring as a `geo` polygon (x = longitude). `None` for point boundaries.
    pub fn to_polygon(&self) -> Option<Polygon> {
        if self.kind == BoundaryKind::Point {
            return None;
        }
        let coords: Vec<Coord> = self
            .ring
            .iter()
            .map(|p| Coord { x: p.longitude, y: p.latitude })
            .collect();
        Some(Polygon::new(LineString::new(coords), vec![]))
    }

    /// Whether `point` lies on or inside the boundary.
    ///
    /// Circles are tested by great-circle distance to the center, not against the
    /// polygonal approximation in `ring`.
    pub fn contains(&self, point: &GeoPoint) -> bool {
        match self.kind {
            BoundaryKind::Point => haversine_distance(&self.center, point) <= SAME_SPOT_METERS,
            BoundaryKind::Circle => {
                let radius_m = self.radius_km.unwrap_or(0.0) * 1000.0;
                haversine_distance(&self.center, point) <= radius_m
            }
            BoundaryKind::Ellipse | BoundaryKind::Hull => self
                .to_polygon()
                .is_some_and(|polygon| polygon.intersects(&to_geo(point))),
        }
    }
}

/// Boundary for a cluster, or `None` for a singleton.
pub fn build_boundary(cluster: &Cluster, config: &BoundaryConfig) -> Option<ClusterBoundary> {
    if cluster.is_singleton() {
        return None;
    }
    boundary_for_points(&cluster.coordinates(), &cluster.centroid, config)
}

/// Boundary enclosing `points`, with `centroid` used for the circle fallback.
///
/// Returns `None` for fewer than two points.
///
/// ```rust
/// use place_clusters::{boundary_for_points, geo_utils, BoundaryConfig, BoundaryKind, GeoPoint};
///
/// // Three places on one meridian: no hull, so a 200 km circle around the centroid
/// let points = [GeoPoint::new(60.0, 10.0), GeoPoint::new(60.1, 10.0), GeoPoint::new(60.2, 10.0)];
/// let centroid = geo_utils::compute_center(&points);
///
/// let boundary = boundary_for_points(&points, &centroid, &BoundaryConfig::default()).unwrap();
/// assert_eq!(boundary.kind, BoundaryKind::Circle);
/// assert_eq!(boundary.radius_km, Some(200.0));
/// ```
pub fn boundary_for_points(
    points: &[GeoPoint],
    centroid: &GeoPoint,
    config: &BoundaryConfig,
) -> Option<ClusterBoundary> {
    let first = points.first()?;
    if points.len() < 2 {
        return None;
    }

    if points.iter().all(|p| haversine_distance(first, p) <= SAME_SPOT_METERS) {
        return Some(ClusterBoundary {
            kind: BoundaryKind::Point,
            ring: vec![*first],
            center: *first,
            radius_km: None,
        });
    }

    let built = if points.len() == 2 {
        ellipse(&points[0], &points[1], config)
    } else {
        hull(points, centroid)
    };

    match built {
        Ok(boundary) => Some(boundary),
        Err(e) => {
            debug!("[Boundary] {} for {} points, using {} km circle", e, points.len(), config.fallback_radius_km);
            Some(circle(centroid, config))
        }
    }
}

/// Ellipse through `a` and `b`, centered on their great-circle midpoint.
///
/// The major axis follows the great circle through both points. The vertices at
/// 0 and 180 degrees are the member coordinates themselves, so both members lie
/// on the ring exactly.
fn ellipse(a: &GeoPoint, b: &GeoPoint, config: &BoundaryConfig) -> std::result::Result<ClusterBoundary, GeometryError> {
    let center = midpoint(a, b);
    let semi_major = haversine_distance(a, b) / 2.0;
    let semi_minor = semi_major * config.ellipse_minor_ratio;
    if !semi_major.is_finite() || !semi_minor.is_finite() || !center.is_valid() {
        return Err(GeometryError::NonFiniteAxis);
    }

    let bearing = initial_bearing(&center, b);
    let n = even_segments(config.segments);
    let mut ring = Vec::with_capacity(n + 1);

    for i in 0..n {
        let theta = TAU * i as f64 / n as f64;
        let x = semi_major * theta.cos();
        let y = semi_minor * theta.sin();
        let offset = y.atan2(x).to_degrees();
        ring.push(destination_point(&center, bearing + offset, x.hypot(y)));
    }
    // Destination math lands the tips a few ulps off the members
    ring[0] = *b;
    ring[n / 2] = *a;
    ring.push(ring[0]);

    Ok(ClusterBoundary {
        kind: BoundaryKind::Ellipse,
        ring,
        center,
        radius_km: None,
    })
}

/// Segment count with the floor applied, rounded up to even so both axis tips are vertices.
fn even_segments(segments: u32) -> usize {
    let n = segments.max(MIN_SEGMENTS) as usize;
    n + n % 2
}

/// Convex hull of the points in (longitude, latitude) space.
///
/// Sets spanning more than 180° of longitude get synthetic corners at ±180° so
/// the hull covers the whole band instead of collapsing across the antimeridian.
fn hull(points: &[GeoPoint], centroid: &GeoPoint) -> std::result::Result<ClusterBoundary, GeometryError> {
    let mut input: Vec<Point> = points.iter().map(to_geo).collect();

    if let Some(bounds) = Bounds::from_points(points) {
        if bounds.longitude_span() > 180.0 {
            pad_antimeridian(&mut input, &bounds);
        }
    }

    let polygon = MultiPoint::from(input).convex_hull();
    let area = polygon.unsigned_area();
    // Exterior rings are closed, so the last coordinate repeats the first
    let vertices = polygon.exterior().0.len().saturating_sub(1);
    if vertices < 3 || area <= HULL_AREA_EPSILON {
        return Err(GeometryError::DegenerateHull { vertices, area });
    }

    let ring = polygon
        .exterior()
        .coords()
        .map(|c| GeoPoint::new(c.y, c.x))
        .collect();

    Ok(ClusterBoundary {
        kind: BoundaryKind::Hull,
        ring,
        center: *centroid,
        radius_km: None,
    })
}

fn pad_antimeridian(input: &mut Vec<Point>, bounds: &Bounds) {
    for lng in [-180.0, 180.0] {
        input.push(Point::new(lng, bounds.min_lat));
        input.push(Point::new(lng, bounds.max_lat));
    }
}

fn circle(center: &GeoPoint, config: &BoundaryConfig) -> ClusterBoundary {
    let radius_m = config.fallback_radius_km * 1000.0;
    let n = config.segments.max(MIN_SEGMENTS) as usize;
    let mut ring: Vec<GeoPoint> = (0..n)
        .map(|i| destination_point(center, 360.0 * i as f64 / n as f64, radius_m))
        .collect();
    ring.push(ring[0]);

    ClusterBoundary {
        kind: BoundaryKind::Circle,
        ring,
        center: *center,
        radius_km: Some(config.fallback_radius_km),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo_utils::compute_center;

    fn assert_closed(boundary: &ClusterBoundary) {
        assert_eq!(boundary.ring.first(), boundary.ring.last());
    }

    #[test]
    fn test_fewer_than_two_points() {
        let config = BoundaryConfig::default();
        let p = GeoPoint::new(60.0, 10.0);
        assert!(boundary_for_points(&[], &p, &config).is_none());
        assert!(boundary_for_points(&[p], &p, &config).is_none());
    }

    #[test]
    fn test_identical_points_give_point_boundary() {
        let p = GeoPoint::new(63.43, 10.39);
        let boundary = boundary_for_points(&[p, p, p], &p, &BoundaryConfig::default()).unwrap();
        assert_eq!(boundary.kind, BoundaryKind::Point);
        assert_eq!(boundary.ring, vec![p]);
        assert!(boundary.contains(&p));
        assert!(boundary.to_polygon().is_none());
    }

    #[test]
    fn test_two_points_give_ellipse() {
        let a = GeoPoint::new(60.0, 10.0);
        let b = GeoPoint::new(60.01, 10.01);
        let centroid = compute_center(&[a, b]);
        let config = BoundaryConfig::default();

        let boundary = boundary_for_points(&[a, b], &centroid, &config).unwrap();
        assert_eq!(boundary.kind, BoundaryKind::Ellipse);
        assert_eq!(boundary.ring.len(), config.segments as usize + 1);
        assert_closed(&boundary);
        assert!(boundary.contains(&a));
        assert!(boundary.contains(&b));
        // The midpoint is well inside
        assert!(boundary.contains(&centroid));
    }

    #[test]
    fn test_wide_ellipse_tips_are_members() {
        // ~220 km apart along a parallel, where a great circle bows north of the mean
        let a = GeoPoint::new(60.0, 8.0);
        let b = GeoPoint::new(60.0, 12.0);
        let config = BoundaryConfig { segments: 33, ..BoundaryConfig::default() };

        let boundary = boundary_for_points(&[a, b], &compute_center(&[a, b]), &config).unwrap();
        assert_eq!(boundary.ring.len(), 35);
        assert_eq!(boundary.ring[0], b);
        assert_eq!(boundary.ring[17], a);
        assert!(boundary.contains(&a));
        assert!(boundary.contains(&b));
        assert!(boundary.center.latitude > 60.0);
    }

    #[test]
    fn test_ellipse_contains_both_members() {
        let config = BoundaryConfig::default();
        for i in 0..20 {
            for j in 0..10 {
                let a = GeoPoint::new(58.0 + i as f64 * 0.29, 4.0 + j as f64 * 1.13);
                let b = GeoPoint::new(a.latitude + 0.01 + j as f64 * 0.07, a.longitude - 0.4 + i as f64 * 0.05);
                let boundary = boundary_for_points(&[a, b], &compute_center(&[a, b]), &config).unwrap();

                assert_eq!(boundary.kind, BoundaryKind::Ellipse);
                assert!(boundary.contains(&a), "{:?} outside ellipse with {:?}", a, b);
                assert!(boundary.contains(&b), "{:?} outside ellipse with {:?}", b, a);
            }
        }
    }

    #[test]
    fn test_ellipse_axes() {
        let a = GeoPoint::new(60.0, 10.0);
        let b = GeoPoint::new(60.5, 10.0);
        let boundary = boundary_for_points(&[a, b], &compute_center(&[a, b]), &BoundaryConfig::default()).unwrap();

        let half = haversine_distance(&a, &b) / 2.0;
        let farthest = boundary
            .ring
            .iter()
            .map(|v| haversine_distance(&boundary.center, v))
            .fold(0.0, f64::max);
        let nearest = boundary
            .ring
            .iter()
            .map(|v| haversine_distance(&boundary.center, v))
            .fold(f64::INFINITY, f64::min);

        assert!((farthest - half).abs() < 1.0);
        assert!((nearest - half * 0.5).abs() < 1.0);
    }

    #[test]
    fn test_triangle_gives_hull() {
        let points = [
            GeoPoint::new(60.0, 10.0),
            GeoPoint::new(60.5, 11.0),
            GeoPoint::new(61.0, 10.0),
            GeoPoint::new(60.5, 10.4),
        ];
        let centroid = compute_center(&points);

        let boundary = boundary_for_points(&points, &centroid, &BoundaryConfig::default()).unwrap();
        assert_eq!(boundary.kind, BoundaryKind::Hull);
        assert_closed(&boundary);
        // Interior point is not a hull vertex
        assert_eq!(boundary.ring.len(), 4);
        for p in &points {
            assert!(boundary.contains(p), "{:?} outside hull", p);
        }
        assert!(!boundary.contains(&GeoPoint::new(62.0, 10.0)));
    }

    #[test]
    fn test_collinear_triple_falls_back_to_circle() {
        let points = [GeoPoint::new(0.0, 0.0), GeoPoint::new(1.0, 1.0), GeoPoint::new(2.0, 2.0)];
        let centroid = compute_center(&points);

        let boundary = boundary_for_points(&points, &centroid, &BoundaryConfig::default()).unwrap();
        assert_eq!(boundary.kind, BoundaryKind::Circle);
        assert_eq!(boundary.center, GeoPoint::new(1.0, 1.0));
        assert_eq!(boundary.radius_km, Some(200.0));
        assert_closed(&boundary);
        for v in &boundary.ring {
            assert!((haversine_distance(&boundary.center, v) - 200_000.0).abs() < 1.0);
        }
        assert!(boundary.contains(&points[1]));
    }

    #[test]
    fn test_circle_radius_stays_fixed_for_wide_clusters() {
        // Centroid at 2.63°N: the southern member is ~237 km away
        let points = [GeoPoint::new(0.5, 0.0), GeoPoint::new(3.0, 0.0), GeoPoint::new(4.4, 0.0)];
        let centroid = compute_center(&points);

        let boundary = boundary_for_points(&points, &centroid, &BoundaryConfig::default()).unwrap();
        assert_eq!(boundary.kind, BoundaryKind::Circle);
        assert_eq!(boundary.radius_km, Some(200.0));
        assert!(!boundary.contains(&points[0]));
        assert!(boundary.contains(&points[1]));
        assert!(boundary.contains(&points[2]));
    }

    #[test]
    fn test_two_distinct_among_three_is_degenerate() {
        let a = GeoPoint::new(60.0, 10.0);
        let b = GeoPoint::new(60.2, 10.0);
        let points = [a, b, a];
        let centroid = compute_center(&points);

        let boundary = boundary_for_points(&points, &centroid, &BoundaryConfig::default()).unwrap();
        assert_eq!(boundary.kind, BoundaryKind::Circle);
        assert!(points.iter().all(|p| boundary.contains(p)));
    }

    #[test]
    fn test_antimeridian_padding() {
        let points = [
            GeoPoint::new(10.0, 170.0),
            GeoPoint::new(20.0, -170.0),
            GeoPoint::new(15.0, 175.0),
            GeoPoint::new(12.0, -175.0),
        ];
        let centroid = compute_center(&points);

        let boundary = boundary_for_points(&points, &centroid, &BoundaryConfig::default()).unwrap();
        assert_eq!(boundary.kind, BoundaryKind::Hull);
        assert!(boundary.ring.iter().any(|p| p.longitude == -180.0));
        assert!(boundary.ring.iter().any(|p| p.longitude == 180.0));
        for p in &points {
            assert!(boundary.contains(p));
        }
    }

    #[test]
    fn test_config_validation() {
        assert!(BoundaryConfig::default().validate().is_ok());

        let bad_radius = BoundaryConfig { fallback_radius_km: 0.0, ..BoundaryConfig::default() };
        assert!(bad_radius.validate().is_err());

        let bad_ratio = BoundaryConfig { ellipse_minor_ratio: 1.5, ..BoundaryConfig::default() };
        assert!(bad_ratio.validate().is_err());

        let bad_segments = BoundaryConfig { segments: 3, ..BoundaryConfig::default() };
        assert!(bad_segments.validate().is_err());
    }
}
