//! # Place Clusters
//!
//! Aggregation and spatial clustering of place-name mentions for literary map views.
//!
//! This library provides:
//! - Aggregation of raw place mentions into one record per canonical place name
//! - Grid-bucket and single-linkage spatial clustering with exact frequency conservation
//! - Cluster boundaries (convex hull, oriented ellipse, circle fallback) for map overlays
//! - A bounded LRU cache for clustering results, owned by the caller
//!
//! ## Features
//!
//! - **`parallel`** - Run independent clustering passes (zoom pyramids) with rayon
//! - **`serde`** - `Serialize`/`Deserialize` for configuration and output types
//! - **`full`** - Enable all features
//!
//! ## Quick Start
//!
//! ```rust
//! use place_clusters::{build_clusters, ClusterConfig, FeatureClass, GeoPoint, PlaceMention};
//!
//! let mentions = vec![
//!     PlaceMention::new("Christiania", "Oslo", GeoPoint::new(59.9139, 10.7522), FeatureClass::PopulatedPlace, 12, "book-1"),
//!     PlaceMention::new("Drammen", "Drammen", GeoPoint::new(59.7439, 10.2045), FeatureClass::PopulatedPlace, 3, "book-2"),
//!     PlaceMention::new("Bergen", "Bergen", GeoPoint::new(60.3913, 5.3221), FeatureClass::PopulatedPlace, 7, "book-1"),
//! ];
//!
//! let clusters = build_clusters(&mentions, &ClusterConfig::with_threshold(100.0)).unwrap();
//! let total: u64 = clusters.iter().map(|c| c.total_frequency).sum();
//! assert_eq!(total, 22);
//! ```

use std::collections::BTreeSet;

pub mod aggregate;
pub mod boundary;
pub mod cache;
pub mod clustering;
pub mod error;
pub mod feature;
pub mod geo_utils;

pub use aggregate::{aggregate_mentions, filter_feature_classes, top_by_frequency};
pub use boundary::{boundary_for_points, build_boundary, BoundaryConfig, BoundaryKind, ClusterBoundary};
pub use cache::{CacheStats, ClusterCache, ClusterKey};
pub use clustering::cluster_places;
pub use error::{ClusterError, Result};
pub use feature::FeatureClass;

// ============================================================================
// Core Types
// ============================================================================

/// A WGS84 coordinate with latitude and longitude in degrees.
///
/// # Example
/// ```
/// use place_clusters::GeoPoint;
/// let point = GeoPoint::new(63.4305, 10.3951); // Trondheim
/// assert!(point.is_valid());
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    /// Create a new point.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Check if the point has finite, in-range coordinates.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude >= -90.0
            && self.latitude <= 90.0
            && self.longitude >= -180.0
            && self.longitude <= 180.0
    }
}

/// Bounding box of a point set.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Bounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl Bounds {
    /// Create bounds from points.
    pub fn from_points(points: &[GeoPoint]) -> Option<Self> {
        if points.is_empty() {
            return None;
        }
        let mut min_lat = f64::MAX;
        let mut max_lat = f64::MIN;
        let mut min_lng = f64::MAX;
        let mut max_lng = f64::MIN;

        for p in points {
            min_lat = min_lat.min(p.latitude);
            max_lat = max_lat.max(p.latitude);
            min_lng = min_lng.min(p.longitude);
            max_lng = max_lng.max(p.longitude);
        }

        Some(Self { min_lat, max_lat, min_lng, max_lng })
    }

    /// Longitude extent in degrees.
    pub fn longitude_span(&self) -> f64 {
        self.max_lng - self.min_lng
    }
}

/// One occurrence record of a place name in a book.
///
/// This is the only record shape crossing into the library. Loaders translate
/// whatever storage schema they read (spreadsheet columns, SQL rows) into it.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PlaceMention {
    /// The place name exactly as written in the text
    pub token: String,
    /// Normalized modern name, used as the aggregation key
    pub canonical_name: String,
    /// Location, if the gazetteer resolved one
    pub coordinate: Option<GeoPoint>,
    pub feature_class: FeatureClass,
    /// Number of occurrences in the source book
    pub mention_count: u32,
    /// Opaque reference to the bibliographic record
    pub source_book_id: String,
}

impl PlaceMention {
    /// Create a mention with a resolved coordinate.
    pub fn new(
        token: &str,
        canonical_name: &str,
        coordinate: GeoPoint,
        feature_class: FeatureClass,
        mention_count: u32,
        source_book_id: &str,
    ) -> Self {
        Self {
            token: token.to_string(),
            canonical_name: canonical_name.to_string(),
            coordinate: Some(coordinate),
            feature_class,
            mention_count,
            source_book_id: source_book_id.to_string(),
        }
    }

    /// Create a mention the gazetteer could not place.
    pub fn unlocated(
        token: &str,
        canonical_name: &str,
        feature_class: FeatureClass,
        mention_count: u32,
        source_book_id: &str,
    ) -> Self {
        Self {
            coordinate: None,
            ..Self::new(token, canonical_name, GeoPoint::new(0.0, 0.0), feature_class, mention_count, source_book_id)
        }
    }
}

/// All mentions sharing one canonical name, merged.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AggregatedPlace {
    pub canonical_name: String,
    /// Distinct surface forms, first-seen order
    pub tokens: Vec<String>,
    /// Coordinate of the first-seen mention
    pub coordinate: GeoPoint,
    /// Feature class of the first-seen mention
    pub feature_class: FeatureClass,
    /// Sum of mention counts
    pub total_frequency: u64,
    /// Distinct books mentioning the place
    pub book_ids: BTreeSet<String>,
}

impl AggregatedPlace {
    /// Number of distinct books mentioning the place.
    pub fn book_count(&self) -> usize {
        self.book_ids.len()
    }
}

/// A group of nearby places drawn as one marker.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Cluster {
    /// Position in the output of the clustering pass
    pub id: usize,
    /// Arithmetic mean of member coordinates
    pub centroid: GeoPoint,
    /// Member places in input order (never empty)
    pub members: Vec<AggregatedPlace>,
    /// Sum of member frequencies
    pub total_frequency: u64,
    /// Sum of member book counts (a book mentioning two members counts twice)
    pub total_books: usize,
    /// Size of the union of member book sets
    pub distinct_books: usize,
    /// Class with the highest summed frequency; ties go to the earlier member
    pub feature_class: FeatureClass,
    /// Overlay outline; always `None` for singletons
    pub boundary: Option<ClusterBoundary>,
}

impl Cluster {
    /// True when the cluster holds exactly one place.
    pub fn is_singleton(&self) -> bool {
        self.members.len() == 1
    }

    /// Member coordinates in member order.
    pub fn coordinates(&self) -> Vec<GeoPoint> {
        self.members.iter().map(|m| m.coordinate).collect()
    }
}

/// How places are partitioned into clusters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ClusterStrategy {
    /// Round coordinates to a grid of `threshold_km / 111.32` degrees and group by cell.
    ///
    /// Cheap and deterministic, but approximate: two places just across a cell edge
    /// are split even when closer than the threshold, and places in one cell can be
    /// farther apart than the threshold.
    #[default]
    Grid,
    /// Single-linkage: places within `threshold_km` great-circle distance are joined,
    /// transitively. Uses an R-tree for candidate search.
    Linkage,
}

/// Configuration for a clustering pass.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ClusterConfig {
    /// Clustering distance in kilometers. Must be positive.
    /// Default: 200.0
    pub threshold_km: f64,

    /// Partitioning algorithm.
    /// Default: `Grid`
    pub strategy: ClusterStrategy,

    /// Build boundaries for multi-member clusters.
    /// Default: true
    pub compute_boundaries: bool,

    /// Cluster each feature class separately, so a cluster never mixes classes.
    /// Default: false
    pub split_by_feature_class: bool,

    /// Boundary geometry settings.
    pub boundary: BoundaryConfig,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            threshold_km: 200.0,
            strategy: ClusterStrategy::Grid,
            compute_boundaries: true,
            split_by_feature_class: false,
            boundary: BoundaryConfig::default(),
        }
    }
}

impl ClusterConfig {
    /// Default configuration with a different threshold.
    pub fn with_threshold(threshold_km: f64) -> Self {
        Self {
            threshold_km,
            ..Self::default()
        }
    }

    /// Check every parameter, reporting the first bad one.
    pub fn validate(&self) -> Result<()> {
        if !self.threshold_km.is_finite() || self.threshold_km <= 0.0 {
            return Err(ClusterError::invalid_parameter(
                "threshold_km",
                self.threshold_km,
                "clustering threshold must be a positive number of kilometers",
            ));
        }
        if self.strategy == ClusterStrategy::Grid {
            // Cell indices are i64; round(180 / δ) must not saturate
            let delta = geo_utils::km_to_degrees(self.threshold_km);
            if !delta.is_normal() || 180.0 / delta >= i64::MAX as f64 {
                return Err(ClusterError::invalid_parameter(
                    "threshold_km",
                    self.threshold_km,
                    "threshold is too small to index grid cells",
                ));
            }
        }
        self.boundary.validate()
    }
}

// ============================================================================
// Pipeline
// ============================================================================

/// Aggregate raw mentions and cluster the result in one call.
///
/// Fails with [`ClusterError::InvalidParameter`] before touching the input when
/// the configuration is invalid.
pub fn build_clusters(mentions: &[PlaceMention], config: &ClusterConfig) -> Result<Vec<Cluster>> {
    config.validate()?;
    let places = aggregate_mentions(mentions);
    cluster_places(&places, config)
}

/// Run one clustering pass per threshold over the same places.
///
/// Typical use is a zoom pyramid: coarse thresholds for zoomed-out views,
/// fine ones for close-ups. Results are returned in threshold order.
pub fn cluster_at_thresholds(
    places: &[AggregatedPlace],
    thresholds_km: &[f64],
    config: &ClusterConfig,
) -> Result<Vec<Vec<Cluster>>> {
    thresholds_km
        .iter()
        .map(|&threshold_km| {
            let pass = ClusterConfig { threshold_km, ..config.clone() };
            cluster_places(places, &pass)
        })
        .collect()
}

/// Same as [`cluster_at_thresholds`], with passes running on rayon.
///
/// Passes share nothing but the read-only input slice, so the output is
/// identical to the sequential version.
#[cfg(feature = "parallel")]
pub fn cluster_at_thresholds_parallel(
    places: &[AggregatedPlace],
    thresholds_km: &[f64],
    config: &ClusterConfig,
) -> Result<Vec<Vec<Cluster>>> {
    use log::info;
    use rayon::prelude::*;

    let start = std::time::Instant::now();
    let result = thresholds_km
        .par_iter()
        .map(|&threshold_km| {
            let pass = ClusterConfig { threshold_km, ..config.clone() };
            cluster_places(places, &pass)
        })
        .collect::<Result<Vec<_>>>();

    info!(
        "[PlaceClusters] {} parallel passes over {} places in {:?}",
        thresholds_km.len(),
        places.len(),
        start.elapsed()
    );
    result
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn mention(name: &str, lat: f64, lng: f64, count: u32, book: &str) -> PlaceMention {
        PlaceMention::new(name, name, GeoPoint::new(lat, lng), FeatureClass::PopulatedPlace, count, book)
    }

    #[test]
    fn test_geo_point_validation() {
        assert!(GeoPoint::new(59.9139, 10.7522).is_valid());
        assert!(!GeoPoint::new(91.0, 0.0).is_valid());
        assert!(!GeoPoint::new(0.0, 181.0).is_valid());
        assert!(!GeoPoint::new(f64::NAN, 0.0).is_valid());
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(ClusterConfig::default().validate().is_ok());
        assert_eq!(ClusterConfig::default().threshold_km, 200.0);
    }

    #[test]
    fn test_invalid_threshold_rejected() {
        for bad in [0.0, -5.0, f64::NAN, f64::INFINITY] {
            let err = ClusterConfig::with_threshold(bad).validate().unwrap_err();
            assert!(matches!(err, ClusterError::InvalidParameter { name: "threshold_km", .. }));
        }
    }

    #[test]
    fn test_tiny_grid_threshold_rejected() {
        for tiny in [1e-16, 5e-324] {
            let err = ClusterConfig::with_threshold(tiny).validate().unwrap_err();
            assert!(matches!(err, ClusterError::InvalidParameter { name: "threshold_km", .. }));
        }
        assert!(ClusterConfig::with_threshold(1e-6).validate().is_ok());

        // Linkage never builds cell indices
        let linkage = ClusterConfig {
            strategy: ClusterStrategy::Linkage,
            ..ClusterConfig::with_threshold(1e-16)
        };
        assert!(linkage.validate().is_ok());
    }

    #[test]
    fn test_build_clusters_pipeline() {
        let mentions = vec![
            mention("Oslo", 59.9139, 10.7522, 10, "b1"),
            mention("Oslo", 59.9139, 10.7522, 5, "b2"),
            mention("Tromsø", 69.6492, 18.9553, 2, "b1"),
            PlaceMention::unlocated("Atlantis", "Atlantis", FeatureClass::Area, 9, "b3"),
        ];

        let clusters = build_clusters(&mentions, &ClusterConfig::with_threshold(50.0)).unwrap();
        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[0].members[0].canonical_name, "Oslo");
        assert_eq!(clusters[0].total_frequency, 15);
        assert_eq!(clusters[0].total_books, 2);
        assert_eq!(clusters[1].total_frequency, 2);
    }

    #[test]
    fn test_build_clusters_rejects_bad_threshold_on_empty_input() {
        let result = build_clusters(&[], &ClusterConfig::with_threshold(0.0));
        assert!(matches!(result, Err(ClusterError::InvalidParameter { .. })));
    }

    #[test]
    fn test_cluster_at_thresholds_order() {
        let mentions = vec![
            mention("Oslo", 59.9139, 10.7522, 1, "b1"),
            mention("Drammen", 59.7439, 10.2045, 1, "b1"),
            mention("Bergen", 60.3913, 5.3221, 1, "b1"),
        ];
        let places = aggregate_mentions(&mentions);
        let config = ClusterConfig {
            strategy: ClusterStrategy::Linkage,
            ..ClusterConfig::default()
        };

        let passes = cluster_at_thresholds(&places, &[10.0, 50.0, 400.0], &config).unwrap();
        let counts: Vec<usize> = passes.iter().map(|p| p.len()).collect();
        assert_eq!(counts, vec![3, 2, 1]);
    }

    #[test]
    fn test_cluster_at_thresholds_fails_on_any_bad_threshold() {
        let places = aggregate_mentions(&[mention("Oslo", 59.9139, 10.7522, 1, "b1")]);
        let result = cluster_at_thresholds(&places, &[10.0, -1.0], &ClusterConfig::default());
        assert!(result.is_err());
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn test_parallel_matches_sequential() {
        let mentions: Vec<PlaceMention> = (0..40)
            .map(|i| mention(&format!("place-{i}"), 58.0 + i as f64 * 0.3, 5.0 + (i % 7) as f64, 1 + i, "b1"))
            .collect();
        let places = aggregate_mentions(&mentions);
        let thresholds = [5.0, 25.0, 100.0, 300.0];
        let config = ClusterConfig::default();

        let sequential = cluster_at_thresholds(&places, &thresholds, &config).unwrap();
        let parallel = cluster_at_thresholds_parallel(&places, &thresholds, &config).unwrap();
        assert_eq!(sequential, parallel);
    }
}
