//! Spatial clustering of aggregated places.
//!
//! ## Strategies
//!
//! **Grid** buckets each place by `(round(lat / δ), round(lon / δ))` with
//! `δ = threshold_km / 111.32`. It is a single deterministic pass, but only an
//! approximation of distance-based clustering: a cell edge can split two places
//! a few meters apart, and the far corners of one cell can be farther apart than
//! the threshold. Cell keys are kept as two integers, so distant cells never alias.
//!
//! **Linkage** joins every pair of places within `threshold_km` great-circle
//! distance and takes the transitive closure (single linkage). Candidate pairs
//! come from an R-tree window query; a disjoint-set forest merges them.
//!
//! ## Guarantees
//!
//! - Every input place lands in exactly one cluster.
//! - A cluster's `total_frequency` is the exact sum of its members'.
//! - Output order, member order and centroids depend only on input order.

use std::collections::{BTreeSet, HashMap};
use std::time::Instant;

use log::info;
use rstar::{RTree, RTreeObject, AABB};

use crate::boundary::build_boundary;
use crate::error::{ClusterError, Result};
use crate::geo_utils::{compute_center, haversine_distance, km_to_degrees, search_window};
use crate::{AggregatedPlace, Cluster, ClusterConfig, ClusterStrategy, FeatureClass, GeoPoint};

/// Widening applied to R-tree windows so float error never drops a boundary pair.
const WINDOW_MARGIN: f64 = 1.0001;

/// Partition places into clusters.
///
/// Fails before any work when the configuration is invalid
/// ([`ClusterError::InvalidParameter`]) or any place has a non-finite or
/// out-of-range coordinate ([`ClusterError::InvalidInput`]).
///
/// # Example
/// ```
/// use place_clusters::{aggregate_mentions, cluster_places, BoundaryKind, ClusterConfig, FeatureClass, GeoPoint, PlaceMention};
///
/// let mentions = vec![
///     PlaceMention::new("A", "A", GeoPoint::new(60.0, 10.0), FeatureClass::PopulatedPlace, 5, "b1"),
///     PlaceMention::new("B", "B", GeoPoint::new(60.01, 10.01), FeatureClass::PopulatedPlace, 3, "b2"),
/// ];
/// let places = aggregate_mentions(&mentions);
///
/// let clusters = cluster_places(&places, &ClusterConfig::with_threshold(200.0)).unwrap();
/// assert_eq!(clusters.len(), 1);
/// assert_eq!(clusters[0].total_frequency, 8);
/// assert_eq!(clusters[0].boundary.as_ref().unwrap().kind, BoundaryKind::Ellipse);
/// ```
pub fn cluster_places(places: &[AggregatedPlace], config: &ClusterConfig) -> Result<Vec<Cluster>> {
    config.validate()?;
    validate_places(places)?;

    if places.is_empty() {
        return Ok(vec![]);
    }

    let start = Instant::now();

    let mut groups = if config.split_by_feature_class {
        class_partitions(places)
            .into_iter()
            .flat_map(|indices| partition(places, &indices, config))
            .collect()
    } else {
        let indices: Vec<usize> = (0..places.len()).collect();
        partition(places, &indices, config)
    };

    // Groups hold ascending indices; order clusters by their first member
    groups.sort_by_key(|g| g[0]);

    let clusters: Vec<Cluster> = groups
        .iter()
        .enumerate()
        .map(|(id, indices)| make_cluster(id, places, indices, config))
        .collect();

    info!(
        "[Clustering] {} places -> {} clusters ({:?}, {} km) in {:?}",
        places.len(),
        clusters.len(),
        config.strategy,
        config.threshold_km,
        start.elapsed()
    );

    Ok(clusters)
}

fn validate_places(places: &[AggregatedPlace]) -> Result<()> {
    for place in places {
        if !place.coordinate.is_valid() {
            return Err(ClusterError::invalid_input(
                place.canonical_name.clone(),
                format!(
                    "coordinate ({}, {}) is not a finite WGS84 position",
                    place.coordinate.latitude, place.coordinate.longitude
                ),
            ));
        }
    }
    Ok(())
}

/// Indices grouped by feature class, classes in first-seen order.
fn class_partitions(places: &[AggregatedPlace]) -> Vec<Vec<usize>> {
    let mut order: Vec<FeatureClass> = Vec::new();
    let mut by_class: HashMap<FeatureClass, Vec<usize>> = HashMap::new();

    for (i, place) in places.iter().enumerate() {
        by_class
            .entry(place.feature_class)
            .or_insert_with(|| {
                order.push(place.feature_class);
                Vec::new()
            })
            .push(i);
    }

    order
        .into_iter()
        .filter_map(|fc| by_class.remove(&fc))
        .collect()
}

fn partition(places: &[AggregatedPlace], indices: &[usize], config: &ClusterConfig) -> Vec<Vec<usize>> {
    match config.strategy {
        ClusterStrategy::Grid => grid_groups(places, indices, config.threshold_km),
        ClusterStrategy::Linkage => linkage_groups(places, indices, config.threshold_km),
    }
}

// ============================================================================
// Grid Buckets
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct GridCell {
    row: i64,
    col: i64,
}

impl GridCell {
    /// `ClusterConfig::validate` keeps `180 / delta` inside the i64 range.
    fn of(point: &GeoPoint, delta: f64) -> Self {
        Self {
            row: (point.latitude / delta).round() as i64,
            col: (point.longitude / delta).round() as i64,
        }
    }
}

fn grid_groups(places: &[AggregatedPlace], indices: &[usize], threshold_km: f64) -> Vec<Vec<usize>> {
    let delta = km_to_degrees(threshold_km);
    let mut cells: HashMap<GridCell, usize> = HashMap::new();
    let mut groups: Vec<Vec<usize>> = Vec::new();

    for &i in indices {
        let cell = GridCell::of(&places[i].coordinate, delta);
        match cells.get(&cell) {
            Some(&g) => groups[g].push(i),
            None => {
                cells.insert(cell, groups.len());
                groups.push(vec![i]);
            }
        }
    }

    groups
}

// ============================================================================
// Single Linkage
// ============================================================================

/// A place coordinate with its input index, for R-tree queries.
#[derive(Debug, Clone, Copy)]
struct IndexedPlace {
    idx: usize,
    lat: f64,
    lng: f64,
}

impl RTreeObject for IndexedPlace {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point([self.lng, self.lat])
    }
}

fn linkage_groups(places: &[AggregatedPlace], indices: &[usize], threshold_km: f64) -> Vec<Vec<usize>> {
    let entries: Vec<IndexedPlace> = indices
        .iter()
        .map(|&idx| IndexedPlace {
            idx,
            lat: places[idx].coordinate.latitude,
            lng: places[idx].coordinate.longitude,
        })
        .collect();
    let rtree = RTree::bulk_load(entries.clone());

    let threshold_m = threshold_km * 1000.0;
    let mut sets = DisjointSet::new(places.len());

    for entry in &entries {
        let (lat_pad, lng_pad) = search_window(threshold_m, entry.lat);
        let lat_pad = lat_pad * WINDOW_MARGIN;
        let lng_pad = lng_pad.map_or(360.0, |d| d * WINDOW_MARGIN);
        let window = AABB::from_corners(
            [entry.lng - lng_pad, entry.lat - lat_pad],
            [entry.lng + lng_pad, entry.lat + lat_pad],
        );

        let origin = places[entry.idx].coordinate;
        for other in rtree.locate_in_envelope_intersecting(&window) {
            // Each pair once
            if other.idx <= entry.idx {
                continue;
            }
            if haversine_distance(&origin, &places[other.idx].coordinate) <= threshold_m {
                sets.union(entry.idx, other.idx);
            }
        }
    }

    let mut root_to_group: HashMap<usize, usize> = HashMap::new();
    let mut groups: Vec<Vec<usize>> = Vec::new();
    for &i in indices {
        let root = sets.find(i);
        match root_to_group.get(&root) {
            Some(&g) => groups[g].push(i),
            None => {
                root_to_group.insert(root, groups.len());
                groups.push(vec![i]);
            }
        }
    }

    groups
}

/// Union-find over input indices, with path compression.
struct DisjointSet {
    parent: Vec<usize>,
}

impl DisjointSet {
    fn new(n: usize) -> Self {
        Self { parent: (0..n).collect() }
    }

    fn find(&mut self, id: usize) -> usize {
        let mut root = id;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        let mut current = id;
        while self.parent[current] != root {
            let next = self.parent[current];
            self.parent[current] = root;
            current = next;
        }
        root
    }

    /// The smaller root wins, so roots never depend on union order.
    fn union(&mut self, a: usize, b: usize) {
        let root_a = self.find(a);
        let root_b = self.find(b);
        if root_a != root_b {
            let (keep, merge) = if root_a < root_b { (root_a, root_b) } else { (root_b, root_a) };
            self.parent[merge] = keep;
        }
    }
}

// ============================================================================
// Cluster Assembly
// ============================================================================

fn make_cluster(id: usize, places: &[AggregatedPlace], indices: &[usize], config: &ClusterConfig) -> Cluster {
    let members: Vec<AggregatedPlace> = indices.iter().map(|&i| places[i].clone()).collect();
    let coordinates: Vec<GeoPoint> = members.iter().map(|m| m.coordinate).collect();

    let total_frequency: u64 = members.iter().map(|m| m.total_frequency).sum();
    let total_books: usize = members.iter().map(|m| m.book_count()).sum();
    let distinct_books = members
        .iter()
        .flat_map(|m| m.book_ids.iter().map(String::as_str))
        .collect::<BTreeSet<&str>>()
        .len();

    let mut cluster = Cluster {
        id,
        centroid: compute_center(&coordinates),
        feature_class: dominant_class(&members),
        members,
        total_frequency,
        total_books,
        distinct_books,
        boundary: None,
    };

    if config.compute_boundaries && !cluster.is_singleton() {
        cluster.boundary = build_boundary(&cluster, &config.boundary);
    }

    cluster
}

/// Class with the highest summed frequency; the earliest class wins ties.
fn dominant_class(members: &[AggregatedPlace]) -> FeatureClass {
    let mut totals: Vec<(FeatureClass, u64)> = Vec::new();
    for m in members {
        match totals.iter_mut().find(|(fc, _)| *fc == m.feature_class) {
            Some((_, total)) => *total += m.total_frequency,
            None => totals.push((m.feature_class, m.total_frequency)),
        }
    }

    let mut best = totals[0];
    for &candidate in &totals[1..] {
        if candidate.1 > best.1 {
            best = candidate;
        }
    }
    best.0
}

// ============================================================================
// Tests
// ============================================================================
