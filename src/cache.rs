//! Bounded LRU cache for clustering results.
//!
//! Clustering the same filtered place set at the same threshold is common when a
//! map view pans back and forth between zoom levels. The cache is an ordinary
//! value owned by the caller: there is no global state, and two caches never
//! see each other's entries.
//!
//! # Example
//! ```
//! use place_clusters::{cluster_places, ClusterCache, ClusterConfig, ClusterKey};
//!
//! let mut cache = ClusterCache::new(4);
//! let config = ClusterConfig::with_threshold(50.0);
//! let key = ClusterKey::new(("P", "H"), config.threshold_km, Some(6));
//!
//! let first = cache.get_or_compute(key.clone(), || cluster_places(&[], &config)).unwrap();
//! let second = cache.get_or_compute(key, || cluster_places(&[], &config)).unwrap();
//! assert_eq!(first, second);
//!
//! let stats = cache.stats();
//! assert_eq!(stats.hits, 1);
//! assert_eq!(stats.misses, 1);
//! ```

use std::hash::Hash;
use std::num::NonZeroUsize;
use std::sync::Arc;

use log::debug;
use lru::LruCache;

use crate::error::Result;
use crate::Cluster;

/// Default number of cached clustering results.
pub const DEFAULT_CACHE_CAPACITY: usize = 16;

/// Identifies one clustering request.
///
/// `filter` is whatever describes the query upstream of clustering (feature
/// classes, corpus id, top-N limit). It is stored and compared in full, so two
/// different filters never share an entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClusterKey<F> {
    pub filter: F,
    /// `threshold_km.to_bits()`, so equal thresholds compare equal exactly
    pub threshold_bits: u64,
    pub zoom: Option<u8>,
}

impl<F> ClusterKey<F> {
    pub fn new(filter: F, threshold_km: f64, zoom: Option<u8>) -> Self {
        Self {
            filter,
            threshold_bits: threshold_km.to_bits(),
            zoom,
        }
    }

    pub fn threshold_km(&self) -> f64 {
        f64::from_bits(self.threshold_bits)
    }
}

/// Statistics about cache performance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Current number of entries
    pub size: usize,
    pub capacity: usize,
}

impl CacheStats {
    /// Hit rate in [0, 1]; 0 before any lookup.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// LRU cache of clustering results.
///
/// Results are shared as `Arc<Vec<Cluster>>` so a hit never copies clusters.
/// Not thread-safe; wrap in a mutex to share between threads.
#[derive(Debug)]
pub struct ClusterCache<F: Hash + Eq> {
    entries: LruCache<ClusterKey<F>, Arc<Vec<Cluster>>>,
    hits: u64,
    misses: u64,
}

impl<F: Hash + Eq> Default for ClusterCache<F> {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

impl<F: Hash + Eq> ClusterCache<F> {
    /// Create a cache holding at most `capacity` results (zero is treated as one).
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: LruCache::new(capacity),
            hits: 0,
            misses: 0,
        }
    }

    /// Cached result for `key`, or run `compute` and cache what it returns.
    ///
    /// Errors from `compute` are returned as-is and leave the cache unchanged,
    /// so the next call with the same key computes again.
    pub fn get_or_compute<C>(&mut self, key: ClusterKey<F>, compute: C) -> Result<Arc<Vec<Cluster>>>
    where
        C: FnOnce() -> Result<Vec<Cluster>>,
    {
        if let Some(clusters) = self.entries.get(&key) {
            self.hits += 1;
            return Ok(Arc::clone(clusters));
        }

        self.misses += 1;
        let clusters = Arc::new(compute()?);
        // The key was absent, so anything handed back is an eviction
        if let Some((evicted, _)) = self.entries.push(key, Arc::clone(&clusters)) {
            debug!("[ClusterCache] Evicted entry for {} km", evicted.threshold_km());
        }
        Ok(clusters)
    }

    /// Cached result, marking it most recently used.
    pub fn get(&mut self, key: &ClusterKey<F>) -> Option<Arc<Vec<Cluster>>> {
        self.entries.get(key).cloned()
    }

    /// Cached result without touching the LRU order.
    pub fn peek(&self, key: &ClusterKey<F>) -> Option<Arc<Vec<Cluster>>> {
        self.entries.peek(key).cloned()
    }

    pub fn contains(&self, key: &ClusterKey<F>) -> bool {
        self.entries.contains(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every entry. Statistics are kept.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn reset_stats(&mut self) {
        self.hits = 0;
        self.misses = 0;
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            size: self.entries.len(),
            capacity: self.entries.cap().get(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{cluster_places, ClusterConfig, ClusterError, FeatureClass};

    fn key(threshold_km: f64) -> ClusterKey<Vec<FeatureClass>> {
        ClusterKey::new(vec![FeatureClass::PopulatedPlace], threshold_km, None)
    }

    fn empty() -> Result<Vec<Cluster>> {
        cluster_places(&[], &ClusterConfig::default())
    }

    #[test]
    fn test_key_identity() {
        assert_eq!(key(50.0), key(50.0));
        assert_ne!(key(50.0), key(50.000001));
        assert_ne!(ClusterKey::new("P", 50.0, Some(4)), ClusterKey::new("P", 50.0, Some(5)));
        assert_ne!(ClusterKey::new("P", 50.0, None), ClusterKey::new("H", 50.0, None));
        assert_eq!(key(12.5).threshold_km(), 12.5);
    }

    #[test]
    fn test_distinct_filters_never_share_entries() {
        let mut cache = ClusterCache::new(8);
        let towns = ClusterKey::new(vec![FeatureClass::PopulatedPlace], 50.0, None);
        let water = ClusterKey::new(vec![FeatureClass::Hydrographic], 50.0, None);

        cache.get_or_compute(towns.clone(), empty).unwrap();
        assert!(cache.contains(&towns));
        assert!(!cache.contains(&water));

        let mut computed = false;
        cache
            .get_or_compute(water, || {
                computed = true;
                empty()
            })
            .unwrap();
        assert!(computed);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_hits_and_misses() {
        let mut cache: ClusterCache<Vec<FeatureClass>> = ClusterCache::default();
        let mut calls = 0;

        for _ in 0..3 {
            cache
                .get_or_compute(key(10.0), || {
                    calls += 1;
                    empty()
                })
                .unwrap();
        }

        assert_eq!(calls, 1);
        let stats = cache.stats();
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.size, 1);
        assert_eq!(stats.capacity, DEFAULT_CACHE_CAPACITY);
        assert!((stats.hit_rate() - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_lru_eviction() {
        let mut cache = ClusterCache::new(2);
        cache.get_or_compute(key(1.0), empty).unwrap();
        cache.get_or_compute(key(2.0), empty).unwrap();

        // Touch 1 so 2 becomes least recently used
        assert!(cache.get(&key(1.0)).is_some());
        cache.get_or_compute(key(3.0), empty).unwrap();

        assert!(cache.contains(&key(1.0)));
        assert!(!cache.contains(&key(2.0)));
        assert!(cache.contains(&key(3.0)));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_peek_keeps_order() {
        let mut cache = ClusterCache::new(2);
        cache.get_or_compute(key(1.0), empty).unwrap();
        cache.get_or_compute(key(2.0), empty).unwrap();

        assert!(cache.peek(&key(1.0)).is_some());
        cache.get_or_compute(key(3.0), empty).unwrap();

        assert!(!cache.contains(&key(1.0)));
        assert!(cache.contains(&key(2.0)));
    }

    #[test]
    fn test_errors_not_cached() {
        let mut cache = ClusterCache::new(4);
        let bad = ClusterConfig::with_threshold(-1.0);

        let result = cache.get_or_compute(key(-1.0), || cluster_places(&[], &bad));
        assert!(matches!(result, Err(ClusterError::InvalidParameter { .. })));
        assert!(cache.is_empty());

        cache.get_or_compute(key(-1.0), empty).unwrap();
        assert_eq!(cache.stats().misses, 2);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_zero_capacity_holds_one() {
        let mut cache = ClusterCache::new(0);
        cache.get_or_compute(key(1.0), empty).unwrap();
        cache.get_or_compute(key(2.0), empty).unwrap();
        assert_eq!(cache.stats().capacity, 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_clear_and_reset() {
        let mut cache = ClusterCache::new(4);
        cache.get_or_compute(key(1.0), empty).unwrap();
        cache.get_or_compute(key(1.0), empty).unwrap();

        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.stats().hits, 1);

        cache.reset_stats();
        assert_eq!(cache.stats(), CacheStats { hits: 0, misses: 0, size: 0, capacity: 4 });
    }

    #[test]
    fn test_caches_are_independent() {
        let mut a = ClusterCache::new(4);
        let b = ClusterCache::new(4);
        a.get_or_compute(key(1.0), empty).unwrap();
        assert!(a.contains(&key(1.0)));
        assert!(!b.contains(&key(1.0)));
    }
}
