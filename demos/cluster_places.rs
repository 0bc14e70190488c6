//! Example of aggregating and clustering place mentions from a small corpus.
//!
//! Run with: cargo run --example cluster_places

use place_clusters::{
    aggregate_mentions, cluster_places, filter_feature_classes, top_by_frequency, ClusterCache, ClusterConfig,
    ClusterKey, ClusterStrategy, FeatureClass, GeoPoint, PlaceMention,
};

fn main() {
    use FeatureClass::*;

    let mentions = vec![
        PlaceMention::new("Christiania", "Oslo", GeoPoint::new(59.9139, 10.7522), PopulatedPlace, 42, "book-1"),
        PlaceMention::new("Kristiania", "Oslo", GeoPoint::new(59.9139, 10.7522), PopulatedPlace, 17, "book-2"),
        PlaceMention::new("Drammen", "Drammen", GeoPoint::new(59.7439, 10.2045), PopulatedPlace, 6, "book-1"),
        PlaceMention::new("Akerselven", "Akerselva", GeoPoint::new(59.9225, 10.7580), Hydrographic, 9, "book-2"),
        PlaceMention::new("Bergen", "Bergen", GeoPoint::new(60.3913, 5.3221), PopulatedPlace, 25, "book-3"),
        PlaceMention::new("Voss", "Voss", GeoPoint::new(60.6280, 6.4180), PopulatedPlace, 4, "book-3"),
        PlaceMention::new("Fløien", "Fløyen", GeoPoint::new(60.3947, 5.3447), Hypsographic, 3, "book-3"),
        PlaceMention::new("Trondhjem", "Trondheim", GeoPoint::new(63.4305, 10.3951), PopulatedPlace, 11, "book-1"),
        PlaceMention::new("Tromsø", "Tromsø", GeoPoint::new(69.6492, 18.9553), PopulatedPlace, 2, "book-2"),
        PlaceMention::unlocated("Soria Moria", "Soria Moria", Area, 5, "book-2"),
    ];

    println!("Place Clustering Example\n");

    let places = aggregate_mentions(&mentions);
    println!("{} mentions -> {} located places\n", mentions.len(), places.len());

    println!("Most mentioned:");
    for place in top_by_frequency(&places, 3) {
        println!(
            "   {:<10} {:>3} mentions in {} book(s), tokens {:?}",
            place.canonical_name,
            place.total_frequency,
            place.book_count(),
            place.tokens
        );
    }
    println!();

    for strategy in [ClusterStrategy::Grid, ClusterStrategy::Linkage] {
        let config = ClusterConfig {
            strategy,
            ..ClusterConfig::with_threshold(100.0)
        };
        let clusters = match cluster_places(&places, &config) {
            Ok(clusters) => clusters,
            Err(e) => {
                eprintln!("Clustering failed: {e}");
                return;
            }
        };

        println!("{:?} at {} km: {} clusters", strategy, config.threshold_km, clusters.len());
        for cluster in &clusters {
            let names: Vec<&str> = cluster.members.iter().map(|m| m.canonical_name.as_str()).collect();
            let boundary = cluster
                .boundary
                .as_ref()
                .map_or("marker".to_string(), |b| format!("{:?}", b.kind));
            println!(
                "   #{} ({:.3}, {:.3}) freq={} books={} class={} [{}] {}",
                cluster.id,
                cluster.centroid.latitude,
                cluster.centroid.longitude,
                cluster.total_frequency,
                cluster.distinct_books,
                cluster.feature_class.code(),
                boundary,
                names.join(", ")
            );
        }
        println!();
    }

    // Water only, cached: the second lookup never reclusters
    let mut cache = ClusterCache::default();
    let water_classes = [Hydrographic];
    let water = filter_feature_classes(&places, &water_classes);
    let config = ClusterConfig::with_threshold(50.0);
    let key = ClusterKey::new(water_classes, config.threshold_km, None);

    for _ in 0..2 {
        if let Err(e) = cache.get_or_compute(key.clone(), || cluster_places(&water, &config)) {
            eprintln!("Clustering failed: {e}");
            return;
        }
    }
    let stats = cache.stats();
    println!(
        "Cache: {} hit(s), {} miss(es), {}/{} entries",
        stats.hits, stats.misses, stats.size, stats.capacity
    );
}
