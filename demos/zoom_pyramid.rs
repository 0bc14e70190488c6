//! Example of clustering one place set at every zoom level of a map.
//!
//! Run with: cargo run --example zoom_pyramid --features parallel

use place_clusters::{
    aggregate_mentions, cluster_at_thresholds, cluster_at_thresholds_parallel, ClusterConfig, ClusterStrategy,
    FeatureClass, GeoPoint, PlaceMention,
};
use std::time::Instant;

/// Threshold per zoom level: roughly the ground width of a marker.
fn threshold_for_zoom(zoom: u8) -> f64 {
    400.0 / 2f64.powi(i32::from(zoom) - 4)
}

fn main() {
    println!("Zoom Pyramid Example\n");

    // A synthetic corpus: towns scattered along the Norwegian coast
    let mut mentions = Vec::new();
    for i in 0..2_000u32 {
        let t = f64::from(i) / 2_000.0;
        let lat = 58.0 + 13.0 * t + 0.3 * (f64::from(i) * 0.37).sin();
        let lng = 5.0 + 20.0 * t * t + 0.5 * (f64::from(i) * 0.91).cos();
        let name = format!("place-{}", i);
        mentions.push(PlaceMention::new(
            &name,
            &name,
            GeoPoint::new(lat, lng),
            FeatureClass::ALL[(i % 8) as usize],
            1 + i % 13,
            &format!("book-{}", i % 40),
        ));
    }

    let places = aggregate_mentions(&mentions);
    let zooms: Vec<u8> = (4..=12).collect();
    let thresholds: Vec<f64> = zooms.iter().map(|&z| threshold_for_zoom(z)).collect();
    let config = ClusterConfig {
        strategy: ClusterStrategy::Linkage,
        ..ClusterConfig::default()
    };

    let start = Instant::now();
    let sequential = cluster_at_thresholds(&places, &thresholds, &config);
    let sequential_time = start.elapsed();

    let start = Instant::now();
    let parallel = cluster_at_thresholds_parallel(&places, &thresholds, &config);
    let parallel_time = start.elapsed();

    let (sequential, parallel) = match (sequential, parallel) {
        (Ok(s), Ok(p)) => (s, p),
        (Err(e), _) | (_, Err(e)) => {
            eprintln!("Clustering failed: {e}");
            return;
        }
    };

    println!("{} places, {} zoom levels", places.len(), zooms.len());
    println!("Sequential: {:?}", sequential_time);
    println!("Parallel:   {:?}", parallel_time);
    println!("Identical:  {}\n", sequential == parallel);

    for ((zoom, threshold), clusters) in zooms.iter().zip(&thresholds).zip(&parallel) {
        let largest = clusters.iter().map(|c| c.members.len()).max().unwrap_or(0);
        println!(
            "   zoom {:>2}: {:>7.2} km -> {:>4} clusters (largest {})",
            zoom,
            threshold,
            clusters.len(),
            largest
        );
    }
}
