//! Aggregation of raw mentions into one record per canonical place name.
//!
//! Also hosts the presentation-side helpers (top-N truncation, feature-class
//! filtering) that callers apply between aggregation and clustering. They live
//! here rather than in the clusterer so a truncated view never changes how the
//! remaining places are grouped.

use std::collections::{BTreeSet, HashMap};

use log::debug;

use crate::{AggregatedPlace, FeatureClass, PlaceMention};

/// Merge mentions sharing a canonical name.
///
/// - Output order is the order in which each name first appears.
/// - Frequencies are summed; book ids are merged into a set.
/// - Coordinate and feature class come from the first located mention.
/// - Mentions without a coordinate are dropped: they cannot be placed on a map.
///
/// ```rust
/// use place_clusters::{aggregate_mentions, FeatureClass, GeoPoint, PlaceMention};
///
/// let oslo = GeoPoint::new(59.9139, 10.7522);
/// let mentions = vec![
///     PlaceMention::new("Christiania", "Oslo", oslo, FeatureClass::PopulatedPlace, 4, "b1"),
///     PlaceMention::new("Kristiania", "Oslo", oslo, FeatureClass::PopulatedPlace, 2, "b2"),
/// ];
///
/// let places = aggregate_mentions(&mentions);
/// assert_eq!(places.len(), 1);
/// assert_eq!(places[0].total_frequency, 6);
/// assert_eq!(places[0].tokens, vec!["Christiania", "Kristiania"]);
/// ```
pub fn aggregate_mentions(mentions: &[PlaceMention]) -> Vec<AggregatedPlace> {
    let mut places: Vec<AggregatedPlace> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut unlocated = 0usize;

    for mention in mentions {
        let Some(coordinate) = mention.coordinate else {
            unlocated += 1;
            continue;
        };

        match index.get(mention.canonical_name.as_str()) {
            Some(&i) => {
                let place = &mut places[i];
                place.total_frequency += u64::from(mention.mention_count);
                place.book_ids.insert(mention.source_book_id.clone());
                if !place.tokens.contains(&mention.token) {
                    place.tokens.push(mention.token.clone());
                }
            }
            None => {
                index.insert(mention.canonical_name.as_str(), places.len());
                places.push(AggregatedPlace {
                    canonical_name: mention.canonical_name.clone(),
                    tokens: vec![mention.token.clone()],
                    coordinate,
                    feature_class: mention.feature_class,
                    total_frequency: u64::from(mention.mention_count),
                    book_ids: BTreeSet::from([mention.source_book_id.clone()]),
                });
            }
        }
    }

    if unlocated > 0 {
        debug!("[Aggregate] Dropped {} mentions without coordinates", unlocated);
    }
    debug!("[Aggregate] {} mentions -> {} places", mentions.len(), places.len());

    places
}

/// The `n` most frequent places, most frequent first.
///
/// The sort is stable, so places with equal frequency keep their input order.
pub fn top_by_frequency(places: &[AggregatedPlace], n: usize) -> Vec<AggregatedPlace> {
    let mut sorted = places.to_vec();
    sorted.sort_by(|a, b| b.total_frequency.cmp(&a.total_frequency));
    sorted.truncate(n);
    sorted
}

/// Places whose feature class is in `classes`, input order preserved.
///
/// An empty `classes` slice selects nothing.
pub fn filter_feature_classes(places: &[AggregatedPlace], classes: &[FeatureClass]) -> Vec<AggregatedPlace> {
    places
        .iter()
        .filter(|p| classes.contains(&p.feature_class))
        .cloned()
        .collect()
}
