use rustc_hash::FxHashMap;

use crate::storage::ratings::RatingStore;
use crate::storage::relation::{KeyedRelation, Relation};
use crate::types::{ItemAggregate, ItemId};

/// Per-item aggregate relation.
pub type ItemAggregates = KeyedRelation<ItemAggregate>;

/// Groups every rating by item and computes count and mean.
///
/// The result replaces any previous aggregate relation wholesale. Items are
/// emitted in the order they first appear in the store.
pub fn recompute(ratings: &RatingStore) -> ItemAggregates {
    let mut order: Vec<ItemId> = Vec::new();
    let mut sums: FxHashMap<ItemId, (u64, f64)> = FxHashMap::default();
    for rating in ratings.scan() {
        let entry = sums.entry(rating.item_id).or_insert_with(|| {
            order.push(rating.item_id);
            (0, 0.0)
        });
        entry.0 += 1;
        entry.1 += rating.score;
    }
    let rows = order
        .into_iter()
        .map(|item_id| {
            let (count, sum) = sums[&item_id];
            ItemAggregate {
                item_id,
                rating_count: count,
                mean_rating: sum / count as f64,
            }
        })
        .collect();
    KeyedRelation::from_rows(rows)
}
