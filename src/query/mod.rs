#![forbid(unsafe_code)]

//! Query layer: predictions, top-N recommendations, similar items, and user
//! history.
//!
//! Every result is assembled by inner-joining on item id against the catalog,
//! the aggregate relation, and the external link relation, in that order.
//! Rows missing from any of them are dropped without error.

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::model::{Model, Prediction};
use crate::storage::{inner_join, CatalogStore, ItemAggregates, RatingStore};
use crate::types::{ItemId, Rating, Result, UserId};

/// Result row types.
pub mod rows;
/// Vector similarity helpers.
pub mod similarity;

pub use rows::{HistoryEntry, PredictedItem, SimilarItem};
pub use similarity::cosine_similarity;

/// Thresholds applied by the ranking queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryOptions {
    /// Minimum rating count for an item to appear in top-N results.
    pub top_min_ratings: u64,
    /// Minimum rating count for an item to appear in similarity results.
    pub similar_min_ratings: u64,
    /// Number of neighbours returned by similarity queries, excluding the
    /// leading self-match.
    pub similar_limit: usize,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            top_min_ratings: 25,
            similar_min_ratings: 5,
            similar_limit: 20,
        }
    }
}

/// Read-only view answering queries against one consistent engine state.
pub struct QueryEngine<'a> {
    catalog: &'a CatalogStore,
    ratings: &'a RatingStore,
    aggregates: &'a ItemAggregates,
    model: &'a Model,
    options: &'a QueryOptions,
}

impl<'a> QueryEngine<'a> {
    /// Binds the relations and model a query runs against.
    pub fn new(
        catalog: &'a CatalogStore,
        ratings: &'a RatingStore,
        aggregates: &'a ItemAggregates,
        model: &'a Model,
        options: &'a QueryOptions,
    ) -> Self {
        Self {
            catalog,
            ratings,
            aggregates,
            model,
            options,
        }
    }

    /// Predicts `user_id`'s rating for each requested item.
    ///
    /// Duplicated ids produce duplicated rows. Items without factors,
    /// catalog, aggregate, or link rows are omitted.
    pub fn predict_for_items(&self, user_id: UserId, item_ids: &[ItemId]) -> Vec<PredictedItem> {
        let pairs: Vec<(UserId, ItemId)> = item_ids.iter().map(|&item| (user_id, item)).collect();
        self.assemble(self.model.predict(&pairs))
    }

    /// Best `count` items the user has not rated, by descending prediction.
    ///
    /// Candidates are the distinct items rated by other users in first-seen
    /// order; equal scores keep that order.
    pub fn top_recommendations(&self, user_id: UserId, count: usize) -> Vec<PredictedItem> {
        if count == 0 {
            return Vec::new();
        }
        let rated = self.ratings.items_rated_by(user_id);
        let mut seen = FxHashSet::default();
        let pairs: Vec<(UserId, ItemId)> = self
            .ratings
            .excluding_user(user_id)
            .map(|r| r.item_id)
            .filter(|item| !rated.contains(item) && seen.insert(*item))
            .map(|item| (user_id, item))
            .collect();
        let min = self.options.top_min_ratings;
        let mut rows: Vec<PredictedItem> = self
            .assemble(self.model.predict(&pairs))
            .into_iter()
            .filter(|row| row.rating_count >= min)
            .collect();
        rows.sort_by(|a, b| b.predicted_rating.total_cmp(&a.predicted_rating));
        rows.truncate(count);
        debug!(
            user = user_id.0,
            candidates = pairs.len(),
            returned = rows.len(),
            "query.top.completed"
        );
        rows
    }

    /// Items closest to `item_id` using the configured limit.
    pub fn similar_items(&self, item_id: ItemId) -> Result<Vec<SimilarItem>> {
        self.similar_items_with_limit(item_id, self.options.similar_limit)
    }

    /// Items closest to `item_id` in latent space.
    ///
    /// Returns up to `limit + 1` rows. When the query item itself survives the
    /// joins and the count filter it is the first row with similarity 1.0;
    /// callers wanting neighbours only should drop it.
    pub fn similar_items_with_limit(
        &self,
        item_id: ItemId,
        limit: usize,
    ) -> Result<Vec<SimilarItem>> {
        let target = self.model.item_factors(item_id)?;
        let min = self.options.similar_min_ratings;
        let links = self.catalog.links();
        let mut rows = Vec::new();
        for (candidate, vector) in self.model.factors().item_vectors() {
            let mut similarity = cosine_similarity(target, vector);
            if candidate == item_id && similarity != 0.0 {
                similarity = 1.0;
            }
            for item in self.catalog.items().lookup(candidate) {
                for aggregate in self.aggregates.lookup(candidate) {
                    if aggregate.rating_count < min {
                        continue;
                    }
                    for link in links.lookup(candidate) {
                        rows.push(SimilarItem {
                            item_id: candidate,
                            title: item.title.clone(),
                            similarity,
                            rating_count: aggregate.rating_count,
                            mean_rating: aggregate.mean_rating,
                            external_ref: link.external_id_a.clone(),
                        });
                    }
                }
            }
        }
        rows.sort_by(|a, b| {
            b.similarity
                .total_cmp(&a.similarity)
                .then_with(|| (b.item_id == item_id).cmp(&(a.item_id == item_id)))
        });
        rows.truncate(limit.saturating_add(1));
        debug!(item = item_id.0, returned = rows.len(), "query.similar.completed");
        Ok(rows)
    }

    /// Distinct (item, score) pairs rated by `user_id`, in first-seen order.
    pub fn user_history(&self, user_id: UserId) -> Vec<HistoryEntry> {
        let mut seen = FxHashSet::default();
        let distinct: Vec<Rating> = self
            .ratings
            .for_user(user_id)
            .filter(|r| seen.insert((r.item_id, r.score.to_bits())))
            .copied()
            .collect();
        let links = self.catalog.links();
        inner_join(distinct, self.catalog.items())
            .flat_map(move |(rating, item)| {
                links.lookup(rating.item_id).map(move |link| HistoryEntry {
                    item_id: rating.item_id,
                    title: item.title.clone(),
                    rating: rating.score,
                    external_ref: link.external_id_a.clone(),
                })
            })
            .collect()
    }

    fn assemble(&self, predictions: Vec<Prediction>) -> Vec<PredictedItem> {
        let aggregates = self.aggregates;
        let links = self.catalog.links();
        inner_join(predictions, self.catalog.items())
            .flat_map(move |(prediction, item)| {
                aggregates
                    .lookup(prediction.item_id)
                    .map(move |aggregate| (prediction, item, aggregate))
            })
            .flat_map(move |(prediction, item, aggregate)| {
                links.lookup(prediction.item_id).map(move |link| PredictedItem {
                    item_id: prediction.item_id,
                    title: item.title.clone(),
                    predicted_rating: prediction.score,
                    rating_count: aggregate.rating_count,
                    external_ref: link.external_id_a.clone(),
                })
            })
            .collect()
    }
}
