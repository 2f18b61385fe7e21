use serde::Serialize;

use crate::types::ItemId;

/// Predicted rating for one item, joined with catalog metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictedItem {
    /// Item identifier.
    pub item_id: ItemId,
    /// Catalog title.
    pub title: String,
    /// Model score for the requesting user.
    pub predicted_rating: f64,
    /// Number of ratings the item has received.
    pub rating_count: u64,
    /// Primary external identifier.
    pub external_ref: String,
}

/// Item ranked by latent-space closeness to a query item.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimilarItem {
    /// Item identifier.
    pub item_id: ItemId,
    /// Catalog title.
    pub title: String,
    /// Cosine similarity to the query item.
    pub similarity: f64,
    /// Number of ratings the item has received.
    pub rating_count: u64,
    /// Mean rating across those ratings.
    pub mean_rating: f64,
    /// Primary external identifier.
    pub external_ref: String,
}

/// One distinct (item, score) pair from a user's own ratings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryEntry {
    /// Item identifier.
    pub item_id: ItemId,
    /// Catalog title.
    pub title: String,
    /// Score the user gave.
    pub rating: f64,
    /// Primary external identifier.
    pub external_ref: String,
}
