#![forbid(unsafe_code)]

//! In-memory relations backing the engine: ratings, catalog, and aggregates.

/// Per-item rating statistics derived from the rating relation.
pub mod aggregates;
/// Item titles and external identifiers.
pub mod catalog;
/// Append-only rating observations.
pub mod ratings;
/// Row-set abstraction and join helpers.
pub mod relation;

pub use aggregates::{recompute, ItemAggregates};
pub use catalog::CatalogStore;
pub use ratings::RatingStore;
pub use relation::{inner_join, ItemKeyed, KeyedRelation, Relation};
