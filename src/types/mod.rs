#![forbid(unsafe_code)]

//! Identifiers, row types, and the crate-wide error type.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a user in the rating relation.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

/// Identifier of a catalog item.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for UserId {
    fn from(value: i64) -> Self {
        UserId(value)
    }
}

impl From<i64> for ItemId {
    fn from(value: i64) -> Self {
        ItemId(value)
    }
}

/// A single (user, item, score) observation.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Rating {
    /// User that produced the rating.
    pub user_id: UserId,
    /// Rated item.
    pub item_id: ItemId,
    /// Rating value as loaded.
    pub score: f64,
}

impl Rating {
    /// Builds a rating from raw identifiers.
    pub fn new(user_id: i64, item_id: i64, score: f64) -> Self {
        Self {
            user_id: UserId(user_id),
            item_id: ItemId(item_id),
            score,
        }
    }
}

/// Catalog row describing an item.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Item identifier.
    pub item_id: ItemId,
    /// Display title.
    pub title: String,
    /// Pipe-separated genre list, when the catalog carries one.
    pub genres: Option<String>,
}

/// Link from a catalog item to identifiers in external catalogs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemExternalRef {
    /// Item identifier.
    pub item_id: ItemId,
    /// Primary external identifier, surfaced in query results.
    pub external_id_a: String,
    /// Secondary external identifier; may be empty.
    pub external_id_b: String,
}

/// Per-item statistics derived from the rating relation.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ItemAggregate {
    /// Item identifier.
    pub item_id: ItemId,
    /// Number of rating rows for the item.
    pub rating_count: u64,
    /// Mean score across those rows.
    pub mean_rating: f64,
}

/// Errors surfaced by loading, training, and querying.
#[derive(thiserror::Error, Debug)]
pub enum ReelError {
    /// Underlying I/O failure.
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),
    /// An input row could not be split or coerced.
    #[error("malformed record in {source_name} at line {line}: {reason}")]
    MalformedRecord {
        /// Name of the relation being loaded.
        source_name: String,
        /// 1-based line number of the offending record.
        line: u64,
        /// What went wrong.
        reason: String,
    },
    /// The item has no trained latent factors.
    #[error("unknown item {0}: no trained factors")]
    UnknownItem(ItemId),
    /// The factor learner failed.
    #[error("training failed: {0}")]
    Training(String),
    /// A factor snapshot could not be encoded, decoded, or is inconsistent.
    #[error("snapshot: {0}")]
    Snapshot(String),
    /// A caller supplied an argument outside the accepted domain.
    #[error("invalid argument: {0}")]
    Invalid(&'static str),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ReelError>;
