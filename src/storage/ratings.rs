use std::sync::Arc;

use rustc_hash::FxHashSet;

use crate::storage::relation::Relation;
use crate::types::{ItemId, Rating, UserId};

/// Append-only store of rating observations.
///
/// Cloning is cheap; the rows are shared until the next append on one of the
/// clones, which copies them first. Readers holding an older clone never see
/// rows appended later.
#[derive(Clone, Debug, Default)]
pub struct RatingStore {
    rows: Arc<Vec<Rating>>,
}

impl RatingStore {
    /// Wraps already-loaded rows.
    pub fn from_rows(rows: Vec<Rating>) -> Self {
        Self {
            rows: Arc::new(rows),
        }
    }

    /// Appends rows without deduplication and returns the accepted rows.
    pub fn append<'a>(&mut self, new_rows: &'a [Rating]) -> &'a [Rating] {
        Arc::make_mut(&mut self.rows).extend_from_slice(new_rows);
        new_rows
    }

    /// All rows in load/append order.
    pub fn rows(&self) -> &[Rating] {
        &self.rows
    }

    /// Ratings produced by `user_id`.
    pub fn for_user(&self, user_id: UserId) -> impl Iterator<Item = &Rating> + '_ {
        self.rows.iter().filter(move |r| r.user_id == user_id)
    }

    /// Ratings produced by anyone other than `user_id`.
    pub fn excluding_user(&self, user_id: UserId) -> impl Iterator<Item = &Rating> + '_ {
        self.rows.iter().filter(move |r| r.user_id != user_id)
    }

    /// Distinct items rated by `user_id`.
    pub fn items_rated_by(&self, user_id: UserId) -> FxHashSet<ItemId> {
        self.for_user(user_id).map(|r| r.item_id).collect()
    }

    /// Number of distinct users present.
    pub fn distinct_users(&self) -> usize {
        self.rows
            .iter()
            .map(|r| r.user_id)
            .collect::<FxHashSet<_>>()
            .len()
    }
}

impl Relation for RatingStore {
    type Row = Rating;

    fn len(&self) -> usize {
        self.rows.len()
    }

    fn scan(&self) -> Box<dyn Iterator<Item = &Rating> + '_> {
        Box::new(self.rows.iter())
    }
}
