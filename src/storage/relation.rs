//! Backend-agnostic row-set abstraction used by the query layer.
//!
//! Query code only talks to [`Relation`] scans and [`KeyedRelation`] lookups,
//! so a data-parallel backend can replace the in-memory one without touching
//! ranking logic.

use rustc_hash::FxHashMap;

use crate::types::{Item, ItemAggregate, ItemExternalRef, ItemId, Rating};

/// Read-only, scannable set of rows.
pub trait Relation {
    /// Row type yielded by scans.
    type Row;

    /// Number of rows.
    fn len(&self) -> usize;

    /// Returns `true` when the relation holds no rows.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterates every row in insertion order.
    fn scan(&self) -> Box<dyn Iterator<Item = &Self::Row> + '_>;
}

/// Rows that can be joined on an item identifier.
pub trait ItemKeyed {
    /// Join key.
    fn item_id(&self) -> ItemId;
}

impl ItemKeyed for Rating {
    fn item_id(&self) -> ItemId {
        self.item_id
    }
}

impl ItemKeyed for Item {
    fn item_id(&self) -> ItemId {
        self.item_id
    }
}

impl ItemKeyed for ItemExternalRef {
    fn item_id(&self) -> ItemId {
        self.item_id
    }
}

impl ItemKeyed for ItemAggregate {
    fn item_id(&self) -> ItemId {
        self.item_id
    }
}

/// In-memory relation indexed by item id.
///
/// Duplicate keys are retained, so joining against a key that appears twice
/// yields two output rows.
#[derive(Clone, Debug)]
pub struct KeyedRelation<T> {
    rows: Vec<T>,
    index: FxHashMap<ItemId, Vec<usize>>,
}

impl<T> Default for KeyedRelation<T> {
    fn default() -> Self {
        Self {
            rows: Vec::new(),
            index: FxHashMap::default(),
        }
    }
}

impl<T: ItemKeyed> KeyedRelation<T> {
    /// Builds the relation and its key index from rows.
    pub fn from_rows(rows: Vec<T>) -> Self {
        let mut index: FxHashMap<ItemId, Vec<usize>> = FxHashMap::default();
        for (pos, row) in rows.iter().enumerate() {
            index.entry(row.item_id()).or_default().push(pos);
        }
        Self { rows, index }
    }

    /// Iterates every row whose key equals `item_id`.
    pub fn lookup(&self, item_id: ItemId) -> impl Iterator<Item = &T> + '_ {
        self.index
            .get(&item_id)
            .into_iter()
            .flatten()
            .map(move |&pos| &self.rows[pos])
    }

    /// Returns the first row for `item_id`, if any.
    pub fn first(&self, item_id: ItemId) -> Option<&T> {
        self.lookup(item_id).next()
    }

    /// Returns `true` when at least one row carries `item_id`.
    pub fn contains(&self, item_id: ItemId) -> bool {
        self.index.contains_key(&item_id)
    }

    /// Number of distinct keys.
    pub fn key_count(&self) -> usize {
        self.index.len()
    }
}

impl<T> Relation for KeyedRelation<T> {
    type Row = T;

    fn len(&self) -> usize {
        self.rows.len()
    }

    fn scan(&self) -> Box<dyn Iterator<Item = &T> + '_> {
        Box::new(self.rows.iter())
    }
}

/// Inner-joins `left` against `right` on item id.
///
/// Left rows without a match are dropped; a left row matching several right
/// rows is emitted once per match. Output follows left order.
pub fn inner_join<'r, L, R, I>(
    left: I,
    right: &'r KeyedRelation<R>,
) -> impl Iterator<Item = (L, &'r R)> + 'r
where
    I: IntoIterator<Item = L>,
    I::IntoIter: 'r,
    L: ItemKeyed + Clone + 'r,
    R: ItemKeyed,
{
    left.into_iter().flat_map(move |l| {
        let key = l.item_id();
        right.lookup(key).map(move |r| (l.clone(), r))
    })
}
