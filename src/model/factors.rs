use rustc_hash::FxHashMap;

use crate::model::{FactorModel, Prediction};
use crate::types::{ItemId, ReelError, Result, UserId};

/// Row-major factor tables for users and items.
#[derive(Clone, Debug)]
pub struct DenseFactors {
    rank: usize,
    users: Vec<UserId>,
    user_index: FxHashMap<UserId, usize>,
    user_data: Vec<f32>,
    items: Vec<ItemId>,
    item_index: FxHashMap<ItemId, usize>,
    item_data: Vec<f32>,
}

impl DenseFactors {
    /// Builds factor tables from explicit vectors.
    ///
    /// Every vector must have length `rank` and ids must be unique per side.
    pub fn new(
        rank: usize,
        users: Vec<(UserId, Vec<f32>)>,
        items: Vec<(ItemId, Vec<f32>)>,
    ) -> Result<Self> {
        let (user_ids, user_data) = flatten(rank, users)?;
        let (item_ids, item_data) = flatten(rank, items)?;
        Self::from_parts(rank, user_ids, user_data, item_ids, item_data)
    }

    pub(crate) fn from_parts(
        rank: usize,
        users: Vec<UserId>,
        user_data: Vec<f32>,
        items: Vec<ItemId>,
        item_data: Vec<f32>,
    ) -> Result<Self> {
        debug_assert_eq!(users.len() * rank, user_data.len());
        debug_assert_eq!(items.len() * rank, item_data.len());
        let user_index = index_of(&users)?;
        let item_index = index_of(&items)?;
        Ok(Self {
            rank,
            users,
            user_index,
            user_data,
            items,
            item_index,
            item_data,
        })
    }

    /// Latent vector of `user_id`, if trained.
    pub fn user_factors(&self, user_id: UserId) -> Option<&[f32]> {
        self.user_index
            .get(&user_id)
            .map(|&pos| &self.user_data[pos * self.rank..(pos + 1) * self.rank])
    }

    /// Number of users with factors.
    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    /// Number of items with factors.
    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    fn item_slice(&self, pos: usize) -> &[f32] {
        &self.item_data[pos * self.rank..(pos + 1) * self.rank]
    }
}

impl FactorModel for DenseFactors {
    fn rank(&self) -> usize {
        self.rank
    }

    fn predict(&self, pairs: &[(UserId, ItemId)]) -> Vec<Prediction> {
        pairs
            .iter()
            .filter_map(|&(user_id, item_id)| {
                let user = self.user_factors(user_id)?;
                let item = self.item_index.get(&item_id).map(|&pos| self.item_slice(pos))?;
                Some(Prediction {
                    user_id,
                    item_id,
                    score: dot(user, item),
                })
            })
            .collect()
    }

    fn item_factors(&self, item_id: ItemId) -> Result<&[f32]> {
        self.item_index
            .get(&item_id)
            .map(|&pos| self.item_slice(pos))
            .ok_or(ReelError::UnknownItem(item_id))
    }

    fn item_vectors(&self) -> Box<dyn Iterator<Item = (ItemId, &[f32])> + '_> {
        Box::new(
            self.items
                .iter()
                .copied()
                .zip(self.item_data.chunks_exact(self.rank)),
        )
    }

    fn user_vectors(&self) -> Box<dyn Iterator<Item = (UserId, &[f32])> + '_> {
        Box::new(
            self.users
                .iter()
                .copied()
                .zip(self.user_data.chunks_exact(self.rank)),
        )
    }
}

/// Dot product accumulated in `f64`.
pub fn dot(a: &[f32], b: &[f32]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(&x, &y)| f64::from(x) * f64::from(y))
        .sum()
}

fn flatten<K: Copy>(rank: usize, rows: Vec<(K, Vec<f32>)>) -> Result<(Vec<K>, Vec<f32>)> {
    if rank == 0 {
        return Err(ReelError::Invalid("rank must be positive"));
    }
    let mut ids = Vec::with_capacity(rows.len());
    let mut data = Vec::with_capacity(rows.len() * rank);
    for (id, vector) in rows {
        if vector.len() != rank {
            return Err(ReelError::Invalid("factor vector length must equal rank"));
        }
        ids.push(id);
        data.extend_from_slice(&vector);
    }
    Ok((ids, data))
}

fn index_of<K: Copy + Eq + std::hash::Hash>(ids: &[K]) -> Result<FxHashMap<K, usize>> {
    let mut index = FxHashMap::default();
    index.reserve(ids.len());
    for (pos, id) in ids.iter().enumerate() {
        if index.insert(*id, pos).is_some() {
            return Err(ReelError::Invalid("duplicate id in factor table"));
        }
    }
    Ok(index)
}
