//! Explicit-feedback alternating least squares.
//!
//! Each pass fixes one side and solves a regularized normal equation per row
//! of the other side. Regularization is scaled by the number of ratings in the
//! row. Users and items are visited in ascending id order and initial factors
//! come from a seeded ChaCha stream, so output depends only on the ratings and
//! [`TrainParams`].

use std::collections::BTreeSet;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rustc_hash::FxHashMap;
use tracing::debug;

use crate::model::{DenseFactors, FactorModel, FactorTrainer, TrainParams};
use crate::storage::RatingStore;
use crate::types::{ItemId, Rating, ReelError, Result, UserId};

const MIN_PIVOT: f64 = 1e-12;

/// Default [`FactorTrainer`].
#[derive(Debug, Clone, Copy, Default)]
pub struct AlsTrainer;

impl FactorTrainer for AlsTrainer {
    fn train(&self, ratings: &RatingStore, params: &TrainParams) -> Result<Box<dyn FactorModel>> {
        Ok(Box::new(train(ratings.rows(), params)?))
    }
}

/// Trains dense factors over `ratings`.
pub fn train(ratings: &[Rating], params: &TrainParams) -> Result<DenseFactors> {
    params.validate()?;
    if ratings.is_empty() {
        return Err(ReelError::Training("no ratings to train on".into()));
    }
    let rank = params.rank;
    let users: Vec<UserId> = ratings
        .iter()
        .map(|r| r.user_id)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let items: Vec<ItemId> = ratings
        .iter()
        .map(|r| r.item_id)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let user_pos: FxHashMap<UserId, usize> =
        users.iter().enumerate().map(|(pos, id)| (*id, pos)).collect();
    let item_pos: FxHashMap<ItemId, usize> =
        items.iter().enumerate().map(|(pos, id)| (*id, pos)).collect();

    let mut by_user: Vec<Vec<(usize, f64)>> = vec![Vec::new(); users.len()];
    let mut by_item: Vec<Vec<(usize, f64)>> = vec![Vec::new(); items.len()];
    for rating in ratings {
        let u = user_pos[&rating.user_id];
        let i = item_pos[&rating.item_id];
        by_user[u].push((i, rating.score));
        by_item[i].push((u, rating.score));
    }

    let mut rng = ChaCha8Rng::seed_from_u64(params.seed);
    let mut user_data = init_factors(&mut rng, users.len(), rank);
    let mut item_data = init_factors(&mut rng, items.len(), rank);
    let mut solver = NormalEquation::new(rank);
    for iteration in 0..params.iterations {
        solve_side(&by_user, &item_data, &mut user_data, params.regularization, &mut solver)?;
        solve_side(&by_item, &user_data, &mut item_data, params.regularization, &mut solver)?;
        debug!(iteration, "model.als.iteration");
    }
    DenseFactors::from_parts(rank, users, user_data, items, item_data)
}

fn init_factors(rng: &mut ChaCha8Rng, rows: usize, rank: usize) -> Vec<f32> {
    let mut data = Vec::with_capacity(rows * rank);
    for _ in 0..rows {
        let start = data.len();
        data.extend((0..rank).map(|_| rng.gen::<f32>()));
        let row = &mut data[start..];
        let norm = row.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            row.iter_mut().for_each(|v| *v /= norm);
        }
    }
    data
}

fn solve_side(
    rows: &[Vec<(usize, f64)>],
    fixed: &[f32],
    target: &mut [f32],
    regularization: f64,
    solver: &mut NormalEquation,
) -> Result<()> {
    let rank = solver.rank;
    for (row, entries) in rows.iter().enumerate() {
        solver.reset();
        for &(col, score) in entries {
            solver.add(&fixed[col * rank..(col + 1) * rank], score);
        }
        let reg = regularization * entries.len() as f64;
        solver.solve(reg, &mut target[row * rank..(row + 1) * rank])?;
    }
    Ok(())
}

/// Accumulates `AᵀA` and `Aᵀb` for one row and solves by Cholesky.
struct NormalEquation {
    rank: usize,
    ata: Vec<f64>,
    atb: Vec<f64>,
    lower: Vec<f64>,
    scratch: Vec<f64>,
}

impl NormalEquation {
    fn new(rank: usize) -> Self {
        Self {
            rank,
            ata: vec![0.0; rank * rank],
            atb: vec![0.0; rank],
            lower: vec![0.0; rank * rank],
            scratch: vec![0.0; rank],
        }
    }

    fn reset(&mut self) {
        self.ata.iter_mut().for_each(|v| *v = 0.0);
        self.atb.iter_mut().for_each(|v| *v = 0.0);
    }

    fn add(&mut self, vector: &[f32], target: f64) {
        let n = self.rank;
        for i in 0..n {
            let vi = f64::from(vector[i]);
            self.atb[i] += vi * target;
            for j in 0..=i {
                self.ata[i * n + j] += vi * f64::from(vector[j]);
            }
        }
    }

    fn solve(&mut self, reg: f64, out: &mut [f32]) -> Result<()> {
        let n = self.rank;
        let (a, l) = (&self.ata, &mut self.lower);
        for j in 0..n {
            let mut diag = a[j * n + j] + reg;
            for k in 0..j {
                diag -= l[j * n + k] * l[j * n + k];
            }
            if !(diag.is_finite() && diag > MIN_PIVOT) {
                return Err(ReelError::Training(format!(
                    "normal equation is not positive definite (pivot {diag:e} at {j})"
                )));
            }
            let pivot = diag.sqrt();
            l[j * n + j] = pivot;
            for i in (j + 1)..n {
                let mut sum = a[i * n + j];
                for k in 0..j {
                    sum -= l[i * n + k] * l[j * n + k];
                }
                l[i * n + j] = sum / pivot;
            }
        }
        let y = &mut self.scratch;
        for i in 0..n {
            let mut sum = self.atb[i];
            for k in 0..i {
                sum -= l[i * n + k] * y[k];
            }
            y[i] = sum / l[i * n + i];
        }
        for i in (0..n).rev() {
            let mut sum = y[i];
            for k in (i + 1)..n {
                sum -= l[k * n + i] * y[k];
            }
            y[i] = sum / l[i * n + i];
        }
        for (dst, src) in out.iter_mut().zip(y.iter()) {
            *dst = *src as f32;
        }
        Ok(())
    }
}
