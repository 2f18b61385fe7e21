#![forbid(unsafe_code)]

//! Latent-factor model boundary.
//!
//! The engine only talks to [`FactorTrainer`] and [`FactorModel`]; the
//! learning algorithm behind them is replaceable. [`als::AlsTrainer`] is the
//! default backend.

use std::fmt;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::storage::{ItemKeyed, RatingStore, Relation};
use crate::types::{ItemId, ReelError, Result, UserId};

/// Alternating least squares backend.
pub mod als;
/// Dense factor tables and vector helpers.
pub mod factors;
/// Serialized factor sets for reloading a trained model.
pub mod snapshot;

pub use als::AlsTrainer;
pub use factors::DenseFactors;
pub use snapshot::FactorSnapshot;

/// Hyperparameters handed to the factor learner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainParams {
    /// Dimension of every latent vector.
    pub rank: usize,
    /// Number of alternating passes.
    pub iterations: usize,
    /// Regularization weight.
    pub regularization: f64,
    /// Seed for factor initialization.
    pub seed: u64,
}

impl Default for TrainParams {
    fn default() -> Self {
        Self {
            rank: 8,
            iterations: 10,
            regularization: 0.1,
            seed: 5,
        }
    }
}

impl TrainParams {
    /// Rejects parameters no learner can honour.
    ///
    /// Regularization must be strictly positive: with a zero weight the
    /// normal equations of a user or item with fewer ratings than `rank` are
    /// singular.
    pub fn validate(&self) -> Result<()> {
        if self.rank == 0 {
            return Err(ReelError::Invalid("rank must be positive"));
        }
        if !(self.regularization.is_finite() && self.regularization > 0.0) {
            return Err(ReelError::Invalid(
                "regularization must be finite and positive",
            ));
        }
        Ok(())
    }
}

/// Predicted score for a (user, item) pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Prediction {
    /// User the score is for.
    pub user_id: UserId,
    /// Scored item.
    pub item_id: ItemId,
    /// Predicted rating.
    pub score: f64,
}

impl ItemKeyed for Prediction {
    fn item_id(&self) -> ItemId {
        self.item_id
    }
}

/// Trained latent factors able to score arbitrary pairs.
pub trait FactorModel: Send + Sync + fmt::Debug {
    /// Dimension of the latent vectors.
    fn rank(&self) -> usize;

    /// Scores each pair. Pairs whose user or item has no factors are omitted;
    /// the remaining predictions keep input order.
    fn predict(&self, pairs: &[(UserId, ItemId)]) -> Vec<Prediction>;

    /// Latent vector of `item_id`, or [`ReelError::UnknownItem`].
    fn item_factors(&self, item_id: ItemId) -> Result<&[f32]>;

    /// Every trained item vector.
    fn item_vectors(&self) -> Box<dyn Iterator<Item = (ItemId, &[f32])> + '_>;

    /// Every trained user vector.
    fn user_vectors(&self) -> Box<dyn Iterator<Item = (UserId, &[f32])> + '_>;
}

/// Produces a [`FactorModel`] from the full rating relation.
pub trait FactorTrainer: Send + Sync {
    /// Trains from scratch. Must be deterministic for identical inputs.
    fn train(&self, ratings: &RatingStore, params: &TrainParams) -> Result<Box<dyn FactorModel>>;
}

/// A trained factor model together with the parameters that produced it.
///
/// Models are never mutated; ingestion builds a replacement.
#[derive(Debug)]
pub struct Model {
    params: TrainParams,
    trained_on: usize,
    factors: Box<dyn FactorModel>,
}

impl Model {
    /// Trains a model over every rating in `ratings`.
    pub fn train(
        trainer: &dyn FactorTrainer,
        ratings: &RatingStore,
        params: TrainParams,
    ) -> Result<Self> {
        params.validate()?;
        let start = Instant::now();
        info!(
            ratings = ratings.len(),
            rank = params.rank,
            iterations = params.iterations,
            regularization = params.regularization,
            seed = params.seed,
            "model.train.begin"
        );
        let factors = trainer.train(ratings, &params)?;
        if factors.rank() != params.rank {
            return Err(ReelError::Training(format!(
                "learner returned rank {} (requested {})",
                factors.rank(),
                params.rank
            )));
        }
        info!(
            ratings = ratings.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1_000.0,
            "model.train.completed"
        );
        Ok(Self {
            params,
            trained_on: ratings.len(),
            factors,
        })
    }

    /// Wraps factors that were trained elsewhere, e.g. reloaded from a snapshot.
    pub fn from_factors(
        params: TrainParams,
        trained_on: usize,
        factors: Box<dyn FactorModel>,
    ) -> Result<Self> {
        if factors.rank() != params.rank {
            return Err(ReelError::Snapshot(format!(
                "factor rank {} does not match params rank {}",
                factors.rank(),
                params.rank
            )));
        }
        Ok(Self {
            params,
            trained_on,
            factors,
        })
    }

    /// Hyperparameters used for training.
    pub fn params(&self) -> &TrainParams {
        &self.params
    }

    /// Number of rating rows the model was trained on.
    pub fn trained_on(&self) -> usize {
        self.trained_on
    }

    /// Underlying factors.
    pub fn factors(&self) -> &dyn FactorModel {
        self.factors.as_ref()
    }

    /// See [`FactorModel::predict`].
    pub fn predict(&self, pairs: &[(UserId, ItemId)]) -> Vec<Prediction> {
        self.factors.predict(pairs)
    }

    /// See [`FactorModel::item_factors`].
    pub fn item_factors(&self, item_id: ItemId) -> Result<&[f32]> {
        self.factors.item_factors(item_id)
    }
}
