#![forbid(unsafe_code)]

//! The recommendation engine: owns the live relations and model and exposes
//! the query and ingestion API.
//!
//! Live state is an immutable [`EngineState`] behind an `Arc`. Queries clone
//! the current `Arc` and run against it; ingestion builds a complete
//! replacement and swaps it in. A query that starts while ingestion is
//! retraining therefore sees the previous, consistent state.

use std::sync::Arc;
use std::time::Instant;

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::import::Dataset;
use crate::model::{AlsTrainer, FactorSnapshot, FactorTrainer, Model, TrainParams};
use crate::query::{HistoryEntry, PredictedItem, QueryEngine, QueryOptions, SimilarItem};
use crate::storage::{recompute, CatalogStore, ItemAggregates, RatingStore, Relation};
use crate::types::{ItemId, Result, UserId};

mod ingest;

/// Tunables for training and querying.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineOptions {
    /// Hyperparameters for every (re)training.
    pub training: TrainParams,
    /// Ranking thresholds.
    pub queries: QueryOptions,
}

/// One consistent generation of ratings, aggregates, and model.
#[derive(Debug)]
pub struct EngineState {
    ratings: RatingStore,
    aggregates: ItemAggregates,
    model: Model,
    generation: u64,
}

impl EngineState {
    /// Rating relation of this generation.
    pub fn ratings(&self) -> &RatingStore {
        &self.ratings
    }

    /// Aggregates computed from [`EngineState::ratings`].
    pub fn aggregates(&self) -> &ItemAggregates {
        &self.aggregates
    }

    /// Model trained on [`EngineState::ratings`].
    pub fn model(&self) -> &Model {
        &self.model
    }

    /// Number of ingestions since the engine was opened.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Summary counters for the live state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngineStats {
    /// State generation.
    pub generation: u64,
    /// Rating rows.
    pub ratings: usize,
    /// Distinct users with ratings.
    pub users: usize,
    /// Distinct items with ratings.
    pub rated_items: usize,
    /// Catalog item rows.
    pub catalog_items: usize,
    /// External link rows.
    pub links: usize,
    /// Users with trained factors.
    pub trained_users: usize,
    /// Items with trained factors.
    pub trained_items: usize,
    /// Parameters of the live model.
    pub params: TrainParams,
}

/// Recommendation engine over a catalog, a rating relation, and a model.
pub struct Engine {
    catalog: Arc<CatalogStore>,
    state: RwLock<Arc<EngineState>>,
    writer: Mutex<()>,
    trainer: Box<dyn FactorTrainer>,
    options: EngineOptions,
}

impl Engine {
    /// Builds the stores and trains the initial model with [`AlsTrainer`].
    pub fn open(dataset: Dataset, options: EngineOptions) -> Result<Self> {
        Self::open_with_trainer(dataset, options, Box::new(AlsTrainer))
    }

    /// Builds the stores and trains the initial model with `trainer`.
    pub fn open_with_trainer(
        dataset: Dataset,
        options: EngineOptions,
        trainer: Box<dyn FactorTrainer>,
    ) -> Result<Self> {
        let start = Instant::now();
        let (catalog, ratings) = split(dataset);
        let aggregates = recompute(&ratings);
        let model = Model::train(trainer.as_ref(), &ratings, options.training)?;
        let engine = Self::assemble(catalog, ratings, aggregates, model, trainer, options);
        info!(
            duration_ms = start.elapsed().as_secs_f64() * 1_000.0,
            "engine.open.trained"
        );
        Ok(engine)
    }

    /// Starts from an already trained model, e.g. one reloaded from a
    /// [`FactorSnapshot`]. Later ingestions retrain with [`AlsTrainer`].
    pub fn open_with_model(dataset: Dataset, options: EngineOptions, model: Model) -> Self {
        let (catalog, ratings) = split(dataset);
        let aggregates = recompute(&ratings);
        let engine = Self::assemble(
            catalog,
            ratings,
            aggregates,
            model,
            Box::new(AlsTrainer),
            options,
        );
        info!("engine.open.preloaded");
        engine
    }

    fn assemble(
        catalog: CatalogStore,
        ratings: RatingStore,
        aggregates: ItemAggregates,
        model: Model,
        trainer: Box<dyn FactorTrainer>,
        options: EngineOptions,
    ) -> Self {
        info!(
            ratings = ratings.len(),
            items = catalog.item_count(),
            links = catalog.link_count(),
            rated_items = aggregates.key_count(),
            "engine.open"
        );
        Self {
            catalog: Arc::new(catalog),
            state: RwLock::new(Arc::new(EngineState {
                ratings,
                aggregates,
                model,
                generation: 0,
            })),
            writer: Mutex::new(()),
            trainer,
            options,
        }
    }

    /// Current state. The returned handle stays valid across later ingestions.
    pub fn snapshot(&self) -> Arc<EngineState> {
        self.state.read().clone()
    }

    /// Catalog shared by every generation.
    pub fn catalog(&self) -> &CatalogStore {
        &self.catalog
    }

    /// Options the engine was opened with.
    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Generation of the live state.
    pub fn generation(&self) -> u64 {
        self.state.read().generation
    }

    /// Predicted ratings of `user_id` for `item_ids`.
    pub fn ratings_for_items(&self, user_id: UserId, item_ids: &[ItemId]) -> Vec<PredictedItem> {
        self.with_query(|query| query.predict_for_items(user_id, item_ids))
    }

    /// Top `count` unrated items for `user_id`.
    pub fn top_recommendations(&self, user_id: UserId, count: usize) -> Vec<PredictedItem> {
        self.with_query(|query| query.top_recommendations(user_id, count))
    }

    /// Items most similar to `item_id`, self-match first.
    pub fn similar_items(&self, item_id: ItemId) -> Result<Vec<SimilarItem>> {
        self.with_query(|query| query.similar_items(item_id))
    }

    /// Distinct ratings `user_id` has given.
    pub fn user_history(&self, user_id: UserId) -> Vec<HistoryEntry> {
        self.with_query(|query| query.user_history(user_id))
    }

    /// Serializable copy of the live model.
    pub fn export_snapshot(&self) -> FactorSnapshot {
        FactorSnapshot::capture(&self.snapshot().model)
    }

    /// Counters describing the live state.
    pub fn stats(&self) -> EngineStats {
        let state = self.snapshot();
        let factors = state.model.factors();
        EngineStats {
            generation: state.generation,
            ratings: state.ratings.len(),
            users: state.ratings.distinct_users(),
            rated_items: state.aggregates.key_count(),
            catalog_items: self.catalog.item_count(),
            links: self.catalog.link_count(),
            trained_users: factors.user_vectors().count(),
            trained_items: factors.item_vectors().count(),
            params: *state.model.params(),
        }
    }

    fn with_query<R>(&self, run: impl FnOnce(&QueryEngine<'_>) -> R) -> R {
        let state = self.snapshot();
        let query = QueryEngine::new(
            &self.catalog,
            &state.ratings,
            &state.aggregates,
            &state.model,
            &self.options.queries,
        );
        run(&query)
    }
}

fn split(dataset: Dataset) -> (CatalogStore, RatingStore) {
    let Dataset {
        ratings,
        items,
        links,
    } = dataset;
    (
        CatalogStore::new(items, links),
        RatingStore::from_rows(ratings),
    )
}
