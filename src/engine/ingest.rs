use std::sync::Arc;
use std::time::Instant;

use tracing::info;

use super::{Engine, EngineState};
use crate::model::Model;
use crate::storage::{recompute, Relation};
use crate::types::{Rating, Result};

impl Engine {
    /// Appends `ratings`, recomputes aggregates, retrains on the full rating
    /// relation, and publishes the result. Returns the input unchanged.
    ///
    /// Ingestions are serialized. The call blocks until retraining finishes;
    /// queries issued after it returns observe the new state. On training
    /// failure the previous state stays live.
    pub fn add_ratings(&self, ratings: Vec<Rating>) -> Result<Vec<Rating>> {
        let _writer = self.writer.lock();
        let start = Instant::now();
        let current = self.snapshot();

        let mut next_ratings = current.ratings.clone();
        next_ratings.append(&ratings);
        let aggregates = recompute(&next_ratings);
        let model = Model::train(self.trainer.as_ref(), &next_ratings, self.options.training)?;

        let next = Arc::new(EngineState {
            ratings: next_ratings,
            aggregates,
            model,
            generation: current.generation + 1,
        });
        let generation = next.generation;
        let total = next.ratings.len();
        *self.state.write() = next;

        info!(
            accepted = ratings.len(),
            total_ratings = total,
            generation,
            duration_ms = start.elapsed().as_secs_f64() * 1_000.0,
            "engine.ingest.completed"
        );
        Ok(ratings)
    }
}
