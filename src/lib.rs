//! Reel: a collaborative-filtering recommendation engine.
//!
//! Ratings, catalog metadata, and external links are loaded into in-memory
//! relations, a latent-factor model is trained over the ratings, and queries
//! join model output back against the catalog.

#![warn(missing_docs)]

pub mod config;
pub mod engine;
pub mod import;
pub mod model;
pub mod query;
pub mod storage;
pub mod types;

pub use engine::{Engine, EngineOptions, EngineState, EngineStats};
pub use types::{Item, ItemExternalRef, ItemId, Rating, ReelError, Result, UserId};
