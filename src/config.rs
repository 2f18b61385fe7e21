//! TOML configuration for the engine and CLI.
//!
//! ```toml
//! [dataset]
//! dir = "data/ml-latest-small"
//! factors = "data/factors.json"
//!
//! [training]
//! rank = 8
//! iterations = 10
//!
//! [queries]
//! top_min_ratings = 25
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::engine::EngineOptions;
use crate::import::DatasetPaths;
use crate::model::TrainParams;
use crate::query::QueryOptions;

/// Parsed configuration file.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Input locations.
    pub dataset: DatasetSection,
    /// Training hyperparameters.
    pub training: TrainParams,
    /// Query thresholds.
    pub queries: QueryOptions,
}

/// `[dataset]` table.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DatasetSection {
    /// Directory holding `ratings.csv`, `movies.csv`, and `links.csv`.
    pub dir: Option<PathBuf>,
    /// Ratings file; overrides `dir`.
    pub ratings: Option<PathBuf>,
    /// Items file; overrides `dir`.
    pub items: Option<PathBuf>,
    /// Links file; overrides `dir`.
    pub links: Option<PathBuf>,
    /// Previously saved factor snapshot to start from.
    pub factors: Option<PathBuf>,
}

impl DatasetSection {
    /// Resolves the three input paths, or `None` if any is unknown.
    pub fn paths(&self) -> Option<DatasetPaths> {
        let base = self.dir.as_ref().map(DatasetPaths::in_dir);
        let pick = |explicit: &Option<PathBuf>, fallback: Option<&PathBuf>| {
            explicit.clone().or_else(|| fallback.cloned())
        };
        Some(DatasetPaths {
            ratings: pick(&self.ratings, base.as_ref().map(|b| &b.ratings))?,
            items: pick(&self.items, base.as_ref().map(|b| &b.items))?,
            links: pick(&self.links, base.as_ref().map(|b| &b.links))?,
        })
    }
}

impl EngineConfig {
    /// Loads `explicit`, or the default config file when it exists.
    ///
    /// A missing default file yields [`EngineConfig::default`]; a missing
    /// explicit file is an error.
    pub fn load(explicit: Option<PathBuf>) -> Result<Self, ConfigError> {
        match explicit {
            Some(path) => read_file(&path),
            None => match default_config_path() {
                Some(path) if path.exists() => read_file(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    /// Parses configuration from TOML text.
    pub fn from_toml(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    /// Engine options described by this file.
    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            training: self.training,
            queries: self.queries,
        }
    }
}

fn read_file(path: &Path) -> Result<EngineConfig, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    EngineConfig::from_toml(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Configuration loading failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config {path}: {source}")]
    Read {
        /// Offending path.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },
    /// The file is not valid TOML for [`EngineConfig`].
    #[error("failed to parse config {path}: {source}")]
    Parse {
        /// Offending path.
        path: PathBuf,
        /// Underlying error.
        source: toml::de::Error,
    },
}

/// `<config dir>/reel/engine.toml`.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|base| base.join("reel").join("engine.toml"))
}
