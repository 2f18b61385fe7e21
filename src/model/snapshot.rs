use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::model::{DenseFactors, Model, TrainParams};
use crate::types::{ItemId, ReelError, Result, UserId};

/// Current on-disk snapshot version.
pub const SNAPSHOT_VERSION: u32 = 1;

/// One latent vector keyed by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorRow<K> {
    /// User or item id.
    pub id: K,
    /// Latent vector of length `rank`.
    pub factors: Vec<f32>,
}

/// Serializable copy of a trained model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorSnapshot {
    /// Snapshot format version.
    pub version: u32,
    /// Parameters the factors were trained with.
    pub params: TrainParams,
    /// Number of ratings the model was trained on.
    pub trained_on: usize,
    /// User factor table.
    pub users: Vec<FactorRow<UserId>>,
    /// Item factor table.
    pub items: Vec<FactorRow<ItemId>>,
}

impl FactorSnapshot {
    /// Copies the factors of a live model.
    pub fn capture(model: &Model) -> Self {
        let factors = model.factors();
        Self {
            version: SNAPSHOT_VERSION,
            params: *model.params(),
            trained_on: model.trained_on(),
            users: factors
                .user_vectors()
                .map(|(id, v)| FactorRow {
                    id,
                    factors: v.to_vec(),
                })
                .collect(),
            items: factors
                .item_vectors()
                .map(|(id, v)| FactorRow {
                    id,
                    factors: v.to_vec(),
                })
                .collect(),
        }
    }

    /// Writes the snapshot as JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer(&mut writer, self)
            .map_err(|err| ReelError::Snapshot(err.to_string()))?;
        writer.flush()?;
        info!(
            path = %path.display(),
            users = self.users.len(),
            items = self.items.len(),
            "model.snapshot.saved"
        );
        Ok(())
    }

    /// Reads a snapshot written by [`FactorSnapshot::save`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let reader = BufReader::new(File::open(path)?);
        let snapshot: FactorSnapshot =
            serde_json::from_reader(reader).map_err(|err| ReelError::Snapshot(err.to_string()))?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(ReelError::Snapshot(format!(
                "unsupported snapshot version {} (expected {SNAPSHOT_VERSION})",
                snapshot.version
            )));
        }
        info!(
            path = %path.display(),
            users = snapshot.users.len(),
            items = snapshot.items.len(),
            "model.snapshot.loaded"
        );
        Ok(snapshot)
    }

    /// Rebuilds a [`Model`] from the snapshot.
    pub fn into_model(self) -> Result<Model> {
        self.params.validate()?;
        let rank = self.params.rank;
        let users = self.users.into_iter().map(|row| (row.id, row.factors)).collect();
        let items = self.items.into_iter().map(|row| (row.id, row.factors)).collect();
        let factors = DenseFactors::new(rank, users, items).map_err(|err| match err {
            ReelError::Invalid(msg) => ReelError::Snapshot(msg.to_string()),
            other => other,
        })?;
        Model::from_factors(self.params, self.trained_on, Box::new(factors))
    }
}
