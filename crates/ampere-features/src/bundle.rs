//! Artifact bundle: everything inference needs besides the model.
//!
//! The bundle serializes as a JSON array of exactly three elements, in fixed
//! order: `[encoder, schema, [rolling_mean, rolling_std]]`.

use crate::encoder::OneHotEncoder;
use ampere_traits::{
    AmpereError, Result,
    columns::{ROLLING_MEAN, ROLLING_STD},
    types::column_f64,
};
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Rolling statistics carried forward from the last training row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "(f64, f64)", into = "(f64, f64)")]
pub struct RollingStats {
    /// Trailing mean of the target.
    pub mean: f64,
    /// Trailing sample standard deviation of the target.
    pub std: f64,
}

impl From<(f64, f64)> for RollingStats {
    fn from((mean, std): (f64, f64)) -> Self {
        Self { mean, std }
    }
}

impl From<RollingStats> for (f64, f64) {
    fn from(stats: RollingStats) -> Self {
        (stats.mean, stats.std)
    }
}

impl RollingStats {
    /// Reads the rolling statistics of the last row of a feature frame.
    ///
    /// # Errors
    ///
    /// Returns an error if the frame is empty, lacks the rolling columns, or
    /// the last row holds nulls.
    pub fn from_last_row(df: &DataFrame) -> Result<Self> {
        let last = |name: &str| -> Result<f64> {
            column_f64(df, name)?
                .last()
                .copied()
                .flatten()
                .ok_or_else(|| AmpereError::InsufficientData(format!("no value for '{name}'")))
        };
        Ok(Self {
            mean: last(ROLLING_MEAN)?,
            std: last(ROLLING_STD)?,
        })
    }
}

/// Encoder, frozen feature schema and rolling-statistics carry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactBundle(pub OneHotEncoder, pub Vec<String>, pub RollingStats);

impl ArtifactBundle {
    /// Bundles the training-time artifacts.
    pub fn new(encoder: OneHotEncoder, schema: Vec<String>, rolling: RollingStats) -> Self {
        Self(encoder, schema, rolling)
    }

    /// The fitted encoder.
    pub fn encoder(&self) -> &OneHotEncoder {
        &self.0
    }

    /// Ordered feature names the model was trained on.
    pub fn schema(&self) -> &[String] {
        &self.1
    }

    /// Carried rolling statistics.
    pub fn rolling(&self) -> RollingStats {
        self.2
    }

    /// Serializes the bundle to JSON.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    /// Deserializes a bundle from JSON.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Writes the bundle to `path`.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.to_bytes()?)?;
        Ok(())
    }

    /// Reads a bundle from `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_bytes(&std::fs::read(path)?)
    }
}
