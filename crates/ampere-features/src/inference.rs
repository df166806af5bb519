//! Reapplies the frozen training pipeline to a single new observation.

use crate::{
    bundle::ArtifactBundle,
    extract::{ExtractConfig, extract_features},
};
use ampere_traits::{
    AmpereError, Result,
    columns::{LAG, ROLLING_MEAN, ROLLING_STD, VALUE},
};
use polars::prelude::*;

/// Builds the one-row model input for the period after `df`'s observation.
///
/// The observation's `value` becomes the `lag` feature, the carried rolling
/// statistics of the bundle are attached, and the result holds exactly the
/// bundle's schema columns in schema order. Schema columns that cannot be
/// produced are an error; they are never filled with defaults.
///
/// # Errors
///
/// Returns [`AmpereError::InvalidData`] unless `df` holds exactly one row,
/// and [`AmpereError::MissingColumn`] for a schema column the pipeline did
/// not produce.
pub fn prepare_for_inference(df: &DataFrame, bundle: &ArtifactBundle) -> Result<DataFrame> {
    if df.height() != 1 {
        return Err(AmpereError::InvalidData(format!(
            "inference expects exactly one observation, got {}",
            df.height()
        )));
    }

    let mut features = extract_features(df, &ExtractConfig::inference())?;
    if features.height() != 1 {
        return Err(AmpereError::InvalidData(
            "observation has missing fields".to_string(),
        ));
    }
    features.rename(VALUE, LAG.into())?;

    let mut encoded = bundle.encoder().transform(&features)?;
    let rolling = bundle.rolling();
    encoded.with_column(Series::new(ROLLING_MEAN.into(), [rolling.mean]))?;
    encoded.with_column(Series::new(ROLLING_STD.into(), [rolling.std]))?;

    for name in bundle.schema() {
        if encoded.column(name).is_err() {
            return Err(AmpereError::MissingColumn(name.clone()));
        }
    }
    Ok(encoded.select(bundle.schema().iter().map(String::as_str))?)
}
