//! Importance-based pruning against a random reference feature.
//!
//! A feature whose importance is below that of a column of pure noise
//! contributes nothing the model could not get from chance, so it is
//! dropped along with the reference itself.

use ampere_traits::{AmpereError, Regressor, Result, types::column_names};
use polars::prelude::*;
use tracing::{debug, info};

/// A pruned feature frame.
#[derive(Debug, Clone)]
pub struct Pruned {
    /// Remaining features, in their original order.
    pub frame: DataFrame,
    /// Dropped features, highest importance first, reference last.
    pub dropped: Vec<String>,
}

/// Features ranked below `reference`, followed by `reference` itself.
///
/// # Errors
///
/// Returns [`AmpereError::InvalidData`] if `names` and `importances` differ
/// in length and [`AmpereError::MissingColumn`] if `reference` is not among
/// `names`.
///
/// # Example
///
/// ```
/// use ampere_eval::prune::redundant_features;
///
/// let names = ["lag", "day", "random_feature", "quarter"].map(String::from);
/// let dropped = redundant_features(&names, &[0.6, 0.2, 0.15, 0.05], "random_feature").unwrap();
/// assert_eq!(dropped, vec!["quarter", "random_feature"]);
/// ```
pub fn redundant_features(
    names: &[String],
    importances: &[f64],
    reference: &str,
) -> Result<Vec<String>> {
    if names.len() != importances.len() {
        return Err(AmpereError::InvalidData(format!(
            "{} feature names but {} importances",
            names.len(),
            importances.len()
        )));
    }
    let threshold = names
        .iter()
        .position(|n| n == reference)
        .map(|i| importances[i])
        .ok_or_else(|| AmpereError::MissingColumn(reference.to_string()))?;

    let mut ranked: Vec<(&String, f64)> = names.iter().zip(importances.iter().copied()).collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));

    let mut dropped: Vec<String> = ranked
        .into_iter()
        .filter(|(name, importance)| *name != reference && *importance < threshold)
        .map(|(name, _)| name.clone())
        .collect();
    dropped.push(reference.to_string());
    Ok(dropped)
}

/// Drops the features of `x` that `model` ranks below `reference`.
///
/// `x` must be the frame the model was fitted on, in the same column order.
///
/// # Errors
///
/// Returns [`AmpereError::Model`] if the model exposes no importances, plus
/// the errors of [`redundant_features`].
pub fn prune_redundant<R: Regressor + ?Sized>(
    model: &R,
    x: &DataFrame,
    reference: &str,
) -> Result<Pruned> {
    let importances = model
        .feature_importances()
        .ok_or_else(|| AmpereError::Model("model exposes no feature importances".to_string()))?;
    let names = column_names(x);
    let dropped = redundant_features(&names, &importances.to_vec(), reference)?;

    info!(
        "pruning {} of {} features against '{reference}'",
        dropped.len(),
        names.len()
    );
    Ok(Pruned {
        frame: apply_pruning(x, &dropped)?,
        dropped,
    })
}

/// Drops `dropped` from `x`. Names absent from `x` are skipped.
///
/// # Errors
///
/// Returns an error if the frame cannot be rebuilt.
pub fn apply_pruning(x: &DataFrame, dropped: &[String]) -> Result<DataFrame> {
    let mut out = x.clone();
    for name in dropped {
        if out.column(name).is_ok() {
            out = out.drop(name)?;
        } else {
            debug!("pruned feature '{name}' not present, skipping");
        }
    }
    Ok(out)
}
