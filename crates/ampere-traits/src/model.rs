//! Regression model traits.
//!
//! The walk-forward trainer never reuses a fitted model across folds. It asks
//! a [`ModelConfig`] for a fresh [`Regressor`] at the start of every fold, so
//! boosting state from one fold cannot leak into the evaluation of another.

use crate::Result;
use ndarray::{Array1, ArrayView1, ArrayView2};
use std::collections::BTreeMap;

/// A borrowed `(features, target)` pair.
pub type EvalSet<'a> = (ArrayView2<'a, f64>, ArrayView1<'a, f64>);

/// A supervised regression model over dense `f64` features.
///
/// # Example
///
/// ```
/// use ampere_traits::{EvalSet, Regressor, Result};
/// use ndarray::{Array1, ArrayView1, ArrayView2};
///
/// #[derive(Debug, Default)]
/// struct MeanModel {
///     mean: f64,
/// }
///
/// impl Regressor for MeanModel {
///     fn fit(&mut self, _x: ArrayView2<'_, f64>, y: ArrayView1<'_, f64>, _eval: Option<EvalSet<'_>>) -> Result<()> {
///         self.mean = y.mean().unwrap_or(0.0);
///         Ok(())
///     }
///
///     fn predict(&self, x: ArrayView2<'_, f64>) -> Result<Array1<f64>> {
///         Ok(Array1::from_elem(x.nrows(), self.mean))
///     }
///
///     fn feature_importances(&self) -> Option<Array1<f64>> {
///         None
///     }
///
///     fn to_bytes(&self) -> Result<Vec<u8>> {
///         Ok(self.mean.to_le_bytes().to_vec())
///     }
/// }
/// ```
pub trait Regressor: std::fmt::Debug {
    /// Fits the model on `(x, y)`.
    ///
    /// `eval` is an optional held-out set the model may use to stop early.
    /// It must never be used to fit parameters.
    fn fit(
        &mut self,
        x: ArrayView2<'_, f64>,
        y: ArrayView1<'_, f64>,
        eval: Option<EvalSet<'_>>,
    ) -> Result<()>;

    /// Predicts one value per row of `x`.
    fn predict(&self, x: ArrayView2<'_, f64>) -> Result<Array1<f64>>;

    /// Importance of each input column, aligned with the training columns.
    ///
    /// Returns `None` before the model is fitted.
    fn feature_importances(&self) -> Option<Array1<f64>>;

    /// Serialized fitted model, logged as a run artifact.
    fn to_bytes(&self) -> Result<Vec<u8>>;
}

/// A hyperparameter configuration that can build fresh models.
pub trait ModelConfig: std::fmt::Debug {
    /// The model type built by this configuration.
    type Model: Regressor;

    /// Builds a new, unfitted model.
    fn build(&self) -> Self::Model;

    /// Flattened parameters for experiment tracking.
    fn params(&self) -> BTreeMap<String, String>;
}
