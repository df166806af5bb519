//! Booster hyperparameters.

use crate::booster::GbmRegressor;
use ampere_traits::{AmpereError, ModelConfig, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use xgboost::parameters::{
    BoosterParameters, BoosterParametersBuilder, BoosterType,
    learning::{EvaluationMetric, LearningTaskParametersBuilder, Metrics, Objective},
    tree::{TreeBoosterParametersBuilder, TreeMethod},
};

/// Hyperparameters of the gradient-boosted regressor.
///
/// Names and meanings are XGBoost's; `n_estimators` and
/// `early_stopping_rounds` drive the boosting loop, the rest go to the
/// booster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GbmParams {
    /// Maximum number of boosting rounds.
    pub n_estimators: usize,
    /// Maximum tree depth.
    pub max_depth: usize,
    /// Shrinkage applied to every leaf weight.
    pub learning_rate: f64,
    /// Fraction of rows sampled per tree.
    pub subsample: f64,
    /// Fraction of features sampled per tree.
    pub colsample_bytree: f64,
    /// Minimum hessian sum in a child.
    pub min_child_weight: f64,
    /// L1 regularization on leaf weights.
    pub alpha: f64,
    /// Minimum loss reduction required to split.
    pub gamma: f64,
    /// L2 regularization on leaf weights.
    pub lambda: f64,
    /// Stop after this many rounds without improvement on the eval set.
    pub early_stopping_rounds: Option<usize>,
    /// Seed of XGBoost's row and column sampling.
    pub seed: u64,
}

impl Default for GbmParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: 6,
            learning_rate: 0.3,
            subsample: 1.0,
            colsample_bytree: 1.0,
            min_child_weight: 1.0,
            alpha: 0.0,
            gamma: 0.0,
            lambda: 1.0,
            early_stopping_rounds: None,
            seed: 0,
        }
    }
}

impl GbmParams {
    /// Sets the number of boosting rounds.
    pub const fn with_n_estimators(mut self, n: usize) -> Self {
        self.n_estimators = n;
        self
    }

    /// Sets early stopping.
    pub const fn with_early_stopping(mut self, rounds: usize) -> Self {
        self.early_stopping_rounds = Some(rounds);
        self
    }

    /// Sets the sampling seed.
    pub const fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Checks every parameter is inside its valid domain.
    ///
    /// # Errors
    ///
    /// Returns [`AmpereError::InvalidConfig`] naming the first bad parameter.
    pub fn validate(&self) -> Result<()> {
        let invalid = |what: String| Err(AmpereError::InvalidConfig(what));
        if self.n_estimators == 0 {
            return invalid("n_estimators must be positive".to_string());
        }
        if self.max_depth == 0 {
            return invalid("max_depth must be positive".to_string());
        }
        if !(self.learning_rate > 0.0 && self.learning_rate <= 1.0) {
            return invalid(format!("learning_rate {} not in (0, 1]", self.learning_rate));
        }
        for (name, value) in [
            ("subsample", self.subsample),
            ("colsample_bytree", self.colsample_bytree),
        ] {
            if !(value > 0.0 && value <= 1.0) {
                return invalid(format!("{name} {value} not in (0, 1]"));
            }
        }
        for (name, value) in [
            ("min_child_weight", self.min_child_weight),
            ("alpha", self.alpha),
            ("gamma", self.gamma),
            ("lambda", self.lambda),
        ] {
            if !(value >= 0.0 && value.is_finite()) {
                return invalid(format!("{name} must be finite and non-negative, got {value}"));
            }
        }
        Ok(())
    }

    /// XGBoost parameters for a squared-error booster starting at
    /// `base_score`, scored by RMSE on evaluation sets.
    ///
    /// # Errors
    ///
    /// Returns [`AmpereError::InvalidConfig`] if XGBoost rejects a value.
    pub fn booster_parameters(&self, base_score: f32) -> Result<BoosterParameters> {
        let invalid = |e: String| AmpereError::InvalidConfig(format!("xgboost: {e}"));
        let max_depth = u32::try_from(self.max_depth)
            .map_err(|_| invalid(format!("max_depth {} out of range", self.max_depth)))?;
        let tree = TreeBoosterParametersBuilder::default()
            .eta(self.learning_rate as f32)
            .max_depth(max_depth)
            .subsample(self.subsample as f32)
            .colsample_bytree(self.colsample_bytree as f32)
            .min_child_weight(self.min_child_weight as f32)
            .alpha(self.alpha as f32)
            .gamma(self.gamma as f32)
            .lambda(self.lambda as f32)
            .tree_method(TreeMethod::Exact)
            .build()
            .map_err(|e| invalid(e.to_string()))?;
        let learning = LearningTaskParametersBuilder::default()
            .objective(Objective::RegLinear)
            .eval_metrics(Metrics::Custom(vec![EvaluationMetric::RMSE]))
            .base_score(base_score)
            .seed(self.seed)
            .build()
            .map_err(|e| invalid(e.to_string()))?;
        BoosterParametersBuilder::default()
            .booster_type(BoosterType::Tree(tree))
            .learning_params(learning)
            .verbose(false)
            .build()
            .map_err(|e| invalid(e.to_string()))
    }
}

impl ModelConfig for GbmParams {
    type Model = GbmRegressor;

    fn build(&self) -> GbmRegressor {
        GbmRegressor::new(self.clone())
    }

    fn params(&self) -> BTreeMap<String, String> {
        let mut params = BTreeMap::new();
        params.insert("n_estimators".to_string(), self.n_estimators.to_string());
        params.insert("max_depth".to_string(), self.max_depth.to_string());
        params.insert("learning_rate".to_string(), self.learning_rate.to_string());
        params.insert("subsample".to_string(), self.subsample.to_string());
        params.insert(
            "colsample_bytree".to_string(),
            self.colsample_bytree.to_string(),
        );
        params.insert(
            "min_child_weight".to_string(),
            self.min_child_weight.to_string(),
        );
        params.insert("alpha".to_string(), self.alpha.to_string());
        params.insert("gamma".to_string(), self.gamma.to_string());
        params.insert("lambda".to_string(), self.lambda.to_string());
        if let Some(rounds) = self.early_stopping_rounds {
            params.insert("early_stopping_rounds".to_string(), rounds.to_string());
        }
        params.insert("seed".to_string(), self.seed.to_string());
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let params = GbmParams::default();
        assert!(params.validate().is_ok());
        assert_eq!(params.n_estimators, 100);
    }

    #[test]
    fn test_invalid_params() {
        let cases = [
            GbmParams {
                n_estimators: 0,
                ..Default::default()
            },
            GbmParams {
                learning_rate: 0.0,
                ..Default::default()
            },
            GbmParams {
                subsample: 1.5,
                ..Default::default()
            },
            GbmParams {
                lambda: -1.0,
                ..Default::default()
            },
            GbmParams {
                gamma: f64::NAN,
                ..Default::default()
            },
        ];
        for params in cases {
            assert!(
                matches!(params.validate(), Err(AmpereError::InvalidConfig(_))),
                "{params:?}"
            );
        }
    }

    #[test]
    fn test_params_map() {
        let params = GbmParams::default().with_early_stopping(50).with_seed(3);
        let map = params.params();
        assert_eq!(map["n_estimators"], "100");
        assert_eq!(map["early_stopping_rounds"], "50");
        assert_eq!(map["seed"], "3");
        assert!(!GbmParams::default().params().contains_key("early_stopping_rounds"));
    }

    #[test]
    fn test_booster_parameters_build() {
        assert!(GbmParams::default().booster_parameters(100.0).is_ok());
        let deep = GbmParams {
            max_depth: usize::MAX,
            ..Default::default()
        };
        assert!(matches!(
            deep.booster_parameters(0.0),
            Err(AmpereError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_deserialize_partial() {
        let params: GbmParams = serde_json::from_str(r#"{"max_depth": 3}"#).unwrap();
        assert_eq!(params.max_depth, 3);
        assert_eq!(params.n_estimators, 100);
    }
}
