//! XGBoost-backed squared-error regressor.

use crate::{importance::gain_importances, params::GbmParams};
use ampere_traits::{AmpereError, EvalSet, Regressor, Result};
use ndarray::{Array1, ArrayView1, ArrayView2};
use std::{
    fmt, fs,
    sync::{Mutex, PoisonError},
};
use tracing::debug;
use xgboost::{Booster, DMatrix, parameters::BoosterParameters};

/// XGBoost reseeds a process-wide generator when a booster is configured, so
/// fits hold this lock to keep seeded sampling reproducible.
static FIT_LOCK: Mutex<()> = Mutex::new(());

const PARAMS_ATTR: &str = "ampere_params";
const FEATURES_ATTR: &str = "ampere_n_features";
const TREES_ATTR: &str = "ampere_n_trees";
const BEST_ATTR: &str = "ampere_best_iteration";

fn model_err(e: impl fmt::Display) -> AmpereError {
    AmpereError::Model(e.to_string())
}

/// Row-major `f32` matrix, labelled when `y` is given.
///
/// XGBoost reads `0.0` in a dense matrix as missing; split directions for
/// missing values are learned, so zero-valued indicators still separate.
fn dense(x: ArrayView2<'_, f64>, y: Option<ArrayView1<'_, f64>>) -> Result<DMatrix> {
    let data: Vec<f32> = x.iter().map(|&v| v as f32).collect();
    let mut matrix = DMatrix::from_dense(&data, x.nrows()).map_err(model_err)?;
    if let Some(y) = y {
        let labels: Vec<f32> = y.iter().map(|&v| v as f32).collect();
        matrix.set_labels(&labels).map_err(model_err)?;
    }
    Ok(matrix)
}

fn eval_rmse(booster: &Booster, deval: &DMatrix) -> Result<f32> {
    booster
        .evaluate(deval)
        .map_err(model_err)?
        .get("rmse")
        .copied()
        .ok_or_else(|| AmpereError::Model("evaluation reported no rmse".to_string()))
}

/// Boosting rounds actually run and the best round on the eval set.
struct Boosted {
    booster: Booster,
    rounds: usize,
    best: Option<usize>,
}

/// Runs up to `rounds` boosting rounds. With `patience`, stops once the eval
/// RMSE has not improved for that many rounds.
fn boost(
    params: &BoosterParameters,
    dtrain: &DMatrix,
    deval: Option<&DMatrix>,
    rounds: usize,
    patience: Option<usize>,
) -> Result<Boosted> {
    let mut cached = vec![dtrain];
    cached.extend(deval);
    let mut booster = Booster::new_with_cached_dmats(params, &cached).map_err(model_err)?;

    let mut best: Option<(usize, f32)> = None;
    let mut run = 0;
    for round in 0..rounds {
        let iteration = i32::try_from(round).map_err(model_err)?;
        booster.update(dtrain, iteration).map_err(model_err)?;
        run = round + 1;

        let Some(deval) = deval else { continue };
        let score = eval_rmse(&booster, deval)?;
        if best.is_none_or(|(_, b)| score < b) {
            best = Some((round, score));
        }
        if let (Some(patience), Some((best_round, _))) = (patience, best)
            && round - best_round >= patience
        {
            debug!("early stopping at round {round}, best round {best_round}");
            break;
        }
    }
    Ok(Boosted {
        booster,
        rounds: run,
        best: best.map(|(round, _)| round),
    })
}

/// Gradient-boosted regression trees with squared-error loss.
///
/// Boosting starts from the target mean. When an evaluation set is supplied
/// together with [`GbmParams::early_stopping_rounds`], boosting stops once
/// the evaluation RMSE has not improved for that many rounds and the booster
/// is rebuilt with only the rounds up to the best one.
pub struct GbmRegressor {
    params: GbmParams,
    booster: Option<Booster>,
    n_features: usize,
    n_trees: usize,
    best_iteration: Option<usize>,
    importances: Array1<f64>,
}

impl fmt::Debug for GbmRegressor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GbmRegressor")
            .field("params", &self.params)
            .field("fitted", &self.booster.is_some())
            .field("n_features", &self.n_features)
            .field("n_trees", &self.n_trees)
            .field("best_iteration", &self.best_iteration)
            .finish_non_exhaustive()
    }
}

impl GbmRegressor {
    /// Creates an unfitted regressor.
    pub fn new(params: GbmParams) -> Self {
        Self {
            params,
            booster: None,
            n_features: 0,
            n_trees: 0,
            best_iteration: None,
            importances: Array1::zeros(0),
        }
    }

    /// Hyperparameters of this model.
    pub const fn params(&self) -> &GbmParams {
        &self.params
    }

    /// Number of trees kept after fitting.
    pub const fn n_trees(&self) -> usize {
        self.n_trees
    }

    /// Best round on the evaluation set, when early stopping was active.
    pub const fn best_iteration(&self) -> Option<usize> {
        self.best_iteration
    }

    /// Restores a model written by [`Regressor::to_bytes`].
    ///
    /// # Errors
    ///
    /// Returns [`AmpereError::Model`] if the bytes are not an XGBoost model
    /// saved by this type.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let booster = Booster::load_buffer(bytes).map_err(model_err)?;
        let attr = |key: &str| -> Result<Option<String>> {
            booster.get_attribute(key).map_err(model_err)
        };
        let required = |key: &str| -> Result<String> {
            attr(key)?.ok_or_else(|| AmpereError::Model(format!("model has no {key} attribute")))
        };

        let params: GbmParams = serde_json::from_str(&required(PARAMS_ATTR)?)?;
        let n_features: usize = required(FEATURES_ATTR)?.parse().map_err(model_err)?;
        let n_trees: usize = required(TREES_ATTR)?.parse().map_err(model_err)?;
        let best_iteration = attr(BEST_ATTR)?
            .map(|s| s.parse::<usize>())
            .transpose()
            .map_err(model_err)?;
        let importances =
            gain_importances(&booster.dump_model(true, None).map_err(model_err)?, n_features);

        Ok(Self {
            params,
            booster: Some(booster),
            n_features,
            n_trees,
            best_iteration,
            importances,
        })
    }

    fn fitted(&self, x: ArrayView2<'_, f64>) -> Result<&Booster> {
        let booster = self
            .booster
            .as_ref()
            .ok_or_else(|| AmpereError::Model("model has not been fitted".to_string()))?;
        if x.ncols() != self.n_features {
            return Err(AmpereError::Model(format!(
                "expected {} features, got {}",
                self.n_features,
                x.ncols()
            )));
        }
        Ok(booster)
    }

    fn tag(&self, booster: &mut Booster) -> Result<()> {
        booster
            .set_attribute(PARAMS_ATTR, &serde_json::to_string(&self.params)?)
            .map_err(model_err)?;
        booster
            .set_attribute(FEATURES_ATTR, &self.n_features.to_string())
            .map_err(model_err)?;
        booster
            .set_attribute(TREES_ATTR, &self.n_trees.to_string())
            .map_err(model_err)?;
        if let Some(best) = self.best_iteration {
            booster
                .set_attribute(BEST_ATTR, &best.to_string())
                .map_err(model_err)?;
        }
        Ok(())
    }
}

impl Regressor for GbmRegressor {
    fn fit(
        &mut self,
        x: ArrayView2<'_, f64>,
        y: ArrayView1<'_, f64>,
        eval: Option<EvalSet<'_>>,
    ) -> Result<()> {
        self.params.validate()?;
        let (n, p) = x.dim();
        if n == 0 || p == 0 {
            return Err(AmpereError::InsufficientData(format!(
                "cannot fit on a {n}x{p} matrix"
            )));
        }
        if y.len() != n {
            return Err(AmpereError::Model(format!(
                "{n} rows but {} targets",
                y.len()
            )));
        }
        if let Some((ex, ey)) = eval
            && (ex.ncols() != p || ex.nrows() != ey.len() || ex.nrows() == 0)
        {
            return Err(AmpereError::Model("eval set shape mismatch".to_string()));
        }

        let base_score = y.mean().unwrap_or(0.0) as f32;
        let booster_params = self.params.booster_parameters(base_score)?;
        let dtrain = dense(x, Some(y))?;
        let deval = eval.map(|(ex, ey)| dense(ex, Some(ey))).transpose()?;
        let patience = self.params.early_stopping_rounds.filter(|_| deval.is_some());

        let _guard = FIT_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
        let mut boosted = boost(
            &booster_params,
            &dtrain,
            deval.as_ref(),
            self.params.n_estimators,
            patience,
        )?;
        self.best_iteration = None;
        if let (Some(_), Some(best)) = (patience, boosted.best) {
            if best + 1 < boosted.rounds {
                boosted = boost(&booster_params, &dtrain, None, best + 1, None)?;
            }
            self.best_iteration = Some(best);
        }

        let mut booster = boosted.booster;
        self.n_features = p;
        self.n_trees = boosted.rounds;
        self.importances =
            gain_importances(&booster.dump_model(true, None).map_err(model_err)?, p);
        self.tag(&mut booster)?;
        self.booster = Some(booster);
        Ok(())
    }

    fn predict(&self, x: ArrayView2<'_, f64>) -> Result<Array1<f64>> {
        let booster = self.fitted(x)?;
        if x.nrows() == 0 {
            return Ok(Array1::zeros(0));
        }
        let predictions = booster.predict(&dense(x, None)?).map_err(model_err)?;
        Ok(predictions.into_iter().map(f64::from).collect())
    }

    fn feature_importances(&self) -> Option<Array1<f64>> {
        self.booster.as_ref().map(|_| self.importances.clone())
    }

    fn to_bytes(&self) -> Result<Vec<u8>> {
        let booster = self
            .booster
            .as_ref()
            .ok_or_else(|| AmpereError::Model("model has not been fitted".to_string()))?;
        let file = tempfile::NamedTempFile::new()?;
        booster.save(file.path()).map_err(model_err)?;
        Ok(fs::read(file.path())?)
    }
}
