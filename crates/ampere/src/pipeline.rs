//! Training and prediction flows.
//!
//! [`train_flow`] runs the whole training protocol on a raw frame: filter,
//! extract, lag, encode, a baseline walk-forward pass used for pruning,
//! hyperparameter search on the pruned features, and a final tracked fit
//! that logs the model together with the [`ArtifactBundle`].
//! [`predict_one`] replays the frozen pipeline on the latest observation.

use crate::config::AmpereConfig;
use ampere_eval::{
    MODEL_ARTIFACT, ModelVersion, ParamSet, Study, Tuner, WalkForwardReport, WalkForwardTrainer,
    prune_redundant,
};
use ampere_features::{
    ArtifactBundle, ExtractConfig, OneHotEncoder, RollingStats, add_noise_feature,
    extract::parse_periods, extract_features, filter_by_iqr, prepare_for_inference,
    to_supervised,
};
use ampere_gbm::{GbmParams, GbmRegressor};
use ampere_traits::{
    AmpereError, ExperimentTracker, Regressor, Result, RunId,
    columns::{RANDOM_FEATURE, VALUE},
    types::{column_names, frame_to_matrix, target_vector},
};
use polars::prelude::*;
use rand::{SeedableRng, rngs::StdRng};
use std::fs;
use tracing::info;

/// Artifact name of the serialized [`ArtifactBundle`].
pub const BUNDLE_ARTIFACT: &str = "bundle.json";

/// Encoded supervised frame and the encoder fitted on it.
#[derive(Debug, Clone)]
pub struct Preprocessed {
    /// Encoded frame; `value` is the target, every other column a feature.
    pub frame: DataFrame,
    /// Encoder state to reuse at inference.
    pub encoder: OneHotEncoder,
}

/// Fails unless `period` is strictly increasing, one row per day.
fn check_periods(df: &DataFrame) -> Result<()> {
    let periods: Vec<_> = parse_periods(df)?.into_iter().flatten().collect();
    match periods.windows(2).find(|pair| pair[0] >= pair[1]) {
        Some(pair) => Err(AmpereError::InvalidData(format!(
            "period must be strictly increasing, found {} before {}",
            pair[0], pair[1]
        ))),
        None => Ok(()),
    }
}

/// Filters outliers, extracts features, adds the lag and one-hot encodes.
///
/// # Errors
///
/// Returns [`AmpereError::InvalidData`] for repeated or unsorted periods, and
/// an error for a bad window, missing columns or a frame too short to yield
/// any row.
pub fn preprocess(df: &DataFrame, window_size: usize) -> Result<Preprocessed> {
    check_periods(df)?;
    let filtered = filter_by_iqr(df, VALUE)?;
    let features = extract_features(&filtered, &ExtractConfig::training(window_size))?;
    let supervised = to_supervised(&features)?;
    if supervised.height() == 0 {
        return Err(AmpereError::InsufficientData(format!(
            "{} raw rows leave nothing to train on with a {window_size}-day window",
            df.height()
        )));
    }
    let (frame, encoder) = OneHotEncoder::fit_transform(&supervised)?;
    info!(
        "preprocessed {} raw rows into {} rows x {} columns",
        df.height(),
        frame.height(),
        frame.width()
    );
    Ok(Preprocessed { frame, encoder })
}

/// Booster parameters of a tuning trial.
///
/// # Errors
///
/// Returns an error if a value does not fit its parameter.
pub fn gbm_params(params: &ParamSet, seed: u64) -> Result<GbmParams> {
    let mut gbm: GbmParams = serde_json::from_value(serde_json::to_value(params)?)?;
    gbm.seed = seed;
    gbm.validate()?;
    Ok(gbm)
}

/// Everything a training run produced.
#[derive(Debug)]
pub struct TrainingOutcome {
    /// Tracked run of the final fit.
    pub run_id: RunId,
    /// Parameters of the best trial.
    pub best_params: GbmParams,
    /// Baseline pass on every feature plus the noise feature.
    pub baseline: WalkForwardReport<GbmRegressor>,
    /// Tuning study.
    pub study: Study,
    /// Final tracked pass with the best parameters.
    pub final_report: WalkForwardReport<GbmRegressor>,
    /// Features removed by pruning, reference last.
    pub dropped: Vec<String>,
    /// Frozen encoder, schema and rolling statistics.
    pub bundle: ArtifactBundle,
}

/// Runs the training protocol on a raw `period / timezone / value` frame.
///
/// The frame must be sorted by period. The final fit is logged to `tracker`
/// under the configured experiment.
///
/// # Errors
///
/// Returns the first error of any stage; a failed final fit leaves its run
/// unfinished.
pub fn train_flow<T>(
    df: &DataFrame,
    config: &AmpereConfig,
    tracker: &mut T,
) -> Result<TrainingOutcome>
where
    T: ExperimentTracker + ?Sized,
{
    config.validate()?;
    let seed = config.training.seed;
    let model_seed = seed.unwrap_or_default();

    let pre = preprocess(df, config.training.window_size)?;
    let rolling = RollingStats::from_last_row(&pre.frame)?;
    let x_all = pre.frame.drop(VALUE)?;
    let y = target_vector(&pre.frame, VALUE)?;

    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    let x_noisy = add_noise_feature(&x_all, &mut rng)?;

    let trainer = WalkForwardTrainer::new(config.training.n_splits)?;
    let baseline_params = GbmParams::default().with_seed(model_seed);
    let x_baseline = frame_to_matrix(&x_noisy)?;
    let baseline = trainer.evaluate(&baseline_params, x_baseline.view(), y.view())?;
    info!(
        "baseline: train MAE {:.2}, test MAE {:.2}",
        baseline.mean_train_mae, baseline.mean_test_mae
    );

    let pruned = prune_redundant(&baseline.model, &x_noisy, RANDOM_FEATURE)?;
    let schema = column_names(&pruned.frame);
    if schema.is_empty() {
        return Err(AmpereError::InsufficientData(
            "no feature outranks the random reference".to_string(),
        ));
    }
    let x = frame_to_matrix(&pruned.frame)?;

    let mut tuner = Tuner::new(config.hyperparameters.space(), seed)?;
    let study = tuner.optimize(config.hyperparameters.n_trials, |params| {
        let params = gbm_params(params, model_seed)?;
        Ok(trainer.evaluate(&params, x.view(), y.view())?.mean_test_mae)
    })?;
    let best = study
        .best()
        .ok_or_else(|| AmpereError::InsufficientData("no completed trial".to_string()))?;
    info!("best trial {} with test MAE {:.2}", best.number, best.value);
    let best_params = gbm_params(&best.params, model_seed)?;

    let bundle = ArtifactBundle::new(pre.encoder, schema, rolling);
    let bundle_bytes = bundle.to_bytes()?;
    let (run_id, final_report) = trainer.evaluate_tracked(
        &best_params,
        x.view(),
        y.view(),
        tracker,
        &config.tracking.experiment,
        &[(BUNDLE_ARTIFACT, bundle_bytes.as_slice())],
    )?;
    info!(
        "run {run_id}: train MAE {:.2}, test MAE {:.2}",
        final_report.mean_train_mae, final_report.mean_test_mae
    );

    Ok(TrainingOutcome {
        run_id,
        best_params,
        baseline,
        study,
        final_report,
        dropped: pruned.dropped,
        bundle,
    })
}

/// Predicts the period after the single observation in `latest`.
///
/// # Errors
///
/// Returns an error if the observation cannot be prepared or the model
/// fails.
pub fn predict_one<R>(latest: &DataFrame, bundle: &ArtifactBundle, model: &R) -> Result<f64>
where
    R: Regressor + ?Sized,
{
    let x = prepare_for_inference(latest, bundle)?;
    let predictions = model.predict(frame_to_matrix(&x)?.view())?;
    predictions
        .first()
        .copied()
        .ok_or_else(|| AmpereError::Model("model returned no prediction".to_string()))
}

/// Reads the model and bundle logged with a registered version.
///
/// # Errors
///
/// Returns an error if either artifact is missing or unreadable.
pub fn load_version(version: &ModelVersion) -> Result<(GbmRegressor, ArtifactBundle)> {
    let model_path = version.artifact_path(MODEL_ARTIFACT);
    let model = GbmRegressor::from_bytes(&fs::read(&model_path).map_err(|e| {
        AmpereError::Tracking(format!("cannot read {}: {e}", model_path.display()))
    })?)?;
    let bundle = ArtifactBundle::load(version.artifact_path(BUNDLE_ARTIFACT))?;
    Ok((model, bundle))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ampere_eval::ParamValue;
    use ampere_traits::types::{Date, Observation, observations_to_frame};

    fn raw(n: u64) -> DataFrame {
        let start = Date::from_ymd_opt(2024, 1, 1).unwrap();
        let rows: Vec<Observation> = (0..n)
            .map(|i| {
                let day = start + chrono::Days::new(i);
                Observation::new(day, "Eastern", 1000 + (i as i64 % 7) * 10)
            })
            .collect();
        observations_to_frame(&rows).unwrap()
    }

    #[test]
    fn test_preprocess_columns() {
        let pre = preprocess(&raw(40), 7).unwrap();
        let names = column_names(&pre.frame);
        assert!(names.contains(&"value".to_string()));
        assert!(names.contains(&"lag".to_string()));
        assert!(names.contains(&"day_of_week_Monday".to_string()));
        assert!(names.contains(&"timezone_Eastern".to_string()));
        assert!(!names.contains(&"period".to_string()));
        // 40 days, 6 lost to the window, 1 to the lag
        assert_eq!(pre.frame.height(), 33);
    }

    #[test]
    fn test_preprocess_too_short() {
        assert!(matches!(
            preprocess(&raw(7), 7),
            Err(AmpereError::InsufficientData(_))
        ));
    }

    fn days(offsets: &[u64]) -> DataFrame {
        let start = Date::from_ymd_opt(2024, 1, 1).unwrap();
        let rows: Vec<Observation> = offsets
            .iter()
            .map(|&i| Observation::new(start + chrono::Days::new(i), "Eastern", 1000 + i as i64))
            .collect();
        observations_to_frame(&rows).unwrap()
    }

    #[test]
    fn test_preprocess_rejects_repeated_day() {
        // a revised 2024-01-16 arrives next to the original row
        let mut offsets: Vec<u64> = (0..20).collect();
        offsets.insert(16, 15);
        assert!(matches!(
            preprocess(&days(&offsets), 7),
            Err(AmpereError::InvalidData(_))
        ));
    }

    #[test]
    fn test_preprocess_rejects_unsorted_days() {
        let offsets: Vec<u64> = (10..20).chain(0..10).collect();
        assert!(matches!(
            preprocess(&days(&offsets), 7),
            Err(AmpereError::InvalidData(_))
        ));
        assert!(preprocess(&days(&(0..20).collect::<Vec<_>>()), 7).is_ok());
    }

    #[test]
    fn test_gbm_params_from_trial() {
        let mut set = ParamSet::new();
        set.insert("n_estimators".to_string(), ParamValue::Int(120));
        set.insert("max_depth".to_string(), ParamValue::Int(4));
        set.insert("learning_rate".to_string(), ParamValue::Float(0.05));
        set.insert("min_child_weight".to_string(), ParamValue::Int(3));
        set.insert("early_stopping_rounds".to_string(), ParamValue::Int(50));
        let params = gbm_params(&set, 7).unwrap();
        assert_eq!(params.n_estimators, 120);
        assert_eq!(params.max_depth, 4);
        assert_eq!(params.min_child_weight, 3.0);
        assert_eq!(params.early_stopping_rounds, Some(50));
        assert_eq!(params.seed, 7);
        assert_eq!(params.lambda, GbmParams::default().lambda);

        set.insert("subsample".to_string(), ParamValue::Float(1.5));
        assert!(gbm_params(&set, 7).is_err());
    }
}
