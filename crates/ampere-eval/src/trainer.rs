//! Walk-forward training and evaluation.
//!
//! Every fold gets a freshly built model, fitted on the rows before its test
//! block and scored with mean absolute error on both blocks. Folds run
//! sequentially in time order.

use crate::split::{Fold, WalkForwardSplit};
use ampere_traits::{
    AmpereError, ExperimentTracker, ModelConfig, Regressor, Result, RunId,
    stats::mean_absolute_error,
};
use ndarray::{ArrayView1, ArrayView2, s};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Scores of one fold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoldScore {
    /// Zero-based fold index.
    pub fold: usize,
    /// Row ranges of the fold.
    pub split: Fold,
    /// MAE on the training block.
    pub train_mae: f64,
    /// MAE on the test block.
    pub test_mae: f64,
}

/// Result of a walk-forward evaluation.
#[derive(Debug, Clone)]
pub struct WalkForwardReport<M> {
    /// Per-fold scores in fold order.
    pub folds: Vec<FoldScore>,
    /// Mean of the per-fold training MAE.
    pub mean_train_mae: f64,
    /// Mean of the per-fold test MAE; the tuning objective.
    pub mean_test_mae: f64,
    /// Model fitted on the final fold.
    pub model: M,
}

/// Named artifact logged with the final fold of a tracked run.
pub type Artifact<'a> = (&'a str, &'a [u8]);

/// Artifact name of the serialized final-fold model.
pub const MODEL_ARTIFACT: &str = "model.bin";

/// Walk-forward evaluator.
#[derive(Debug, Clone, Copy)]
pub struct WalkForwardTrainer {
    split: WalkForwardSplit,
}

impl WalkForwardTrainer {
    /// Creates a trainer with `n_splits` folds.
    ///
    /// # Errors
    ///
    /// Returns [`AmpereError::InvalidConfig`] when `n_splits < 2`.
    pub fn new(n_splits: usize) -> Result<Self> {
        Ok(Self {
            split: WalkForwardSplit::new(n_splits)?,
        })
    }

    /// The splitter used by this trainer.
    pub const fn split(&self) -> &WalkForwardSplit {
        &self.split
    }

    /// Evaluates `config` on `(x, y)`.
    ///
    /// # Errors
    ///
    /// Returns an error for mismatched shapes, too few rows for the fold
    /// count, or a model failure.
    pub fn evaluate<C: ModelConfig>(
        &self,
        config: &C,
        x: ArrayView2<'_, f64>,
        y: ArrayView1<'_, f64>,
    ) -> Result<WalkForwardReport<C::Model>> {
        self.run(config, x, y, |_, _, _| Ok(()))
    }

    /// Evaluates `config` inside a new tracked run of `experiment`.
    ///
    /// Logs the model parameters, `mae_train` and `mae_test` per fold (step
    /// = fold index), the mean scores, and with the final fold the serialized
    /// model as [`MODEL_ARTIFACT`] plus every entry of `artifacts`. The run is
    /// ended only when every fold succeeded.
    ///
    /// # Errors
    ///
    /// As [`evaluate`](Self::evaluate), plus tracker failures.
    pub fn evaluate_tracked<C, T>(
        &self,
        config: &C,
        x: ArrayView2<'_, f64>,
        y: ArrayView1<'_, f64>,
        tracker: &mut T,
        experiment: &str,
        artifacts: &[Artifact<'_>],
    ) -> Result<(RunId, WalkForwardReport<C::Model>)>
    where
        C: ModelConfig,
        T: ExperimentTracker + ?Sized,
    {
        let run = tracker.start_run(experiment)?;
        tracker.log_params(&run, &config.params())?;

        let n_folds = self.split.n_splits();
        let report = self.run(config, x, y, |score, model, _| {
            tracker.log_metric(&run, "mae_train", score.train_mae, score.fold)?;
            tracker.log_metric(&run, "mae_test", score.test_mae, score.fold)?;
            if score.fold + 1 == n_folds {
                tracker.log_artifact(&run, MODEL_ARTIFACT, &model.to_bytes()?)?;
                for (name, bytes) in artifacts {
                    tracker.log_artifact(&run, name, bytes)?;
                }
            }
            Ok(())
        })?;

        tracker.log_metric(&run, "mean_mae_train", report.mean_train_mae, 0)?;
        tracker.log_metric(&run, "mean_mae_test", report.mean_test_mae, 0)?;
        tracker.end_run(&run)?;
        Ok((run, report))
    }

    fn run<C, F>(
        &self,
        config: &C,
        x: ArrayView2<'_, f64>,
        y: ArrayView1<'_, f64>,
        mut on_fold: F,
    ) -> Result<WalkForwardReport<C::Model>>
    where
        C: ModelConfig,
        F: FnMut(&FoldScore, &C::Model, usize) -> Result<()>,
    {
        if x.nrows() != y.len() {
            return Err(AmpereError::InvalidData(format!(
                "{} feature rows but {} targets",
                x.nrows(),
                y.len()
            )));
        }
        let folds = self.split.folds(x.nrows())?;

        let mut scores = Vec::with_capacity(folds.len());
        let mut last_model = None;
        for (k, fold) in folds.into_iter().enumerate() {
            let train_x = x.slice(s![fold.train.clone(), ..]);
            let train_y = y.slice(s![fold.train.clone()]);
            let test_x = x.slice(s![fold.test.clone(), ..]);
            let test_y = y.slice(s![fold.test.clone()]);

            let mut model = config.build();
            model.fit(train_x, train_y, Some((test_x, test_y)))?;
            let train_pred = model.predict(train_x)?;
            let test_pred = model.predict(test_x)?;

            let score = FoldScore {
                fold: k,
                train_mae: mean_absolute_error(train_pred.view(), train_y),
                test_mae: mean_absolute_error(test_pred.view(), test_y),
                split: fold,
            };
            info!(
                "fold {k}: train rows {}, test rows {}, mae_train {:.3}, mae_test {:.3}",
                score.split.train.len(),
                score.split.test.len(),
                score.train_mae,
                score.test_mae
            );
            on_fold(&score, &model, k)?;
            scores.push(score);
            last_model = Some(model);
        }

        let model = last_model.ok_or_else(|| {
            AmpereError::InsufficientData("walk-forward evaluation produced no folds".to_string())
        })?;
        let n = scores.len() as f64;
        Ok(WalkForwardReport {
            mean_train_mae: scores.iter().map(|s| s.train_mae).sum::<f64>() / n,
            mean_test_mae: scores.iter().map(|s| s.test_mae).sum::<f64>() / n,
            folds: scores,
            model,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ampere_gbm::GbmParams;
    use ampere_traits::NullTracker;
    use approx::assert_relative_eq;
    use ndarray::{Array1, Array2};
    use std::collections::BTreeMap;

    /// Predicts the training mean; records the sizes it was fitted on.
    #[derive(Debug, Default, Serialize)]
    struct MeanModel {
        mean: f64,
        fitted_rows: usize,
        saw_eval: bool,
    }

    impl Regressor for MeanModel {
        fn fit(
            &mut self,
            _x: ArrayView2<'_, f64>,
            y: ArrayView1<'_, f64>,
            eval: Option<ampere_traits::EvalSet<'_>>,
        ) -> Result<()> {
            self.mean = y.mean().unwrap_or(0.0);
            self.fitted_rows = y.len();
            self.saw_eval = eval.is_some();
            Ok(())
        }

        fn predict(&self, x: ArrayView2<'_, f64>) -> Result<Array1<f64>> {
            Ok(Array1::from_elem(x.nrows(), self.mean))
        }

        fn feature_importances(&self) -> Option<Array1<f64>> {
            None
        }

        fn to_bytes(&self) -> Result<Vec<u8>> {
            Ok(serde_json::to_vec(self)?)
        }
    }

    #[derive(Debug)]
    struct MeanConfig;

    impl ModelConfig for MeanConfig {
        type Model = MeanModel;

        fn build(&self) -> MeanModel {
            MeanModel::default()
        }

        fn params(&self) -> BTreeMap<String, String> {
            BTreeMap::from([("kind".to_string(), "mean".to_string())])
        }
    }

    #[derive(Debug, Default)]
    struct RecordingTracker {
        metrics: Vec<(String, f64, usize)>,
        artifacts: Vec<String>,
        ended: bool,
    }

    impl ExperimentTracker for RecordingTracker {
        fn start_run(&mut self, _experiment: &str) -> Result<RunId> {
            Ok("run-1".to_string())
        }

        fn log_params(&mut self, _run: &str, _params: &BTreeMap<String, String>) -> Result<()> {
            Ok(())
        }

        fn log_metric(&mut self, _run: &str, name: &str, value: f64, step: usize) -> Result<()> {
            self.metrics.push((name.to_string(), value, step));
            Ok(())
        }

        fn log_artifact(&mut self, _run: &str, name: &str, _bytes: &[u8]) -> Result<()> {
            self.artifacts.push(name.to_string());
            Ok(())
        }

        fn end_run(&mut self, _run: &str) -> Result<()> {
            self.ended = true;
            Ok(())
        }
    }

    fn linear(n: usize) -> (Array2<f64>, Array1<f64>) {
        let x = Array2::from_shape_fn((n, 1), |(i, _)| i as f64);
        let y = x.column(0).to_owned();
        (x, y)
    }

    #[test]
    fn test_mean_model_scores() {
        let (x, y) = linear(12);
        let trainer = WalkForwardTrainer::new(3).unwrap();
        let report = trainer.evaluate(&MeanConfig, x.view(), y.view()).unwrap();

        assert_eq!(report.folds.len(), 3);
        // fold 0 trains on 0..3 (mean 1), tests on 3..6
        assert_relative_eq!(report.folds[0].train_mae, 2.0 / 3.0);
        assert_relative_eq!(report.folds[0].test_mae, 3.0);
        assert_eq!(report.model.fitted_rows, 9);
        assert!(report.model.saw_eval);

        let mean_test = report.folds.iter().map(|f| f.test_mae).sum::<f64>() / 3.0;
        assert_relative_eq!(report.mean_test_mae, mean_test);
    }

    #[test]
    fn test_too_few_rows() {
        let (x, y) = linear(5);
        let trainer = WalkForwardTrainer::new(9).unwrap();
        assert!(matches!(
            trainer.evaluate(&MeanConfig, x.view(), y.view()),
            Err(AmpereError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_shape_mismatch() {
        let (x, _) = linear(10);
        let y = Array1::<f64>::zeros(9);
        let trainer = WalkForwardTrainer::new(2).unwrap();
        assert!(trainer.evaluate(&MeanConfig, x.view(), y.view()).is_err());
    }

    #[test]
    fn test_tracked_run_logs_every_fold() {
        let (x, y) = linear(20);
        let trainer = WalkForwardTrainer::new(4).unwrap();
        let mut tracker = RecordingTracker::default();
        let bundle = b"[]".as_slice();

        let (run, report) = trainer
            .evaluate_tracked(
                &MeanConfig,
                x.view(),
                y.view(),
                &mut tracker,
                "demand",
                &[("bundle.json", bundle)],
            )
            .unwrap();

        assert_eq!(run, "run-1");
        assert!(tracker.ended);
        let test_steps: Vec<usize> = tracker
            .metrics
            .iter()
            .filter(|(name, _, _)| name == "mae_test")
            .map(|(_, _, step)| *step)
            .collect();
        assert_eq!(test_steps, vec![0, 1, 2, 3]);
        assert_eq!(tracker.artifacts, vec!["model.bin", "bundle.json"]);
        assert_eq!(report.folds.len(), 4);
    }

    #[test]
    fn test_gbm_beats_mean_on_signal() {
        let n = 200;
        let x = Array2::from_shape_fn((n, 2), |(i, j)| {
            if j == 0 { (i % 7) as f64 } else { i as f64 }
        });
        let y = x.column(0).mapv(|d| 100.0 + 10.0 * d);

        let trainer = WalkForwardTrainer::new(4).unwrap();
        let gbm = trainer
            .evaluate(&GbmParams::default(), x.view(), y.view())
            .unwrap();
        let mean = trainer.evaluate(&MeanConfig, x.view(), y.view()).unwrap();
        assert!(gbm.mean_test_mae < mean.mean_test_mae);

        let mut null = NullTracker;
        let (_, tracked) = trainer
            .evaluate_tracked(&GbmParams::default(), x.view(), y.view(), &mut null, "x", &[])
            .unwrap();
        assert_relative_eq!(tracked.mean_test_mae, gbm.mean_test_mae);
    }
}
