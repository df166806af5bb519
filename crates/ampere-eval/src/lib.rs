//! Model evaluation and selection for Ampere.
//!
//! This crate provides the training-side machinery around a [`Regressor`]:
//! - Walk-forward (expanding window) cross-validation with per-fold MAE
//! - Pruning of features that rank below a random reference feature
//! - A bounded search space and a seeded TPE hyperparameter tuner
//! - A file-backed experiment tracker and model registry
//!
//! # Example
//!
//! ```rust,ignore
//! use ampere_eval::{WalkForwardTrainer, SearchSpace, Tuner};
//! use ampere_gbm::GbmParams;
//!
//! let trainer = WalkForwardTrainer::new(9)?;
//! let report = trainer.evaluate(&GbmParams::default(), x.view(), y.view())?;
//! println!("mean test MAE: {:.2}", report.mean_test_mae);
//!
//! let mut tuner = Tuner::new(SearchSpace::default(), Some(42))?;
//! let study = tuner.optimize(100, |params| objective(params))?;
//! ```
//!
//! [`Regressor`]: ampere_traits::Regressor

pub mod prune;
pub mod registry;
pub mod space;
pub mod split;
pub mod tracking;
pub mod trainer;
pub mod tuner;

// Re-export main types
pub use prune::{Pruned, apply_pruning, prune_redundant, redundant_features};
pub use registry::{ModelRegistry, ModelVersion, Stage};
pub use space::{Distribution, ParamSet, ParamValue, SearchSpace};
pub use split::{Fold, WalkForwardSplit};
pub use tracking::{FileTracker, MetricPoint, RunMeta, RunRecord, RunStatus};
pub use trainer::{Artifact, FoldScore, MODEL_ARTIFACT, WalkForwardReport, WalkForwardTrainer};
pub use tuner::{Study, TpeSampler, Trial, TrialState, Tuner};
