#![doc(issue_tracker_base_url = "https://github.com/ampere-forecast/ampere/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! # ampere
//!
//! Electricity demand forecasting pipeline.
//!
//! ampere is an umbrella crate: it re-exports the ampere sub-crates and adds
//! the pipeline configuration plus the training and prediction flows that tie
//! them together.
//!
//! ## Quick Start
//!
//! ```ignore
//! use ampere::{AmpereConfig, FileTracker, pipeline};
//!
//! # fn main() -> ampere::Result<()> {
//! let config = AmpereConfig::load("ampere.toml")?;
//! let mut tracker = FileTracker::new(&config.tracking.root)?;
//!
//! // raw `period / timezone / value` frame, sorted by period
//! let outcome = pipeline::train_flow(&raw, &config, &mut tracker)?;
//! println!("run {} test MAE {:.2}", outcome.run_id, outcome.final_report.mean_test_mae);
//!
//! let next = pipeline::predict_one(&latest, &outcome.bundle, &outcome.final_report.model)?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Crate Organization
//!
//! - [`traits`] - Error type, shared types, model and tracker traits
//! - [`features`] - Outlier filter, feature extraction, encoding, inference preparation
//! - [`gbm`] - Gradient-boosted regression trees
//! - [`eval`] - Walk-forward evaluation, pruning, tuning, tracking and registry
//! - [`eia`] - EIA open-data client
//! - [`store`] - PostgreSQL storage
//!
//! ## Architecture
//!
//! 1. **Fetch** pages of demand rows from the EIA API into the store
//! 2. **Preprocess** raw observations into an encoded supervised frame
//! 3. **Evaluate** models with walk-forward cross-validation
//! 4. **Prune** features that rank below random noise
//! 5. **Tune** hyperparameters with a seeded TPE search
//! 6. **Register** the best run and **predict** the next day

/// Version information for the ampere crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod config;
pub mod pipeline;

/// Core trait definitions and shared types.
pub mod traits {
    pub use ampere_traits::*;
}

/// Feature pipeline.
pub mod features {
    pub use ampere_features::*;
}

/// Gradient-boosted regression trees.
pub mod gbm {
    pub use ampere_gbm::*;
}

/// Evaluation, tuning, tracking and registry.
pub mod eval {
    pub use ampere_eval::*;
}

/// EIA open-data client.
pub mod eia {
    pub use ampere_eia::*;
}

/// PostgreSQL storage.
pub mod store {
    pub use ampere_store::*;
}

pub use ampere_eval::{FileTracker, ModelRegistry, Stage};
pub use ampere_features::ArtifactBundle;
pub use ampere_traits::{AmpereError, ExperimentTracker, Regressor, Result};
pub use config::AmpereConfig;
pub use pipeline::{TrainingOutcome, predict_one, train_flow};
