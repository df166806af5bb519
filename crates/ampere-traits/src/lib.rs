#![doc(issue_tracker_base_url = "https://github.com/ampere-forecast/ampere/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Core types and trait definitions for the Ampere forecasting pipeline.
//!
//! This crate provides the foundational abstractions shared by the feature
//! pipeline, the model, and the walk-forward evaluation: the error type, the
//! observation record, regression and experiment-tracking traits, and a few
//! statistics helpers.

/// The version of the ampere-traits crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// Module declarations
pub mod error;
pub mod model;
pub mod retry;
pub mod stats;
pub mod tracking;
pub mod types;

// Re-exports
pub use error::{AmpereError, Result};
pub use model::{EvalSet, ModelConfig, Regressor};
pub use retry::RetryPolicy;
pub use tracking::{ExperimentTracker, NullTracker, RunId};
pub use types::{Date, Observation, columns};
