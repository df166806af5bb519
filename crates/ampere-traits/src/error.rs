//! Error types for the Ampere pipeline.
//!
//! This module defines the error type shared by the feature pipeline, the
//! model, and the walk-forward evaluation crates. Collaborator crates (the
//! EIA client and the store) carry their own error enums and convert into
//! [`AmpereError`] at the boundary.

use thiserror::Error;

/// The main error type for Ampere operations.
#[derive(Debug, Error)]
pub enum AmpereError {
    /// A configuration value is incompatible with the data or with itself.
    ///
    /// These errors are fatal: fold counts that do not fit the data, window
    /// sizes too small for a sample deviation, malformed search bounds.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Error due to invalid or malformed data.
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Error when a required column is missing from a frame.
    #[error("Missing required column: {0}")]
    MissingColumn(String),

    /// Error when data is insufficient for the requested operation.
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    /// Error raised by a model while fitting or predicting.
    #[error("Model error: {0}")]
    Model(String),

    /// Error reported by an experiment tracker or model registry.
    #[error("Tracking error: {0}")]
    Tracking(String),

    /// Error from Polars operations.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// Error serializing or deserializing an artifact.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Filesystem error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Error fetching data from external sources.
    #[error("Data fetch error: {0}")]
    DataFetch(String),
}

/// A specialized Result type for Ampere operations.
pub type Result<T> = std::result::Result<T, AmpereError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AmpereError::InvalidConfig("n_splits must be at least 2".to_string());
        assert_eq!(
            err.to_string(),
            "Invalid configuration: n_splits must be at least 2"
        );

        let err = AmpereError::MissingColumn("rolling_mean".to_string());
        assert_eq!(err.to_string(), "Missing required column: rolling_mean");
    }

    #[test]
    fn test_error_from_json() {
        let json_err = serde_json::from_str::<Vec<f64>>("not json").unwrap_err();
        let err: AmpereError = json_err.into();
        assert!(matches!(err, AmpereError::Serialization(_)));
    }

    #[test]
    fn test_result_type() {
        let ok_result: Result<i32> = Ok(42);
        assert!(ok_result.is_ok());

        let err_result: Result<i32> = Err(AmpereError::Model("diverged".to_string()));
        assert!(err_result.is_err());
    }
}
