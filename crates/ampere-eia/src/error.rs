//! Error types for the EIA API client.

use thiserror::Error;

/// Errors that can occur when using the EIA API.
#[derive(Debug, Error)]
pub enum EiaError {
    /// Missing API key.
    #[error("EIA_API_KEY environment variable not set")]
    MissingApiKey,

    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("Failed to parse JSON response: {0}")]
    Json(#[from] serde_json::Error),

    /// API returned an error.
    #[error("EIA API error: {0}")]
    Api(String),

    /// Rate limit exceeded.
    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    /// Record conversion failed.
    #[error(transparent)]
    Frame(#[from] ampere_traits::AmpereError),
}
