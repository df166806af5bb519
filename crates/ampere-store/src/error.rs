//! Error types for the demand store.

use thiserror::Error;

/// Errors that can occur when reading or writing the store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database driver error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Stored row that cannot be read back.
    #[error("Corrupt row in {table}: {reason}")]
    CorruptRow {
        /// Table holding the row.
        table: &'static str,
        /// What is wrong with it.
        reason: String,
    },

    /// Record value outside the column range.
    #[error("Value out of range: {0}")]
    OutOfRange(i64),

    /// Unknown series identifier.
    #[error("Unknown series '{0}'")]
    UnknownSeries(String),

    /// Frame conversion failed.
    #[error(transparent)]
    Frame(#[from] ampere_traits::AmpereError),
}
