//! PostgreSQL storage of raw demand observations for Ampere.
//!
//! Every series lives in its own table whose unique key spans the full row,
//! so fetching an overlapping date range twice never duplicates data.
//!
//! # Usage
//!
//! ```rust,ignore
//! use ampere_store::{DatabaseConfig, SeriesId, Store};
//! use ampere_traits::RetryPolicy;
//!
//! let store = Store::connect(&DatabaseConfig::default(), RetryPolicy::default()).await?;
//! store.create_table(SeriesId::Demand).await?;
//! let report = store.insert_records(SeriesId::Demand, &records).await?;
//! let frame = store.load_frame(SeriesId::Demand, "ZONJ").await?;
//! ```

mod config;
mod error;
mod schema;
mod store;

pub use config::DatabaseConfig;
pub use error::StoreError;
pub use schema::{SeriesId, TableSchema};
pub use store::{InsertReport, Store};

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
