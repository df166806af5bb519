//! EIA open-data API client for Ampere.
//!
//! This crate fetches daily electricity demand per sub-balancing authority
//! from the [EIA v2 API](https://www.eia.gov/opendata/) and converts the rows
//! into the raw `period / timezone / value` frame the feature pipeline reads.
//!
//! # Usage
//!
//! ```rust,ignore
//! use ampere_eia::{DemandQuery, EiaClient, records_to_frame};
//! use chrono::NaiveDate;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = EiaClient::from_env()?;
//!     let query = DemandQuery::new(
//!         "ZONJ",
//!         NaiveDate::from_ymd_opt(2019, 1, 1).unwrap(),
//!         NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
//!     );
//!
//!     let records = client.fetch_all(&query).await?;
//!     let frame = records_to_frame(&records)?;
//!     println!("{frame}");
//!     Ok(())
//! }
//! ```
//!
//! # Environment Variables
//!
//! Set `EIA_API_KEY` in your environment or `.env` file:
//!
//! ```bash
//! EIA_API_KEY=your_api_key_here
//! ```

mod client;
mod error;
mod types;

pub use client::{EiaClient, page_offsets, records_to_frame, records_to_observations};
pub use error::EiaError;
pub use types::{DEFAULT_CHUNK_LEN, DemandPage, DemandQuery, DemandRecord};

/// Result type for EIA operations.
pub type Result<T> = std::result::Result<T, EiaError>;
