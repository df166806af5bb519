//! Feature pipeline for the Ampere demand model.
//!
//! The stages run in a fixed order on a frame sorted by `period`:
//! - [`outlier`]: drop observations outside the IQR band
//! - [`extract`]: calendar parts and trailing rolling statistics
//! - [`supervised`]: previous-period target as the `lag` feature
//! - [`encoder`]: fixed-width one-hot encoding of categorical columns
//!
//! Training freezes the encoder, the feature schema and the last rolling
//! statistics in an [`ArtifactBundle`]; [`inference`] replays the same
//! stages on a single observation using that bundle.
//!
//! # Example
//!
//! ```
//! use ampere_features::{extract::{extract_features, ExtractConfig}, supervised::to_supervised};
//! use ampere_traits::types::{observations_to_frame, Date, Observation};
//!
//! let start = Date::from_ymd_opt(2024, 1, 1).unwrap();
//! let rows: Vec<Observation> = (0..10)
//!     .map(|i| Observation::new(start + chrono::Duration::days(i), "Eastern", 1000 + i))
//!     .collect();
//! let features = extract_features(&observations_to_frame(&rows).unwrap(), &ExtractConfig::default()).unwrap();
//! assert_eq!(to_supervised(&features).unwrap().height(), 3);
//! ```

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

pub mod bundle;
pub mod encoder;
pub mod extract;
pub mod inference;
pub mod noise;
pub mod outlier;
pub mod supervised;

// Re-export key types
pub use bundle::{ArtifactBundle, RollingStats};
pub use encoder::{EncodedFeature, OneHotEncoder};
pub use extract::{ExtractConfig, extract_features};
pub use inference::prepare_for_inference;
pub use noise::add_noise_feature;
pub use outlier::filter_by_iqr;
pub use supervised::to_supervised;
