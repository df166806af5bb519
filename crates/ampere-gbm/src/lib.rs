//! Gradient-boosted regression trees for the Ampere demand model.
//!
//! [`GbmRegressor`] wraps an XGBoost booster with a squared-error objective
//! behind the [`Regressor`](ampere_traits::Regressor) trait. [`GbmParams`]
//! maps the tuned hyperparameters onto XGBoost's parameter builders.
//! Boosting stops early on an evaluation set and the booster is cut back to
//! its best round. Importances are total split gain per feature, read from
//! the booster's text dump.
//!
//! # Example
//!
//! ```
//! use ampere_gbm::GbmParams;
//! use ampere_traits::{ModelConfig, Regressor};
//! use ndarray::array;
//!
//! let x = array![[1.0], [2.0], [3.0], [4.0]];
//! let y = array![10.0, 20.0, 30.0, 40.0];
//! let mut model = GbmParams::default().with_n_estimators(20).build();
//! model.fit(x.view(), y.view(), None).unwrap();
//! assert_eq!(model.predict(x.view()).unwrap().len(), 4);
//! ```

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

pub mod booster;
pub mod importance;
pub mod params;

pub use booster::GbmRegressor;
pub use importance::gain_importances;
pub use params::GbmParams;
