//! Pipeline configuration.
//!
//! The configuration is a TOML file with one table per concern. Every field
//! has a default except the credentials, which come from the environment
//! (`EIA_API_KEY`, `AMPERE_DB_PASSWORD`) or a `.env` file.
//!
//! ```toml
//! series = "demand"
//!
//! [api]
//! subba = "ZONJ"
//! start_date = "2019-01-01"
//! end_date = "today"
//!
//! [database]
//! host = "localhost"
//! dbname = "db_demand"
//!
//! [training]
//! n_splits = 5
//! seed = 42
//!
//! [hyperparameters]
//! n_trials = 50
//!
//! [hyperparameters.sample_space]
//! max_depth = [2, 8]
//! learning_rate = [0.01, 0.3]
//! log = ["alpha", "gamma", "lambda"]
//! ```
//!
//! Unknown keys are rejected in every table.

use ampere_eval::{ParamValue, SearchSpace, WalkForwardSplit};
use ampere_features::ExtractConfig;
use ampere_store::{DatabaseConfig, SeriesId};
use ampere_traits::{AmpereError, Result, RetryPolicy};
use chrono::{Days, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Environment variable holding the EIA API key.
pub const API_KEY_ENV: &str = "EIA_API_KEY";

/// Environment variable holding the database password.
pub const DB_PASSWORD_ENV: &str = "AMPERE_DB_PASSWORD";

/// Complete pipeline configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AmpereConfig {
    /// Series to fetch, store and train on.
    pub series: SeriesId,
    /// Data source.
    pub api: ApiConfig,
    /// Relational store.
    pub database: DatabaseConfig,
    /// Feature extraction and walk-forward settings.
    pub training: TrainingConfig,
    /// Hyperparameter search.
    pub hyperparameters: HyperparameterConfig,
    /// Experiment tracking and registry.
    pub tracking: TrackingConfig,
    /// Retry policy for HTTP fetch and database connect.
    pub retry: RetryPolicy,
}

impl Default for AmpereConfig {
    fn default() -> Self {
        Self {
            series: SeriesId::Demand,
            api: ApiConfig::default(),
            database: DatabaseConfig::default(),
            training: TrainingConfig::default(),
            hyperparameters: HyperparameterConfig::default(),
            tracking: TrackingConfig::default(),
            retry: RetryPolicy::default(),
        }
    }
}

/// EIA request settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ApiConfig {
    /// Sub-balancing-authority code.
    pub subba: String,
    /// First day to fetch.
    pub start_date: NaiveDate,
    /// Last day to fetch: a `YYYY-MM-DD` date or `today`, which resolves to
    /// yesterday (the latest complete day).
    pub end_date: String,
    /// Rows per page.
    pub chunk_len: usize,
    /// API key, read from the environment only.
    #[serde(skip)]
    pub api_key: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            subba: "ZONJ".to_string(),
            start_date: NaiveDate::from_ymd_opt(2019, 1, 1).unwrap_or_default(),
            end_date: "today".to_string(),
            chunk_len: ampere_eia::DEFAULT_CHUNK_LEN,
            api_key: None,
        }
    }
}

impl ApiConfig {
    /// The last day to fetch, resolving `today` against `today`.
    ///
    /// # Errors
    ///
    /// Returns [`AmpereError::InvalidConfig`] for an unparseable date.
    pub fn resolve_end_date(&self, today: NaiveDate) -> Result<NaiveDate> {
        if self.end_date.trim().eq_ignore_ascii_case("today") {
            return today
                .checked_sub_days(Days::new(1))
                .ok_or_else(|| AmpereError::InvalidConfig("end_date underflow".to_string()));
        }
        NaiveDate::parse_from_str(self.end_date.trim(), "%Y-%m-%d").map_err(|e| {
            AmpereError::InvalidConfig(format!("end_date '{}': {e}", self.end_date))
        })
    }

    /// The last day to fetch, resolving `today` against the local clock.
    ///
    /// # Errors
    ///
    /// Returns [`AmpereError::InvalidConfig`] for an unparseable date.
    pub fn end_date(&self) -> Result<NaiveDate> {
        self.resolve_end_date(Local::now().date_naive())
    }
}

/// Training settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrainingConfig {
    /// Walk-forward fold count.
    pub n_splits: usize,
    /// Rolling-statistics window in days.
    pub window_size: usize,
    /// Seed for the noise feature, the booster and the tuner. Unset means
    /// non-reproducible runs.
    pub seed: Option<u64>,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            n_splits: 5,
            window_size: 7,
            seed: Some(42),
        }
    }
}

/// Hyperparameter search settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HyperparameterConfig {
    /// Number of tuning trials.
    pub n_trials: usize,
    /// Early-stopping rounds given to every trial.
    pub early_stopping_rounds: usize,
    /// Search bounds.
    pub sample_space: SampleSpaceConfig,
}

impl Default for HyperparameterConfig {
    fn default() -> Self {
        Self {
            n_trials: 50,
            early_stopping_rounds: 50,
            sample_space: SampleSpaceConfig::default(),
        }
    }
}

impl HyperparameterConfig {
    /// The configured search space with this configuration's early stopping.
    pub fn space(&self) -> SearchSpace {
        self.sample_space.space().fixed(
            "early_stopping_rounds",
            ParamValue::Int(self.early_stopping_rounds as i64),
        )
    }

    /// Checks the bounds and the log-scale flags.
    ///
    /// # Errors
    ///
    /// Returns [`AmpereError::InvalidConfig`] for an invalid range or a log
    /// flag on a name that is not a real-valued dimension.
    pub fn validate(&self) -> Result<()> {
        if let Some(name) = self
            .sample_space
            .log
            .iter()
            .find(|name| !SampleSpaceConfig::FLOAT_DIMENSIONS.contains(&name.as_str()))
        {
            return Err(AmpereError::InvalidConfig(format!(
                "sample_space.log: '{name}' is not a real-valued dimension"
            )));
        }
        self.space().validate()
    }
}

/// Inclusive `[low, high]` bounds of every tuned booster parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SampleSpaceConfig {
    /// Boosting rounds.
    pub n_estimators: [i64; 2],
    /// Tree depth.
    pub max_depth: [i64; 2],
    /// Shrinkage.
    pub learning_rate: [f64; 2],
    /// Row fraction per tree.
    pub subsample: [f64; 2],
    /// Column fraction per tree.
    pub colsample_bytree: [f64; 2],
    /// Minimum child hessian.
    pub min_child_weight: [i64; 2],
    /// L1 penalty.
    pub alpha: [f64; 2],
    /// Minimum split gain.
    pub gamma: [f64; 2],
    /// L2 penalty.
    pub lambda: [f64; 2],
    /// Real-valued dimensions sampled uniformly in log space.
    pub log: Vec<String>,
}

impl Default for SampleSpaceConfig {
    fn default() -> Self {
        Self {
            n_estimators: [2, 1000],
            max_depth: [1, 15],
            learning_rate: [0.001, 0.3],
            subsample: [0.5, 1.0],
            colsample_bytree: [0.5, 1.0],
            min_child_weight: [1, 10],
            alpha: [1e-5, 10.0],
            gamma: [1e-5, 5.0],
            lambda: [1e-5, 10.0],
            log: vec!["alpha".to_string(), "gamma".to_string(), "lambda".to_string()],
        }
    }
}

impl SampleSpaceConfig {
    /// Names that may appear in [`log`](Self::log).
    pub const FLOAT_DIMENSIONS: [&str; 6] = [
        "learning_rate",
        "subsample",
        "colsample_bytree",
        "alpha",
        "gamma",
        "lambda",
    ];

    /// The search space spanned by these bounds, without fixed parameters.
    pub fn space(&self) -> SearchSpace {
        let real = |space: SearchSpace, name: &str, [low, high]: [f64; 2]| {
            if self.log.iter().any(|n| n == name) {
                space.log_float(name, low, high)
            } else {
                space.float(name, low, high)
            }
        };
        let [n_lo, n_hi] = self.n_estimators;
        let [d_lo, d_hi] = self.max_depth;
        let [w_lo, w_hi] = self.min_child_weight;

        let space = SearchSpace::empty()
            .int("n_estimators", n_lo, n_hi)
            .int("max_depth", d_lo, d_hi);
        let space = real(space, "learning_rate", self.learning_rate);
        let space = real(space, "subsample", self.subsample);
        let space = real(space, "colsample_bytree", self.colsample_bytree);
        let space = space.int("min_child_weight", w_lo, w_hi);
        let space = real(space, "alpha", self.alpha);
        let space = real(space, "gamma", self.gamma);
        real(space, "lambda", self.lambda)
    }
}

/// Experiment tracking settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrackingConfig {
    /// Root directory of the file tracker and the registry.
    pub root: PathBuf,
    /// Experiment name of training runs.
    pub experiment: String,
    /// Registered model name.
    pub model_name: String,
    /// Metric minimized when picking the best run.
    pub metric: String,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("mlruns"),
            experiment: "demand-forecast".to_string(),
            model_name: "demand-gbm".to_string(),
            metric: "mean_mae_test".to_string(),
        }
    }
}

impl AmpereConfig {
    /// Parses a TOML document without touching the environment.
    ///
    /// # Errors
    ///
    /// Returns [`AmpereError::InvalidConfig`] for malformed TOML, unknown
    /// series ids or invalid values.
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(text).map_err(|e| AmpereError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads `path`, falling back to the defaults when the file does not
    /// exist, then applies the environment overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is invalid.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.is_file() {
            info!("loading configuration from {}", path.display());
            Self::from_toml(&fs::read_to_string(path)?)?
        } else {
            info!("{} not found, using default configuration", path.display());
            Self::default()
        };
        config.apply_env();
        Ok(config)
    }

    /// Reads credentials from the environment and `.env`.
    pub fn apply_env(&mut self) {
        // Try to load .env file (ignore errors if not found)
        let _ = dotenvy::dotenv();

        if let Ok(key) = env::var(API_KEY_ENV) {
            self.api.api_key = Some(key);
        }
        if let Ok(password) = env::var(DB_PASSWORD_ENV) {
            self.database.password = password;
        }
    }

    /// The API key.
    ///
    /// # Errors
    ///
    /// Returns [`AmpereError::InvalidConfig`] when no key was supplied.
    pub fn api_key(&self) -> Result<&str> {
        self.api
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| AmpereError::InvalidConfig(format!("{API_KEY_ENV} is not set")))
    }

    /// Extraction settings of a training run.
    pub const fn extract(&self) -> ExtractConfig {
        ExtractConfig::training(self.training.window_size)
    }

    /// Checks the values that can be checked without data.
    ///
    /// # Errors
    ///
    /// Returns [`AmpereError::InvalidConfig`] naming the first bad value.
    pub fn validate(&self) -> Result<()> {
        WalkForwardSplit::new(self.training.n_splits)?;
        self.extract().validate()?;
        self.hyperparameters.validate()?;
        if self.hyperparameters.n_trials == 0 {
            return Err(AmpereError::InvalidConfig(
                "n_trials must be positive".to_string(),
            ));
        }
        if self.api.chunk_len == 0 {
            return Err(AmpereError::InvalidConfig(
                "chunk_len must be positive".to_string(),
            ));
        }
        let end = self.api.end_date()?;
        if end < self.api.start_date {
            return Err(AmpereError::InvalidConfig(format!(
                "end_date {end} precedes start_date {}",
                self.api.start_date
            )));
        }
        if self.retry.max_attempts == 0 {
            return Err(AmpereError::InvalidConfig(
                "retry.max_attempts must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ampere_eval::Distribution;

    #[test]
    fn test_defaults_validate() {
        let config = AmpereConfig::default();
        config.validate().unwrap();
        assert_eq!(config.series, SeriesId::Demand);
        assert_eq!(config.api.chunk_len, 5000);
        assert_eq!(config.training.window_size, 7);
    }

    #[test]
    fn test_partial_toml() {
        let config = AmpereConfig::from_toml(
            r#"
            series = "demand"

            [api]
            subba = "ZONK"
            end_date = "2024-06-30"

            [training]
            n_splits = 3

            [tracking]
            root = "/tmp/runs"
            "#,
        )
        .unwrap();
        assert_eq!(config.api.subba, "ZONK");
        assert_eq!(config.training.n_splits, 3);
        assert_eq!(config.training.seed, Some(42));
        assert_eq!(config.tracking.root, PathBuf::from("/tmp/runs"));
        assert_eq!(config.database, DatabaseConfig::default());
        assert_eq!(
            config.api.end_date().unwrap(),
            NaiveDate::from_ymd_opt(2024, 6, 30).unwrap()
        );
    }

    #[test]
    fn test_today_is_yesterday() {
        let api = ApiConfig::default();
        let today = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert_eq!(
            api.resolve_end_date(today).unwrap(),
            NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()
        );
    }

    #[test]
    fn test_unknown_series_rejected() {
        let err = AmpereConfig::from_toml(r#"series = "prices""#).unwrap_err();
        assert!(matches!(err, AmpereError::InvalidConfig(_)));
    }

    #[test]
    fn test_invalid_values_rejected() {
        for doc in [
            "[training]\nn_splits = 1",
            "[training]\nwindow_size = 1",
            "[hyperparameters]\nn_trials = 0",
            "[api]\nend_date = \"yesterday-ish\"",
            "[api]\nstart_date = \"2024-01-02\"\nend_date = \"2024-01-01\"",
        ] {
            assert!(AmpereConfig::from_toml(doc).is_err(), "accepted: {doc}");
        }
    }

    #[test]
    fn test_space_uses_configured_early_stopping() {
        let hp = HyperparameterConfig {
            n_trials: 10,
            early_stopping_rounds: 20,
            ..Default::default()
        };
        assert_eq!(
            hp.space().fixed_params()["early_stopping_rounds"],
            ParamValue::Int(20)
        );
    }

    #[test]
    fn test_default_bounds_match_standard_space() {
        assert_eq!(
            HyperparameterConfig::default().space(),
            SearchSpace::default()
        );
    }

    #[test]
    fn test_sample_space_from_toml() {
        let config = AmpereConfig::from_toml(
            r#"
            [hyperparameters]
            n_trials = 5

            [hyperparameters.sample_space]
            max_depth = [2, 4]
            learning_rate = [0.01, 0.2]
            log = ["learning_rate"]
            "#,
        )
        .unwrap();
        let space = config.hyperparameters.space();
        let dist = |name: &str| {
            space
                .dimensions()
                .iter()
                .find(|d| d.name == name)
                .map(|d| d.distribution)
                .unwrap()
        };
        assert_eq!(dist("max_depth"), Distribution::Int { low: 2, high: 4 });
        assert_eq!(
            dist("learning_rate"),
            Distribution::Float {
                low: 0.01,
                high: 0.2,
                log: true
            }
        );
        // alpha keeps its bounds but is now linear
        assert_eq!(
            dist("alpha"),
            Distribution::Float {
                low: 1e-5,
                high: 10.0,
                log: false
            }
        );
        assert_eq!(dist("n_estimators"), Distribution::Int { low: 2, high: 1000 });
    }

    #[test]
    fn test_unknown_keys_rejected() {
        for doc in [
            "[hyperparameters]\nn_trials = 5\nmax_depth = [2, 4]",
            "[hyperparameters.sample_space]\neta = [0.1, 0.2]",
            "[training]\nn_split = 3",
            "[api]\napi_key = \"secret\"",
            "[tracking]\nmetrics = \"mae\"",
            "[database]\nhostname = \"db\"",
            "[retry]\nattempts = 3",
        ] {
            assert!(
                matches!(AmpereConfig::from_toml(doc), Err(AmpereError::InvalidConfig(_))),
                "accepted: {doc}"
            );
        }
    }

    #[test]
    fn test_invalid_sample_space_rejected() {
        for doc in [
            "[hyperparameters.sample_space]\nmax_depth = [4, 2]",
            "[hyperparameters.sample_space]\nalpha = [0.0, 1.0]",
            "[hyperparameters.sample_space]\nlog = [\"max_depth\"]",
            "[hyperparameters.sample_space]\nsubsample = [0.5]",
        ] {
            assert!(AmpereConfig::from_toml(doc).is_err(), "accepted: {doc}");
        }
    }

    #[test]
    fn test_missing_api_key() {
        let config = AmpereConfig::default();
        assert!(config.api_key().is_err());
    }
}
