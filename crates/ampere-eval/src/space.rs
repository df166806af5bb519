//! Hyperparameter search space.

use ampere_traits::{AmpereError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A sampled or fixed parameter value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// Integer parameter.
    Int(i64),
    /// Real parameter.
    Float(f64),
}

impl ParamValue {
    /// The value as a float.
    pub const fn as_f64(self) -> f64 {
        match self {
            Self::Int(v) => v as f64,
            Self::Float(v) => v,
        }
    }

    /// The value as an integer, rounding reals.
    pub fn as_i64(self) -> i64 {
        match self {
            Self::Int(v) => v,
            Self::Float(v) => v.round() as i64,
        }
    }
}

impl std::fmt::Display for ParamValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
        }
    }
}

/// Named parameter values of one trial.
pub type ParamSet = BTreeMap<String, ParamValue>;

/// Range a parameter is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Distribution {
    /// Integers in `[low, high]`.
    Int {
        /// Inclusive lower bound.
        low: i64,
        /// Inclusive upper bound.
        high: i64,
    },
    /// Reals in `[low, high]`, uniform in log space when `log` is set.
    Float {
        /// Lower bound.
        low: f64,
        /// Upper bound.
        high: f64,
        /// Sample uniformly in log space.
        #[serde(default)]
        log: bool,
    },
}

impl Distribution {
    fn validate(&self, name: &str) -> Result<()> {
        let ok = match *self {
            Self::Int { low, high } => low < high,
            Self::Float { low, high, log } => {
                low.is_finite() && high.is_finite() && low < high && (!log || low > 0.0)
            }
        };
        if ok {
            Ok(())
        } else {
            Err(AmpereError::InvalidConfig(format!(
                "invalid bounds for '{name}': {self:?}"
            )))
        }
    }

    /// Bounds in the space the sampler works in (log-transformed for log
    /// distributions).
    pub(crate) fn internal_bounds(&self) -> (f64, f64) {
        match *self {
            Self::Int { low, high } => (low as f64, high as f64),
            Self::Float { low, high, log } if log => (low.ln(), high.ln()),
            Self::Float { low, high, .. } => (low, high),
        }
    }

    /// Maps a value to the sampler's internal space.
    pub(crate) fn to_internal(&self, value: ParamValue) -> f64 {
        match *self {
            Self::Float { log: true, .. } => value.as_f64().ln(),
            _ => value.as_f64(),
        }
    }

    /// Maps an internal-space point back to a parameter value inside bounds.
    pub(crate) fn from_internal(&self, x: f64) -> ParamValue {
        match *self {
            Self::Int { low, high } => ParamValue::Int((x.round() as i64).clamp(low, high)),
            Self::Float { low, high, log } => {
                let v = if log { x.exp() } else { x };
                ParamValue::Float(v.clamp(low, high))
            }
        }
    }
}

/// One searchable dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dimension {
    /// Parameter name.
    pub name: String,
    /// Sampling range.
    pub distribution: Distribution,
}

/// Ordered set of searchable dimensions plus fixed parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchSpace {
    dimensions: Vec<Dimension>,
    fixed: ParamSet,
}

impl Default for SearchSpace {
    /// The standard boosting search space.
    fn default() -> Self {
        Self::empty()
            .int("n_estimators", 2, 1000)
            .int("max_depth", 1, 15)
            .float("learning_rate", 0.001, 0.3)
            .float("subsample", 0.5, 1.0)
            .float("colsample_bytree", 0.5, 1.0)
            .int("min_child_weight", 1, 10)
            .log_float("alpha", 1e-5, 10.0)
            .log_float("gamma", 1e-5, 5.0)
            .log_float("lambda", 1e-5, 10.0)
            .fixed("early_stopping_rounds", ParamValue::Int(50))
    }
}

impl SearchSpace {
    /// A space without dimensions.
    pub fn empty() -> Self {
        Self {
            dimensions: Vec::new(),
            fixed: ParamSet::new(),
        }
    }

    fn push(mut self, name: &str, distribution: Distribution) -> Self {
        self.dimensions.retain(|d| d.name != name);
        self.dimensions.push(Dimension {
            name: name.to_string(),
            distribution,
        });
        self
    }

    /// Adds (or replaces) an integer dimension.
    pub fn int(self, name: &str, low: i64, high: i64) -> Self {
        self.push(name, Distribution::Int { low, high })
    }

    /// Adds (or replaces) a linear real dimension.
    pub fn float(self, name: &str, low: f64, high: f64) -> Self {
        self.push(
            name,
            Distribution::Float {
                low,
                high,
                log: false,
            },
        )
    }

    /// Adds (or replaces) a log-uniform real dimension.
    pub fn log_float(self, name: &str, low: f64, high: f64) -> Self {
        self.push(
            name,
            Distribution::Float {
                low,
                high,
                log: true,
            },
        )
    }

    /// Adds a parameter that every trial receives unchanged.
    pub fn fixed(mut self, name: &str, value: ParamValue) -> Self {
        self.fixed.insert(name.to_string(), value);
        self
    }

    /// Searchable dimensions in declaration order.
    pub fn dimensions(&self) -> &[Dimension] {
        &self.dimensions
    }

    /// Fixed parameters.
    pub const fn fixed_params(&self) -> &ParamSet {
        &self.fixed
    }

    /// Checks every bound.
    ///
    /// # Errors
    ///
    /// Returns [`AmpereError::InvalidConfig`] for an empty space, `low >=
    /// high`, or a non-positive log bound.
    pub fn validate(&self) -> Result<()> {
        if self.dimensions.is_empty() {
            return Err(AmpereError::InvalidConfig(
                "search space has no dimensions".to_string(),
            ));
        }
        for dim in &self.dimensions {
            dim.distribution.validate(&dim.name)?;
        }
        Ok(())
    }

    /// Whether every searchable parameter of `params` lies inside its bounds.
    pub fn contains(&self, params: &ParamSet) -> bool {
        self.dimensions.iter().all(|d| {
            params.get(&d.name).is_some_and(|v| match d.distribution {
                Distribution::Int { low, high } => {
                    matches!(v, ParamValue::Int(i) if (low..=high).contains(i))
                }
                Distribution::Float { low, high, .. } => (low..=high).contains(&v.as_f64()),
            })
        })
    }
}
