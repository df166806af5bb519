//! Common types used throughout the Ampere pipeline.
//!
//! This module defines the raw observation record, the canonical column
//! names shared by every stage of the feature pipeline, and helpers that move
//! data between Polars frames and the `ndarray` matrices consumed by models.

use crate::{AmpereError, Result};
use ndarray::{Array1, Array2};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

// Re-export date type from chrono
pub use chrono::NaiveDate as Date;

/// Canonical column names.
///
/// Every stage of the pipeline reads and writes these names, so the training
/// schema and the inference schema agree by construction.
pub mod columns {
    /// Observation date.
    pub const PERIOD: &str = "period";
    /// Timezone label reported by the balancing authority (categorical).
    pub const TIMEZONE: &str = "timezone";
    /// Demand value, the regression target.
    pub const VALUE: &str = "value";
    /// Calendar year.
    pub const YEAR: &str = "year";
    /// Calendar month (1-12).
    pub const MONTH: &str = "month";
    /// Day of month (1-31).
    pub const DAY: &str = "day";
    /// Weekday name (categorical).
    pub const DAY_OF_WEEK: &str = "day_of_week";
    /// Calendar quarter (1-4).
    pub const QUARTER: &str = "quarter";
    /// ISO week number (1-53).
    pub const WEEK_OF_YEAR: &str = "week_of_year";
    /// 1 on Saturday and Sunday, 0 otherwise.
    pub const IS_WEEKEND: &str = "is_weekend";
    /// Trailing-window mean of the target.
    pub const ROLLING_MEAN: &str = "rolling_mean";
    /// Trailing-window sample standard deviation of the target.
    pub const ROLLING_STD: &str = "rolling_std";
    /// Target of the previous period.
    pub const LAG: &str = "lag";
    /// Uniform noise column used as the pruning reference.
    pub const RANDOM_FEATURE: &str = "random_feature";
}

/// A single demand observation as delivered by the data source.
///
/// Observations of one series are expected in strictly increasing `period`
/// order. Full-row duplicates are removed at the storage boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    /// Calendar date of the observation.
    pub period: Date,
    /// Timezone label (categorical).
    pub timezone: String,
    /// Observed demand.
    pub value: i64,
}

impl Observation {
    /// Creates a new observation.
    pub fn new(period: Date, timezone: impl Into<String>, value: i64) -> Self {
        Self {
            period,
            timezone: timezone.into(),
            value,
        }
    }
}

/// Builds the raw `period / timezone / value` frame from observations.
///
/// # Example
///
/// ```
/// use ampere_traits::types::{observations_to_frame, Date, Observation};
///
/// let rows = vec![Observation::new(Date::from_ymd_opt(2024, 1, 1).unwrap(), "Eastern", 100)];
/// let df = observations_to_frame(&rows).unwrap();
/// assert_eq!(df.height(), 1);
/// ```
pub fn observations_to_frame(observations: &[Observation]) -> Result<DataFrame> {
    let periods: Vec<Date> = observations.iter().map(|o| o.period).collect();
    let timezones: Vec<&str> = observations.iter().map(|o| o.timezone.as_str()).collect();
    let values: Vec<i64> = observations.iter().map(|o| o.value).collect();

    let df = df! {
        columns::PERIOD => periods,
        columns::TIMEZONE => timezones,
        columns::VALUE => values,
    }?;
    Ok(df)
}

/// Returns the column names of a frame in order.
pub fn column_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Checks that every named column exists in the frame.
///
/// # Errors
///
/// Returns [`AmpereError::MissingColumn`] naming the first absent column.
pub fn require_columns(df: &DataFrame, required: &[&str]) -> Result<()> {
    for name in required {
        if df.column(name).is_err() {
            return Err(AmpereError::MissingColumn((*name).to_string()));
        }
    }
    Ok(())
}

/// Reads a numeric column as `f64`, keeping nulls as `None`.
///
/// # Errors
///
/// Returns an error if the column is missing or cannot be cast to `Float64`.
pub fn column_f64(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let column = df
        .column(name)
        .map_err(|_| AmpereError::MissingColumn(name.to_string()))?;
    let series = column.as_materialized_series();
    if series.dtype() == &DataType::String {
        return Err(AmpereError::InvalidData(format!(
            "column '{name}' is categorical and must be encoded first"
        )));
    }
    let cast = series.cast(&DataType::Float64)?;
    Ok(cast.f64()?.into_iter().collect())
}

/// Reads a numeric column into a dense vector.
///
/// # Errors
///
/// Returns [`AmpereError::InvalidData`] if the column holds nulls.
pub fn target_vector(df: &DataFrame, name: &str) -> Result<Array1<f64>> {
    let values = column_f64(df, name)?;
    let dense = values
        .into_iter()
        .enumerate()
        .map(|(row, v)| {
            v.ok_or_else(|| AmpereError::InvalidData(format!("null in '{name}' at row {row}")))
        })
        .collect::<Result<Vec<f64>>>()?;
    Ok(Array1::from_vec(dense))
}

/// Converts an all-numeric frame into a row-major feature matrix.
///
/// Column `j` of the matrix is column `j` of the frame, so feature names can
/// be recovered with [`column_names`].
///
/// # Errors
///
/// Returns an error if any column is categorical or contains nulls.
pub fn frame_to_matrix(df: &DataFrame) -> Result<Array2<f64>> {
    let mut matrix = Array2::<f64>::zeros((df.height(), df.width()));
    for (j, name) in column_names(df).iter().enumerate() {
        let values = column_f64(df, name)?;
        for (i, value) in values.into_iter().enumerate() {
            matrix[[i, j]] = value.ok_or_else(|| {
                AmpereError::InvalidData(format!("null in feature '{name}' at row {i}"))
            })?;
        }
    }
    Ok(matrix)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> Date {
        Date::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_observations_to_frame() {
        let rows = vec![
            Observation::new(date(2024, 1, 1), "Eastern", 100),
            Observation::new(date(2024, 1, 2), "Eastern", 110),
        ];
        let df = observations_to_frame(&rows).unwrap();

        assert_eq!(df.height(), 2);
        assert_eq!(
            column_names(&df),
            vec![columns::PERIOD, columns::TIMEZONE, columns::VALUE]
        );
        assert_eq!(df.column(columns::PERIOD).unwrap().dtype(), &DataType::Date);
    }

    #[test]
    fn test_require_columns() {
        let df = df! { "a" => &[1.0], "b" => &[2.0] }.unwrap();
        assert!(require_columns(&df, &["a", "b"]).is_ok());

        let err = require_columns(&df, &["a", "c"]).unwrap_err();
        assert!(matches!(err, AmpereError::MissingColumn(c) if c == "c"));
    }

    #[test]
    fn test_frame_to_matrix() {
        let df = df! {
            "a" => &[1i64, 2, 3],
            "b" => &[0.5, 1.5, 2.5],
        }
        .unwrap();

        let m = frame_to_matrix(&df).unwrap();
        assert_eq!(m.shape(), &[3, 2]);
        assert_eq!(m[[2, 0]], 3.0);
        assert_eq!(m[[1, 1]], 1.5);
    }

    #[test]
    fn test_frame_to_matrix_rejects_categorical() {
        let df = df! { "tz" => &["Eastern"] }.unwrap();
        assert!(matches!(
            frame_to_matrix(&df),
            Err(AmpereError::InvalidData(_))
        ));
    }

    #[test]
    fn test_target_vector_rejects_nulls() {
        let df = df! { "value" => &[Some(1.0), None] }.unwrap();
        assert!(target_vector(&df, "value").is_err());
    }

    #[test]
    fn test_missing_column() {
        let df = df! { "a" => &[1.0] }.unwrap();
        assert!(matches!(
            column_f64(&df, "zzz"),
            Err(AmpereError::MissingColumn(_))
        ));
    }
}
