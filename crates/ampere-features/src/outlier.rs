//! Interquartile-range outlier filter.
//!
//! Removes observations whose target lies outside
//! `[Q1 - 1.5 * IQR, Q3 + 1.5 * IQR]` before any feature is derived, so a
//! single metering glitch cannot distort the rolling statistics of the
//! following week.

use ampere_traits::{Result, stats::quantile_sorted, types::column_f64};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Tukey fence multiplier.
pub const IQR_MULTIPLIER: f64 = 1.5;

/// Acceptance band computed from the quartiles of a column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IqrBounds {
    /// First quartile.
    pub q1: f64,
    /// Third quartile.
    pub q3: f64,
    /// Lowest accepted value.
    pub lower: f64,
    /// Highest accepted value.
    pub upper: f64,
}

impl IqrBounds {
    /// Whether `value` lies inside the band (bounds inclusive).
    pub fn contains(&self, value: f64) -> bool {
        value >= self.lower && value <= self.upper
    }
}

/// Computes the IQR band of the finite values in `values`.
///
/// Returns `None` when there is no finite value. With fewer than four values
/// the quartiles degenerate towards the extremes but remain well defined.
pub fn iqr_bounds(values: &[f64]) -> Option<IqrBounds> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    sorted.sort_by(f64::total_cmp);

    let q1 = quantile_sorted(&sorted, 0.25)?;
    let q3 = quantile_sorted(&sorted, 0.75)?;
    let iqr = q3 - q1;
    Some(IqrBounds {
        q1,
        q3,
        lower: q1 - IQR_MULTIPLIER * iqr,
        upper: q3 + IQR_MULTIPLIER * iqr,
    })
}

/// Keeps the rows of `df` whose `column` value lies inside its IQR band.
///
/// The column set is unchanged and surviving rows keep their order. Null
/// values are never inside the band. An empty frame is returned as is.
///
/// # Errors
///
/// Returns an error if `column` is missing or not numeric.
///
/// # Example
///
/// ```
/// use ampere_features::outlier::filter_by_iqr;
/// use polars::prelude::*;
///
/// let df = df! { "value" => &[10i64, 11, 12, 13, 500] }.unwrap();
/// let filtered = filter_by_iqr(&df, "value").unwrap();
/// assert_eq!(filtered.height(), 4);
/// ```
pub fn filter_by_iqr(df: &DataFrame, column: &str) -> Result<DataFrame> {
    let values = column_f64(df, column)?;
    let finite: Vec<f64> = values.iter().flatten().copied().collect();

    let Some(bounds) = iqr_bounds(&finite) else {
        // Nothing to measure against: every row is null or the frame is empty.
        return Ok(df.clear());
    };

    let mask: BooleanChunked = values
        .iter()
        .map(|v| v.is_some_and(|v| bounds.contains(v)))
        .collect();
    Ok(df.filter(&mask)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn values(df: &DataFrame) -> Vec<i64> {
        df.column("value")
            .unwrap()
            .as_materialized_series()
            .i64()
            .unwrap()
            .into_iter()
            .flatten()
            .collect()
    }

    #[test]
    fn test_bounds() {
        let b = iqr_bounds(&[1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
        assert_relative_eq!(b.q1, 2.0);
        assert_relative_eq!(b.q3, 4.0);
        assert_relative_eq!(b.lower, -1.0);
        assert_relative_eq!(b.upper, 7.0);
    }

    #[test]
    fn test_filter_removes_spikes() {
        let df = df! {
            "value" => &[100i64, 102, 98, 101, 99, 5000, 103, 1],
            "timezone" => &["Eastern"; 8],
        }
        .unwrap();

        let out = filter_by_iqr(&df, "value").unwrap();
        assert_eq!(out.width(), 2);
        assert_eq!(values(&out), vec![100, 102, 98, 101, 99, 103]);
    }

    #[test]
    fn test_output_inside_original_band() {
        let raw: Vec<i64> = (0..60)
            .map(|i| (i * 37 % 23) * 10 + if i % 17 == 0 { 900 } else { 0 })
            .collect();
        let df = df! { "value" => &raw }.unwrap();
        let bounds = iqr_bounds(&raw.iter().map(|v| *v as f64).collect::<Vec<_>>()).unwrap();

        let out = filter_by_iqr(&df, "value").unwrap();
        assert!(out.height() < df.height());
        for v in values(&out) {
            assert!(bounds.contains(v as f64), "{v} outside band");
        }
    }

    #[test]
    fn test_small_frames_do_not_fail() {
        let empty = df! { "value" => Vec::<i64>::new() }.unwrap();
        assert_eq!(filter_by_iqr(&empty, "value").unwrap().height(), 0);

        let one = df! { "value" => &[42i64] }.unwrap();
        assert_eq!(values(&filter_by_iqr(&one, "value").unwrap()), vec![42]);

        let three = df! { "value" => &[1i64, 2, 100] }.unwrap();
        let out = filter_by_iqr(&three, "value").unwrap();
        assert!(out.height() <= 3);
    }

    #[test]
    fn test_nulls_are_dropped() {
        let df = df! { "value" => &[Some(1i64), None, Some(2), Some(3), Some(2)] }.unwrap();
        let out = filter_by_iqr(&df, "value").unwrap();
        assert_eq!(out.height(), 4);
    }

    #[test]
    fn test_missing_column() {
        let df = df! { "other" => &[1i64] }.unwrap();
        assert!(filter_by_iqr(&df, "value").is_err());
    }
}
