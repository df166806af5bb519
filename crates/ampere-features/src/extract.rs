//! Date-part and rolling-statistic feature extraction.
//!
//! The extractor turns the raw `period / timezone / value` frame into the
//! feature frame consumed by the supervised transform. Date parts are pure
//! functions of `period`; rolling statistics need a full trailing window and
//! are skipped at inference time, where the carried statistics from the last
//! training row are attached instead.

use ampere_traits::{
    AmpereError, Result,
    columns::{
        DAY, DAY_OF_WEEK, IS_WEEKEND, MONTH, PERIOD, QUARTER, ROLLING_MEAN, ROLLING_STD, VALUE,
        WEEK_OF_YEAR, YEAR,
    },
    stats::rolling_mean_std,
    types::{Date, column_f64, require_columns},
};
use chrono::{Datelike, Weekday};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Configuration for feature extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractConfig {
    /// Trailing window for the rolling mean and standard deviation
    /// (default: 7 days).
    pub window_size: usize,
    /// Skip the rolling statistics (single-row inference input).
    pub inference: bool,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            window_size: 7,
            inference: false,
        }
    }
}

impl ExtractConfig {
    /// Training-mode configuration with the given window.
    pub const fn training(window_size: usize) -> Self {
        Self {
            window_size,
            inference: false,
        }
    }

    /// Inference-mode configuration.
    pub const fn inference() -> Self {
        Self {
            window_size: 7,
            inference: true,
        }
    }

    /// Checks the window is large enough for a sample deviation.
    ///
    /// # Errors
    ///
    /// Returns [`AmpereError::InvalidConfig`] when `window_size < 2`.
    pub fn validate(&self) -> Result<()> {
        if !self.inference && self.window_size < 2 {
            return Err(AmpereError::InvalidConfig(format!(
                "window_size must be at least 2, got {}",
                self.window_size
            )));
        }
        Ok(())
    }
}

/// Full English weekday name.
pub const fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

/// Calendar features derived from a single date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateParts {
    /// Calendar year.
    pub year: i32,
    /// Month (1-12).
    pub month: i32,
    /// Day of month.
    pub day: i32,
    /// Weekday name.
    pub day_of_week: &'static str,
    /// Quarter (1-4).
    pub quarter: i32,
    /// ISO week number.
    pub week_of_year: i32,
    /// 1 on weekends.
    pub is_weekend: i32,
}

impl DateParts {
    /// Derives the calendar features of `date`.
    pub fn of(date: Date) -> Self {
        let weekday = date.weekday();
        Self {
            year: date.year(),
            month: date.month() as i32,
            day: date.day() as i32,
            day_of_week: weekday_name(weekday),
            quarter: ((date.month() - 1) / 3 + 1) as i32,
            week_of_year: date.iso_week().week() as i32,
            is_weekend: i32::from(matches!(weekday, Weekday::Sat | Weekday::Sun)),
        }
    }
}

/// Reads the `period` column as dates.
///
/// Accepts a `Date` column or `YYYY-MM-DD` strings; null stays null.
///
/// # Errors
///
/// Returns [`AmpereError::InvalidData`] for unparseable strings or an
/// unsupported dtype.
pub fn parse_periods(df: &DataFrame) -> Result<Vec<Option<Date>>> {
    let series = df
        .column(PERIOD)
        .map_err(|_| AmpereError::MissingColumn(PERIOD.to_string()))?
        .as_materialized_series();

    match series.dtype() {
        DataType::Date => Ok(series.date()?.as_date_iter().collect()),
        DataType::String => series
            .str()?
            .into_iter()
            .map(|s| {
                s.map(|s| {
                    Date::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|e| {
                        AmpereError::InvalidData(format!("invalid period '{s}': {e}"))
                    })
                })
                .transpose()
            })
            .collect(),
        other => Err(AmpereError::InvalidData(format!(
            "period column has unsupported dtype {other}"
        ))),
    }
}

/// Extracts date parts and, outside inference, rolling statistics.
///
/// Output columns, in order: the input columns (with `period` as a `Date`
/// and `value` as `Int64`), then `year, month, day, day_of_week, quarter,
/// week_of_year, is_weekend`, then `rolling_mean, rolling_std` unless
/// `config.inference`. Rows holding any null (including the first
/// `window_size - 1` rows whose window is incomplete) are dropped; the
/// remaining rows keep their order.
///
/// # Errors
///
/// Returns an error when `period` or `value` is missing, a period cannot be
/// parsed, or the window is smaller than 2.
pub fn extract_features(df: &DataFrame, config: &ExtractConfig) -> Result<DataFrame> {
    config.validate()?;
    require_columns(df, &[PERIOD, VALUE])?;

    let periods = parse_periods(df)?;
    let mut out = df.clone();
    out.with_column(Series::new(PERIOD.into(), periods.clone()))?;
    let value = out
        .column(VALUE)?
        .as_materialized_series()
        .cast(&DataType::Int64)?;
    out.with_column(value)?;

    let parts: Vec<Option<DateParts>> = periods.iter().map(|p| p.map(DateParts::of)).collect();
    let int_part = |f: fn(&DateParts) -> i32| -> Vec<Option<i32>> {
        parts.iter().map(|p| p.as_ref().map(f)).collect()
    };

    out.with_column(Series::new(YEAR.into(), int_part(|p| p.year)))?;
    out.with_column(Series::new(MONTH.into(), int_part(|p| p.month)))?;
    out.with_column(Series::new(DAY.into(), int_part(|p| p.day)))?;
    let names: Vec<Option<&str>> = parts.iter().map(|p| p.map(|p| p.day_of_week)).collect();
    out.with_column(Series::new(DAY_OF_WEEK.into(), names))?;
    out.with_column(Series::new(QUARTER.into(), int_part(|p| p.quarter)))?;
    out.with_column(Series::new(WEEK_OF_YEAR.into(), int_part(|p| p.week_of_year)))?;
    out.with_column(Series::new(IS_WEEKEND.into(), int_part(|p| p.is_weekend)))?;

    if !config.inference {
        // A missing target breaks every window that covers it.
        let values: Vec<f64> = column_f64(&out, VALUE)?
            .into_iter()
            .map(|v| v.unwrap_or(f64::NAN))
            .collect();
        let rolling = rolling_mean_std(&values, config.window_size);
        let means: Vec<Option<f64>> = rolling.iter().map(|r| r.map(|(m, _)| m)).collect();
        let stds: Vec<Option<f64>> = rolling.iter().map(|r| r.map(|(_, s)| s)).collect();
        out.with_column(Series::new(ROLLING_MEAN.into(), means))?;
        out.with_column(Series::new(ROLLING_STD.into(), stds))?;
    }

    Ok(out.drop_nulls::<String>(None)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ampere_traits::types::{Observation, column_names, observations_to_frame};
    use approx::assert_relative_eq;

    fn consecutive_days(n: usize) -> DataFrame {
        let start = Date::from_ymd_opt(2024, 1, 1).unwrap();
        let rows: Vec<Observation> = (0..n)
            .map(|i| {
                Observation::new(
                    start + chrono::Duration::days(i as i64),
                    "Eastern",
                    1000 + (i as i64 % 5) * 10,
                )
            })
            .collect();
        observations_to_frame(&rows).unwrap()
    }

    fn f64_column(df: &DataFrame, name: &str) -> Vec<Option<f64>> {
        column_f64(df, name).unwrap()
    }

    #[test]
    fn test_date_parts() {
        // 2024-12-29 is a Sunday in ISO week 52; 2024-12-30 starts ISO week 1 of 2025
        let sunday = DateParts::of(Date::from_ymd_opt(2024, 12, 29).unwrap());
        assert_eq!(sunday.year, 2024);
        assert_eq!(sunday.quarter, 4);
        assert_eq!(sunday.week_of_year, 52);
        assert_eq!(sunday.day_of_week, "Sunday");
        assert_eq!(sunday.is_weekend, 1);

        let monday = DateParts::of(Date::from_ymd_opt(2024, 12, 30).unwrap());
        assert_eq!(monday.week_of_year, 1);
        assert_eq!(monday.is_weekend, 0);
        assert_eq!(monday.day_of_week, "Monday");
    }

    #[test]
    fn test_ten_days_window_seven() {
        let df = consecutive_days(10);
        let out = extract_features(&df, &ExtractConfig::training(7)).unwrap();

        assert_eq!(out.height(), 4);
        let means = f64_column(&out, ROLLING_MEAN);
        let stds = f64_column(&out, ROLLING_STD);
        assert!(means.iter().all(|m| m.is_some_and(f64::is_finite)));
        assert!(stds.iter().all(|s| s.is_some_and(f64::is_finite)));
    }

    #[test]
    fn test_column_order() {
        let out = extract_features(&consecutive_days(8), &ExtractConfig::default()).unwrap();
        assert_eq!(
            column_names(&out),
            vec![
                PERIOD,
                "timezone",
                VALUE,
                YEAR,
                MONTH,
                DAY,
                DAY_OF_WEEK,
                QUARTER,
                WEEK_OF_YEAR,
                IS_WEEKEND,
                ROLLING_MEAN,
                ROLLING_STD
            ]
        );
    }

    #[test]
    fn test_rolling_values() {
        let df = df! {
            "period" => &["2024-03-01", "2024-03-02", "2024-03-03", "2024-03-04"],
            "value" => &[10i64, 20, 30, 40],
        }
        .unwrap();
        let out = extract_features(&df, &ExtractConfig::training(3)).unwrap();

        assert_eq!(out.height(), 2);
        let means = f64_column(&out, ROLLING_MEAN);
        assert_relative_eq!(means[0].unwrap(), 20.0);
        assert_relative_eq!(means[1].unwrap(), 30.0);
        let stds = f64_column(&out, ROLLING_STD);
        assert_relative_eq!(stds[0].unwrap(), 10.0);
    }

    #[test]
    fn test_missing_target_drops_covering_windows() {
        let df = df! {
            "period" => &["2024-03-01", "2024-03-02", "2024-03-03", "2024-03-04", "2024-03-05"],
            "value" => &[Some(10i64), None, Some(30), Some(40), Some(50)],
        }
        .unwrap();
        let out = extract_features(&df, &ExtractConfig::training(2)).unwrap();

        let day = |d| Date::from_ymd_opt(2024, 3, d);
        assert_eq!(parse_periods(&out).unwrap(), vec![day(4), day(5)]);
        assert_eq!(f64_column(&out, ROLLING_MEAN), vec![Some(35.0), Some(45.0)]);
        assert_eq!(out.get_columns().iter().map(Column::null_count).sum::<usize>(), 0);
    }

    #[test]
    fn test_inference_mode_keeps_single_row() {
        let df = consecutive_days(1);
        let out = extract_features(&df, &ExtractConfig::inference()).unwrap();

        assert_eq!(out.height(), 1);
        assert!(out.column(ROLLING_MEAN).is_err());
        assert!(out.column(ROLLING_STD).is_err());
    }

    #[test]
    fn test_deterministic() {
        let df = consecutive_days(30);
        let a = extract_features(&df, &ExtractConfig::default()).unwrap();
        let b = extract_features(&df, &ExtractConfig::default()).unwrap();
        assert!(a.equals_missing(&b));

        // Re-extraction of an extracted frame reproduces the date parts.
        let raw = a.select([PERIOD, "timezone", VALUE]).unwrap();
        let again = extract_features(&raw, &ExtractConfig::inference()).unwrap();
        for name in [YEAR, MONTH, DAY, QUARTER, WEEK_OF_YEAR, IS_WEEKEND] {
            assert_eq!(f64_column(&a, name), f64_column(&again, name), "{name}");
        }
    }

    #[test]
    fn test_window_too_small() {
        let err = extract_features(&consecutive_days(5), &ExtractConfig::training(1)).unwrap_err();
        assert!(matches!(err, AmpereError::InvalidConfig(_)));
    }

    #[test]
    fn test_invalid_period() {
        let df = df! {
            "period" => &["2024-13-45"],
            "value" => &[1i64],
        }
        .unwrap();
        assert!(matches!(
            extract_features(&df, &ExtractConfig::inference()),
            Err(AmpereError::InvalidData(_))
        ));
    }

    #[test]
    fn test_missing_value_column() {
        let df = df! { "period" => &["2024-01-01"] }.unwrap();
        assert!(matches!(
            extract_features(&df, &ExtractConfig::inference()),
            Err(AmpereError::MissingColumn(_))
        ));
    }
}
