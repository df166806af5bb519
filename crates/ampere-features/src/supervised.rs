//! Lagged-target transform.

use ampere_traits::{
    AmpereError, Result,
    columns::{LAG, PERIOD, VALUE},
    types::require_columns,
};
use polars::prelude::*;

/// Turns an extracted feature frame into a supervised-learning frame.
///
/// Adds `lag`, the target of the previous row, drops the first row (which
/// has no predecessor) and drops `period`. Rows are never re-sorted: the
/// caller supplies the frame in ascending `period` order.
///
/// # Errors
///
/// Returns [`AmpereError::MissingColumn`] if `value` or `period` is absent
/// and [`AmpereError::InvalidData`] if the target holds nulls.
pub fn to_supervised(df: &DataFrame) -> Result<DataFrame> {
    require_columns(df, &[PERIOD, VALUE])?;

    let value = df
        .column(VALUE)?
        .as_materialized_series()
        .cast(&DataType::Int64)?;
    if value.null_count() > 0 {
        return Err(AmpereError::InvalidData(format!(
            "{} null target values before lagging",
            value.null_count()
        )));
    }

    let mut out = df.drop(PERIOD)?;
    out.with_column(value.clone())?;
    out.with_column(value.shift(1).with_name(LAG.into()))?;

    if out.height() == 0 {
        return Ok(out);
    }
    Ok(out.slice(1, out.height() - 1))
}
