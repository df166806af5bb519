//! Statistical utility functions for the feature pipeline and evaluation.
//!
//! This module provides the small set of statistics shared across crates:
//! interpolated quantiles for outlier bounds, trailing-window moments for
//! rolling features, and the mean absolute error used to score folds.

use ndarray::ArrayView1;

/// Linearly interpolated quantile of already-sorted values.
///
/// The position of quantile `q` is `q * (n - 1)`; values between two ranks
/// are interpolated linearly. Returns `None` for empty input.
///
/// # Examples
///
/// ```
/// use ampere_traits::stats::quantile_sorted;
///
/// let values = [1.0, 2.0, 3.0, 4.0];
/// assert_eq!(quantile_sorted(&values, 0.25), Some(1.75));
/// assert_eq!(quantile_sorted(&values, 0.5), Some(2.5));
/// ```
pub fn quantile_sorted(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let q = q.clamp(0.0, 1.0);
    let pos = q * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let frac = pos - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * frac)
}

/// Arithmetic mean. Returns `NaN` for empty input.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (N-1 denominator).
///
/// Returns `NaN` when fewer than two values are given, matching the
/// convention that a single observation has no sample spread.
pub fn sample_std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return f64::NAN;
    }
    let m = mean(values);
    let variance =
        values.iter().map(|x| (x - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

/// Trailing-window mean and sample standard deviation.
///
/// Entry `i` covers `values[i + 1 - window ..= i]`. Entries before the window
/// fills are `None`, as are windows containing a non-finite value.
///
/// # Examples
///
/// ```
/// use ampere_traits::stats::rolling_mean_std;
///
/// let stats = rolling_mean_std(&[1.0, 2.0, 3.0], 2);
/// assert!(stats[0].is_none());
/// assert_eq!(stats[1].unwrap().0, 1.5);
/// ```
pub fn rolling_mean_std(values: &[f64], window: usize) -> Vec<Option<(f64, f64)>> {
    if window == 0 {
        return vec![None; values.len()];
    }
    (0..values.len())
        .map(|i| {
            if i + 1 < window {
                return None;
            }
            let slice = &values[i + 1 - window..=i];
            if slice.iter().any(|v| !v.is_finite()) {
                return None;
            }
            let std = sample_std(slice);
            std.is_finite().then(|| (mean(slice), std))
        })
        .collect()
}

/// Mean absolute error between targets and predictions.
///
/// Returns `NaN` if the inputs are empty or differ in length.
pub fn mean_absolute_error(actual: ArrayView1<'_, f64>, predicted: ArrayView1<'_, f64>) -> f64 {
    if actual.is_empty() || actual.len() != predicted.len() {
        return f64::NAN;
    }
    actual
        .iter()
        .zip(predicted.iter())
        .map(|(a, p)| (a - p).abs())
        .sum::<f64>()
        / actual.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_quantile_interpolation() {
        let sorted = vec![10.0, 20.0, 30.0, 40.0, 50.0];
        assert_eq!(quantile_sorted(&sorted, 0.0), Some(10.0));
        assert_eq!(quantile_sorted(&sorted, 0.25), Some(20.0));
        assert_eq!(quantile_sorted(&sorted, 0.75), Some(40.0));
        assert_eq!(quantile_sorted(&sorted, 1.0), Some(50.0));

        let sorted = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        assert_relative_eq!(quantile_sorted(&sorted, 0.25).unwrap(), 2.25);
        assert_relative_eq!(quantile_sorted(&sorted, 0.75).unwrap(), 4.75);
    }

    #[test]
    fn test_quantile_degenerate() {
        assert_eq!(quantile_sorted(&[], 0.25), None);
        assert_eq!(quantile_sorted(&[7.0], 0.25), Some(7.0));
        assert_eq!(quantile_sorted(&[7.0], 0.75), Some(7.0));
    }

    #[test]
    fn test_sample_std() {
        let values = vec![2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_relative_eq!(sample_std(&values), 2.138089935299395, epsilon = 1e-12);
        assert!(sample_std(&[1.0]).is_nan());
    }

    #[test]
    fn test_rolling_window() {
        let values: Vec<f64> = (1..=10).map(f64::from).collect();
        let stats = rolling_mean_std(&values, 7);

        assert_eq!(stats.len(), 10);
        assert!(stats[..6].iter().all(Option::is_none));
        let filled: Vec<_> = stats.iter().flatten().collect();
        assert_eq!(filled.len(), 4);

        // window 1..=7
        let (m, s) = stats[6].unwrap();
        assert_relative_eq!(m, 4.0);
        assert_relative_eq!(s, 2.160246899469287, epsilon = 1e-12);
    }

    #[test]
    fn test_rolling_window_one_has_no_spread() {
        let stats = rolling_mean_std(&[1.0, 2.0], 1);
        assert!(stats.iter().all(Option::is_none));
    }

    #[test]
    fn test_mean_absolute_error() {
        let actual = array![1.0, 2.0, 3.0];
        let predicted = array![1.5, 2.0, 1.0];
        assert_relative_eq!(
            mean_absolute_error(actual.view(), predicted.view()),
            2.5 / 3.0
        );

        let empty = ndarray::Array1::<f64>::zeros(0);
        assert!(mean_absolute_error(empty.view(), empty.view()).is_nan());
    }
}
