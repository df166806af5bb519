//! Forward-chaining (expanding window) cross-validation splits.

use ampere_traits::{AmpereError, Result};
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// One train/test split. Every train index precedes every test index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fold {
    /// Rows used for fitting.
    pub train: Range<usize>,
    /// Rows used for scoring, immediately after `train`.
    pub test: Range<usize>,
}

/// Expanding-window splitter.
///
/// The data is cut into `n_splits + 1` blocks of `n_samples / (n_splits + 1)`
/// rows, with any remainder added to the first training block. Fold `k`
/// trains on everything before test block `k`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalkForwardSplit {
    n_splits: usize,
}

impl WalkForwardSplit {
    /// Creates a splitter with `n_splits` folds.
    ///
    /// # Errors
    ///
    /// Returns [`AmpereError::InvalidConfig`] when `n_splits < 2`.
    pub fn new(n_splits: usize) -> Result<Self> {
        if n_splits < 2 {
            return Err(AmpereError::InvalidConfig(format!(
                "n_splits must be at least 2, got {n_splits}"
            )));
        }
        Ok(Self { n_splits })
    }

    /// Number of folds.
    pub const fn n_splits(&self) -> usize {
        self.n_splits
    }

    /// Computes the folds for `n_samples` time-ordered rows.
    ///
    /// # Errors
    ///
    /// Returns [`AmpereError::InvalidConfig`] when there are fewer than
    /// `n_splits + 1` rows.
    ///
    /// # Example
    ///
    /// ```
    /// use ampere_eval::split::WalkForwardSplit;
    ///
    /// let folds = WalkForwardSplit::new(3).unwrap().folds(10).unwrap();
    /// assert_eq!(folds[0].train, 0..4);
    /// assert_eq!(folds[0].test, 4..6);
    /// assert_eq!(folds[2].test, 8..10);
    /// ```
    pub fn folds(&self, n_samples: usize) -> Result<Vec<Fold>> {
        let n_blocks = self.n_splits + 1;
        if n_samples < n_blocks {
            return Err(AmpereError::InvalidConfig(format!(
                "{} folds need at least {n_blocks} samples, got {n_samples}",
                self.n_splits
            )));
        }

        let test_size = n_samples / n_blocks;
        let first_test = n_samples - self.n_splits * test_size;
        let folds: Vec<Fold> = (0..self.n_splits)
            .map(|k| {
                let start = first_test + k * test_size;
                Fold {
                    train: 0..start,
                    test: start..start + test_size,
                }
            })
            .collect();

        if folds.iter().any(|f| f.train.is_empty()) {
            return Err(AmpereError::InvalidConfig(
                "walk-forward split produced an empty training block".to_string(),
            ));
        }
        Ok(folds)
    }
}
