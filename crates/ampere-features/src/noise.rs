//! Random reference feature for importance-based pruning.

use ampere_traits::{Result, columns::RANDOM_FEATURE};
use polars::prelude::*;
use rand::Rng;

/// Appends a `random_feature` column of uniform `[0, 1)` draws.
///
/// A feature that ranks below this column carries no more signal than noise.
///
/// # Errors
///
/// Returns an error if the frame already has a `random_feature` column of a
/// different length (which cannot happen for frames built by this crate).
pub fn add_noise_feature<R: Rng + ?Sized>(df: &DataFrame, rng: &mut R) -> Result<DataFrame> {
    let noise: Vec<f64> = (0..df.height()).map(|_| rng.random::<f64>()).collect();
    let mut out = df.clone();
    out.with_column(Series::new(RANDOM_FEATURE.into(), noise))?;
    Ok(out)
}
