//! Gain importances from an XGBoost text dump.

use ndarray::Array1;

/// Total split gain per feature, normalized to sum to one.
///
/// `dump` is a model dump with statistics. Split nodes read like
/// `0:[f3<12.5] yes=1,no=2,missing=1,gain=804.2,cover=90`; leaves carry no
/// gain and are skipped. Features that never split get zero, and a model
/// without any split yields all zeros.
pub fn gain_importances(dump: &str, n_features: usize) -> Array1<f64> {
    let mut totals = Array1::<f64>::zeros(n_features);
    for (feature, gain) in dump.lines().filter_map(parse_split) {
        if let Some(total) = totals.get_mut(feature) {
            *total += gain;
        }
    }
    let sum = totals.sum();
    if sum > 0.0 {
        totals /= sum;
    }
    totals
}

fn parse_split(line: &str) -> Option<(usize, f64)> {
    let rest = &line[line.find("[f")? + 2..];
    let digits = rest.find(|c: char| !c.is_ascii_digit())?;
    let feature = rest[..digits].parse().ok()?;
    let gain = line[line.find("gain=")? + 5..]
        .split(',')
        .next()?
        .trim()
        .parse()
        .ok()?;
    Some((feature, gain))
}
