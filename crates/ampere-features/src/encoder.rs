//! Fixed-width one-hot encoding of categorical columns.
//!
//! The encoder is fitted once on the training frame and then applied
//! verbatim at inference, so both paths produce the same indicator columns in
//! the same order regardless of which categories the input happens to hold.

use ampere_traits::{AmpereError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::warn;

/// Categories learned for one categorical column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedFeature {
    /// Source column name.
    pub column: String,
    /// Distinct categories, sorted.
    pub categories: Vec<String>,
}

impl EncodedFeature {
    /// Names of the indicator columns, one per category.
    pub fn indicator_names(&self) -> Vec<String> {
        self.categories
            .iter()
            .map(|c| format!("{}_{}", self.column, c))
            .collect()
    }
}

/// One-hot encoder state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OneHotEncoder {
    /// Encoded columns in the order they appeared in the training frame.
    pub features: Vec<EncodedFeature>,
}

impl OneHotEncoder {
    /// Learns the categories of every `String` column of `df` and encodes it.
    ///
    /// Categorical columns are replaced by `Float64` indicator columns named
    /// `<column>_<category>`, appended after the remaining columns.
    ///
    /// # Errors
    ///
    /// Returns an error if the frame cannot be rebuilt.
    pub fn fit_transform(df: &DataFrame) -> Result<(DataFrame, Self)> {
        let mut features = Vec::new();
        for column in df.get_columns() {
            let series = column.as_materialized_series();
            if series.dtype() != &DataType::String {
                continue;
            }
            let categories: BTreeSet<String> = series
                .str()?
                .into_iter()
                .flatten()
                .map(str::to_string)
                .collect();
            features.push(EncodedFeature {
                column: series.name().to_string(),
                categories: categories.into_iter().collect(),
            });
        }

        let encoder = Self { features };
        let encoded = encoder.transform(df)?;
        Ok((encoded, encoder))
    }

    /// Encodes `df` with the stored categories only.
    ///
    /// Values the encoder has never seen encode as all-zero rows and are
    /// reported with a warning. `String` columns the encoder was not fitted
    /// on are rejected because no model feature could represent them.
    ///
    /// # Errors
    ///
    /// Returns [`AmpereError::MissingColumn`] if an encoded column is absent
    /// and [`AmpereError::InvalidData`] for an unknown categorical column.
    pub fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        for column in df.get_columns() {
            let name = column.name().as_str();
            if column.dtype() == &DataType::String
                && !self.features.iter().any(|f| f.column == name)
            {
                return Err(AmpereError::InvalidData(format!(
                    "categorical column '{name}' was not seen when fitting the encoder"
                )));
            }
        }

        let mut out = df.clone();
        let mut indicators = Vec::new();
        for feature in &self.features {
            let values: Vec<Option<String>> = df
                .column(&feature.column)
                .map_err(|_| AmpereError::MissingColumn(feature.column.clone()))?
                .as_materialized_series()
                .cast(&DataType::String)?
                .str()?
                .into_iter()
                .map(|v| v.map(str::to_string))
                .collect();

            let unseen = values
                .iter()
                .filter(|v| {
                    v.as_ref()
                        .is_some_and(|v| feature.categories.binary_search(v).is_err())
                })
                .count();
            if unseen > 0 {
                warn!(
                    "{unseen} unseen value(s) in '{}' encoded as all-zero",
                    feature.column
                );
            }

            for (category, name) in feature.categories.iter().zip(feature.indicator_names()) {
                let flags: Vec<f64> = values
                    .iter()
                    .map(|v| if v.as_deref() == Some(category.as_str()) { 1.0 } else { 0.0 })
                    .collect();
                indicators.push(Series::new(name.into(), flags));
            }
            out = out.drop(&feature.column)?;
        }

        for indicator in indicators {
            out.with_column(indicator)?;
        }
        Ok(out)
    }

    /// Every indicator column produced by this encoder, in output order.
    pub fn output_columns(&self) -> Vec<String> {
        self.features
            .iter()
            .flat_map(EncodedFeature::indicator_names)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ampere_traits::types::column_names;

    fn sample() -> DataFrame {
        df! {
            "value" => &[1i64, 2, 3, 4],
            "timezone" => &["Eastern", "Eastern", "Central", "Eastern"],
            "day_of_week" => &["Monday", "Tuesday", "Monday", "Sunday"],
            "lag" => &[0i64, 1, 2, 3],
        }
        .unwrap()
    }

    #[test]
    fn test_fit_transform_layout() {
        let (encoded, encoder) = OneHotEncoder::fit_transform(&sample()).unwrap();

        assert_eq!(
            column_names(&encoded),
            vec![
                "value",
                "lag",
                "timezone_Central",
                "timezone_Eastern",
                "day_of_week_Monday",
                "day_of_week_Sunday",
                "day_of_week_Tuesday",
            ]
        );
        assert_eq!(encoder.features.len(), 2);
        assert_eq!(encoder.features[1].categories, vec!["Monday", "Sunday", "Tuesday"]);

        let monday: Vec<Option<f64>> = encoded
            .column("day_of_week_Monday")
            .unwrap()
            .as_materialized_series()
            .f64()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(monday, vec![Some(1.0), Some(0.0), Some(1.0), Some(0.0)]);
    }

    #[test]
    fn test_round_trip() {
        let df = sample();
        let (fitted, encoder) = OneHotEncoder::fit_transform(&df).unwrap();
        let applied = encoder.transform(&df).unwrap();
        assert!(fitted.equals_missing(&applied));
    }

    #[test]
    fn test_apply_keeps_width_for_single_row() {
        let (fitted, encoder) = OneHotEncoder::fit_transform(&sample()).unwrap();
        let one = df! {
            "value" => &[9i64],
            "timezone" => &["Central"],
            "day_of_week" => &["Sunday"],
            "lag" => &[8i64],
        }
        .unwrap();

        let applied = encoder.transform(&one).unwrap();
        assert_eq!(column_names(&applied), column_names(&fitted));
        assert_eq!(encoder.output_columns().len(), 5);
    }

    #[test]
    fn test_unseen_category_is_all_zero() {
        let (_, encoder) = OneHotEncoder::fit_transform(&sample()).unwrap();
        let one = df! {
            "value" => &[9i64],
            "timezone" => &["Pacific"],
            "day_of_week" => &["Friday"],
            "lag" => &[8i64],
        }
        .unwrap();

        let applied = encoder.transform(&one).unwrap();
        for name in encoder.output_columns() {
            let v = applied
                .column(&name)
                .unwrap()
                .as_materialized_series()
                .f64()
                .unwrap()
                .get(0);
            assert_eq!(v, Some(0.0), "{name}");
        }
    }

    #[test]
    fn test_missing_encoded_column() {
        let (_, encoder) = OneHotEncoder::fit_transform(&sample()).unwrap();
        let df = df! { "value" => &[1i64], "timezone" => &["Eastern"] }.unwrap();
        assert!(matches!(
            encoder.transform(&df),
            Err(AmpereError::MissingColumn(c)) if c == "day_of_week"
        ));
    }

    #[test]
    fn test_unknown_categorical_column() {
        let (_, encoder) = OneHotEncoder::fit_transform(&sample()).unwrap();
        let mut df = sample();
        df.with_column(Series::new("region".into(), &["a", "b", "c", "d"]))
            .unwrap();
        assert!(matches!(
            encoder.transform(&df),
            Err(AmpereError::InvalidData(_))
        ));
    }

    #[test]
    fn test_no_categorical_columns() {
        let df = df! { "value" => &[1i64, 2] }.unwrap();
        let (encoded, encoder) = OneHotEncoder::fit_transform(&df).unwrap();
        assert!(encoder.features.is_empty());
        assert!(encoded.equals(&df));
    }
}
