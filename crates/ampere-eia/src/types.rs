//! Data types for EIA API requests and responses.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

/// Default number of rows requested per page.
pub const DEFAULT_CHUNK_LEN: usize = 5000;

/// A daily sub-balancing-authority demand request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DemandQuery {
    /// Sub-balancing-authority code (e.g. `ZONJ`).
    pub subba: String,
    /// First day, inclusive.
    pub start: NaiveDate,
    /// Last day, inclusive.
    pub end: NaiveDate,
    /// Rows per page.
    #[serde(default = "default_chunk_len")]
    pub chunk_len: usize,
}

const fn default_chunk_len() -> usize {
    DEFAULT_CHUNK_LEN
}

impl DemandQuery {
    /// Creates a query with the default page size.
    pub fn new(subba: impl Into<String>, start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            subba: subba.into(),
            start,
            end,
            chunk_len: DEFAULT_CHUNK_LEN,
        }
    }

    /// Sets the page size.
    #[must_use]
    pub const fn with_chunk_len(mut self, chunk_len: usize) -> Self {
        self.chunk_len = chunk_len;
        self
    }
}

/// One demand row as returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DemandRecord {
    /// Observation date (`YYYY-MM-DD`).
    pub period: String,
    /// Sub-balancing-authority code.
    pub subba: String,
    /// Sub-balancing-authority name.
    #[serde(rename = "subba-name", default)]
    pub subba_name: String,
    /// Parent balancing authority code.
    #[serde(default)]
    pub parent: String,
    /// Parent balancing authority name.
    #[serde(rename = "parent-name", default)]
    pub parent_name: String,
    /// Timezone label.
    #[serde(default)]
    pub timezone: String,
    /// Demand; the API sends numbers or numeric strings.
    #[serde(default, deserialize_with = "de_flexible_i64")]
    pub value: Option<i64>,
    /// Unit of `value`.
    #[serde(rename = "value-units", default)]
    pub value_units: String,
}

impl DemandRecord {
    /// Parsed observation date.
    pub fn date(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(&self.period, "%Y-%m-%d").ok()
    }
}

/// Page envelope of the v2 API.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Envelope {
    pub(crate) response: ResponseBody,
}

/// Body of a data page.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ResponseBody {
    #[serde(default, deserialize_with = "de_flexible_i64")]
    pub(crate) total: Option<i64>,
    #[serde(default)]
    pub(crate) data: Vec<DemandRecord>,
}

/// One page of demand rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DemandPage {
    /// Total number of rows matching the query.
    pub total: usize,
    /// Rows of this page.
    pub records: Vec<DemandRecord>,
}

fn de_flexible_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flexible {
        Int(i64),
        Float(f64),
        Text(String),
    }

    Ok(match Option::<Flexible>::deserialize(deserializer)? {
        None => None,
        Some(Flexible::Int(v)) => Some(v),
        Some(Flexible::Float(v)) if v.is_finite() => Some(v.round() as i64),
        Some(Flexible::Float(_)) => None,
        Some(Flexible::Text(s)) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().filter(|v| v.is_finite()).map(|v| v.round() as i64))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_with_string_value() {
        let json = r#"{
            "period": "2024-01-02",
            "subba": "ZONJ",
            "subba-name": "Zone J",
            "parent": "NYIS",
            "parent-name": "New York Independent System Operator",
            "timezone": "Eastern",
            "value": "5421",
            "value-units": "megawatthours"
        }"#;
        let record: DemandRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.value, Some(5421));
        assert_eq!(record.subba_name, "Zone J");
        assert_eq!(record.date(), NaiveDate::from_ymd_opt(2024, 1, 2));
    }

    #[test]
    fn test_record_value_variants() {
        let parse = |v: &str| -> Option<i64> {
            let json = format!(r#"{{"period": "2024-01-02", "subba": "ZONJ", "value": {v}}}"#);
            serde_json::from_str::<DemandRecord>(&json).unwrap().value
        };
        assert_eq!(parse("5421"), Some(5421));
        assert_eq!(parse("5421.6"), Some(5422));
        assert_eq!(parse(r#""  17 ""#), Some(17));
        assert_eq!(parse("null"), None);
        assert_eq!(parse(r#""n/a""#), None);
    }

    #[test]
    fn test_envelope_total_as_string() {
        let json = r#"{"response": {"total": "12", "data": []}}"#;
        let envelope: Envelope = serde_json::from_str(json).unwrap();
        assert_eq!(envelope.response.total, Some(12));
    }
}
