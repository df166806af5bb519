//! Series identifiers and their table layouts.

use crate::error::StoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A stored series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeriesId {
    /// Daily sub-balancing-authority demand.
    Demand,
}

impl SeriesId {
    /// Every known series.
    pub const ALL: [Self; 1] = [Self::Demand];

    /// Identifier used in configuration and on the command line.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Demand => "demand",
        }
    }

    /// Table layout of this series.
    pub const fn schema(&self) -> TableSchema {
        match self {
            Self::Demand => DEMAND,
        }
    }
}

impl fmt::Display for SeriesId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SeriesId {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|id| id.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| StoreError::UnknownSeries(s.to_string()))
    }
}

/// Column layout of a series table.
///
/// The unique key spans every column, so re-inserting an identical row is a
/// no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableSchema {
    /// Table name.
    pub table: &'static str,
    /// Column names with their SQL types, in insert order.
    pub columns: &'static [(&'static str, &'static str)],
}

const DEMAND: TableSchema = TableSchema {
    table: "demand",
    columns: &[
        ("period", "VARCHAR(100)"),
        ("subba", "VARCHAR(100)"),
        ("subba_name", "VARCHAR(100)"),
        ("parent", "VARCHAR(100)"),
        ("parent_name", "VARCHAR(100)"),
        ("timezone", "VARCHAR(100)"),
        ("value", "INTEGER"),
        ("value_units", "VARCHAR(100)"),
    ],
};

impl TableSchema {
    /// Comma-separated column names.
    pub fn column_list(&self) -> String {
        self.columns
            .iter()
            .map(|(name, _)| *name)
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// `CREATE TABLE IF NOT EXISTS` statement.
    pub fn create_sql(&self) -> String {
        let defs: Vec<String> = self
            .columns
            .iter()
            .map(|(name, ty)| format!("{name} {ty}"))
            .collect();
        format!(
            "CREATE TABLE IF NOT EXISTS {} (id SERIAL PRIMARY KEY, {}, UNIQUE ({}))",
            self.table,
            defs.join(", "),
            self.column_list()
        )
    }

    /// Head of the insert statement; values are appended by the caller.
    pub fn insert_head(&self) -> String {
        format!("INSERT INTO {} ({}) ", self.table, self.column_list())
    }

    /// One `period, timezone, value` row per period of the sub-region bound
    /// to `$1`, ordered by period. Revised values win over earlier inserts.
    pub fn select_observations_sql(&self) -> String {
        format!(
            "SELECT DISTINCT ON (period) period, timezone, value FROM {} \
             WHERE subba = $1 AND value IS NOT NULL ORDER BY period ASC, id DESC",
            self.table
        )
    }

    /// Most recent `period, timezone, value` row of the sub-region bound to `$1`.
    pub fn select_latest_sql(&self) -> String {
        format!(
            "SELECT period, timezone, value FROM {} \
             WHERE subba = $1 AND value IS NOT NULL ORDER BY period DESC, id DESC LIMIT 1",
            self.table
        )
    }

    /// Maximum rows per insert statement under the bind-parameter limit.
    pub const fn rows_per_insert(&self) -> usize {
        // Postgres caps a statement at 65535 bind parameters.
        65_535 / self.columns.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_series_parse() {
        assert_eq!("demand".parse::<SeriesId>().unwrap(), SeriesId::Demand);
        assert_eq!(" Demand ".parse::<SeriesId>().unwrap(), SeriesId::Demand);
        assert!(matches!(
            "prices".parse::<SeriesId>(),
            Err(StoreError::UnknownSeries(_))
        ));
        assert_eq!(SeriesId::Demand.to_string(), "demand");
    }

    #[test]
    fn test_create_sql() {
        let sql = SeriesId::Demand.schema().create_sql();
        assert!(sql.starts_with("CREATE TABLE IF NOT EXISTS demand (id SERIAL PRIMARY KEY, "));
        assert!(sql.contains("value INTEGER"));
        assert!(sql.ends_with(
            "UNIQUE (period, subba, subba_name, parent, parent_name, timezone, value, value_units))"
        ));
    }

    #[test]
    fn test_insert_and_select_sql() {
        let schema = SeriesId::Demand.schema();
        assert_eq!(
            schema.insert_head(),
            "INSERT INTO demand (period, subba, subba_name, parent, parent_name, timezone, value, value_units) "
        );
        let select = schema.select_observations_sql();
        assert!(select.starts_with("SELECT DISTINCT ON (period) period, timezone, value"));
        assert!(select.contains("WHERE subba = $1 AND value IS NOT NULL"));
        assert!(select.ends_with("ORDER BY period ASC, id DESC"));
        let latest = schema.select_latest_sql();
        assert!(latest.contains("WHERE subba = $1"));
        assert!(latest.ends_with("ORDER BY period DESC, id DESC LIMIT 1"));
        assert_eq!(schema.rows_per_insert(), 8191);
    }
}
