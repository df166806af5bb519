//! PostgreSQL-backed storage of raw series rows.

use crate::{
    Result,
    config::DatabaseConfig,
    error::StoreError,
    schema::{SeriesId, TableSchema},
};
use ampere_eia::DemandRecord;
use ampere_traits::{
    Observation,
    retry::{RetryPolicy, retry},
    types::observations_to_frame,
};
use chrono::NaiveDate;
use polars::prelude::DataFrame;
use sqlx::{
    PgPool, Postgres, QueryBuilder,
    postgres::PgPoolOptions,
};
use tracing::{debug, info, warn};

/// Outcome of an insert.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InsertReport {
    /// Rows written.
    pub inserted: u64,
    /// Rows skipped because an identical row already exists.
    pub duplicates: u64,
}

/// Connection pool over the series tables.
#[derive(Debug, Clone)]
pub struct Store {
    pool: PgPool,
}

impl Store {
    /// Connects to the database, retrying under `policy`.
    ///
    /// # Errors
    ///
    /// Returns the last connection error once the attempts are exhausted.
    pub async fn connect(config: &DatabaseConfig, policy: RetryPolicy) -> Result<Self> {
        let label = format!("connect to {}:{}/{}", config.host, config.port, config.dbname);
        let pool = retry(policy, &label, || {
            PgPoolOptions::new()
                .max_connections(4)
                .acquire_timeout(config.timeout())
                .connect_with(config.connect_options())
        })
        .await?;
        info!("connected to {}:{}/{}", config.host, config.port, config.dbname);
        Ok(Self { pool })
    }

    /// Wraps an existing pool.
    pub const fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates the table of `series` if it does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the statement fails.
    pub async fn create_table(&self, series: SeriesId) -> Result<()> {
        let sql = series.schema().create_sql();
        debug!("{sql}");
        sqlx::query(&sql).execute(&self.pool).await?;
        Ok(())
    }

    /// Inserts demand rows, skipping rows that are already stored.
    ///
    /// # Errors
    ///
    /// Returns an error if a value does not fit the column or a statement
    /// fails.
    pub async fn insert_records(
        &self,
        series: SeriesId,
        records: &[DemandRecord],
    ) -> Result<InsertReport> {
        let schema = series.schema();
        let mut report = InsertReport::default();

        for chunk in records.chunks(schema.rows_per_insert()) {
            let values = chunk
                .iter()
                .map(|r| {
                    r.value
                        .map(|v| i32::try_from(v).map_err(|_| StoreError::OutOfRange(v)))
                        .transpose()
                })
                .collect::<Result<Vec<Option<i32>>>>()?;

            let mut builder: QueryBuilder<'_, Postgres> = QueryBuilder::new(schema.insert_head());
            builder.push_values(chunk.iter().zip(values), |mut row, (r, value)| {
                row.push_bind(&r.period)
                    .push_bind(&r.subba)
                    .push_bind(&r.subba_name)
                    .push_bind(&r.parent)
                    .push_bind(&r.parent_name)
                    .push_bind(&r.timezone)
                    .push_bind(value)
                    .push_bind(&r.value_units);
            });
            builder.push(" ON CONFLICT DO NOTHING");

            let written = builder.build().execute(&self.pool).await?.rows_affected();
            report.inserted += written;
            report.duplicates += chunk.len() as u64 - written;
        }

        if report.duplicates > 0 {
            warn!(
                "{}: {} duplicate row(s) already stored",
                schema.table, report.duplicates
            );
        }
        info!("{}: inserted {} row(s)", schema.table, report.inserted);
        Ok(report)
    }

    /// Loads the observations of `series` for sub-region `subba`, one per
    /// period and ordered by period.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or a stored period is malformed.
    pub async fn load_observations(
        &self,
        series: SeriesId,
        subba: &str,
    ) -> Result<Vec<Observation>> {
        let schema = series.schema();
        let rows: Vec<(String, String, i32)> =
            sqlx::query_as(&schema.select_observations_sql())
                .bind(subba)
                .fetch_all(&self.pool)
                .await?;
        rows.into_iter()
            .map(|row| to_observation(&schema, row))
            .collect()
    }

    /// Loads `series` for sub-region `subba` as the raw
    /// `period / timezone / value` frame.
    ///
    /// # Errors
    ///
    /// Returns an error if the rows cannot be loaded or converted.
    pub async fn load_frame(&self, series: SeriesId, subba: &str) -> Result<DataFrame> {
        let observations = self.load_observations(series, subba).await?;
        Ok(observations_to_frame(&observations)?)
    }

    /// Most recent observation of `series` for sub-region `subba`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or the period is malformed.
    pub async fn latest_observation(
        &self,
        series: SeriesId,
        subba: &str,
    ) -> Result<Option<Observation>> {
        let schema = series.schema();
        let row: Option<(String, String, i32)> = sqlx::query_as(&schema.select_latest_sql())
            .bind(subba)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|row| to_observation(&schema, row)).transpose()
    }

    /// Closes the pool.
    pub async fn close(self) {
        self.pool.close().await;
    }
}

fn to_observation(
    schema: &TableSchema,
    (period, timezone, value): (String, String, i32),
) -> Result<Observation> {
    let period = NaiveDate::parse_from_str(&period, "%Y-%m-%d").map_err(|e| {
        StoreError::CorruptRow {
            table: schema.table,
            reason: format!("period '{period}': {e}"),
        }
    })?;
    Ok(Observation::new(period, timezone, i64::from(value)))
}
