//! EIA API client implementation.

use crate::{
    Result,
    error::EiaError,
    types::{DemandPage, DemandQuery, DemandRecord, Envelope},
};
use ampere_traits::{
    Observation,
    retry::{RetryPolicy, retry},
    types::observations_to_frame,
};
use polars::prelude::DataFrame;
use reqwest::Client;
use std::env;
use tracing::{debug, info, warn};

/// Base URL for the EIA v2 API.
const EIA_BASE_URL: &str = "https://api.eia.gov/v2";

/// Route of the daily sub-balancing-authority demand dataset.
const DEMAND_ROUTE: &str = "electricity/rto/daily-region-sub-ba-data/data/";

/// EIA open-data API client.
#[derive(Debug, Clone)]
pub struct EiaClient {
    client: Client,
    api_key: String,
    base_url: String,
    retry: RetryPolicy,
}

impl EiaClient {
    /// Create a new EIA client with the given API key.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: EIA_BASE_URL.to_string(),
            retry: RetryPolicy::default(),
        }
    }

    /// Create a new EIA client from the `EIA_API_KEY` environment variable.
    ///
    /// This will also load from a `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the environment variable is not set.
    pub fn from_env() -> Result<Self> {
        // Try to load .env file (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let api_key = env::var("EIA_API_KEY").map_err(|_| EiaError::MissingApiKey)?;

        Ok(Self::new(api_key))
    }

    /// Point the client at another API root (mirrors, tests).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Retry policy applied to every page request.
    #[must_use]
    pub const fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Build the page URL for a demand query.
    fn demand_url(&self, query: &DemandQuery, offset: usize) -> String {
        format!(
            "{}/{DEMAND_ROUTE}?frequency=daily&data[0]=value&facets[subba][]={}\
             &start={}&end={}&sort[0][column]=period&sort[0][direction]=asc\
             &offset={offset}&length={}&api_key={}",
            self.base_url,
            query.subba,
            query.start.format("%Y-%m-%d"),
            query.end.format("%Y-%m-%d"),
            query.chunk_len,
            self.api_key
        )
    }

    fn redact(&self, url: &str) -> String {
        if self.api_key.is_empty() {
            url.to_string()
        } else {
            url.replace(&self.api_key, "***")
        }
    }

    /// Fetch one page of demand rows starting at `offset`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails, the API answers with a
    /// non-success status, or the body cannot be parsed.
    pub async fn fetch_page(&self, query: &DemandQuery, offset: usize) -> Result<DemandPage> {
        let url = self.demand_url(query, offset);
        debug!("GET {}", self.redact(&url));
        let response = self.client.get(&url).send().await?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(EiaError::RateLimitExceeded);
        }

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(EiaError::Api(format!("HTTP {status}: {}", self.redact(&text))));
        }

        let text = response.text().await?;
        parse_page(&text)
    }

    /// Fetch every row of a query, page by page.
    ///
    /// The first page reports the total row count; the remaining pages are
    /// requested by offset in order. Each page is retried under the client's
    /// retry policy, and a page that still fails aborts the whole fetch.
    ///
    /// # Errors
    ///
    /// Returns the error of the first page that could not be fetched.
    pub async fn fetch_all(&self, query: &DemandQuery) -> Result<Vec<DemandRecord>> {
        if query.chunk_len == 0 {
            return Err(EiaError::Api("chunk_len must be positive".to_string()));
        }

        let first = retry(self.retry, "EIA page 0", || self.fetch_page(query, 0)).await?;
        let total = first.total;
        let offsets = page_offsets(total, query.chunk_len);
        info!(
            "{}: {total} rows in {} page(s) between {} and {}",
            query.subba,
            offsets.len().max(1),
            query.start,
            query.end
        );

        let mut records = first.records;
        for (page, offset) in offsets.into_iter().enumerate().skip(1) {
            let label = format!("EIA page {page}");
            let next = retry(self.retry, &label, || self.fetch_page(query, offset)).await?;
            records.extend(next.records);
        }

        if records.len() != total {
            warn!(
                "{}: expected {total} rows, received {}",
                query.subba,
                records.len()
            );
        }
        Ok(records)
    }
}

fn parse_page(text: &str) -> Result<DemandPage> {
    let envelope: Envelope = serde_json::from_str(text).map_err(|e| {
        let snippet: String = text.chars().take(200).collect();
        EiaError::Api(format!("unexpected response ({e}): {snippet}"))
    })?;
    let total = envelope.response.total.unwrap_or(0).max(0) as usize;
    Ok(DemandPage {
        total,
        records: envelope.response.data,
    })
}

/// Offsets of every page needed to cover `total` rows.
pub fn page_offsets(total: usize, chunk_len: usize) -> Vec<usize> {
    if chunk_len == 0 {
        return Vec::new();
    }
    (0..total.div_ceil(chunk_len)).map(|i| i * chunk_len).collect()
}

/// Convert API rows into the raw `period / timezone / value` frame.
///
/// Rows without a value or with an unparseable period are skipped with a
/// warning.
///
/// # Errors
///
/// Returns an error if the frame cannot be built.
pub fn records_to_frame(records: &[DemandRecord]) -> Result<DataFrame> {
    let observations = records_to_observations(records);
    Ok(observations_to_frame(&observations)?)
}

/// Convert API rows into observations, skipping incomplete rows.
pub fn records_to_observations(records: &[DemandRecord]) -> Vec<Observation> {
    let mut skipped = 0usize;
    let observations: Vec<Observation> = records
        .iter()
        .filter_map(|r| match (r.date(), r.value) {
            (Some(period), Some(value)) => Some(Observation::new(period, r.timezone.clone(), value)),
            _ => {
                skipped += 1;
                None
            }
        })
        .collect();
    if skipped > 0 {
        warn!("skipped {skipped} incomplete demand record(s)");
    }
    observations
}
