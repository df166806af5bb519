//! Fetch command implementation.

use ampere::AmpereConfig;
use ampere::eia::{DemandQuery, EiaClient};
use ampere::store::Store;
use anyhow::{Result, anyhow};
use chrono::{Days, NaiveDate};

/// Parses a `YYYY-MM-DD` date.
pub(crate) fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| anyhow!("Invalid date '{}': {}", s, e))
}

/// Fetch demand for the configured range and store it.
pub(crate) async fn fetch(config: &AmpereConfig, full: bool) -> Result<()> {
    println!("\n╔══════════════════════════════════════════════════════════════╗");
    println!("║                       Fetch Demand                           ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    let client = EiaClient::new(config.api_key()?).with_retry(config.retry);
    let store = Store::connect(&config.database, config.retry).await?;
    store.create_table(config.series).await?;

    let end = config.api.end_date()?;
    let mut start = config.api.start_date;
    if !full
        && let Some(latest) = store.latest_observation(config.series, &config.api.subba).await?
        && let Some(next) = latest.period.checked_add_days(Days::new(1))
        && next > start
    {
        println!("Latest stored day: {}", latest.period);
        start = next;
    }

    println!("Series: {} ({})", config.series, config.api.subba);
    println!("Range:  {} to {}", start, end);
    println!();

    if start > end {
        println!("Store is up to date.");
        store.close().await;
        return Ok(());
    }

    let query =
        DemandQuery::new(&config.api.subba, start, end).with_chunk_len(config.api.chunk_len);
    let records = client.fetch_all(&query).await?;
    println!("Fetched {} row(s)", records.len());

    let report = store.insert_records(config.series, &records).await?;
    store.close().await;

    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("{:<12} {:>10}", "Inserted", report.inserted);
    println!("{:<12} {:>10}", "Duplicates", report.duplicates);
    println!();
    Ok(())
}
