//! Predict command implementation.

use ampere::store::Store;
use ampere::traits::types::observations_to_frame;
use ampere::{AmpereConfig, ModelRegistry, pipeline};
use anyhow::{Result, anyhow};
use chrono::Days;

/// Predict the day after the latest stored observation with the
/// production model.
pub(crate) async fn predict(config: &AmpereConfig) -> Result<()> {
    println!("\n╔══════════════════════════════════════════════════════════════╗");
    println!("║                        Prediction                            ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    let registry = ModelRegistry::new(&config.tracking.root)?;
    let version = registry.production(&config.tracking.model_name)?;
    let (model, bundle) = pipeline::load_version(&version)?;

    let store = Store::connect(&config.database, config.retry).await?;
    let latest = store
        .latest_observation(config.series, &config.api.subba)
        .await?
        .ok_or_else(|| anyhow!("No stored observations for series '{}'", config.series))?;
    store.close().await;

    let frame = observations_to_frame(std::slice::from_ref(&latest))?;
    let prediction = pipeline::predict_one(&frame, &bundle, &model)?;
    let target = latest
        .period
        .checked_add_days(Days::new(1))
        .ok_or_else(|| anyhow!("Date overflow after {}", latest.period))?;

    println!("Model:      {} v{}", version.name, version.version);
    println!("Run:        {}", version.run_id);
    println!("Latest:     {} = {}", latest.period, latest.value);
    println!();
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("{:<12} {:>12.0}", target, prediction);
    println!();
    Ok(())
}
