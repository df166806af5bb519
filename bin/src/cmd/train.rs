//! Train command implementation.

use ampere::store::Store;
use ampere::traits::ModelConfig;
use ampere::{AmpereConfig, FileTracker, pipeline};
use anyhow::Result;

/// Train on the stored series and log the final fit as a tracked run.
pub(crate) async fn train(config: &AmpereConfig) -> Result<()> {
    println!("\n╔══════════════════════════════════════════════════════════════╗");
    println!("║                        Train Model                           ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    let store = Store::connect(&config.database, config.retry).await?;
    let raw = store.load_frame(config.series, &config.api.subba).await?;
    store.close().await;

    println!("Series:     {}", config.series);
    println!("Rows:       {}", raw.height());
    println!("Folds:      {}", config.training.n_splits);
    println!("Trials:     {}", config.hyperparameters.n_trials);
    match config.training.seed {
        Some(seed) => println!("Seed:       {}", seed),
        None => println!("Seed:       none (non-reproducible)"),
    }
    println!();

    let mut tracker = FileTracker::new(&config.tracking.root)?;
    let outcome = pipeline::train_flow(&raw, config, &mut tracker)?;

    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("BASELINE (all features + random_feature)");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n");
    println!("Mean train MAE: {:>10.2}", outcome.baseline.mean_train_mae);
    println!("Mean test MAE:  {:>10.2}", outcome.baseline.mean_test_mae);
    println!();
    println!("Dropped features:");
    for name in &outcome.dropped {
        println!("  {}", name);
    }
    println!();

    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("FINAL MODEL (run {})", outcome.run_id);
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n");
    for (name, value) in outcome.best_params.params() {
        println!("  {:<24} {}", name, value);
    }
    println!();
    println!(
        "{:<6} {:>10} {:>10} {:>12} {:>12}",
        "Fold", "Train", "Test", "Train MAE", "Test MAE"
    );
    println!("{}", "─".repeat(54));
    for fold in &outcome.final_report.folds {
        println!(
            "{:<6} {:>10} {:>10} {:>12.2} {:>12.2}",
            fold.fold,
            fold.split.train.len(),
            fold.split.test.len(),
            fold.train_mae,
            fold.test_mae
        );
    }
    println!("{}", "─".repeat(54));
    println!(
        "{:<6} {:>10} {:>10} {:>12.2} {:>12.2}",
        "Mean",
        "",
        "",
        outcome.final_report.mean_train_mae,
        outcome.final_report.mean_test_mae
    );
    println!();
    println!("Schema: {}", outcome.bundle.schema().join(", "));
    println!();
    Ok(())
}
