//! Register command implementation.

use ampere::{AmpereConfig, ModelRegistry, Stage};
use anyhow::{Result, anyhow};

/// Register the best finished run and optionally promote it.
pub(crate) fn register(config: &AmpereConfig, promote: bool) -> Result<()> {
    println!("\n╔══════════════════════════════════════════════════════════════╗");
    println!("║                      Register Model                          ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    let tracking = &config.tracking;
    let registry = ModelRegistry::new(&tracking.root)?;
    let best = registry
        .search_best(&tracking.experiment, &tracking.metric)?
        .ok_or_else(|| {
            anyhow!(
                "No finished run of '{}' logged '{}'",
                tracking.experiment,
                tracking.metric
            )
        })?;

    println!("Experiment: {}", tracking.experiment);
    println!("Best run:   {}", best.meta.run_id);
    if let Some(value) = best.final_metric(&tracking.metric) {
        println!("{:<11} {:.2}", format!("{}:", tracking.metric), value);
    }
    println!();

    let mut version = registry.register(&tracking.model_name, &best)?;
    if promote {
        version = registry.promote(&tracking.model_name, version.version, Stage::Production)?;
    }

    println!("Model:      {}", version.name);
    println!("Version:    {}", version.version);
    println!("Stage:      {}", version.stage);
    println!();
    Ok(())
}
