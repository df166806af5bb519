//! Ampere CLI binary.
//!
//! Provides the command-line interface for the Ampere forecasting pipeline.

mod cmd;

use ampere::AmpereConfig;
use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ampere")]
#[command(about = "Electricity demand forecasting pipeline", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file
    #[arg(short, long, global = true, default_value = "ampere.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch demand from the EIA API into the store
    Fetch {
        /// Start date (YYYY-MM-DD), overrides the configuration
        #[arg(long)]
        start: Option<String>,

        /// End date (YYYY-MM-DD or "today"), overrides the configuration
        #[arg(long)]
        end: Option<String>,

        /// Refetch the whole range instead of resuming after the latest stored day
        #[arg(long)]
        full: bool,
    },

    /// Train, tune and track a model on the stored series
    Train {
        /// Number of tuning trials, overrides the configuration
        #[arg(short = 'n', long)]
        trials: Option<usize>,

        /// Seed, overrides the configuration
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Register the best tracked run and promote it to production
    Register {
        /// Register without promoting
        #[arg(long)]
        no_promote: bool,
    },

    /// Predict the day after the latest stored observation
    Predict,

    /// List known series
    Series,
}

#[tokio::main]
async fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Fetch { start, end, full } => {
            let mut config = load_config(&cli.config)?;
            if let Some(start) = start {
                config.api.start_date = cmd::fetch::parse_date(&start)?;
            }
            if let Some(end) = end {
                config.api.end_date = end;
            }
            config.validate()?;
            cmd::fetch::fetch(&config, full).await?;
        }
        Commands::Train { trials, seed } => {
            let mut config = load_config(&cli.config)?;
            if let Some(trials) = trials {
                config.hyperparameters.n_trials = trials;
            }
            if seed.is_some() {
                config.training.seed = seed;
            }
            config.validate()?;
            cmd::train::train(&config).await?;
        }
        Commands::Register { no_promote } => {
            let config = load_config(&cli.config)?;
            cmd::register::register(&config, !no_promote)?;
        }
        Commands::Predict => {
            let config = load_config(&cli.config)?;
            cmd::predict::predict(&config).await?;
        }
        Commands::Series => {
            cmd::series::list_series();
        }
    }

    Ok(())
}

fn load_config(path: &Path) -> Result<AmpereConfig> {
    Ok(AmpereConfig::load(path)?)
}
