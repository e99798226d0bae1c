use anyhow::Context;
use clap::Parser;
use folio_gym::cli::{self, Cli, Commands, OutputMode};
use folio_gym::config::{AppConfig, LoggingConfig};
use tracing::info;

mod main_runtime;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Sample {
            assets,
            rows,
            seed,
            volatility,
            out,
        } => {
            let _guard = main_runtime::init_logging(&LoggingConfig::default());
            cli::run_sample(&assets, rows, seed, volatility, &out)?;
            println!("Wrote {} assets x {} rows to {}", assets.len(), rows, out.display());
        }
        Commands::Simulate {
            data,
            config,
            episodes,
            policy,
            seed,
            json,
        } => {
            let mut app = AppConfig::load_from(&config)
                .with_context(|| format!("loading config from {}", config.display()))?;
            let _guard = main_runtime::init_logging(&app.logging);

            if let Some(episodes) = episodes {
                app.simulation.episodes = episodes;
            }
            if let Some(policy) = policy {
                app.simulation.policy = policy;
            }
            if let Some(seed) = seed {
                app.simulation.seed = seed;
            }

            let data_path = data
                .or_else(|| app.simulation.data_path.clone())
                .context("no feature table given: pass --data or set simulation.data_path")?;

            info!(
                data = %data_path.display(),
                episodes = app.simulation.episodes,
                policy = %app.simulation.policy,
                "Starting simulation"
            );

            let summaries = cli::run_simulate(&app, &data_path)?;
            cli::print_items(&summaries, OutputMode::from_json_flag(json))?;
        }
    }

    Ok(())
}
