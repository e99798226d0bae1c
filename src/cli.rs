//! Command-line interface for the `folio-gym` binary.
//!
//! Results print as a table by default or as JSON with `--json`.

use anyhow::Context;
use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tabled::{Table, Tabled};
use tracing::info;

use crate::config::AppConfig;
use crate::domain::MarketData;
use crate::rl::environment::{generate_sample_data_with, TradingEnvironment, DEFAULT_VOLATILITY};
use crate::runner::{self, EpisodeSummary, PolicyKind};

#[derive(Parser)]
#[command(name = "folio-gym")]
#[command(version)]
#[command(about = "Portfolio allocation environment for reinforcement learning", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a synthetic feature table
    Sample {
        /// Comma-separated asset symbols
        #[arg(long, value_delimiter = ',', default_value = "AAA,BBB")]
        assets: Vec<String>,
        /// Rows per asset
        #[arg(long, default_value = "500")]
        rows: usize,
        /// Random seed
        #[arg(long, default_value = "42")]
        seed: u64,
        /// Per-bar return half-range
        #[arg(long, default_value_t = DEFAULT_VOLATILITY)]
        volatility: f64,
        /// Output JSON file
        #[arg(long)]
        out: PathBuf,
    },
    /// Run episodes with a reference policy
    Simulate {
        /// Feature table (overrides `simulation.data_path`)
        #[arg(long)]
        data: Option<PathBuf>,
        /// Config directory
        #[arg(short, long, default_value = "config")]
        config: PathBuf,
        /// Number of episodes (overrides config)
        #[arg(long)]
        episodes: Option<usize>,
        /// Policy: equal, cash or random (overrides config)
        #[arg(long)]
        policy: Option<PolicyKind>,
        /// Seed for the random policy (overrides config)
        #[arg(long)]
        seed: Option<u64>,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

/// Output mode for command results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Table,
    Json,
}

impl OutputMode {
    pub fn from_json_flag(json: bool) -> Self {
        if json {
            OutputMode::Json
        } else {
            OutputMode::Table
        }
    }
}

/// Print a vec of Tabled + Serialize items in the chosen mode.
pub fn print_items<T: Tabled + Serialize>(items: &[T], mode: OutputMode) -> anyhow::Result<()> {
    match mode {
        OutputMode::Table => {
            if items.is_empty() {
                println!("(no results)");
            } else {
                let table = Table::new(items).to_string();
                println!("{table}");
            }
        }
        OutputMode::Json => {
            let json = serde_json::to_string_pretty(items)?;
            println!("{json}");
        }
    }
    Ok(())
}

/// Generate a sample table and write it to `out`
pub fn run_sample(
    assets: &[String],
    rows: usize,
    seed: u64,
    volatility: f64,
    out: &Path,
) -> anyhow::Result<()> {
    let data = generate_sample_data_with(assets, rows, seed, volatility)?;
    std::fs::write(out, data.to_json_pretty()?)
        .with_context(|| format!("writing {}", out.display()))?;

    info!(
        assets = assets.len(),
        rows,
        seed,
        path = %out.display(),
        "Sample data written"
    );
    Ok(())
}

/// Run the configured episodes over the table at `data_path`
pub fn run_simulate(app: &AppConfig, data_path: &Path) -> anyhow::Result<Vec<EpisodeSummary>> {
    let data = MarketData::load(data_path)
        .with_context(|| format!("loading {}", data_path.display()))?;
    let mut env = TradingEnvironment::new(Arc::new(data), app.env.clone())?;
    let mut rng = StdRng::seed_from_u64(app.simulation.seed);

    Ok(runner::run_episodes(
        &mut env,
        app.simulation.episodes,
        app.simulation.policy,
        &mut rng,
    )?)
}
