//! `kelly` command-line interface
//!
//! Loads a JSON scenario, derives asset statistics, solves the Kelly
//! allocation, simulates it against generated comparison portfolios, and
//! prints a report.

mod report;
mod scenario;

use clap::{Parser, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use kelly::{KellyError, PortfolioSet};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use scenario::{Scenario, ScenarioError};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
enum CliError {
    #[error("cannot read scenario file: {0}")]
    Io(#[from] std::io::Error),

    #[error("cannot parse scenario file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error(transparent)]
    Scenario(#[from] ScenarioError),

    #[error(transparent)]
    Kelly(#[from] KellyError),
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable report.
    Text,
    /// Full results as JSON.
    Json,
}

#[derive(Parser, Debug)]
#[command(
    name = "kelly",
    version,
    about = "Growth-optimal portfolio construction and simulation"
)]
struct Cli {
    /// Path to the JSON scenario file
    scenario: PathBuf,

    /// Report format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Override the scenario's trial count
    #[arg(long)]
    trials: Option<usize>,

    /// Override the scenario's base seed
    #[arg(long)]
    seed: Option<u64>,

    /// Override the number of generated comparison portfolios
    #[arg(long)]
    variants: Option<usize>,
}

fn main() {
    if let Err(err) = run(Cli::parse()) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let text = std::fs::read_to_string(&cli.scenario)?;
    let mut scenario: Scenario = serde_json::from_str(&text)?;
    if let Some(trials) = cli.trials {
        scenario.simulation.trials = trials;
    }
    if let Some(seed) = cli.seed {
        scenario.simulation.seed = seed;
    }
    if let Some(variants) = cli.variants {
        scenario.variants = variants;
    }

    let stats = scenario.asset_statistics()?;
    let allocation = kelly::optimize(&stats, scenario.long_only)?;

    let mut rng = ChaCha8Rng::seed_from_u64(scenario.simulation.seed);
    let set = PortfolioSet::with_generated_variants(
        allocation,
        scenario.long_only,
        scenario.variants,
        &mut rng,
    )
    .map_err(KellyError::from)?;

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner} simulating {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(format!(
        "{} portfolios × {} trials",
        set.len(),
        scenario.simulation.trials
    ));
    spinner.enable_steady_tick(Duration::from_millis(100));
    let results = kelly::simulate(&set, &stats, &scenario.simulation)?;
    spinner.finish_and_clear();

    match cli.format {
        OutputFormat::Text => {
            let names = scenario.asset_names(stats.n_assets());
            print!("{}", report::render(&set, &names, &results));
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&results)?);
        }
    }
    Ok(())
}
