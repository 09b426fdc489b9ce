//! Survival Simulation Driver
//!
//! Runs one simulation with the offline seeded provider, writes the JSONL run
//! log and prints the run's metrics.

use clap::Parser;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use survival_core::{load_config, validate, GameEngine, JsonlLogger, SeededProvider};
use survival_events::{ExperimentCondition, ResourceScenario, RunConfig, RunMetrics};
use tracing_subscriber::EnvFilter;

/// Command line arguments for the simulation
#[derive(Parser, Debug)]
#[command(name = "survival_sim")]
#[command(about = "Turn-based survival simulation with hormone-modulated agents")]
struct Args {
    /// TOML configuration file
    #[arg(long, conflicts_with_all = ["scenario", "condition"])]
    config: Option<PathBuf>,

    /// Resource scenario preset (low, medium, high)
    #[arg(long, default_value = "medium")]
    scenario: String,

    /// Experiment condition preset (baseline, full_model, ...)
    #[arg(long, default_value = "baseline")]
    condition: String,

    /// Random seed for reproducibility
    #[arg(long)]
    seed: Option<u64>,

    /// Number of turns to simulate
    #[arg(long)]
    turns: Option<u32>,

    /// Where to write the JSONL run log
    #[arg(long, default_value = "output/run.jsonl")]
    output: PathBuf,
}

fn build_config(args: &Args) -> Result<RunConfig, String> {
    let mut config = match &args.config {
        Some(path) => load_config(path).map_err(|e| e.to_string())?,
        None => {
            let scenario = args.scenario.parse::<ResourceScenario>()?;
            let condition = args.condition.parse::<ExperimentCondition>()?;
            RunConfig::preset(scenario, condition)
        }
    };
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    if let Some(turns) = args.turns {
        config.max_turns = turns;
    }
    validate(&config).map_err(|e| e.to_string())?;
    Ok(config)
}

fn print_metrics(metrics: &RunMetrics, output: &Path) {
    println!();
    println!("Run complete");
    println!("============");
    println!("Run id: {}", metrics.run_id);
    println!("Experiment: {} / {}", metrics.experiment, metrics.scenario);
    println!("Turns played: {}", metrics.turns_played);
    println!(
        "Survivors: {}/{} ({:.0}%)",
        metrics.survivors,
        metrics.total_agents,
        metrics.survival_rate * 100.0
    );
    println!(
        "Average survival duration: {:.2} turns",
        metrics.average_survival_duration
    );
    println!("Cooperation count: {}", metrics.cooperation_count);
    println!("Transgression count: {}", metrics.transgression_count);
    println!("Sociability index: {:.2}", metrics.sociability_index);
    println!("Power drawn: {:.1}", metrics.power_drawn);
    println!("Power tapped: {:.1}", metrics.power_tapped);
    println!(
        "Average hormones: cortisol {:.2}, endorphin {:.2}",
        metrics.avg_cortisol, metrics.avg_endorphin
    );
    println!("Decision failures: {}", metrics.decision_failures);
    println!("Log written to {}", output.display());
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();

    let args = Args::parse();
    let config = match build_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    println!("Survival Simulation");
    println!("===================");
    println!("Experiment: {}", config.experiment.name);
    println!("Scenario: {}", config.scenario.name());
    println!("Seed: {}", config.seed);
    println!("Turns: {}", config.max_turns);
    println!("Agents: {}", config.agents.ids.join(", "));

    let logger = match JsonlLogger::new(&args.output) {
        Ok(logger) => logger,
        Err(e) => {
            eprintln!("Could not open {}: {}", args.output.display(), e);
            return ExitCode::FAILURE;
        }
    };

    let provider = SeededProvider::from_config(&config);
    let engine = match GameEngine::new(config, provider) {
        Ok(engine) => engine.with_sink(logger),
        Err(e) => {
            eprintln!("Could not start the run: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match engine.run().await {
        Ok(log) => {
            print_metrics(&RunMetrics::from_log(&log), &args.output);
            ExitCode::SUCCESS
        }
        Err(failure) => {
            eprintln!("Run aborted: {}", failure);
            print_metrics(&RunMetrics::from_log(&failure.partial_log), &args.output);
            ExitCode::FAILURE
        }
    }
}
