//! Self-play robot learning CLI.
//!
//! - `run`            -- Run the learning loop against the mock simulator
//! - `default-config` -- Print the default configuration as JSON
//! - `inspect`        -- Summarize a saved results file

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use selfplay::config::SelfPlayConfig;
use selfplay::env::MockSimulator;
use selfplay::model::MockFoundationModel;
use selfplay::selection::{ControllerSelectionMode, TaskSelectionMode};
use selfplay::training::{EpisodeResult, LearningLoop};

// ---------------------------------------------------------------------------
// CLI definition
// ---------------------------------------------------------------------------

/// Self-play task proposal and controller learning in simulation.
#[derive(Parser)]
#[command(name = "selfplay", version, about)]
struct Cli {
    /// Path to a JSON configuration file (uses defaults if not provided).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Debug, clap::ValueEnum)]
enum TaskModeArg {
    Sequential,
    Random,
    Difficulty,
}

impl From<TaskModeArg> for TaskSelectionMode {
    fn from(arg: TaskModeArg) -> Self {
        match arg {
            TaskModeArg::Sequential => Self::Sequential,
            TaskModeArg::Random => Self::Random,
            TaskModeArg::Difficulty => Self::Difficulty,
        }
    }
}

#[derive(Clone, Debug, clap::ValueEnum)]
enum ControllerModeArg {
    Sequential,
    Random,
    MatchTask,
}

impl From<ControllerModeArg> for ControllerSelectionMode {
    fn from(arg: ControllerModeArg) -> Self {
        match arg {
            ControllerModeArg::Sequential => Self::Sequential,
            ControllerModeArg::Random => Self::Random,
            ControllerModeArg::MatchTask => Self::MatchTask,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run the learning loop with the mock simulator and generator.
    Run {
        /// Number of episodes (defaults to the configured maximum).
        #[arg(long)]
        episodes: Option<usize>,

        /// Seed for every random choice the generator makes.
        #[arg(long)]
        seed: Option<u64>,

        /// Task selection mode.
        #[arg(long)]
        task_mode: Option<TaskModeArg>,

        /// Controller selection mode.
        #[arg(long)]
        controller_mode: Option<ControllerModeArg>,

        /// Bandit learning rate.
        #[arg(long)]
        learning_rate: Option<f64>,

        /// Path to save episode results.
        #[arg(long, default_value = "data/results.json")]
        output: PathBuf,
    },

    /// Print the default configuration as JSON.
    DefaultConfig,

    /// Summarize a saved results file.
    Inspect {
        /// Path to the results JSON file.
        #[arg(default_value = "data/results.json")]
        path: PathBuf,
    },
}

// ---------------------------------------------------------------------------
// Entrypoint
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let config = match &cli.config {
        Some(path) => SelfPlayConfig::load_from_file(path)?,
        None => SelfPlayConfig::default(),
    };

    match cli.command {
        Commands::Run {
            episodes,
            seed,
            task_mode,
            controller_mode,
            learning_rate,
            output,
        } => {
            let mut config = config;
            if let Some(seed) = seed {
                config.groot_n1.seed = Some(seed);
            }
            if let Some(mode) = task_mode {
                config.groot_n1.task_selection_mode = mode.into();
            }
            if let Some(mode) = controller_mode {
                config.groot_n1.controller_selection_mode = mode.into();
            }
            if let Some(lr) = learning_rate {
                config.learning.learning_rate = lr;
            }
            config.validate().context("Invalid configuration")?;
            cmd_run(&config, episodes, &output).await
        }
        Commands::DefaultConfig => {
            println!("{}", serde_json::to_string_pretty(&SelfPlayConfig::default())?);
            Ok(())
        }
        Commands::Inspect { path } => cmd_inspect(&path),
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_run(config: &SelfPlayConfig, episodes: Option<usize>, output: &Path) -> Result<()> {
    tracing::info!(
        task_mode = %config.groot_n1.task_selection_mode,
        controller_mode = %config.groot_n1.controller_selection_mode,
        "Starting self-play run"
    );

    let sim = match config.groot_n1.seed {
        Some(seed) => MockSimulator::with_seed(config.simulation.clone(), seed),
        None => MockSimulator::new(config.simulation.clone()),
    };
    let model = MockFoundationModel::from_config(config)?;
    let mut learning_loop = LearningLoop::new(config, sim, model);

    let results = learning_loop.run(episodes).await;
    let summary = learning_loop.model().engine().summary();
    learning_loop.close().await;

    tracing::info!(
        episodes = results.len(),
        weights = ?summary.weights,
        affinity = ?summary.task_type_controllers,
        "Selection state after run"
    );

    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let json = serde_json::to_string_pretty(&results)?;
    std::fs::write(output, json)
        .with_context(|| format!("Failed to write results to {}", output.display()))?;

    tracing::info!(path = %output.display(), count = results.len(), "Saved episode results");
    Ok(())
}

fn cmd_inspect(path: &Path) -> Result<()> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let results: Vec<EpisodeResult> =
        serde_json::from_str(&text).context("Failed to parse episode results")?;

    println!("Results: {}", path.display());
    println!("  Episodes: {}", results.len());
    if results.is_empty() {
        return Ok(());
    }

    let successes = results.iter().filter(|r| r.execution.success).count();
    let mean_reward = results.iter().map(|r| r.reward).sum::<f64>() / results.len() as f64;
    println!(
        "  Success rate: {:.1}%",
        successes as f64 / results.len() as f64 * 100.0
    );
    println!("  Mean reward: {mean_reward:.3}");
    if let Some(last) = results.last() {
        println!("  Final difficulty: {}", last.difficulty_after);
    }
    println!();

    let mut by_type: BTreeMap<&str, (usize, usize)> = BTreeMap::new();
    for r in &results {
        let entry = by_type.entry(r.task.task_type.as_str()).or_default();
        entry.0 += 1;
        if r.execution.success {
            entry.1 += 1;
        }
    }
    println!("By task type:");
    for (task_type, (total, ok)) in &by_type {
        println!("  {task_type}: {ok}/{total} succeeded");
    }
    println!();

    println!("Last episodes:");
    for r in results.iter().rev().take(10).rev() {
        println!(
            "  #{:<4} {:<16} {:<7} reward {:>6.3}  score {:.2}",
            r.episode,
            r.task.task_type,
            if r.execution.success { "ok" } else { "failed" },
            r.reward,
            r.evaluation.score
        );
    }

    Ok(())
}
