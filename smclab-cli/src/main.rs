//! SMC Lab CLI — run backtests and inspect key levels.
//!
//! Commands:
//! - `run` — replay candles through the smart-money strategy and save artifacts
//! - `levels` — replay candles and print the final key-level cache per timeframe

use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand};
use smclab_core::{StrategyConfig, Timeframe};
use smclab_runner::{
    run_backtest, save_artifacts, BacktestConfig, BacktestResult, DataSpec, RunSettings,
};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "smclab", about = "SMC Lab CLI — smart-money key-level backtester")]
struct Cli {
    /// Log at debug level (overridden by RUST_LOG).
    #[arg(long, short, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay candles through the strategy and save the artifact set.
    Run {
        #[command(flatten)]
        input: InputArgs,

        /// Output directory for artifacts. Overrides the config file.
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Replay candles and print the key levels left in each timeframe's cache.
    Levels {
        #[command(flatten)]
        input: InputArgs,

        /// Only print levels that are still active.
        #[arg(long, default_value_t = false)]
        active_only: bool,

        /// Print the levels as JSON instead of a table.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

/// Where candles come from and which detectors run.
#[derive(Args)]
struct InputArgs {
    /// Path to a TOML config file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Candle CSV for a single-timeframe run.
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Timeframe of the CSV (1m, 5m, 15m, 1h, 4h, 1d).
    #[arg(long, default_value = "1d")]
    timeframe: Timeframe,

    /// Use synthetic candles when the CSV is missing or empty.
    #[arg(long, default_value_t = false)]
    synthetic: bool,

    /// Number of synthetic candles per timeframe.
    #[arg(long, default_value_t = 500)]
    synthetic_candles: usize,

    /// Record fair value gaps.
    #[arg(long, default_value_t = false)]
    detect_fvg: bool,

    /// Record order blocks.
    #[arg(long, default_value_t = false)]
    detect_order_blocks: bool,

    /// Record market structure breaks.
    #[arg(long, default_value_t = false)]
    detect_structure_breaks: bool,

    /// Replay timeframes one after another instead of on the thread pool.
    #[arg(long, default_value_t = false)]
    sequential: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Run { input, output_dir } => run_backtest_cmd(input, output_dir),
        Commands::Levels {
            input,
            active_only,
            json,
        } => run_levels_cmd(input, active_only, json),
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "smclab=debug,smclab_core=debug,smclab_runner=debug"
    } else {
        "smclab=info,smclab_core=info,smclab_runner=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn run_backtest_cmd(input: InputArgs, output_dir: Option<PathBuf>) -> Result<()> {
    let mut config = build_config(&input)?;
    if let Some(dir) = output_dir {
        config.run.output_dir = dir;
    }

    let result = run_backtest(&config, None)?;
    print_summary(&result);

    // Save full artifact set (manifest.json, trades.csv, levels.csv, report.md)
    let run_dir = save_artifacts(&result, &config.run.output_dir)?;
    println!("Artifacts saved to: {}", run_dir.display());

    Ok(())
}

fn run_levels_cmd(input: InputArgs, active_only: bool, json: bool) -> Result<()> {
    let config = build_config(&input)?;
    let result = run_backtest(&config, None)?;

    if json {
        let levels: Vec<_> = result
            .timeframes
            .iter()
            .flat_map(|tf| tf.key_levels.iter())
            .filter(|level| level.active || !active_only)
            .collect();
        println!("{}", serde_json::to_string_pretty(&levels)?);
        return Ok(());
    }

    for tf in &result.timeframes {
        println!();
        println!(
            "=== {} ({} levels, {} active) ===",
            tf.timeframe,
            tf.key_levels.len(),
            tf.active_levels()
        );
        println!("{:<36} {:<12} {:<7} {}", "Name", "Type", "Active", "Detail");
        println!("{}", "-".repeat(80));
        for level in tf.key_levels.iter().filter(|level| level.active || !active_only) {
            println!(
                "{:<36} {:<12} {:<7} {}",
                level.name,
                level.level_type().as_str(),
                if level.active { "yes" } else { "no" },
                level.kind
            );
        }
    }
    print_failures(&result);

    Ok(())
}

/// Build a config from `--config`, or from the single-CSV flags.
///
/// Detector flags and `--sequential` are applied on top of a config file.
fn build_config(input: &InputArgs) -> Result<BacktestConfig> {
    if input.config.is_some() && input.csv.is_some() {
        bail!("--config and --csv are mutually exclusive");
    }

    let mut config = if let Some(path) = &input.config {
        BacktestConfig::from_file(path)?
    } else {
        if input.csv.is_none() && !input.synthetic {
            bail!("one of --config, --csv or --synthetic is required");
        }
        BacktestConfig {
            data: vec![DataSpec {
                path: input.csv.clone(),
                timeframe: input.timeframe,
            }],
            strategy: StrategyConfig::default(),
            run: RunSettings {
                synthetic: input.synthetic,
                synthetic_candles: input.synthetic_candles,
                ..RunSettings::default()
            },
        }
    };

    config.strategy.detect_fvg |= input.detect_fvg;
    config.strategy.detect_order_blocks |= input.detect_order_blocks;
    config.strategy.detect_structure_breaks |= input.detect_structure_breaks;
    if input.sequential {
        config.run.parallel = false;
    }

    config.validate()?;
    Ok(config)
}

fn print_summary(result: &BacktestResult) {
    println!();
    println!("=== Backtest Result ===");
    println!("Timeframes:     {}", result.timeframes.len());
    println!("Candles:        {}", result.candle_count());
    println!("Trades:         {}", result.trade_count());
    println!("Config Hash:    {}", result.config_hash);
    println!("Dataset Hash:   {}", result.dataset_hash);
    println!();
    println!("--- Per Timeframe ---");
    println!(
        "{:<6} {:<10} {:>8} {:>8} {:>8} {:>8}",
        "TF", "Source", "Candles", "Skipped", "Levels", "Trades"
    );
    for tf in &result.timeframes {
        println!(
            "{:<6} {:<10} {:>8} {:>8} {:>8} {:>8}",
            tf.timeframe.label(),
            tf.source.to_string(),
            tf.candle_count,
            tf.skipped_rows,
            tf.active_levels(),
            tf.trades.len()
        );
    }
    print_failures(result);
    if result.has_synthetic {
        println!();
        println!("WARNING: Results based on SYNTHETIC data");
    }
}

fn print_failures(result: &BacktestResult) {
    for failure in &result.failures {
        println!("FAILED {}: {}", failure.timeframe, failure.error);
    }
}
