//! Barloop CLI: run and inspect commands.
//!
//! Commands:
//! - `run`: execute a backtest from a TOML config file and/or flags
//! - `inspect`: load a CSV directory and report per-symbol coverage

mod logging;

use anyhow::{bail, Context, Result};
use barloop_core::data::{load_aligned, CsvDirSource, GapPolicy};
use barloop_runner::{
    format_stats, run_backtest, save_artifacts, BacktestConfig, DataConfig, StrategyConfig,
};
use chrono::{NaiveDate, NaiveTime};
use clap::{Args, Parser, Subcommand, ValueEnum};
use logging::{init_logging, LogFormat};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "barloop", about = "Barloop: event-driven bar backtester")]
struct Cli {
    /// Log level used when RUST_LOG is not set.
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Log output format.
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a backtest from a TOML config file, flags, or both.
    Run(RunArgs),
    /// Load CSV data and report bar and gap counts per symbol.
    Inspect(InspectArgs),
}

#[derive(Args)]
struct RunArgs {
    /// Path to a TOML config file. Flags below override its fields.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Symbols to trade (e.g., SPY QQQ).
    #[arg(long, num_args = 1..)]
    symbols: Vec<String>,

    /// Directory holding one <SYMBOL>.csv per symbol.
    #[arg(long, conflicts_with = "synthetic")]
    data_dir: Option<PathBuf>,

    /// Start date (YYYY-MM-DD).
    #[arg(long)]
    start: Option<NaiveDate>,

    /// Initial capital.
    #[arg(long)]
    capital: Option<f64>,

    /// Pause after each tick, in seconds.
    #[arg(long)]
    heartbeat: Option<f64>,

    /// Reference strategy to run.
    #[arg(long, value_enum)]
    strategy: Option<StrategyArg>,

    /// Use seeded synthetic data instead of CSV files.
    #[arg(long, default_value_t = false)]
    synthetic: bool,

    /// Save report.json and equity.csv under <OUTPUT_DIR>/<run_id>/.
    #[arg(long)]
    output_dir: Option<PathBuf>,
}

#[derive(Args)]
struct InspectArgs {
    /// Directory holding one <SYMBOL>.csv per symbol.
    #[arg(long, default_value = "data")]
    data_dir: PathBuf,

    /// Symbols to load.
    #[arg(long, num_args = 1.., required = true)]
    symbols: Vec<String>,

    /// Ignore rows before this date (YYYY-MM-DD).
    #[arg(long)]
    start: Option<NaiveDate>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum StrategyArg {
    BuyAndHold,
    LagMomentum,
}

impl From<StrategyArg> for StrategyConfig {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::BuyAndHold => StrategyConfig::BuyAndHold,
            StrategyArg::LagMomentum => StrategyConfig::lag_momentum(),
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level, cli.log_format)?;

    match cli.command {
        Commands::Run(args) => run_cmd(args),
        Commands::Inspect(args) => inspect_cmd(args),
    }
}

fn run_cmd(args: RunArgs) -> Result<()> {
    let config = build_config(&args)?;
    let report = run_backtest(&config).context("backtest failed")?;

    println!("Run: {}", report.run_id);
    println!("Strategy: {}", report.strategy);
    if report.synthetic {
        println!("Data: SYNTHETIC");
    }
    println!("Ticks: {}", report.ticks);
    println!("{}", format_stats(&report.stats, &report.counters));
    if let Some(note) = &report.strategy_note {
        println!("{note}");
    }

    if let Some(dir) = &args.output_dir {
        let run_dir = save_artifacts(&report, dir)?;
        println!("Artifacts saved to: {}", run_dir.display());
    }
    Ok(())
}

/// Config file first, then flag overrides.
fn build_config(args: &RunArgs) -> Result<BacktestConfig> {
    let mut config = match &args.config {
        Some(path) => BacktestConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => {
            if args.symbols.is_empty() {
                bail!("--symbols is required without --config");
            }
            let Some(start) = args.start else {
                bail!("--start is required without --config");
            };
            BacktestConfig::new(args.symbols.clone(), start)
        }
    };

    if !args.symbols.is_empty() {
        config.symbols = args.symbols.clone();
    }
    if let Some(start) = args.start {
        config.start_date = start;
    }
    if let Some(dir) = &args.data_dir {
        config.data = DataConfig::Csv { dir: dir.clone() };
    }
    if args.synthetic && !config.is_synthetic() {
        config.data = DataConfig::Synthetic {
            end_date: None,
            seed: 0,
        };
    }
    if let Some(capital) = args.capital {
        config.initial_capital = capital;
    }
    if let Some(heartbeat) = args.heartbeat {
        config.heartbeat_secs = heartbeat;
    }
    if let Some(strategy) = args.strategy {
        config.strategy = strategy.into();
    }

    config.validate()?;
    tracing::debug!(
        symbols = ?config.symbols,
        strategy = config.strategy.name(),
        synthetic = config.is_synthetic(),
        "resolved run config"
    );
    Ok(config)
}

fn inspect_cmd(args: InspectArgs) -> Result<()> {
    let source = CsvDirSource::new(&args.data_dir);
    let start = args.start.unwrap_or(NaiveDate::MIN).and_time(NaiveTime::default());
    let aligned = load_aligned(&source, &args.symbols, start, GapPolicy::Void)
        .with_context(|| format!("loading data from {}", args.data_dir.display()))?;

    match (aligned.timeline.first(), aligned.timeline.last()) {
        (Some(first), Some(last)) => println!(
            "Timeline: {} .. {} ({} ticks)",
            first,
            last,
            aligned.timeline.len()
        ),
        _ => println!("Timeline: empty"),
    }
    println!("{:<10} {:>8} {:>8} {:>8}", "symbol", "bars", "void", "void%");
    for (i, symbol) in aligned.symbols.iter().enumerate() {
        let voids = aligned.void_counts[i];
        println!(
            "{:<10} {:>8} {:>8} {:>7.1}%",
            symbol,
            aligned.timeline.len() - voids,
            voids,
            aligned.void_rate(i) * 100.0
        );
    }
    Ok(())
}
