//! Backtest runner: wires source, stream, strategy, portfolio and simulator.
//!
//! Two entry points:
//! - `run_backtest()`: resolves the data source from the config. Used by the CLI.
//! - `run_backtest_with_source()`: takes any `BarSource`. Used by tests and embedders.

use barloop_core::data::BarSource;
use barloop_core::engine::{Backtest, Portfolio, RunCounters};
use barloop_core::error::{BoxError, EngineError};
use barloop_core::execution::{ExecutionHandler, SimulatedExecution};
use barloop_core::performance::{EquityPoint, SummaryStats};
use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;

use crate::config::{BacktestConfig, ConfigError, RunId};
use crate::data_loader::resolve_source;
use crate::portfolio::NaivePortfolio;
use crate::strategy::build_strategy;

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),
}

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

/// Complete result of one backtest run.
#[derive(Debug, Clone, Serialize)]
pub struct BacktestReport {
    pub schema_version: u32,
    pub run_id: RunId,
    pub symbols: Vec<String>,
    pub start_date: NaiveDate,
    pub initial_capital: f64,
    pub strategy: String,
    pub synthetic: bool,
    pub ticks: u64,
    pub counters: RunCounters,
    pub stats: SummaryStats,
    pub equity_curve: Vec<EquityPoint>,
    pub strategy_note: Option<String>,
}

/// Run a backtest, reading bars from wherever the config points.
pub fn run_backtest(config: &BacktestConfig) -> Result<BacktestReport, RunError> {
    config.validate()?;
    let source = resolve_source(&config.data, config.start_date);
    run_backtest_with_source(config, source.as_ref())
}

/// Run a backtest over bars from `source`, ignoring the config's `[data]` table.
pub fn run_backtest_with_source(
    config: &BacktestConfig,
    source: &dyn BarSource,
) -> Result<BacktestReport, RunError> {
    config.validate()?;
    let run_id = config.run_id()?;
    tracing::info!(
        run_id = %run_id,
        strategy = config.strategy.name(),
        symbols = ?config.symbols,
        "starting backtest"
    );

    let mut backtest = Backtest::assemble(
        config.engine_config(),
        source,
        |_| build_strategy(&config.strategy).map_err(BoxError::from),
        |bars| {
            Ok(Box::new(NaivePortfolio::new(
                bars.symbols(),
                config.initial_capital,
                config.portfolio.order_quantity,
            )) as Box<dyn Portfolio>)
        },
        || {
            Ok(Box::new(SimulatedExecution::new(config.execution.exchange.as_str()))
                as Box<dyn ExecutionHandler>)
        },
    )?;
    let summary = backtest.run()?;

    let stats = backtest.portfolio().summary_stats(config.annualization);
    let equity_curve = backtest.portfolio().equity_curve();
    log_stats(&stats, &summary.counters);

    Ok(BacktestReport {
        schema_version: SCHEMA_VERSION,
        run_id,
        symbols: config.symbols.clone(),
        start_date: config.start_date,
        initial_capital: config.initial_capital,
        strategy: config.strategy.name().to_string(),
        synthetic: config.is_synthetic(),
        ticks: summary.ticks,
        counters: summary.counters,
        stats,
        equity_curve,
        strategy_note: backtest.strategy().note(),
    })
}

/// The statistics block, one line per figure.
pub fn format_stats(stats: &SummaryStats, counters: &RunCounters) -> String {
    [
        format!("Total Return: {:.2}%", stats.total_return * 100.0),
        format!("Sharpe Ratio: {:.2}", stats.sharpe_ratio),
        format!("Max Drawdown: {:.2}%", stats.max_drawdown * 100.0),
        format!("Drawdown Duration: {}", stats.drawdown_duration),
        format!("Length of Series: {}", stats.length_of_series),
        format!("Signals: {}", counters.signals),
        format!("Orders: {}", counters.orders),
        format!("Fills: {}", counters.fills),
    ]
    .join("\n")
}

fn log_stats(stats: &SummaryStats, counters: &RunCounters) {
    tracing::info!(
        total_return = stats.total_return,
        sharpe_ratio = stats.sharpe_ratio,
        max_drawdown = stats.max_drawdown,
        drawdown_duration = stats.drawdown_duration,
        length_of_series = stats.length_of_series,
        signals = counters.signals,
        orders = counters.orders,
        fills = counters.fills,
        "performance summary"
    );
}
