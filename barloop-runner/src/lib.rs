//! Barloop Runner: run configuration, data resolution, reference components, export.
//!
//! This crate builds on `barloop-core` to provide:
//! - TOML run configuration with content-hashed run ids
//! - CSV or seeded synthetic bar sources
//! - A fixed-quantity reference portfolio with holdings and equity curve
//! - Buy-and-hold and lagged-momentum reference strategies
//! - The single-run driver and its JSON/CSV artifacts

pub mod config;
pub mod data_loader;
pub mod export;
pub mod portfolio;
pub mod runner;
pub mod strategy;

pub use config::{BacktestConfig, ConfigError, DataConfig, RunId, StrategyConfig};
pub use data_loader::{generate_synthetic_bars, resolve_source, SyntheticSource};
pub use export::{export_equity_csv, export_json, save_artifacts};
pub use portfolio::{HoldingsRow, NaivePortfolio};
pub use runner::{format_stats, run_backtest, run_backtest_with_source, BacktestReport, RunError};
pub use strategy::{build_strategy, BuyAndHold, LagMomentum};
