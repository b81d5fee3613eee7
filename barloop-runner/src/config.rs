//! Serializable backtest configuration.
//!
//! A run is described by one TOML document:
//!
//! ```toml
//! symbols = ["SPY", "QQQ"]
//! start_date = "2020-01-02"
//! initial_capital = 100000.0
//!
//! [data]
//! type = "csv"
//! dir = "data"
//!
//! [strategy]
//! type = "lag_momentum"
//! warmup_bars = 5
//! lookback = 5
//! ```

use barloop_core::data::GapPolicy;
use barloop_core::engine::EngineConfig;
use barloop_core::performance::periods;
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Content hash of a [`BacktestConfig`].
pub type RunId = String;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Everything needed to reproduce one backtest.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BacktestConfig {
    /// Symbols to trade, in report order.
    pub symbols: Vec<String>,

    /// Rows before this date are discarded.
    pub start_date: NaiveDate,

    #[serde(default = "default_initial_capital")]
    pub initial_capital: f64,

    /// Pause after each tick. Zero for a full-speed backtest.
    #[serde(default)]
    pub heartbeat_secs: f64,

    #[serde(default)]
    pub gap_policy: GapPolicy,

    /// Periods per year for the Sharpe ratio.
    #[serde(default = "default_annualization")]
    pub annualization: f64,

    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub strategy: StrategyConfig,

    #[serde(default)]
    pub portfolio: PortfolioConfig,

    #[serde(default)]
    pub execution: ExecutionConfig,
}

fn default_initial_capital() -> f64 {
    100_000.0
}

fn default_annualization() -> f64 {
    periods::DAILY
}

/// Where bars come from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DataConfig {
    /// One `<symbol>.csv` per symbol under `dir`.
    Csv {
        #[serde(default = "default_data_dir")]
        dir: PathBuf,
    },
    /// Seeded random walk; results are tagged synthetic.
    Synthetic {
        /// Defaults to one year after the start date.
        #[serde(default)]
        end_date: Option<NaiveDate>,
        #[serde(default)]
        seed: u64,
    },
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

impl Default for DataConfig {
    fn default() -> Self {
        DataConfig::Csv {
            dir: default_data_dir(),
        }
    }
}

/// Which reference strategy drives the run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StrategyConfig {
    /// One LONG per symbol on its first real bar.
    #[default]
    BuyAndHold,

    /// Mean of lagged percent changes predicts the next move.
    LagMomentum {
        #[serde(default = "default_warmup_bars")]
        warmup_bars: u64,
        #[serde(default = "default_lookback")]
        lookback: usize,
    },
}

fn default_warmup_bars() -> u64 {
    5
}

fn default_lookback() -> usize {
    5
}

impl StrategyConfig {
    pub fn name(&self) -> &'static str {
        match self {
            StrategyConfig::BuyAndHold => "buy_and_hold",
            StrategyConfig::LagMomentum { .. } => "lag_momentum",
        }
    }

    pub fn lag_momentum() -> Self {
        StrategyConfig::LagMomentum {
            warmup_bars: default_warmup_bars(),
            lookback: default_lookback(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PortfolioConfig {
    /// Shares per opening order.
    #[serde(default = "default_order_quantity")]
    pub order_quantity: u64,
}

fn default_order_quantity() -> u64 {
    100
}

impl Default for PortfolioConfig {
    fn default() -> Self {
        Self {
            order_quantity: default_order_quantity(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExecutionConfig {
    /// Exchange label stamped on fills.
    #[serde(default = "default_exchange")]
    pub exchange: String,
}

fn default_exchange() -> String {
    barloop_core::execution::simulated::DEFAULT_EXCHANGE.to_string()
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            exchange: default_exchange(),
        }
    }
}

impl BacktestConfig {
    /// A config with every optional field at its default.
    pub fn new(symbols: Vec<String>, start_date: NaiveDate) -> Self {
        Self {
            symbols,
            start_date,
            initial_capital: default_initial_capital(),
            heartbeat_secs: 0.0,
            gap_policy: GapPolicy::default(),
            annualization: default_annualization(),
            data: DataConfig::default(),
            strategy: StrategyConfig::default(),
            portfolio: PortfolioConfig::default(),
            execution: ExecutionConfig::default(),
        }
    }

    /// Load a config from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse a config from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Reject configs that cannot produce a meaningful run.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));

        if self.symbols.is_empty() {
            return invalid("at least one symbol is required".into());
        }
        let mut seen = HashSet::new();
        for s in &self.symbols {
            if s.trim().is_empty() {
                return invalid("symbol names must not be blank".into());
            }
            if !seen.insert(s.as_str()) {
                return invalid(format!("symbol '{s}' is listed twice"));
            }
        }
        if !(self.initial_capital.is_finite() && self.initial_capital > 0.0) {
            return invalid(format!(
                "initial_capital must be positive, got {}",
                self.initial_capital
            ));
        }
        if self.heartbeat().is_none() {
            return invalid(format!(
                "heartbeat_secs must be zero or a positive duration, got {}",
                self.heartbeat_secs
            ));
        }
        if !(self.annualization.is_finite() && self.annualization > 0.0) {
            return invalid(format!(
                "annualization must be positive, got {}",
                self.annualization
            ));
        }
        if self.portfolio.order_quantity == 0 {
            return invalid("portfolio.order_quantity must be at least 1".into());
        }
        if let StrategyConfig::LagMomentum { lookback, .. } = self.strategy {
            if lookback == 0 {
                return invalid("strategy.lookback must be at least 1".into());
            }
        }
        if let DataConfig::Synthetic {
            end_date: Some(end),
            ..
        } = self.data
        {
            if end < self.start_date {
                return invalid(format!(
                    "data.end_date {end} is before start_date {}",
                    self.start_date
                ));
            }
        }
        Ok(())
    }

    /// Deterministic BLAKE3 hash of the canonical JSON form.
    ///
    /// Two configs with identical fields share a run id and therefore an
    /// artifact directory.
    pub fn run_id(&self) -> Result<RunId, ConfigError> {
        let json = serde_json::to_string(self)?;
        Ok(blake3::hash(json.as_bytes()).to_hex().to_string())
    }

    /// The knobs the tick loop reads.
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig::new(
            self.symbols.clone(),
            self.start_date.and_time(NaiveTime::default()),
        )
        .with_gap_policy(self.gap_policy)
        .with_heartbeat(self.heartbeat().unwrap_or_default())
    }

    /// `heartbeat_secs` as a `Duration`; `None` when negative, non-finite or
    /// too large to represent. `validate` rejects those values.
    fn heartbeat(&self) -> Option<Duration> {
        Duration::try_from_secs_f64(self.heartbeat_secs).ok()
    }

    pub fn is_synthetic(&self) -> bool {
        matches!(self.data, DataConfig::Synthetic { .. })
    }
}
