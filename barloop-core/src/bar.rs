//! Bar: the fundamental market data unit.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// OHLCV bar plus adjusted close for one symbol at one timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
    pub adj_close: f64,
}

impl Bar {
    /// A gap slot: the symbol has no row at this timeline timestamp.
    pub fn void(timestamp: NaiveDateTime) -> Self {
        Self {
            timestamp,
            open: f64::NAN,
            high: f64::NAN,
            low: f64::NAN,
            close: f64::NAN,
            volume: 0,
            adj_close: f64::NAN,
        }
    }

    /// A gap slot that repeats a previous close in every price field.
    pub fn carried(timestamp: NaiveDateTime, prev: &Bar) -> Self {
        Self {
            timestamp,
            open: prev.close,
            high: prev.close,
            low: prev.close,
            close: prev.close,
            volume: 0,
            adj_close: prev.adj_close,
        }
    }

    /// Returns true if any price field is NaN (void bar).
    pub fn is_void(&self) -> bool {
        self.open.is_nan()
            || self.high.is_nan()
            || self.low.is_nan()
            || self.close.is_nan()
            || self.adj_close.is_nan()
    }

    /// Numeric projection onto one field.
    pub fn value(&self, field: BarField) -> f64 {
        match field {
            BarField::Open => self.open,
            BarField::High => self.high,
            BarField::Low => self.low,
            BarField::Close => self.close,
            BarField::Volume => self.volume as f64,
            BarField::AdjClose => self.adj_close,
        }
    }
}

/// Selects one numeric column of a bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BarField {
    Open,
    High,
    Low,
    Close,
    Volume,
    AdjClose,
}

impl BarField {
    pub const ALL: [BarField; 6] = [
        BarField::Open,
        BarField::High,
        BarField::Low,
        BarField::Close,
        BarField::Volume,
        BarField::AdjClose,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BarField::Open => "open",
            BarField::High => "high",
            BarField::Low => "low",
            BarField::Close => "close",
            BarField::Volume => "volume",
            BarField::AdjClose => "adj_close",
        }
    }
}

impl fmt::Display for BarField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BarField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "open" => Ok(BarField::Open),
            "high" => Ok(BarField::High),
            "low" => Ok(BarField::Low),
            "close" => Ok(BarField::Close),
            "volume" => Ok(BarField::Volume),
            "adj_close" | "adjusted_close" | "adj close" => Ok(BarField::AdjClose),
            other => Err(format!("unknown bar field '{other}'")),
        }
    }
}
