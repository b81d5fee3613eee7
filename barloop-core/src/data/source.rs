//! Bar source trait and an in-memory implementation.
//!
//! The BarSource trait abstracts over where a symbol's history lives (a CSV
//! directory, generated data, a map in a test) so the stream never cares.

use crate::bar::Bar;
use crate::error::DataLoadError;
use std::collections::HashMap;
use std::path::PathBuf;

/// Supplies one symbol's full, possibly unsorted, bar history.
pub trait BarSource {
    /// Human-readable name of this source.
    fn name(&self) -> &str;

    /// Load every bar available for `symbol`. Order is not significant.
    fn load(&self, symbol: &str) -> Result<Vec<Bar>, DataLoadError>;
}

/// Bars held in memory, keyed by symbol.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    bars: HashMap<String, Vec<Bar>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_symbol(mut self, symbol: impl Into<String>, bars: Vec<Bar>) -> Self {
        self.insert(symbol, bars);
        self
    }

    pub fn insert(&mut self, symbol: impl Into<String>, bars: Vec<Bar>) {
        self.bars.insert(symbol.into(), bars);
    }
}

impl BarSource for MemorySource {
    fn name(&self) -> &str {
        "memory"
    }

    fn load(&self, symbol: &str) -> Result<Vec<Bar>, DataLoadError> {
        self.bars
            .get(symbol)
            .cloned()
            .ok_or_else(|| DataLoadError::MissingSource {
                symbol: symbol.to_string(),
                path: PathBuf::from("<memory>"),
            })
    }
}
