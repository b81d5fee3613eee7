//! Error taxonomy for the engine.
//!
//! Every condition here is fatal for the run that raised it. The engine is
//! offline and deterministic, so nothing is retried; errors carry the symbol,
//! timestamp, field or tick that triggered them.

use crate::events::EventKind;
use chrono::NaiveDateTime;
use std::path::PathBuf;
use thiserror::Error;

/// Boxed error returned by collaborator callbacks (strategy, portfolio, execution).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failure while loading or aligning historical bars. Fatal at setup.
#[derive(Debug, Error)]
pub enum DataLoadError {
    #[error("no data source for symbol '{symbol}' at {}", path.display())]
    MissingSource { symbol: String, path: PathBuf },

    #[error("I/O error reading '{symbol}': {source}")]
    Io {
        symbol: String,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error in '{symbol}' (line {line}): {source}")]
    Csv {
        symbol: String,
        line: u64,
        #[source]
        source: csv::Error,
    },

    #[error("'{symbol}' is missing required column '{column}'")]
    MissingColumn { symbol: String, column: String },

    #[error("'{symbol}' line {line}: cannot parse timestamp '{value}'")]
    BadTimestamp {
        symbol: String,
        line: u64,
        value: String,
    },

    #[error("'{symbol}' line {line}: cannot parse {field} value '{value}'")]
    BadField {
        symbol: String,
        line: u64,
        field: &'static str,
        value: String,
    },

    #[error("'{symbol}' has non-monotonic timestamps: {timestamp} appears more than once")]
    NonMonotonic {
        symbol: String,
        timestamp: NaiveDateTime,
    },

    #[error("'{symbol}' has no bars on or after {start}")]
    NoBarsAfterStart { symbol: String, start: NaiveDateTime },

    #[error("no symbols configured")]
    EmptyUniverse,

    #[error("symbol '{0}' is configured more than once")]
    DuplicateSymbol(String),
}

/// A bar-stream query named a symbol outside the configured universe.
///
/// This is a collaborator bug, not a data condition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown symbol '{symbol}': not in the configured symbol list")]
pub struct UnknownSymbolError {
    pub symbol: String,
}

/// Invalid field values on event construction.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EventError {
    #[error("signal strength {0} outside (0, 1]")]
    Strength(f64),

    #[error("order quantity must be positive")]
    ZeroQuantity,
}

/// Failure of the orchestrator or of a collaborator it drives.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("setup failed while creating {component}: {source}")]
    Setup {
        component: &'static str,
        #[source]
        source: BoxError,
    },

    #[error("{component} failed at tick {tick}: {source}")]
    Collaborator {
        component: &'static str,
        tick: u64,
        #[source]
        source: BoxError,
    },

    #[error("tick {tick}: consuming a {consumed} event produced a {produced} event")]
    OrderingViolation {
        tick: u64,
        consumed: EventKind,
        produced: EventKind,
    },

    #[error("tick {tick}: execution handler produced {fills} fills for one order (expected 1)")]
    ExecutionContract { tick: u64, fills: usize },
}

impl EngineError {
    /// The `UnknownSymbolError` behind a collaborator failure, if that is what it was.
    pub fn unknown_symbol(&self) -> Option<&UnknownSymbolError> {
        match self {
            EngineError::Collaborator { source, .. } | EngineError::Setup { source, .. } => {
                source.downcast_ref::<UnknownSymbolError>()
            }
            _ => None,
        }
    }
}
