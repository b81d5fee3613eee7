//! Barloop Core: event model, bar stream, execution simulator, analytics, tick loop.
//!
//! This crate contains the backtesting engine proper:
//! - Bars and the four event kinds (Market, Signal, Order, Fill)
//! - A FIFO event queue owned by the orchestrator
//! - The historical bar stream, which only ever exposes already-seen bars
//! - A zero-friction execution simulator and the tiered commission model
//! - Sharpe ratio, drawdown, and equity-curve analytics
//! - The tick loop that routes events to strategy, portfolio, and execution

pub mod bar;
pub mod clock;
pub mod data;
pub mod engine;
pub mod error;
pub mod events;
pub mod execution;
pub mod performance;

pub use bar::{Bar, BarField};
pub use error::{BoxError, DataLoadError, EngineError, EventError, UnknownSymbolError};
