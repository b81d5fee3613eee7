//! Backtesting engine: the deterministic tick loop and its collaborator seams.
//!
//! One tick:
//! 1. Advance the bar stream (stop if exhausted)
//! 2. Enqueue a Market event
//! 3. Drain the queue in FIFO order, routing each event by kind:
//!    Market → strategy (then portfolio mark-to-market), Signal → portfolio,
//!    Order → execution handler, Fill → portfolio
//! 4. Optional heartbeat pause

pub mod backtest;
pub mod components;
pub mod config;
pub mod state;

pub use backtest::Backtest;
pub use components::{Portfolio, Strategy};
pub use config::EngineConfig;
pub use state::{DispatchRecord, LoopState, RunCounters, RunSummary};
