//! Collaborator traits driven by the tick loop.
//!
//! Collaborators never hold the queue or the stream. The orchestrator lends
//! them out for the duration of each callback, which keeps every run's state
//! owned in one place and lets a test inject a fresh queue per run.

use crate::data::BarStream;
use crate::error::BoxError;
use crate::events::{EventQueue, FillEvent, MarketEvent, SignalEvent};
use crate::performance::{EquityPoint, SummaryStats};

/// Turns newly visible bars into signals.
///
/// A strategy reads market data only through the stream's windowed
/// accessors, so it cannot see a bar before its tick.
pub trait Strategy {
    /// React to a new tick. May enqueue zero or more Signal events, nothing else.
    fn on_market(
        &mut self,
        event: &MarketEvent,
        bars: &BarStream,
        queue: &mut EventQueue,
    ) -> Result<(), BoxError>;

    /// Called once after the last tick.
    fn on_finish(&mut self) {}

    /// Free-form remark for the run report.
    fn note(&self) -> Option<String> {
        None
    }
}

/// Position and cash accounting.
pub trait Portfolio {
    /// Mark-to-market bookkeeping after each Market event. Enqueues nothing.
    fn on_tick(&mut self, bars: &BarStream) -> Result<(), BoxError>;

    /// Size a signal into zero or more Order events.
    fn on_signal(
        &mut self,
        signal: &SignalEvent,
        bars: &BarStream,
        queue: &mut EventQueue,
    ) -> Result<(), BoxError>;

    /// Apply a fill to holdings. Enqueues nothing.
    fn on_fill(&mut self, fill: &FillEvent, bars: &BarStream) -> Result<(), BoxError>;

    /// Equity curve so far, one row per tick.
    fn equity_curve(&self) -> Vec<EquityPoint> {
        Vec::new()
    }

    /// Headline statistics over [`equity_curve`](Self::equity_curve).
    fn summary_stats(&self, periods: f64) -> SummaryStats {
        SummaryStats::from_curve(&self.equity_curve(), periods)
    }
}
