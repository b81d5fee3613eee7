//! Execution handlers: turn orders into fills.

pub mod commission;
pub mod simulated;

pub use commission::tiered_commission;
pub use simulated::SimulatedExecution;

use crate::clock::Clock;
use crate::error::BoxError;
use crate::events::{EventQueue, OrderEvent};

/// Broker seam. Backtest and live runs differ only in the implementation.
pub trait ExecutionHandler {
    /// Consume one order and enqueue exactly one fill for it.
    fn execute(
        &mut self,
        order: &OrderEvent,
        clock: &dyn Clock,
        queue: &mut EventQueue,
    ) -> Result<(), BoxError>;
}
