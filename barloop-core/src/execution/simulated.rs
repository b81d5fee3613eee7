//! Idealized broker: every order fills in full, immediately, at no cost.

use super::ExecutionHandler;
use crate::clock::Clock;
use crate::error::BoxError;
use crate::events::{EventQueue, FillEvent, OrderEvent};

pub const DEFAULT_EXCHANGE: &str = "SIM";

/// Zero latency, zero slippage, no partial fills, no rejections.
///
/// Commission is left unset so the consumer prices it. Orders are not
/// de-duplicated: the same order executed twice yields two fills.
#[derive(Debug, Clone)]
pub struct SimulatedExecution {
    exchange: String,
}

impl SimulatedExecution {
    pub fn new(exchange: impl Into<String>) -> Self {
        Self {
            exchange: exchange.into(),
        }
    }

    pub fn exchange(&self) -> &str {
        &self.exchange
    }

    /// The fill this handler produces for `order` at time `clock.now()`.
    pub fn fill_for(&self, order: &OrderEvent, clock: &dyn Clock) -> FillEvent {
        FillEvent {
            timestamp: clock.now(),
            symbol: order.symbol.clone(),
            exchange: self.exchange.clone(),
            quantity: order.quantity,
            direction: order.direction,
            commission: None,
            fill_cost: 0.0,
        }
    }
}

impl Default for SimulatedExecution {
    fn default() -> Self {
        Self::new(DEFAULT_EXCHANGE)
    }
}

impl ExecutionHandler for SimulatedExecution {
    fn execute(
        &mut self,
        order: &OrderEvent,
        clock: &dyn Clock,
        queue: &mut EventQueue,
    ) -> Result<(), BoxError> {
        let fill = self.fill_for(order, clock);
        tracing::debug!(
            symbol = %fill.symbol,
            quantity = fill.quantity,
            direction = ?fill.direction,
            "simulated fill"
        );
        queue.push(fill);
        Ok(())
    }
}
