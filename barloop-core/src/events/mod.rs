//! Event model: the four event kinds routed by the tick loop.
//!
//! Events are immutable once built and are consumed exactly once. The closed
//! [`Event`] enum is matched exhaustively at the dispatch site, so a new kind
//! is a compile-time change everywhere it matters.

pub mod queue;

pub use queue::EventQueue;

use crate::error::EventError;
use crate::execution::commission::tiered_commission;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Discriminant of [`Event`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    Market,
    Signal,
    Order,
    Fill,
}

impl EventKind {
    /// Kinds a consumer of `self` may enqueue. Each step moves strictly
    /// later in the chain, which is what guarantees the drain terminates.
    pub fn may_produce(self, produced: EventKind) -> bool {
        matches!(
            (self, produced),
            (EventKind::Market, EventKind::Signal)
                | (EventKind::Signal, EventKind::Order)
                | (EventKind::Order, EventKind::Fill)
        )
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EventKind::Market => "MARKET",
            EventKind::Signal => "SIGNAL",
            EventKind::Order => "ORDER",
            EventKind::Fill => "FILL",
        };
        f.write_str(s)
    }
}

/// Tagged event routed by the orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    Market(MarketEvent),
    Signal(SignalEvent),
    Order(OrderEvent),
    Fill(FillEvent),
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::Market(_) => EventKind::Market,
            Event::Signal(_) => EventKind::Signal,
            Event::Order(_) => EventKind::Order,
            Event::Fill(_) => EventKind::Fill,
        }
    }
}

impl From<MarketEvent> for Event {
    fn from(e: MarketEvent) -> Self {
        Event::Market(e)
    }
}

impl From<SignalEvent> for Event {
    fn from(e: SignalEvent) -> Self {
        Event::Signal(e)
    }
}

impl From<OrderEvent> for Event {
    fn from(e: OrderEvent) -> Self {
        Event::Order(e)
    }
}

impl From<FillEvent> for Event {
    fn from(e: FillEvent) -> Self {
        Event::Fill(e)
    }
}

/// Tick boundary marker: a new bar is now visible for every symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketEvent {
    /// 1-based tick number.
    pub tick: u64,
    /// Timeline timestamp of the bar just revealed.
    pub timestamp: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalDirection {
    Long,
    Short,
    Exit,
}

/// A strategy's view on one symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalEvent {
    pub strategy_id: String,
    pub symbol: String,
    pub timestamp: NaiveDateTime,
    pub direction: SignalDirection,
    /// Conviction in (0, 1].
    pub strength: f64,
}

impl SignalEvent {
    pub fn new(
        strategy_id: impl Into<String>,
        symbol: impl Into<String>,
        timestamp: NaiveDateTime,
        direction: SignalDirection,
        strength: f64,
    ) -> Result<Self, EventError> {
        if !(strength > 0.0 && strength <= 1.0) {
            return Err(EventError::Strength(strength));
        }
        Ok(Self {
            strategy_id: strategy_id.into(),
            symbol: symbol.into(),
            timestamp,
            direction,
            strength,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderDirection {
    Buy,
    Sell,
}

impl OrderDirection {
    /// +1 for buys, -1 for sells.
    pub fn sign(self) -> i64 {
        match self {
            OrderDirection::Buy => 1,
            OrderDirection::Sell => -1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderType {
    Market,
    Limit,
}

/// A portfolio's instruction to trade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderEvent {
    pub symbol: String,
    pub order_type: OrderType,
    pub quantity: u64,
    pub direction: OrderDirection,
}

impl OrderEvent {
    pub fn new(
        symbol: impl Into<String>,
        order_type: OrderType,
        quantity: u64,
        direction: OrderDirection,
    ) -> Result<Self, EventError> {
        if quantity == 0 {
            return Err(EventError::ZeroQuantity);
        }
        Ok(Self {
            symbol: symbol.into(),
            order_type,
            quantity,
            direction,
        })
    }
}

/// The simulated execution outcome of an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FillEvent {
    pub timestamp: NaiveDateTime,
    pub symbol: String,
    pub exchange: String,
    pub quantity: u64,
    pub direction: OrderDirection,
    /// Broker commission; `None` means the consumer computes it.
    pub commission: Option<f64>,
    /// Per-share fill price reported by the broker (0 for the idealized simulator).
    pub fill_cost: f64,
}

impl FillEvent {
    /// Commission for this fill.
    ///
    /// Returns the broker's figure when present. Otherwise applies the tiered
    /// per-share model, valuing the trade at `fill_cost` or, when the broker
    /// reported none, at `reference_price`.
    pub fn commission(&self, reference_price: f64) -> f64 {
        if let Some(c) = self.commission {
            return c;
        }
        let price = if self.fill_cost > 0.0 {
            self.fill_cost
        } else {
            reference_price
        };
        tiered_commission(self.quantity, price)
    }
}
