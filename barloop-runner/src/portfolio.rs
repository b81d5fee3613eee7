//! Reference portfolio: fixed-quantity sizing, cash and holdings bookkeeping.

use std::collections::HashMap;

use barloop_core::bar::BarField;
use barloop_core::data::BarStream;
use barloop_core::engine::Portfolio;
use barloop_core::error::BoxError;
use barloop_core::events::{
    EventQueue, FillEvent, OrderDirection, OrderEvent, OrderType, SignalDirection, SignalEvent,
};
use barloop_core::performance::{equity_curve, EquityPoint};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PortfolioError {
    #[error("no price available to settle a fill for '{symbol}'")]
    NoPrice { symbol: String },
}

/// Marked-to-market snapshot taken after every tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoldingsRow {
    pub timestamp: NaiveDateTime,
    pub cash: f64,
    /// Commission paid so far.
    pub commission: f64,
    /// Cash plus positions at their latest marks.
    pub total: f64,
}

/// Sizes every opening signal at `order_quantity` shares and closes whole
/// positions on EXIT.
///
/// Fills settle at the symbol's latest visible adjusted close unless the
/// broker reported a fill price.
#[derive(Debug, Clone)]
pub struct NaivePortfolio {
    symbols: Vec<String>,
    order_quantity: u64,
    initial_capital: f64,
    cash: f64,
    commission: f64,
    positions: HashMap<String, i64>,
    marks: HashMap<String, f64>,
    holdings: Vec<HoldingsRow>,
}

impl NaivePortfolio {
    pub fn new(symbols: &[String], initial_capital: f64, order_quantity: u64) -> Self {
        Self {
            symbols: symbols.to_vec(),
            order_quantity,
            initial_capital,
            cash: initial_capital,
            commission: 0.0,
            positions: symbols.iter().map(|s| (s.clone(), 0)).collect(),
            marks: HashMap::new(),
            holdings: Vec::new(),
        }
    }

    pub fn initial_capital(&self) -> f64 {
        self.initial_capital
    }

    pub fn cash(&self) -> f64 {
        self.cash
    }

    pub fn total_commission(&self) -> f64 {
        self.commission
    }

    /// Signed share count: positive long, negative short.
    pub fn position(&self, symbol: &str) -> i64 {
        self.positions.get(symbol).copied().unwrap_or(0)
    }

    pub fn holdings(&self) -> &[HoldingsRow] {
        &self.holdings
    }

    fn market_value(&self) -> f64 {
        self.positions
            .iter()
            .map(|(symbol, qty)| {
                let mark = self.marks.get(symbol).copied().unwrap_or(0.0);
                *qty as f64 * mark
            })
            .sum()
    }

    /// The order that moves the current stance to `direction`, if any.
    fn order_for(&self, symbol: &str, direction: SignalDirection) -> Option<(OrderDirection, u64)> {
        let held = self.position(symbol);
        match direction {
            SignalDirection::Long if held == 0 => Some((OrderDirection::Buy, self.order_quantity)),
            SignalDirection::Short if held == 0 => {
                Some((OrderDirection::Sell, self.order_quantity))
            }
            SignalDirection::Exit if held > 0 => Some((OrderDirection::Sell, held.unsigned_abs())),
            SignalDirection::Exit if held < 0 => Some((OrderDirection::Buy, held.unsigned_abs())),
            _ => None,
        }
    }

    fn refresh_marks(&mut self, bars: &BarStream) -> Result<(), BoxError> {
        for symbol in &self.symbols {
            // void bars keep the previous mark
            if let Some(price) = bars
                .latest_bar_value(symbol, BarField::AdjClose)?
                .filter(|p| p.is_finite())
            {
                self.marks.insert(symbol.clone(), price);
            }
        }
        Ok(())
    }
}

impl Portfolio for NaivePortfolio {
    fn on_tick(&mut self, bars: &BarStream) -> Result<(), BoxError> {
        self.refresh_marks(bars)?;
        let Some(timestamp) = bars.latest_timestamp() else {
            return Ok(());
        };
        let total = self.cash + self.market_value();
        self.holdings.push(HoldingsRow {
            timestamp,
            cash: self.cash,
            commission: self.commission,
            total,
        });
        Ok(())
    }

    fn on_signal(
        &mut self,
        signal: &SignalEvent,
        _bars: &BarStream,
        queue: &mut EventQueue,
    ) -> Result<(), BoxError> {
        match self.order_for(&signal.symbol, signal.direction) {
            Some((direction, quantity)) => {
                tracing::debug!(
                    symbol = %signal.symbol,
                    signal = ?signal.direction,
                    order = ?direction,
                    quantity,
                    "sizing order"
                );
                queue.push(OrderEvent::new(
                    &signal.symbol,
                    OrderType::Market,
                    quantity,
                    direction,
                )?);
            }
            None => tracing::debug!(
                symbol = %signal.symbol,
                signal = ?signal.direction,
                held = self.position(&signal.symbol),
                "signal matches current stance; ignored"
            ),
        }
        Ok(())
    }

    fn on_fill(&mut self, fill: &FillEvent, bars: &BarStream) -> Result<(), BoxError> {
        let latest = bars
            .latest_bar_value(&fill.symbol, BarField::AdjClose)?
            .filter(|p| p.is_finite());
        let price = if fill.fill_cost > 0.0 {
            fill.fill_cost
        } else {
            latest
                .or_else(|| self.marks.get(&fill.symbol).copied())
                .ok_or_else(|| PortfolioError::NoPrice {
                    symbol: fill.symbol.clone(),
                })?
        };

        let commission = fill.commission(price);
        let signed = fill.direction.sign() * fill.quantity as i64;
        *self.positions.entry(fill.symbol.clone()).or_insert(0) += signed;
        self.cash -= signed as f64 * price + commission;
        self.commission += commission;
        self.marks.insert(fill.symbol.clone(), price);

        tracing::debug!(
            symbol = %fill.symbol,
            quantity = signed,
            price,
            commission,
            cash = self.cash,
            "fill settled"
        );
        Ok(())
    }

    fn equity_curve(&self) -> Vec<EquityPoint> {
        let totals: Vec<(NaiveDateTime, f64)> =
            self.holdings.iter().map(|r| (r.timestamp, r.total)).collect();
        equity_curve(&totals)
    }
}
