//! Clock sources for stamping fills.
//!
//! A backtest must stamp fills with simulation time, never the host clock,
//! or two runs over the same data would differ.

use chrono::{NaiveDateTime, Utc};

pub trait Clock {
    /// Current time in this clock's sense.
    fn now(&self) -> NaiveDateTime;

    /// Called by the orchestrator after each successful advance.
    fn on_tick(&mut self, _timestamp: NaiveDateTime) {}
}

/// Simulation clock: reports the timestamp of the current tick.
#[derive(Debug, Clone, Copy, Default)]
pub struct TickClock {
    current: NaiveDateTime,
}

impl TickClock {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Clock for TickClock {
    fn now(&self) -> NaiveDateTime {
        self.current
    }

    fn on_tick(&mut self, timestamp: NaiveDateTime) {
        self.current = timestamp;
    }
}

/// Host UTC clock, for wiring against a live feed.
#[derive(Debug, Clone, Copy, Default)]
pub struct WallClock;

impl Clock for WallClock {
    fn now(&self) -> NaiveDateTime {
        Utc::now().naive_utc()
    }
}
