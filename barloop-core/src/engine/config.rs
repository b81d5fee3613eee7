//! Orchestrator configuration, fixed at construction.

use crate::data::GapPolicy;
use chrono::NaiveDateTime;
use std::time::Duration;

/// What the tick loop itself needs to know.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Symbols to load, in the order they are reported.
    pub symbols: Vec<String>,
    /// Rows before this timestamp are discarded at load.
    pub start: NaiveDateTime,
    pub gap_policy: GapPolicy,
    /// Pause after each tick, for a human-observable run. Zero disables it.
    pub heartbeat: Duration,
    /// Keep an ordered `{tick, kind}` record of every routed event.
    pub record_dispatch: bool,
}

impl EngineConfig {
    pub fn new(symbols: Vec<String>, start: NaiveDateTime) -> Self {
        Self {
            symbols,
            start,
            gap_policy: GapPolicy::Void,
            heartbeat: Duration::ZERO,
            record_dispatch: false,
        }
    }

    pub fn with_heartbeat(mut self, heartbeat: Duration) -> Self {
        self.heartbeat = heartbeat;
        self
    }

    pub fn with_gap_policy(mut self, gap_policy: GapPolicy) -> Self {
        self.gap_policy = gap_policy;
        self
    }

    pub fn recording_dispatch(mut self) -> Self {
        self.record_dispatch = true;
        self
    }
}
