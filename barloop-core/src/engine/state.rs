//! Loop state, run counters, and the run summary.

use crate::events::EventKind;
use serde::{Deserialize, Serialize};

/// Orchestrator lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoopState {
    Initializing,
    Running,
    Draining,
    Finished,
}

/// Events routed during the run. Zeroed at construction, read-only once finished.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunCounters {
    pub signals: u64,
    pub orders: u64,
    pub fills: u64,
}

impl RunCounters {
    pub(crate) fn record(&mut self, kind: EventKind) {
        match kind {
            EventKind::Market => {}
            EventKind::Signal => self.signals += 1,
            EventKind::Order => self.orders += 1,
            EventKind::Fill => self.fills += 1,
        }
    }
}

/// One routed event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchRecord {
    pub tick: u64,
    pub kind: EventKind,
}

/// What the orchestrator reports once the stream is exhausted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub ticks: u64,
    pub counters: RunCounters,
    /// Empty unless dispatch recording was enabled.
    pub journal: Vec<DispatchRecord>,
}
