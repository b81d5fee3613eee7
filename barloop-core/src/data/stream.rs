//! Historical bar stream: the causality boundary.
//!
//! Each symbol holds its full aligned series privately, plus a cursor. The
//! visible window is `bars[..cursor]`, and `cursor` equals the number of
//! successful [`BarStream::advance`] calls. Every accessor reads through the
//! window; there is no way to reach a bar that has not been revealed.

use super::align::{load_aligned, AlignedSeries, GapPolicy};
use super::source::BarSource;
use crate::bar::{Bar, BarField};
use crate::error::{DataLoadError, UnknownSymbolError};
use chrono::NaiveDateTime;
use std::collections::HashMap;

#[derive(Debug)]
struct SymbolSeries {
    bars: Vec<Bar>,
    cursor: usize,
}

impl SymbolSeries {
    fn visible(&self) -> &[Bar] {
        &self.bars[..self.cursor]
    }
}

/// Per-symbol lazy producer of time-ordered bars.
#[derive(Debug)]
pub struct BarStream {
    symbols: Vec<String>,
    lookup: HashMap<String, usize>,
    series: Vec<SymbolSeries>,
    timeline: Vec<NaiveDateTime>,
    ticks: u64,
    exhausted: bool,
}

impl BarStream {
    /// Load every symbol from `source`, aligned onto one timeline starting at `start`.
    pub fn load(
        source: &dyn BarSource,
        symbols: &[String],
        start: NaiveDateTime,
        gap_policy: GapPolicy,
    ) -> Result<Self, DataLoadError> {
        let aligned = load_aligned(source, symbols, start, gap_policy)?;
        Ok(Self::from_aligned(aligned))
    }

    /// Wrap already-aligned data. Nothing is visible until the first advance.
    pub fn from_aligned(aligned: AlignedSeries) -> Self {
        let AlignedSeries {
            timeline,
            symbols,
            bars,
            ..
        } = aligned;
        let lookup = symbols
            .iter()
            .enumerate()
            .map(|(i, s)| (s.clone(), i))
            .collect();
        let series = bars
            .into_iter()
            .map(|bars| SymbolSeries { bars, cursor: 0 })
            .collect();
        Self {
            symbols,
            lookup,
            series,
            timeline,
            ticks: 0,
            exhausted: false,
        }
    }

    /// Reveal the next bar for every symbol.
    ///
    /// Returns `false`, and latches [`is_exhausted`](Self::is_exhausted), as soon
    /// as any symbol has nothing left. A failed call reveals nothing for any
    /// symbol, and every later call fails too.
    pub fn advance(&mut self) -> bool {
        if self.exhausted {
            return false;
        }
        if self.series.iter().any(|s| s.cursor >= s.bars.len()) {
            self.exhausted = true;
            tracing::debug!(ticks = self.ticks, "bar stream exhausted");
            return false;
        }
        for s in &mut self.series {
            s.cursor += 1;
        }
        self.ticks += 1;
        true
    }

    /// Inject exhaustion: the next `advance` fails and the run winds down.
    pub fn stop(&mut self) {
        if !self.exhausted {
            tracing::debug!(ticks = self.ticks, "bar stream stopped early");
        }
        self.exhausted = true;
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Number of successful advances so far.
    pub fn tick_count(&self) -> u64 {
        self.ticks
    }

    /// Configured symbols, in load order.
    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    /// Timeline timestamp of the most recently revealed bar.
    pub fn latest_timestamp(&self) -> Option<NaiveDateTime> {
        match self.ticks {
            0 => None,
            n => self.timeline.get(n as usize - 1).copied(),
        }
    }

    /// The last `n` visible bars for `symbol`, oldest first.
    ///
    /// Returns fewer than `n` (possibly none) when the window is shorter.
    pub fn latest(&self, symbol: &str, n: usize) -> Result<&[Bar], UnknownSymbolError> {
        let window = self.window(symbol)?;
        Ok(&window[window.len().saturating_sub(n)..])
    }

    /// The most recent visible bar, or `None` before the first advance.
    pub fn latest_bar(&self, symbol: &str) -> Result<Option<&Bar>, UnknownSymbolError> {
        Ok(self.window(symbol)?.last())
    }

    /// One field of the last `n` visible bars, oldest first.
    pub fn latest_value(
        &self,
        symbol: &str,
        field: BarField,
        n: usize,
    ) -> Result<Vec<f64>, UnknownSymbolError> {
        Ok(self
            .latest(symbol, n)?
            .iter()
            .map(|b| b.value(field))
            .collect())
    }

    /// One field of the most recent visible bar.
    pub fn latest_bar_value(
        &self,
        symbol: &str,
        field: BarField,
    ) -> Result<Option<f64>, UnknownSymbolError> {
        Ok(self.latest_bar(symbol)?.map(|b| b.value(field)))
    }

    fn window(&self, symbol: &str) -> Result<&[Bar], UnknownSymbolError> {
        let idx = self
            .lookup
            .get(symbol)
            .copied()
            .ok_or_else(|| UnknownSymbolError {
                symbol: symbol.to_string(),
            })?;
        let s = &self.series[idx];
        debug_assert_eq!(s.cursor as u64, self.ticks, "window out of step with ticks");
        Ok(s.visible())
    }
}
