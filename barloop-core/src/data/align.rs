//! Multi-symbol time alignment.
//!
//! Every symbol is reindexed onto the sorted union of all symbols' timestamps.
//! Missing slots are void bars (NaN prices) unless forward-fill is explicitly
//! requested; tradable prices are never fabricated silently.

use super::source::BarSource;
use crate::bar::Bar;
use crate::error::DataLoadError;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};

/// Data quality threshold: warn if void bar rate exceeds this fraction.
pub const VOID_BAR_RATE_THRESHOLD: f64 = 0.10;

/// How a symbol's missing timeline slots are represented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GapPolicy {
    /// All prices NaN, volume 0.
    #[default]
    Void,
    /// Repeat the previous real close (volume 0). A leading gap stays void.
    ForwardFill,
}

/// Bars for several symbols on one common timeline.
#[derive(Debug, Clone)]
pub struct AlignedSeries {
    /// Sorted union of all timestamps.
    pub timeline: Vec<NaiveDateTime>,
    /// Symbols in configured order.
    pub symbols: Vec<String>,
    /// `bars[i]` belongs to `symbols[i]`; each has `timeline.len()` entries.
    pub bars: Vec<Vec<Bar>>,
    /// Gap slots per symbol.
    pub void_counts: Vec<usize>,
}

impl AlignedSeries {
    pub fn bars_for(&self, symbol: &str) -> Option<&[Bar]> {
        self.symbols
            .iter()
            .position(|s| s == symbol)
            .map(|i| self.bars[i].as_slice())
    }

    /// Fraction of timeline slots that were gaps for symbol `i`.
    pub fn void_rate(&self, i: usize) -> f64 {
        if self.timeline.is_empty() {
            return 0.0;
        }
        self.void_counts[i] as f64 / self.timeline.len() as f64
    }
}

/// Sort one symbol's bars, reject duplicate timestamps, drop rows before `start`.
pub fn prepare_series(
    symbol: &str,
    mut bars: Vec<Bar>,
    start: NaiveDateTime,
) -> Result<Vec<Bar>, DataLoadError> {
    bars.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
    if let Some(w) = bars.windows(2).find(|w| w[0].timestamp == w[1].timestamp) {
        return Err(DataLoadError::NonMonotonic {
            symbol: symbol.to_string(),
            timestamp: w[1].timestamp,
        });
    }
    bars.retain(|b| b.timestamp >= start);
    if bars.is_empty() {
        return Err(DataLoadError::NoBarsAfterStart {
            symbol: symbol.to_string(),
            start,
        });
    }
    Ok(bars)
}

/// Align already-prepared (sorted, de-duplicated) series onto their union timeline.
pub fn align_symbols(series: Vec<(String, Vec<Bar>)>, gap_policy: GapPolicy) -> AlignedSeries {
    let timeline: Vec<NaiveDateTime> = series
        .iter()
        .flat_map(|(_, bars)| bars.iter().map(|b| b.timestamp))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let mut symbols = Vec::with_capacity(series.len());
    let mut aligned = Vec::with_capacity(series.len());
    let mut void_counts = Vec::with_capacity(series.len());

    for (symbol, bars) in series {
        let mut out = Vec::with_capacity(timeline.len());
        let mut voids = 0;
        let mut last_real: Option<Bar> = None;
        let mut src = bars.into_iter().peekable();

        for &ts in &timeline {
            match src.next_if(|b| b.timestamp == ts) {
                Some(bar) => {
                    last_real = Some(bar.clone());
                    out.push(bar);
                }
                None => {
                    voids += 1;
                    let gap = match (gap_policy, &last_real) {
                        (GapPolicy::ForwardFill, Some(prev)) => Bar::carried(ts, prev),
                        _ => Bar::void(ts),
                    };
                    out.push(gap);
                }
            }
        }

        symbols.push(symbol);
        aligned.push(out);
        void_counts.push(voids);
    }

    AlignedSeries {
        timeline,
        symbols,
        bars: aligned,
        void_counts,
    }
}

/// Load, prepare and align every symbol from `source`.
pub fn load_aligned(
    source: &dyn BarSource,
    symbols: &[String],
    start: NaiveDateTime,
    gap_policy: GapPolicy,
) -> Result<AlignedSeries, DataLoadError> {
    if symbols.is_empty() {
        return Err(DataLoadError::EmptyUniverse);
    }
    let mut seen = HashSet::new();
    let mut series = Vec::with_capacity(symbols.len());
    for symbol in symbols {
        if !seen.insert(symbol.as_str()) {
            return Err(DataLoadError::DuplicateSymbol(symbol.clone()));
        }
        let raw = source.load(symbol)?;
        let prepared = prepare_series(symbol, raw, start)?;
        tracing::debug!(
            symbol = %symbol,
            source = source.name(),
            bars = prepared.len(),
            "loaded series"
        );
        series.push((symbol.clone(), prepared));
    }

    let aligned = align_symbols(series, gap_policy);
    for (i, symbol) in aligned.symbols.iter().enumerate() {
        let rate = aligned.void_rate(i);
        if rate > VOID_BAR_RATE_THRESHOLD {
            tracing::warn!(
                symbol = %symbol,
                void_rate = rate,
                "symbol has many gap slots on the union timeline"
            );
        }
    }
    Ok(aligned)
}
