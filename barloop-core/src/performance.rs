//! Performance analytics: pure functions over return and value series.
//!
//! Nothing here does I/O or mutates its input. Degenerate inputs produce
//! sentinel values (NaN) rather than errors: a flat return series is a valid
//! backtest outcome.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Annualization factors for common bar frequencies.
pub mod periods {
    pub const DAILY: f64 = 252.0;
    pub const HOURLY: f64 = 252.0 * 6.5;
    pub const MINUTELY: f64 = 252.0 * 6.5 * 60.0;
}

/// Annualized Sharpe ratio against a zero benchmark:
/// `sqrt(periods) * mean(returns) / stddev(returns)`.
///
/// Uses the population standard deviation. Returns `f64::NAN` when the
/// series is empty or constant, or its standard deviation is zero.
pub fn sharpe_ratio(returns: &[f64], periods: f64) -> f64 {
    let Some(&first) = returns.first() else {
        return f64::NAN;
    };
    // A constant series can leave rounding noise in the computed deviation.
    if returns.iter().all(|&r| r == first) {
        return f64::NAN;
    }
    let sd = std_dev(returns);
    if sd == 0.0 || !sd.is_finite() {
        return f64::NAN;
    }
    periods.sqrt() * mean(returns) / sd
}

/// Period percent changes of a value series; one element shorter than `values`.
///
/// A step from a zero value yields NaN, matching a percent change that is undefined.
pub fn pct_change(values: &[f64]) -> Vec<f64> {
    values
        .windows(2)
        .map(|w| if w[0] == 0.0 { f64::NAN } else { w[1] / w[0] - 1.0 })
        .collect()
}

/// `(last - first) / first`, or 0.0 for fewer than two points or a zero start.
pub fn total_return(values: &[f64]) -> f64 {
    match (values.first(), values.last()) {
        (Some(&first), Some(&last)) if values.len() >= 2 && first != 0.0 => {
            (last - first) / first
        }
        _ => 0.0,
    }
}

/// High-water-mark drawdown of a value series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Drawdowns {
    pub high_water_mark: Vec<f64>,
    /// `hwm[i] - v[i]`, never negative.
    pub drawdown: Vec<f64>,
    /// Consecutive points spent below the high-water mark, 0 at a new high.
    pub duration: Vec<usize>,
    pub max_drawdown: f64,
    pub max_duration: usize,
}

/// Peak-to-trough drawdown and its duration in one O(n) pass.
///
/// Seeded from the first point: `hwm[0] = v[0]`, `drawdown[0] = duration[0] = 0`.
/// Index 0 is visited once; the scan starts at index 1.
pub fn drawdowns(values: &[f64]) -> Drawdowns {
    let n = values.len();
    let mut hwm = Vec::with_capacity(n);
    let mut drawdown = Vec::with_capacity(n);
    let mut duration = Vec::with_capacity(n);

    if let Some(&first) = values.first() {
        hwm.push(first);
        drawdown.push(0.0);
        duration.push(0);
    }

    let mut max_drawdown = 0.0_f64;
    let mut max_duration = 0;
    for i in 1..n {
        let peak = hwm[i - 1].max(values[i]);
        let dd = peak - values[i];
        let dur = if dd == 0.0 { 0 } else { duration[i - 1] + 1 };
        max_drawdown = max_drawdown.max(dd);
        max_duration = max_duration.max(dur);
        hwm.push(peak);
        drawdown.push(dd);
        duration.push(dur);
    }

    Drawdowns {
        high_water_mark: hwm,
        drawdown,
        duration,
        max_drawdown,
        max_duration,
    }
}

/// One row of a portfolio's equity curve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub timestamp: NaiveDateTime,
    /// Marked-to-market total value.
    pub total: f64,
    /// Percent change of `total` from the previous row (0.0 on the first row).
    pub returns: f64,
    /// Cumulative growth of 1.0: running product of `1 + returns`.
    pub equity_curve: f64,
    /// High-water-mark drawdown of `equity_curve`.
    pub drawdown: f64,
}

/// Build equity-curve rows from `(timestamp, total)` pairs.
///
/// A return that cannot be computed (previous total of zero) is recorded as 0.0
/// so the cumulative curve stays finite.
pub fn equity_curve(totals: &[(NaiveDateTime, f64)]) -> Vec<EquityPoint> {
    let values: Vec<f64> = totals.iter().map(|(_, v)| *v).collect();
    let returns: Vec<f64> = std::iter::once(0.0)
        .chain(pct_change(&values).into_iter().map(|r| if r.is_finite() { r } else { 0.0 }))
        .collect();

    let mut growth = 1.0;
    let curve: Vec<f64> = returns
        .iter()
        .map(|r| {
            growth *= 1.0 + r;
            growth
        })
        .collect();
    let dd = drawdowns(&curve);

    totals
        .iter()
        .enumerate()
        .map(|(i, (timestamp, total))| EquityPoint {
            timestamp: *timestamp,
            total: *total,
            returns: returns[i],
            equity_curve: curve[i],
            drawdown: dd.drawdown[i],
        })
        .collect()
}

/// Headline statistics for a finished run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryStats {
    pub total_return: f64,
    /// NaN when the return series has zero variance.
    pub sharpe_ratio: f64,
    pub max_drawdown: f64,
    pub drawdown_duration: usize,
    pub length_of_series: usize,
}

impl SummaryStats {
    /// Statistics over an equity curve built by [`equity_curve`].
    ///
    /// The first row's placeholder return is excluded from the Sharpe ratio.
    pub fn from_curve(curve: &[EquityPoint], periods: f64) -> Self {
        let growth: Vec<f64> = curve.iter().map(|p| p.equity_curve).collect();
        let returns: Vec<f64> = curve.iter().skip(1).map(|p| p.returns).collect();
        let dd = drawdowns(&growth);
        Self {
            total_return: growth.last().map_or(0.0, |g| g - 1.0),
            sharpe_ratio: sharpe_ratio(&returns, periods),
            max_drawdown: dd.max_drawdown,
            drawdown_duration: dd.max_duration,
            length_of_series: curve.len(),
        }
    }
}

pub(crate) fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation.
pub(crate) fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}
