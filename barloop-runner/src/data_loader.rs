//! Data-source resolution with a synthetic fallback.
//!
//! Resolution:
//! 1. `[data] type = "csv"` -> read `<dir>/<symbol>.csv`
//! 2. `[data] type = "synthetic"` -> deterministic random walk per symbol
//!
//! Synthetic data is clearly fake: it is logged as such and the report
//! carries a `synthetic` flag.

use barloop_core::bar::Bar;
use barloop_core::data::{BarSource, CsvDirSource};
use barloop_core::error::DataLoadError;
use chrono::{Datelike, Duration, NaiveDate, NaiveTime};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::DataConfig;

/// Days of synthetic history generated when no end date is configured.
pub const DEFAULT_SYNTHETIC_DAYS: i64 = 365;

/// Starting price of every synthetic walk.
const SYNTHETIC_START_PRICE: f64 = 100.0;

/// Seeded random-walk bars, weekdays only, over `[start, end]`.
#[derive(Debug, Clone)]
pub struct SyntheticSource {
    start: NaiveDate,
    end: NaiveDate,
    seed: u64,
}

impl SyntheticSource {
    pub fn new(start: NaiveDate, end: NaiveDate, seed: u64) -> Self {
        Self { start, end, seed }
    }
}

impl BarSource for SyntheticSource {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn load(&self, symbol: &str) -> Result<Vec<Bar>, DataLoadError> {
        tracing::warn!(
            symbol,
            "generating synthetic data; results are not from real prices"
        );
        Ok(generate_synthetic_bars(symbol, self.start, self.end, self.seed))
    }
}

/// Build the bar source a config asks for.
pub fn resolve_source(data: &DataConfig, start: NaiveDate) -> Box<dyn BarSource> {
    match data {
        DataConfig::Csv { dir } => {
            tracing::info!(dir = %dir.display(), "reading bars from CSV directory");
            Box::new(CsvDirSource::new(dir.clone()))
        }
        DataConfig::Synthetic { end_date, seed } => {
            let end = end_date.unwrap_or(start + Duration::days(DEFAULT_SYNTHETIC_DAYS));
            tracing::info!(%start, %end, seed, "using synthetic bars");
            Box::new(SyntheticSource::new(start, end, *seed))
        }
    }
}

/// Simple random walk from 100.0, daily moves within ±3%.
///
/// The generator is seeded from BLAKE3 of `(seed, symbol)`, so one symbol
/// always gets the same series and different symbols get different ones.
pub fn generate_synthetic_bars(
    symbol: &str,
    start: NaiveDate,
    end: NaiveDate,
    seed: u64,
) -> Vec<Bar> {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&seed.to_le_bytes());
    hasher.update(symbol.as_bytes());
    let mut rng = StdRng::from_seed(*hasher.finalize().as_bytes());

    let mut bars = Vec::new();
    let mut price = SYNTHETIC_START_PRICE;
    let mut current = start;

    while current <= end {
        let weekday = current.weekday();
        if weekday == chrono::Weekday::Sat || weekday == chrono::Weekday::Sun {
            current += Duration::days(1);
            continue;
        }

        let daily_return: f64 = rng.gen_range(-0.03..0.03);
        let open = price;
        let close = price * (1.0 + daily_return);
        let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.01));
        let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.01));
        let volume = rng.gen_range(500_000..5_000_000u64);

        bars.push(Bar {
            timestamp: current.and_time(NaiveTime::default()),
            open,
            high,
            low,
            close,
            volume,
            adj_close: close,
        });

        price = close;
        current += Duration::days(1);
    }

    bars
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Weekday;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn synthetic_bars_are_deterministic_per_symbol_and_seed() {
        let a = generate_synthetic_bars("SPY", d(2024, 1, 1), d(2024, 3, 1), 0);
        let b = generate_synthetic_bars("SPY", d(2024, 1, 1), d(2024, 3, 1), 0);
        assert_eq!(a, b);

        let other_symbol = generate_synthetic_bars("QQQ", d(2024, 1, 1), d(2024, 3, 1), 0);
        assert_ne!(a, other_symbol);

        let other_seed = generate_synthetic_bars("SPY", d(2024, 1, 1), d(2024, 3, 1), 1);
        assert_ne!(a, other_seed);
    }

    #[test]
    fn synthetic_bars_skip_weekends_and_stay_consistent() {
        let bars = generate_synthetic_bars("SPY", d(2024, 1, 1), d(2024, 1, 31), 3);
        // January 2024 has 23 weekdays
        assert_eq!(bars.len(), 23);
        for bar in &bars {
            let wd = bar.timestamp.date().weekday();
            assert!(wd != Weekday::Sat && wd != Weekday::Sun);
            assert!(bar.high >= bar.open.max(bar.close));
            assert!(bar.low <= bar.open.min(bar.close));
            assert!(bar.volume >= 500_000);
        }
        assert_eq!(bars[0].open, 100.0);
        for w in bars.windows(2) {
            assert!(w[0].timestamp < w[1].timestamp);
            assert_eq!(w[1].open, w[0].close);
        }
    }

    #[test]
    fn empty_range_yields_no_bars() {
        assert!(generate_synthetic_bars("SPY", d(2024, 2, 1), d(2024, 1, 1), 0).is_empty());
        // a weekend-only range
        assert!(generate_synthetic_bars("SPY", d(2024, 1, 6), d(2024, 1, 7), 0).is_empty());
    }

    #[test]
    fn resolve_source_defaults_synthetic_end_date() {
        let source = resolve_source(
            &DataConfig::Synthetic {
                end_date: None,
                seed: 0,
            },
            d(2023, 1, 2),
        );
        assert_eq!(source.name(), "synthetic");
        let bars = source.load("SPY").unwrap();
        let last = bars.last().unwrap().timestamp.date();
        assert!(last <= d(2024, 1, 2));
        assert!(last >= d(2023, 12, 28));
    }

    #[test]
    fn resolve_source_for_csv() {
        let source = resolve_source(&DataConfig::default(), d(2023, 1, 2));
        assert_eq!(source.name(), "csv");
    }
}
