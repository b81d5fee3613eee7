//! CSV directory source: one `<symbol>.csv` per symbol.
//!
//! Expected header columns (case-insensitive, any order):
//! `timestamp|date|datetime, open, high, low, close, volume[, adj_close]`.
//! The adjusted close may also be spelled `adjusted_close` or `adj close`;
//! when absent, `close` is used. Unknown columns are ignored.

use super::source::BarSource;
use crate::bar::Bar;
use crate::error::DataLoadError;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use csv::StringRecord;
use std::fs::File;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

const TIMESTAMP_COLUMNS: [&str; 3] = ["timestamp", "date", "datetime"];
const ADJ_CLOSE_COLUMNS: [&str; 3] = ["adj_close", "adjusted_close", "adj close"];

const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// Reads `<dir>/<symbol>.csv`.
#[derive(Debug, Clone)]
pub struct CsvDirSource {
    dir: PathBuf,
}

impl CsvDirSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, symbol: &str) -> PathBuf {
        self.dir.join(format!("{symbol}.csv"))
    }
}

impl BarSource for CsvDirSource {
    fn name(&self) -> &str {
        "csv"
    }

    fn load(&self, symbol: &str) -> Result<Vec<Bar>, DataLoadError> {
        let path = self.path_for(symbol);
        let file = File::open(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => DataLoadError::MissingSource {
                symbol: symbol.to_string(),
                path: path.clone(),
            },
            _ => DataLoadError::Io {
                symbol: symbol.to_string(),
                source: e,
            },
        })?;
        read_bars(symbol, file)
    }
}

/// Column positions resolved from the header row.
struct Columns {
    timestamp: usize,
    open: usize,
    high: usize,
    low: usize,
    close: usize,
    volume: usize,
    adj_close: Option<usize>,
}

impl Columns {
    fn resolve(symbol: &str, headers: &StringRecord) -> Result<Self, DataLoadError> {
        let names: Vec<String> = headers
            .iter()
            .map(|h| h.trim().to_ascii_lowercase())
            .collect();
        let find = |candidates: &[&str]| names.iter().position(|n| candidates.contains(&n.as_str()));
        let require = |column: &str| {
            find(&[column]).ok_or_else(|| DataLoadError::MissingColumn {
                symbol: symbol.to_string(),
                column: column.to_string(),
            })
        };

        let adj_close = find(&ADJ_CLOSE_COLUMNS);
        if adj_close.is_none() {
            tracing::debug!(symbol, "no adjusted close column; using close");
        }

        Ok(Self {
            timestamp: find(&TIMESTAMP_COLUMNS).ok_or_else(|| DataLoadError::MissingColumn {
                symbol: symbol.to_string(),
                column: "timestamp".to_string(),
            })?,
            open: require("open")?,
            high: require("high")?,
            low: require("low")?,
            close: require("close")?,
            volume: require("volume")?,
            adj_close,
        })
    }
}

/// Parse a CSV stream into bars, in file order.
pub fn read_bars<R: std::io::Read>(symbol: &str, reader: R) -> Result<Vec<Bar>, DataLoadError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let csv_err = |source: csv::Error| DataLoadError::Csv {
        symbol: symbol.to_string(),
        line: source.position().map_or(0, |p| p.line()),
        source,
    };

    let headers = rdr.headers().map_err(csv_err)?.clone();
    let cols = Columns::resolve(symbol, &headers)?;

    let mut bars = Vec::new();
    for record in rdr.records() {
        let record = record.map_err(csv_err)?;
        let line = record.position().map_or(0, |p| p.line());
        bars.push(parse_record(symbol, line, &record, &cols)?);
    }
    Ok(bars)
}

fn parse_record(
    symbol: &str,
    line: u64,
    record: &StringRecord,
    cols: &Columns,
) -> Result<Bar, DataLoadError> {
    let raw_ts = record.get(cols.timestamp).unwrap_or("");
    let timestamp = parse_timestamp(raw_ts).ok_or_else(|| DataLoadError::BadTimestamp {
        symbol: symbol.to_string(),
        line,
        value: raw_ts.to_string(),
    })?;

    let price = |idx: usize, field: &'static str| -> Result<f64, DataLoadError> {
        let raw = record.get(idx).unwrap_or("");
        raw.parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| DataLoadError::BadField {
                symbol: symbol.to_string(),
                line,
                field,
                value: raw.to_string(),
            })
    };

    let close = price(cols.close, "close")?;
    let adj_close = match cols.adj_close {
        Some(idx) => price(idx, "adj_close")?,
        None => close,
    };

    let raw_volume = record.get(cols.volume).unwrap_or("");
    let volume = parse_volume(raw_volume).ok_or_else(|| DataLoadError::BadField {
        symbol: symbol.to_string(),
        line,
        field: "volume",
        value: raw_volume.to_string(),
    })?;

    Ok(Bar {
        timestamp,
        open: price(cols.open, "open")?,
        high: price(cols.high, "high")?,
        low: price(cols.low, "low")?,
        close,
        volume,
        adj_close,
    })
}

/// Accepts `YYYY-MM-DD` (midnight) or a date-time with space or `T` separator.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date.and_time(NaiveTime::default()));
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
}

fn parse_volume(raw: &str) -> Option<u64> {
    raw.parse::<u64>().ok().or_else(|| {
        raw.parse::<f64>()
            .ok()
            .filter(|v| v.is_finite() && *v >= 0.0)
            .map(|v| v.round() as u64)
    })
}
