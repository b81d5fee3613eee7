//! Reporting and export: JSON report and equity-curve CSV.
//!
//! Artifacts for one run live under `<output_dir>/<run_id>/`:
//! - `report.json`: the full `BacktestReport`
//! - `equity.csv`: tick-by-tick equity curve

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use barloop_core::performance::EquityPoint;

use crate::runner::BacktestReport;

// ─── JSON export ────────────────────────────────────────────────────

/// Serialize a `BacktestReport` to pretty JSON. NaN statistics become `null`.
pub fn export_json(report: &BacktestReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("failed to serialize BacktestReport to JSON")
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Export an equity curve as CSV.
///
/// Columns: timestamp, total, returns, equity_curve, drawdown
pub fn export_equity_csv(curve: &[EquityPoint]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["timestamp", "total", "returns", "equity_curve", "drawdown"])?;
    for p in curve {
        wtr.write_record([
            &p.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
            &format!("{:.2}", p.total),
            &format!("{:.6}", p.returns),
            &format!("{:.6}", p.equity_curve),
            &format!("{:.6}", p.drawdown),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Save the artifact set for one run and return the directory written.
///
/// Rerunning an identical config overwrites the same directory.
pub fn save_artifacts(report: &BacktestReport, output_dir: &Path) -> Result<PathBuf> {
    let run_dir = output_dir.join(&report.run_id);
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    let json = export_json(report)?;
    let report_path = run_dir.join("report.json");
    std::fs::write(&report_path, json)
        .with_context(|| format!("failed to write {}", report_path.display()))?;

    let equity = export_equity_csv(&report.equity_curve)?;
    let equity_path = run_dir.join("equity.csv");
    std::fs::write(&equity_path, equity)
        .with_context(|| format!("failed to write {}", equity_path.display()))?;

    tracing::info!(dir = %run_dir.display(), "saved artifacts");
    Ok(run_dir)
}
