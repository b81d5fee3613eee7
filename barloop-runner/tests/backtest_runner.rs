//! End-to-end runner tests: config -> source -> engine -> report -> artifacts.

use barloop_core::bar::Bar;
use barloop_core::data::MemorySource;
use barloop_core::error::EngineError;
use barloop_core::execution::tiered_commission;
use barloop_runner::{
    export_json, run_backtest, run_backtest_with_source, save_artifacts, BacktestConfig,
    DataConfig, RunError, StrategyConfig,
};
use chrono::{NaiveDate, NaiveDateTime};
use proptest::prelude::*;
use tempfile::TempDir;

fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()
}

fn ts(i: usize) -> NaiveDateTime {
    start().and_hms_opt(0, 0, 0).unwrap() + chrono::Duration::days(i as i64)
}

fn bars(closes: &[f64]) -> Vec<Bar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &c)| Bar {
            timestamp: ts(i),
            open: c,
            high: c * 1.01,
            low: c * 0.99,
            close: c,
            volume: 1_000,
            adj_close: c,
        })
        .collect()
}

fn rising(n: usize) -> Vec<f64> {
    (0..n).map(|i| 100.0 + i as f64).collect()
}

#[test]
fn buy_and_hold_over_memory_source() {
    let config = BacktestConfig::new(vec!["SPY".into()], start());
    let source = MemorySource::new().with_symbol("SPY", bars(&rising(10)));
    let report = run_backtest_with_source(&config, &source).unwrap();

    assert_eq!(report.ticks, 10);
    assert_eq!(report.counters.signals, 1);
    assert_eq!(report.counters.orders, 1);
    assert_eq!(report.counters.fills, 1);
    assert_eq!(report.equity_curve.len(), 10);
    assert_eq!(report.stats.length_of_series, 10);
    assert!(report.stats.total_return > 0.0);
    assert_eq!(report.stats.max_drawdown, 0.0);
    assert!(report.strategy_note.is_none());
    assert!(!report.synthetic);
    assert_eq!(report.run_id, config.run_id().unwrap());
}

#[test]
fn lag_momentum_reports_prediction_counts() {
    let mut config = BacktestConfig::new(vec!["SPY".into()], start());
    config.strategy = StrategyConfig::LagMomentum {
        warmup_bars: 2,
        lookback: 2,
    };
    let closes = [10.0, 11.0, 12.0, 13.0, 12.0, 11.0, 10.0, 11.0, 12.0, 13.0];
    let source = MemorySource::new().with_symbol("SPY", bars(&closes));
    let report = run_backtest_with_source(&config, &source).unwrap();

    assert_eq!(report.counters.signals, 3);
    assert_eq!(report.counters.fills, 3);
    let note = report.strategy_note.unwrap();
    assert!(note.contains("up predictions"), "{note}");
}

#[test]
fn csv_run_saves_artifacts() {
    let data = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let mut body = String::from("date,open,high,low,close,volume,adj_close\n");
    for (i, c) in rising(5).iter().enumerate() {
        body.push_str(&format!(
            "{},{c},{c},{c},{c},100,{c}\n",
            ts(i).date().format("%Y-%m-%d")
        ));
    }
    std::fs::write(data.path().join("SPY.csv"), body).unwrap();

    let mut config = BacktestConfig::new(vec!["SPY".into()], start());
    config.data = DataConfig::Csv {
        dir: data.path().to_path_buf(),
    };
    let report = run_backtest(&config).unwrap();
    assert_eq!(report.ticks, 5);

    let dir = save_artifacts(&report, out.path()).unwrap();
    assert_eq!(dir, out.path().join(&report.run_id));

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(dir.join("report.json")).unwrap()).unwrap();
    assert_eq!(json["run_id"], report.run_id.as_str());
    assert_eq!(json["counters"]["fills"], 1);
    assert_eq!(json["equity_curve"].as_array().unwrap().len(), 5);

    let equity = std::fs::read_to_string(dir.join("equity.csv")).unwrap();
    assert_eq!(equity.lines().count(), 6);
}

#[test]
fn synthetic_runs_are_reproducible() {
    let mut config = BacktestConfig::new(vec!["AAA".into(), "BBB".into()], start());
    config.data = DataConfig::Synthetic {
        end_date: NaiveDate::from_ymd_opt(2024, 6, 28),
        seed: 42,
    };
    config.strategy = StrategyConfig::lag_momentum();

    let a = run_backtest(&config).unwrap();
    let b = run_backtest(&config).unwrap();
    assert!(a.synthetic);
    assert_eq!(a.run_id, b.run_id);
    assert_eq!(a.counters, b.counters);
    assert_eq!(a.equity_curve, b.equity_curve);
    assert_eq!(export_json(&a).unwrap(), export_json(&b).unwrap());
    assert!(a.ticks > 100);
}

#[test]
fn missing_symbol_is_a_setup_error() {
    let config = BacktestConfig::new(vec!["SPY".into(), "IWM".into()], start());
    let source = MemorySource::new().with_symbol("SPY", bars(&rising(3)));
    match run_backtest_with_source(&config, &source) {
        Err(RunError::Engine(EngineError::Setup { component, .. })) => {
            assert_eq!(component, "data handler")
        }
        other => panic!("expected setup error, got {other:?}"),
    }
}

#[test]
fn invalid_config_never_reaches_the_engine() {
    let mut config = BacktestConfig::new(vec!["SPY".into()], start());
    config.portfolio.order_quantity = 0;
    let source = MemorySource::new();
    assert!(matches!(
        run_backtest_with_source(&config, &source),
        Err(RunError::Config(_))
    ));
}

proptest! {
    /// Buy-and-hold equity identity: final total = capital + q * (last - first) - commission.
    #[test]
    fn buy_and_hold_accounting(
        closes in prop::collection::vec(10.0..500.0_f64, 2..60),
        quantity in 1u64..2_000,
    ) {
        let mut config = BacktestConfig::new(vec!["SPY".into()], start());
        config.portfolio.order_quantity = quantity;
        let source = MemorySource::new().with_symbol("SPY", bars(&closes));
        let report = run_backtest_with_source(&config, &source).unwrap();

        let first = closes[0];
        let last = closes[closes.len() - 1];
        let commission = tiered_commission(quantity, first);
        let expected = config.initial_capital + quantity as f64 * (last - first) - commission;
        let final_total = report.equity_curve.last().unwrap().total;
        prop_assert!((final_total - expected).abs() < 1e-6 * expected.abs().max(1.0));
        prop_assert!(report.stats.max_drawdown >= 0.0);
    }
}
