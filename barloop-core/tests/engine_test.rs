//! Integration tests for the tick loop.
//!
//! Tests:
//! 1. End-to-end routing: Market -> Signal -> Order -> Fill within one tick
//! 2. Drain termination under fan-out, with exact counters
//! 3. Dispatch guard: ordering violations and the one-fill execution contract
//! 4. Error surfacing: unknown symbols, collaborator failures, setup failures

use barloop_core::bar::{Bar, BarField};
use barloop_core::clock::Clock;
use barloop_core::data::{align_symbols, BarStream, GapPolicy, MemorySource};
use barloop_core::engine::{Backtest, DispatchRecord, EngineConfig, LoopState, Portfolio, Strategy};
use barloop_core::error::{BoxError, EngineError, UnknownSymbolError};
use barloop_core::events::{
    EventKind, EventQueue, FillEvent, MarketEvent, OrderDirection, OrderEvent, OrderType,
    SignalDirection, SignalEvent,
};
use barloop_core::execution::{ExecutionHandler, SimulatedExecution};
use chrono::{NaiveDate, NaiveDateTime};
use std::cell::RefCell;
use std::rc::Rc;

fn ts(i: u64) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 2)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
        + chrono::Duration::days(i as i64)
}

fn simple_bars(n: u64) -> Vec<Bar> {
    (0..n)
        .map(|i| {
            let close = 100.0 + i as f64;
            Bar {
                timestamp: ts(i),
                open: close - 0.5,
                high: close + 1.0,
                low: close - 1.0,
                close,
                volume: 1000,
                adj_close: close,
            }
        })
        .collect()
}

fn stream(n: u64) -> BarStream {
    BarStream::from_aligned(align_symbols(
        vec![("SPY".into(), simple_bars(n))],
        GapPolicy::Void,
    ))
}

fn config() -> EngineConfig {
    EngineConfig::new(vec!["SPY".into()], ts(0)).recording_dispatch()
}

// ── Stub collaborators ───────────────────────────────────────────────

/// Emits a fixed direction at fixed ticks, `per_tick` times each.
struct Scripted {
    script: Vec<(u64, SignalDirection)>,
    per_tick: usize,
    finished: Rc<RefCell<bool>>,
}

impl Strategy for Scripted {
    fn on_market(
        &mut self,
        event: &MarketEvent,
        bars: &BarStream,
        queue: &mut EventQueue,
    ) -> Result<(), BoxError> {
        let close = bars.latest_bar_value("SPY", BarField::Close)?;
        assert!(close.is_some());
        for (tick, direction) in &self.script {
            if *tick == event.tick {
                for _ in 0..self.per_tick {
                    queue.push(SignalEvent::new(
                        "scripted",
                        "SPY",
                        event.timestamp,
                        *direction,
                        1.0,
                    )?);
                }
            }
        }
        Ok(())
    }

    fn on_finish(&mut self) {
        *self.finished.borrow_mut() = true;
    }
}

/// Emits one signal on every tick.
fn every_tick(per_tick: usize, ticks: u64) -> Scripted {
    Scripted {
        script: (1..=ticks).map(|t| (t, SignalDirection::Long)).collect(),
        per_tick,
        finished: Rc::default(),
    }
}

/// Turns each signal into `orders_per_signal` market orders and logs fills.
struct Recorder {
    orders_per_signal: usize,
    fills: Rc<RefCell<Vec<FillEvent>>>,
    ticks_seen: u64,
}

impl Recorder {
    fn new(orders_per_signal: usize) -> (Self, Rc<RefCell<Vec<FillEvent>>>) {
        let fills = Rc::new(RefCell::new(Vec::new()));
        (
            Self {
                orders_per_signal,
                fills: fills.clone(),
                ticks_seen: 0,
            },
            fills,
        )
    }
}

impl Portfolio for Recorder {
    fn on_tick(&mut self, _bars: &BarStream) -> Result<(), BoxError> {
        self.ticks_seen += 1;
        Ok(())
    }

    fn on_signal(
        &mut self,
        signal: &SignalEvent,
        _bars: &BarStream,
        queue: &mut EventQueue,
    ) -> Result<(), BoxError> {
        let direction = match signal.direction {
            SignalDirection::Long => OrderDirection::Buy,
            SignalDirection::Short | SignalDirection::Exit => OrderDirection::Sell,
        };
        for _ in 0..self.orders_per_signal {
            queue.push(OrderEvent::new(&signal.symbol, OrderType::Market, 100, direction)?);
        }
        Ok(())
    }

    fn on_fill(&mut self, fill: &FillEvent, _bars: &BarStream) -> Result<(), BoxError> {
        self.fills.borrow_mut().push(fill.clone());
        Ok(())
    }
}

fn backtest(
    n: u64,
    strategy: impl Strategy + 'static,
    portfolio: impl Portfolio + 'static,
    execution: impl ExecutionHandler + 'static,
) -> Backtest {
    Backtest::new(
        config(),
        stream(n),
        Box::new(strategy),
        Box::new(portfolio),
        Box::new(execution),
    )
}

// ── 1. End-to-end routing ────────────────────────────────────────────

#[test]
fn long_then_exit_routes_through_the_full_chain() {
    let finished = Rc::new(RefCell::new(false));
    let strategy = Scripted {
        script: vec![(3, SignalDirection::Long), (7, SignalDirection::Exit)],
        per_tick: 1,
        finished: finished.clone(),
    };
    let (portfolio, fills) = Recorder::new(1);
    let mut bt = backtest(10, strategy, portfolio, SimulatedExecution::default());

    let summary = bt.run().unwrap();
    assert_eq!(summary.ticks, 10);
    assert_eq!(summary.counters.signals, 2);
    assert_eq!(summary.counters.orders, 2);
    assert_eq!(summary.counters.fills, 2);
    assert_eq!(bt.state(), LoopState::Finished);
    assert!(*finished.borrow());

    let non_market: Vec<DispatchRecord> = summary
        .journal
        .iter()
        .copied()
        .filter(|r| r.kind != EventKind::Market)
        .collect();
    let expected: Vec<DispatchRecord> = [3, 7]
        .into_iter()
        .flat_map(|tick| {
            [EventKind::Signal, EventKind::Order, EventKind::Fill]
                .into_iter()
                .map(move |kind| DispatchRecord { tick, kind })
        })
        .collect();
    assert_eq!(non_market, expected);
    assert_eq!(
        summary
            .journal
            .iter()
            .filter(|r| r.kind == EventKind::Market)
            .count(),
        10
    );

    let fills = fills.borrow();
    assert_eq!(fills[0].direction, OrderDirection::Buy);
    assert_eq!(fills[0].timestamp, ts(2));
    assert_eq!(fills[0].fill_cost, 0.0);
    assert_eq!(fills[0].commission, None);
    assert_eq!(fills[1].direction, OrderDirection::Sell);
    assert_eq!(fills[1].timestamp, ts(6));
}

#[test]
fn each_tick_starts_with_its_market_event() {
    let (portfolio, _) = Recorder::new(1);
    let mut bt = backtest(4, every_tick(1, 4), portfolio, SimulatedExecution::default());
    let journal = bt.run().unwrap().journal;
    for chunk in journal.chunks(4) {
        let kinds: Vec<_> = chunk.iter().map(|r| r.kind).collect();
        assert_eq!(
            kinds,
            vec![EventKind::Market, EventKind::Signal, EventKind::Order, EventKind::Fill]
        );
        assert!(chunk.iter().all(|r| r.tick == chunk[0].tick));
    }
}

// ── 2. Drain termination ─────────────────────────────────────────────

#[test]
fn fan_out_drains_with_exact_counts() {
    let (portfolio, fills) = Recorder::new(3);
    let mut bt = backtest(5, every_tick(2, 5), portfolio, SimulatedExecution::default());
    let summary = bt.run().unwrap();
    assert_eq!(summary.counters.signals, 10);
    assert_eq!(summary.counters.orders, 30);
    assert_eq!(summary.counters.fills, 30);
    assert_eq!(fills.borrow().len(), 30);
}

#[test]
fn empty_stream_finishes_without_ticking() {
    let (portfolio, _) = Recorder::new(1);
    let mut bt = backtest(0, every_tick(1, 0), portfolio, SimulatedExecution::default());
    let summary = bt.run().unwrap();
    assert_eq!(summary.ticks, 0);
    assert!(summary.journal.is_empty());
    assert_eq!(bt.state(), LoopState::Finished);
}

#[test]
fn second_run_does_not_tick_again() {
    let (portfolio, fills) = Recorder::new(1);
    let mut bt = backtest(3, every_tick(1, 3), portfolio, SimulatedExecution::default());
    let first = bt.run().unwrap();
    let second = bt.run().unwrap();
    assert_eq!(first, second);
    assert_eq!(fills.borrow().len(), 3);
}

#[test]
fn stop_ends_the_run_after_the_current_tick() {
    let (portfolio, _) = Recorder::new(1);
    let mut bt = backtest(10, every_tick(1, 10), portfolio, SimulatedExecution::default());
    assert!(bt.step().unwrap());
    assert!(bt.step().unwrap());
    bt.stop();
    assert!(!bt.step().unwrap());
    assert_eq!(bt.counters().fills, 2);
    assert_eq!(bt.state(), LoopState::Finished);
}

// ── 3. Dispatch guard ────────────────────────────────────────────────

/// Strategy that skips the portfolio and places orders itself.
struct Rogue;

impl Strategy for Rogue {
    fn on_market(
        &mut self,
        _event: &MarketEvent,
        _bars: &BarStream,
        queue: &mut EventQueue,
    ) -> Result<(), BoxError> {
        queue.push(OrderEvent::new("SPY", OrderType::Market, 1, OrderDirection::Buy)?);
        Ok(())
    }
}

#[test]
fn strategy_enqueuing_orders_is_an_ordering_violation() {
    let (portfolio, _) = Recorder::new(1);
    let mut bt = backtest(3, Rogue, portfolio, SimulatedExecution::default());
    match bt.run() {
        Err(EngineError::OrderingViolation {
            tick,
            consumed,
            produced,
        }) => {
            assert_eq!(tick, 1);
            assert_eq!(consumed, EventKind::Market);
            assert_eq!(produced, EventKind::Order);
        }
        other => panic!("expected ordering violation, got {other:?}"),
    }
    assert_eq!(bt.state(), LoopState::Finished);
}

/// Execution handler that fills every order `n` times.
struct Repeating(usize);

impl ExecutionHandler for Repeating {
    fn execute(
        &mut self,
        order: &OrderEvent,
        clock: &dyn Clock,
        queue: &mut EventQueue,
    ) -> Result<(), BoxError> {
        let sim = SimulatedExecution::default();
        for _ in 0..self.0 {
            queue.push(sim.fill_for(order, clock));
        }
        Ok(())
    }
}

#[test]
fn execution_must_fill_exactly_once() {
    for n in [0, 2] {
        let (portfolio, _) = Recorder::new(1);
        let mut bt = backtest(3, every_tick(1, 3), portfolio, Repeating(n));
        match bt.run() {
            Err(EngineError::ExecutionContract { tick, fills }) => {
                assert_eq!(tick, 1);
                assert_eq!(fills, n);
            }
            other => panic!("expected execution contract error, got {other:?}"),
        }
    }
}

// ── 4. Error surfacing ───────────────────────────────────────────────

struct ReadsUnknown;

impl Strategy for ReadsUnknown {
    fn on_market(
        &mut self,
        _event: &MarketEvent,
        bars: &BarStream,
        _queue: &mut EventQueue,
    ) -> Result<(), BoxError> {
        bars.latest("QQQ", 5)?;
        Ok(())
    }
}

#[test]
fn unknown_symbol_surfaces_as_collaborator_error() {
    let (portfolio, _) = Recorder::new(1);
    let mut bt = backtest(3, ReadsUnknown, portfolio, SimulatedExecution::default());
    let err = bt.run().unwrap_err();
    assert!(matches!(
        err,
        EngineError::Collaborator {
            component: "strategy",
            tick: 1,
            ..
        }
    ));
    assert_eq!(
        err.unknown_symbol(),
        Some(&UnknownSymbolError {
            symbol: "QQQ".into()
        })
    );
}

#[test]
fn assemble_reports_missing_data_as_setup_error() {
    let source = MemorySource::new().with_symbol("SPY", simple_bars(5));
    let config = EngineConfig::new(vec!["SPY".into(), "IWM".into()], ts(0));
    let result = Backtest::assemble(
        config,
        &source,
        |_| Ok(Box::new(every_tick(1, 5)) as Box<dyn Strategy>),
        |_| Ok(Box::new(Recorder::new(1).0) as Box<dyn Portfolio>),
        || Ok(Box::new(SimulatedExecution::default()) as Box<dyn ExecutionHandler>),
    );
    match result {
        Err(EngineError::Setup { component, .. }) => assert_eq!(component, "data handler"),
        Err(other) => panic!("expected setup error, got {other:?}"),
        Ok(_) => panic!("expected setup error"),
    }
}

#[test]
fn assemble_reports_strategy_construction_failure() {
    let source = MemorySource::new().with_symbol("SPY", simple_bars(5));
    let result = Backtest::assemble(
        EngineConfig::new(vec!["SPY".into()], ts(0)),
        &source,
        |_| Err("bad lookback".into()),
        |_| Ok(Box::new(Recorder::new(1).0) as Box<dyn Portfolio>),
        || Ok(Box::new(SimulatedExecution::default()) as Box<dyn ExecutionHandler>),
    );
    match result {
        Err(EngineError::Setup { component, source }) => {
            assert_eq!(component, "strategy");
            assert_eq!(source.to_string(), "bad lookback");
        }
        Err(other) => panic!("expected setup error, got {other:?}"),
        Ok(_) => panic!("expected setup error"),
    }
}

#[test]
fn assembled_backtest_runs_over_loaded_data() {
    let source = MemorySource::new().with_symbol("SPY", simple_bars(6));
    let mut bt = Backtest::assemble(
        EngineConfig::new(vec!["SPY".into()], ts(2)),
        &source,
        |_| Ok(Box::new(every_tick(1, 10)) as Box<dyn Strategy>),
        |_| Ok(Box::new(Recorder::new(1).0) as Box<dyn Portfolio>),
        || Ok(Box::new(SimulatedExecution::default()) as Box<dyn ExecutionHandler>),
    )
    .unwrap();
    let summary = bt.run().unwrap();
    assert_eq!(summary.ticks, 4);
    assert_eq!(summary.counters.fills, 4);
    assert!(summary.journal.is_empty());
}
