//! The orchestrator: owns the queue, drives the tick loop, routes events.

use super::components::{Portfolio, Strategy};
use super::config::EngineConfig;
use super::state::{DispatchRecord, LoopState, RunCounters, RunSummary};
use crate::clock::{Clock, TickClock};
use crate::data::{BarSource, BarStream};
use crate::error::{BoxError, EngineError};
use crate::events::{Event, EventKind, EventQueue, MarketEvent};
use crate::execution::ExecutionHandler;

/// An event-driven backtest over one bar stream.
///
/// Single-threaded: ticks run strictly in sequence and each tick's queue is
/// drained in FIFO order before the stream advances again.
pub struct Backtest {
    config: EngineConfig,
    bars: BarStream,
    strategy: Box<dyn Strategy>,
    portfolio: Box<dyn Portfolio>,
    execution: Box<dyn ExecutionHandler>,
    clock: Box<dyn Clock>,
    queue: EventQueue,
    counters: RunCounters,
    journal: Vec<DispatchRecord>,
    state: LoopState,
}

impl Backtest {
    /// Wire already-built collaborators. Fills are stamped by a [`TickClock`].
    pub fn new(
        config: EngineConfig,
        bars: BarStream,
        strategy: Box<dyn Strategy>,
        portfolio: Box<dyn Portfolio>,
        execution: Box<dyn ExecutionHandler>,
    ) -> Self {
        Self {
            config,
            bars,
            strategy,
            portfolio,
            execution,
            clock: Box::new(TickClock::new()),
            queue: EventQueue::new(),
            counters: RunCounters::default(),
            journal: Vec::new(),
            state: LoopState::Initializing,
        }
    }

    /// Load the stream from `source`, then build strategy, portfolio and
    /// execution handler in that order.
    ///
    /// The first failure aborts construction with [`EngineError::Setup`];
    /// nothing has ticked at that point.
    pub fn assemble<S, P, X>(
        config: EngineConfig,
        source: &dyn BarSource,
        make_strategy: S,
        make_portfolio: P,
        make_execution: X,
    ) -> Result<Self, EngineError>
    where
        S: FnOnce(&BarStream) -> Result<Box<dyn Strategy>, BoxError>,
        P: FnOnce(&BarStream) -> Result<Box<dyn Portfolio>, BoxError>,
        X: FnOnce() -> Result<Box<dyn ExecutionHandler>, BoxError>,
    {
        let setup = |component: &'static str| {
            move |source: BoxError| EngineError::Setup { component, source }
        };

        tracing::info!(source = source.name(), symbols = ?config.symbols, "creating data handler");
        let bars = BarStream::load(source, &config.symbols, config.start, config.gap_policy)
            .map_err(|e| EngineError::Setup {
                component: "data handler",
                source: Box::new(e),
            })?;
        tracing::info!("creating strategy");
        let strategy = make_strategy(&bars).map_err(setup("strategy"))?;
        tracing::info!("creating portfolio");
        let portfolio = make_portfolio(&bars).map_err(setup("portfolio"))?;
        tracing::info!("creating execution handler");
        let execution = make_execution().map_err(setup("execution handler"))?;

        Ok(Self::new(config, bars, strategy, portfolio, execution))
    }

    /// Replace the clock handed to the execution handler.
    pub fn with_clock(mut self, clock: Box<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn counters(&self) -> RunCounters {
        self.counters
    }

    pub fn bars(&self) -> &BarStream {
        &self.bars
    }

    /// Stop after the current tick; the next advance reports exhaustion.
    pub fn stop(&mut self) {
        self.bars.stop();
    }

    pub fn portfolio(&self) -> &dyn Portfolio {
        self.portfolio.as_ref()
    }

    pub fn strategy(&self) -> &dyn Strategy {
        self.strategy.as_ref()
    }

    /// Run ticks until the stream is exhausted.
    ///
    /// Calling this again on a finished backtest returns the same summary
    /// without ticking.
    pub fn run(&mut self) -> Result<RunSummary, EngineError> {
        if self.state != LoopState::Finished {
            tracing::info!(symbols = self.bars.symbols().len(), "running backtest");
            while self.step()? {}
        }
        Ok(self.summary())
    }

    /// Run one tick. Returns `false` once the stream is exhausted.
    pub fn step(&mut self) -> Result<bool, EngineError> {
        if self.state == LoopState::Finished {
            return Ok(false);
        }
        self.state = LoopState::Running;

        if !self.bars.advance() {
            self.finish();
            return Ok(false);
        }
        let tick = self.bars.tick_count();
        let Some(timestamp) = self.bars.latest_timestamp() else {
            self.finish();
            return Ok(false);
        };
        tracing::debug!(tick, %timestamp, "tick");

        self.clock.on_tick(timestamp);
        self.queue.push(MarketEvent { tick, timestamp });

        self.state = LoopState::Draining;
        if let Err(e) = self.drain(tick) {
            self.state = LoopState::Finished;
            return Err(e);
        }
        self.state = LoopState::Running;

        if !self.config.heartbeat.is_zero() {
            std::thread::sleep(self.config.heartbeat);
        }
        Ok(true)
    }

    fn drain(&mut self, tick: u64) -> Result<(), EngineError> {
        while let Some(event) = self.queue.pop() {
            let kind = event.kind();
            self.counters.record(kind);
            if self.config.record_dispatch {
                self.journal.push(DispatchRecord { tick, kind });
            }
            tracing::trace!(tick, %kind, "dispatch");

            let before = self.queue.len();
            match event {
                Event::Market(market) => {
                    self.strategy
                        .on_market(&market, &self.bars, &mut self.queue)
                        .map_err(collaborator("strategy", tick))?;
                    check_produced(&self.queue, before, tick, kind)?;

                    let before_tick = self.queue.len();
                    self.portfolio
                        .on_tick(&self.bars)
                        .map_err(collaborator("portfolio", tick))?;
                    check_silent(&self.queue, before_tick, tick, kind)?;
                }
                Event::Signal(signal) => {
                    self.portfolio
                        .on_signal(&signal, &self.bars, &mut self.queue)
                        .map_err(collaborator("portfolio", tick))?;
                    check_produced(&self.queue, before, tick, kind)?;
                }
                Event::Order(order) => {
                    self.execution
                        .execute(&order, self.clock.as_ref(), &mut self.queue)
                        .map_err(collaborator("execution handler", tick))?;
                    check_produced(&self.queue, before, tick, kind)?;
                    let fills = self.queue.len() - before;
                    if fills != 1 {
                        return Err(EngineError::ExecutionContract { tick, fills });
                    }
                }
                Event::Fill(fill) => {
                    self.portfolio
                        .on_fill(&fill, &self.bars)
                        .map_err(collaborator("portfolio", tick))?;
                    check_silent(&self.queue, before, tick, kind)?;
                }
            }
        }
        Ok(())
    }

    fn finish(&mut self) {
        if self.state == LoopState::Finished {
            return;
        }
        self.state = LoopState::Finished;
        self.strategy.on_finish();
        tracing::info!(
            ticks = self.bars.tick_count(),
            signals = self.counters.signals,
            orders = self.counters.orders,
            fills = self.counters.fills,
            "backtest finished"
        );
    }

    fn summary(&self) -> RunSummary {
        RunSummary {
            ticks: self.bars.tick_count(),
            counters: self.counters,
            journal: self.journal.clone(),
        }
    }
}

fn collaborator(component: &'static str, tick: u64) -> impl FnOnce(BoxError) -> EngineError {
    move |source| EngineError::Collaborator {
        component,
        tick,
        source,
    }
}

/// Everything enqueued since `before` must be a kind `consumed` may produce.
fn check_produced(
    queue: &EventQueue,
    before: usize,
    tick: u64,
    consumed: EventKind,
) -> Result<(), EngineError> {
    match queue.kinds_from(before).find(|k| !consumed.may_produce(*k)) {
        Some(produced) => Err(EngineError::OrderingViolation {
            tick,
            consumed,
            produced,
        }),
        None => Ok(()),
    }
}

/// Nothing may have been enqueued since `before`.
fn check_silent(
    queue: &EventQueue,
    before: usize,
    tick: u64,
    consumed: EventKind,
) -> Result<(), EngineError> {
    match queue.kinds_from(before).next() {
        Some(produced) => Err(EngineError::OrderingViolation {
            tick,
            consumed,
            produced,
        }),
        None => Ok(()),
    }
}
