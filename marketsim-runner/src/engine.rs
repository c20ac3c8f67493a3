//! Backtest engine — bar-by-bar event loop over a session window.
//!
//! Each bar the engine draws one quote per session symbol, re-attempts any
//! resting orders, stochastically synthesizes a new order from the seeded
//! trade generator, routes fills through the execution simulator and the
//! virtual ledger, and appends one equity point. All randomness derives from
//! the engine seed and the session id, so a run is reproducible bar-for-bar.
//!
//! `run` is long-running (proportional to window length ÷ interval) and is
//! expected to be invoked on a dedicated worker. It polls a [`CancelToken`]
//! at the top of every bar, so a stop is observable within one bar's worth
//! of work.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::Rng;
use thiserror::Error;

use marketsim_core::domain::{
    IdGen, Order, OrderSide, OrderType, Position, PositionSide, Quote, SessionId, Transaction,
};
use marketsim_core::error::{SimError, SimResult};
use marketsim_core::execution::{CostConfig, ExecutionOutcome, ExecutionSimulator};
use marketsim_core::ledger;
use marketsim_core::market::{QuoteGenerator, QuoteSeries};
use marketsim_core::rng::SimRng;

use crate::metrics;
use crate::session::{BacktestSession, EquityPoint, SessionStatus, TradeOutcome};
use crate::strategy::{RandomStrategy, Strategy, TradeIntent};

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Sim(#[from] SimError),

    #[error("session {0} is {1:?}, only pending sessions can run")]
    NotRunnable(SessionId, SessionStatus),
}

/// Cooperative cancellation signal shared between the caller and a run.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

/// Knobs for the built-in randomized trade generator.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineParams {
    /// Per-bar probability that a trade decision fires.
    pub trade_probability: f64,
    pub min_quantity: u32,
    pub max_quantity: u32,
    /// How far synthesized limit/stop prices sit from the touch, as a
    /// fraction of price.
    pub price_offset_pct: f64,
    pub costs: CostConfig,
}

impl Default for EngineParams {
    fn default() -> Self {
        Self {
            trade_probability: 0.15,
            min_quantity: 10,
            max_quantity: 200,
            price_offset_pct: 0.005,
            costs: CostConfig::default(),
        }
    }
}

impl EngineParams {
    pub fn validate(&self) -> SimResult<()> {
        if !(0.0..=1.0).contains(&self.trade_probability) {
            return Err(SimError::InvalidArgument(format!(
                "trade probability must be within [0, 1], got {}",
                self.trade_probability
            )));
        }
        if self.min_quantity == 0 || self.min_quantity > self.max_quantity {
            return Err(SimError::InvalidArgument(format!(
                "quantity bounds must satisfy 0 < min <= max, got {}..{}",
                self.min_quantity, self.max_quantity
            )));
        }
        if self.price_offset_pct < 0.0 {
            return Err(SimError::InvalidArgument(format!(
                "price offset must be non-negative, got {}",
                self.price_offset_pct
            )));
        }
        self.costs.validate()
    }
}

/// Everything a run produced. The caller persists what it wants to keep.
#[derive(Debug, Clone)]
pub struct BacktestReport {
    pub session_id: SessionId,
    pub points: Vec<EquityPoint>,
    pub trades: Vec<TradeOutcome>,
    pub transactions: Vec<Transaction>,
    pub orders: Vec<Order>,
    /// Set when the run failed mid-session; the points gathered before the
    /// failure are retained above.
    pub error: Option<String>,
}

/// An open lot with the entry commission it still owes against its P&L.
struct OpenLot {
    position: Position,
    entry_commission: f64,
}

/// Mutable state that evolves bar-by-bar during a run.
struct RunState {
    cash: f64,
    peak: f64,
    prev_equity: f64,
    ids: IdGen,
    rng: StdRng,
    /// Open lots by symbol. `BTreeMap` so the market-value sum runs in a
    /// stable order and equity stays bit-identical between replays.
    lots: BTreeMap<String, OpenLot>,
    last_price: BTreeMap<String, f64>,
    pending: Vec<Order>,
    points: Vec<EquityPoint>,
    trades: Vec<TradeOutcome>,
    transactions: Vec<Transaction>,
    orders: Vec<Order>,
}

impl RunState {
    fn new(initial_balance: f64, rng: StdRng) -> Self {
        Self {
            cash: initial_balance,
            peak: initial_balance,
            prev_equity: initial_balance,
            ids: IdGen::default(),
            rng,
            lots: BTreeMap::new(),
            last_price: BTreeMap::new(),
            pending: Vec::new(),
            points: Vec::new(),
            trades: Vec::new(),
            transactions: Vec::new(),
            orders: Vec::new(),
        }
    }

    fn into_report(self, session_id: SessionId, error: Option<String>) -> BacktestReport {
        BacktestReport {
            session_id,
            points: self.points,
            trades: self.trades,
            transactions: self.transactions,
            orders: self.orders,
            error,
        }
    }
}

/// Runs backtest sessions against simulated market data.
pub struct BacktestEngine {
    generator: QuoteGenerator,
    simulator: ExecutionSimulator,
    strategy: Box<dyn Strategy>,
    params: EngineParams,
    rng: SimRng,
}

impl BacktestEngine {
    pub fn new(seed: u64, params: EngineParams) -> SimResult<Self> {
        params.validate()?;
        let simulator = ExecutionSimulator::new(params.costs.clone())?;
        let strategy = RandomStrategy::new(
            params.trade_probability,
            params.min_quantity,
            params.max_quantity,
            params.price_offset_pct,
        );
        Ok(Self {
            generator: QuoteGenerator::new(seed),
            simulator,
            strategy: Box::new(strategy),
            params,
            rng: SimRng::new(seed),
        })
    }

    /// Replace the quote generator (e.g. to inject a custom price table).
    pub fn with_generator(mut self, generator: QuoteGenerator) -> Self {
        self.generator = generator;
        self
    }

    /// Plug in a strategy in place of the built-in randomized generator.
    pub fn with_strategy(mut self, strategy: Box<dyn Strategy>) -> Self {
        self.strategy = strategy;
        self
    }

    /// Execute `session` bar-by-bar over its window.
    ///
    /// Transitions Pending → Running, then to Completed, or to Stopped if
    /// `cancel` fires, or to Failed on a mid-run error (partial points are
    /// retained in the returned report either way). Only a Pending session
    /// can run.
    pub fn run(
        &self,
        session: &mut BacktestSession,
        cancel: &CancelToken,
    ) -> Result<BacktestReport, RunError> {
        if session.status != SessionStatus::Pending {
            return Err(RunError::NotRunnable(session.id.clone(), session.status));
        }
        session.status = SessionStatus::Running;

        let mut state = RunState::new(
            session.initial_balance,
            self.rng.stream(&format!("run:{}", session.id), 0),
        );

        let mut feeds: Vec<QuoteSeries> = Vec::with_capacity(session.symbols.len());
        for symbol in &session.symbols {
            match self.generator.quote_series(
                symbol,
                session.start,
                session.end,
                session.interval.label(),
            ) {
                Ok(feed) => feeds.push(feed),
                Err(err) => {
                    session.status = SessionStatus::Failed;
                    return Ok(state.into_report(session.id.clone(), Some(err.to_string())));
                }
            }
        }

        loop {
            // Stop must be observable within one bar of latency.
            if cancel.is_cancelled() {
                session.summary = Some(metrics::summarize(
                    session.initial_balance,
                    session.interval,
                    &state.points,
                    &state.trades,
                ));
                session.status = SessionStatus::Stopped;
                return Ok(state.into_report(session.id.clone(), None));
            }

            let mut bar_quotes: Vec<Quote> = Vec::with_capacity(feeds.len());
            for feed in feeds.iter_mut() {
                match feed.next() {
                    Some(quote) => bar_quotes.push(quote),
                    None => {
                        // All feeds share the window, so one drying up means
                        // the window is exhausted.
                        bar_quotes.clear();
                        break;
                    }
                }
            }
            if bar_quotes.is_empty() {
                break;
            }

            let now = bar_quotes[0].timestamp;
            if let Err(err) = self.step(session, &mut state, &bar_quotes, now) {
                session.status = SessionStatus::Failed;
                return Ok(state.into_report(session.id.clone(), Some(err.to_string())));
            }
        }

        session.summary = Some(metrics::summarize(
            session.initial_balance,
            session.interval,
            &state.points,
            &state.trades,
        ));
        session.status = SessionStatus::Completed;
        Ok(state.into_report(session.id.clone(), None))
    }

    /// One bar: resting orders, trade decision, equity sample.
    fn step(
        &self,
        session: &BacktestSession,
        state: &mut RunState,
        bar_quotes: &[Quote],
        now: DateTime<Utc>,
    ) -> SimResult<()> {
        for quote in bar_quotes {
            state.last_price.insert(quote.symbol.clone(), quote.close);
        }

        self.work_resting_orders(session, state, bar_quotes, now)?;

        // Consult the strategy on one symbol per bar; a symbol with a
        // working order is left alone until it resolves.
        let quote = bar_quotes[state.rng.gen_range(0..bar_quotes.len())].clone();
        if !state.pending.iter().any(|o| o.symbol == quote.symbol) {
            let has_open = state.lots.contains_key(&quote.symbol);
            if let Some(intent) = self.strategy.decide(&quote, has_open, &mut state.rng) {
                self.place_order(session, state, &quote, intent, now)?;
            }
        }

        let market_value: f64 = state
            .lots
            .values()
            .map(|lot| {
                let price = state
                    .last_price
                    .get(&lot.position.symbol)
                    .copied()
                    .unwrap_or(lot.position.avg_entry_price);
                lot.position.market_value(price)
            })
            .sum();
        let equity = state.cash + market_value;
        state.peak = state.peak.max(equity);
        let drawdown_pct = if state.peak > 0.0 {
            ((state.peak - equity) / state.peak * 100.0).max(0.0)
        } else {
            0.0
        };

        state.points.push(EquityPoint {
            timestamp: now,
            equity,
            drawdown_pct,
            cumulative_pnl: equity - session.initial_balance,
            daily_pnl: equity - state.prev_equity,
            market_value,
            cash: state.cash,
            open_positions: state.lots.len(),
        });
        state.prev_equity = equity;
        Ok(())
    }

    /// Re-attempt resting (pending/modified) orders against this bar.
    fn work_resting_orders(
        &self,
        session: &BacktestSession,
        state: &mut RunState,
        bar_quotes: &[Quote],
        now: DateTime<Utc>,
    ) -> SimResult<()> {
        let mut resting = std::mem::take(&mut state.pending);
        let mut still_resting = Vec::with_capacity(resting.len());
        for mut order in resting.drain(..) {
            let Some(quote) = bar_quotes.iter().find(|q| q.symbol == order.symbol) else {
                still_resting.push(order);
                continue;
            };
            match self.simulator.execute(&mut order, quote, &mut state.rng, now)? {
                ExecutionOutcome::Filled => self.settle_fill(session, state, order, now)?,
                ExecutionOutcome::Pending => still_resting.push(order),
            }
        }
        state.pending = still_resting;
        Ok(())
    }

    /// Turn a strategy intent into an order and route it to the simulator.
    fn place_order(
        &self,
        session: &BacktestSession,
        state: &mut RunState,
        quote: &Quote,
        intent: TradeIntent,
        now: DateTime<Utc>,
    ) -> SimResult<()> {
        let mut order = match intent {
            TradeIntent::Exit => {
                let Some(lot) = state.lots.get(&quote.symbol) else {
                    return Ok(());
                };
                let side = match lot.position.side {
                    PositionSide::Long => OrderSide::Sell,
                    PositionSide::Short => OrderSide::Buy,
                };
                Order::new(
                    state.ids.order_id(),
                    &quote.symbol,
                    side,
                    OrderType::Market,
                    lot.position.quantity,
                    now,
                )
            }
            TradeIntent::Enter {
                side,
                order_type,
                quantity,
            } => {
                // Skip entries the balance cannot cover; shorts reserve the
                // same notional as exposure.
                let est_cost =
                    quote.ask * quantity as f64 * (1.0 + self.params.price_offset_pct);
                if est_cost > state.cash {
                    return Ok(());
                }
                Order::new(
                    state.ids.order_id(),
                    &quote.symbol,
                    side,
                    order_type,
                    quantity,
                    now,
                )
            }
        };

        match self.simulator.execute(&mut order, quote, &mut state.rng, now)? {
            ExecutionOutcome::Filled => self.settle_fill(session, state, order, now)?,
            ExecutionOutcome::Pending => state.pending.push(order),
        }
        Ok(())
    }

    /// Post a fill to the ledger and update cash, lots, and the trade log.
    fn settle_fill(
        &self,
        session: &BacktestSession,
        state: &mut RunState,
        order: Order,
        now: DateTime<Utc>,
    ) -> SimResult<()> {
        let txn = ledger::apply_fill(&mut state.ids, &session.account_id, state.cash, &order, now)?;
        state.cash = txn.balance_after;
        state.transactions.push(txn);

        let fill_price = order.avg_fill_price;
        let commission = order
            .execution
            .as_ref()
            .map(|report| report.commission)
            .unwrap_or(0.0);

        // A fill against an open lot on the opposite side is an exit; any
        // other fill opens a fresh lot (the per-symbol working-order guard
        // means a same-side fill never finds a lot to collide with).
        let closes_lot = state
            .lots
            .get(&order.symbol)
            .is_some_and(|lot| lot.position.side.sign() * order.side.sign() < 0.0);
        if closes_lot {
            if let Some(mut lot) = state.lots.remove(&order.symbol) {
                lot.position.close(now);
                let net_pnl =
                    lot.position.pnl_at(fill_price) - commission - lot.entry_commission;
                state.trades.push(TradeOutcome {
                    symbol: order.symbol.clone(),
                    side: lot.position.side,
                    quantity: lot.position.quantity,
                    entry_price: lot.position.avg_entry_price,
                    exit_price: fill_price,
                    net_pnl,
                    closed_at: now,
                });
            }
        } else {
            let side = match order.side {
                OrderSide::Buy => PositionSide::Long,
                OrderSide::Sell => PositionSide::Short,
            };
            state.lots.insert(
                order.symbol.clone(),
                OpenLot {
                    position: Position::open(
                        &order.symbol,
                        side,
                        order.filled_quantity,
                        fill_price,
                        now,
                    ),
                    entry_commission: commission,
                },
            );
        }

        state.orders.push(order);
        Ok(())
    }
}
