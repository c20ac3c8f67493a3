//! Backtest sessions, equity points, and run summaries.

use chrono::{DateTime, Utc};
use marketsim_core::domain::{BarInterval, PositionSide, SessionId};
use marketsim_core::error::{SimError, SimResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Session lifecycle states.
///
/// Pending → Running → {Completed, Stopped, Failed}.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionStatus {
    Pending,
    Running,
    Completed,
    Stopped,
    Failed,
}

/// Caller-supplied parameters for a new session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSpec {
    pub account_id: String,
    pub name: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub symbols: Vec<String>,
    /// Interval label; unrecognized labels fall back to hourly bars.
    pub interval: String,
    pub initial_balance: f64,
    pub strategy_id: String,
    /// `BTreeMap` keeps key order stable so the canonical serialization
    /// (and the session id hashed from it) is deterministic.
    pub strategy_params: BTreeMap<String, f64>,
}

/// Summary statistics rolled up when a run completes or is stopped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub final_balance: f64,
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub win_rate: f64,
    pub profit_factor: f64,
    pub sharpe: f64,
    /// Maximum drawdown percentage observed across the result points.
    pub max_drawdown: f64,
    pub annualized_return: f64,
}

/// One backtest session.
///
/// Created once via [`BacktestSession::create`]; the engine drives status
/// transitions and writes the summary only on completion or stop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestSession {
    pub id: SessionId,
    pub account_id: String,
    pub name: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub symbols: Vec<String>,
    pub interval: BarInterval,
    pub initial_balance: f64,
    pub strategy_id: String,
    pub strategy_params: BTreeMap<String, f64>,
    pub status: SessionStatus,
    pub summary: Option<SessionSummary>,
    pub created_at: DateTime<Utc>,
}

impl BacktestSession {
    /// Validate `spec` and build a Pending session.
    ///
    /// The session id is a content hash of the spec, so the same spec always
    /// yields the same id (and therefore the same randomness downstream).
    pub fn create(spec: SessionSpec, now: DateTime<Utc>) -> SimResult<Self> {
        if spec.name.is_empty() {
            return Err(SimError::InvalidArgument(
                "session name must not be empty".into(),
            ));
        }
        if spec.start >= spec.end {
            return Err(SimError::InvalidArgument(format!(
                "session start {} must be before end {}",
                spec.start, spec.end
            )));
        }
        if spec.symbols.is_empty() {
            return Err(SimError::InvalidArgument(
                "session requires at least one symbol".into(),
            ));
        }
        if spec.symbols.iter().any(|s| s.is_empty()) {
            return Err(SimError::InvalidArgument(
                "session symbols must not be empty".into(),
            ));
        }
        if spec.interval.is_empty() {
            return Err(SimError::InvalidArgument(
                "session interval must not be empty".into(),
            ));
        }
        if spec.initial_balance <= 0.0 {
            return Err(SimError::InvalidArgument(format!(
                "initial balance must be positive, got {}",
                spec.initial_balance
            )));
        }

        let id = session_id(&spec);
        let interval = BarInterval::parse_lossy(&spec.interval);
        Ok(Self {
            id,
            account_id: spec.account_id,
            name: spec.name,
            start: spec.start,
            end: spec.end,
            symbols: spec.symbols,
            interval,
            initial_balance: spec.initial_balance,
            strategy_id: spec.strategy_id,
            strategy_params: spec.strategy_params,
            status: SessionStatus::Pending,
            summary: None,
            created_at: now,
        })
    }
}

/// Deterministic session id: BLAKE3 over the canonical spec serialization.
fn session_id(spec: &SessionSpec) -> SessionId {
    let json = serde_json::to_string(spec).unwrap_or_default();
    let hash = blake3::hash(json.as_bytes());
    SessionId(format!("BT-{}", &hash.to_hex().as_str()[..16]))
}

/// One equity-curve sample, appended per bar of the session window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub timestamp: DateTime<Utc>,
    pub equity: f64,
    /// Decline from the running peak, as a percentage (never negative).
    pub drawdown_pct: f64,
    pub cumulative_pnl: f64,
    pub daily_pnl: f64,
    pub market_value: f64,
    pub cash: f64,
    pub open_positions: usize,
}

/// One round-trip trade closed during a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeOutcome {
    pub symbol: String,
    pub side: PositionSide,
    pub quantity: u32,
    pub entry_price: f64,
    pub exit_price: f64,
    /// Realized P&L net of both legs' commissions.
    pub net_pnl: f64,
    pub closed_at: DateTime<Utc>,
}

impl TradeOutcome {
    pub fn is_winner(&self) -> bool {
        self.net_pnl > 0.0
    }
}
