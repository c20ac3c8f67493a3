//! Backtest orchestration — sessions, the bar-by-bar engine loop,
//! performance metrics, comparisons and parameter sweeps, configuration,
//! and artifact export.

pub mod compare;
pub mod config;
pub mod engine;
pub mod export;
pub mod metrics;
pub mod session;
pub mod strategy;
pub mod sweep;

pub use compare::{compare_sessions, SessionRanking};
pub use config::{ConfigError, RunnerConfig};
pub use engine::{BacktestEngine, BacktestReport, CancelToken, EngineParams, RunError};
pub use session::{
    BacktestSession, EquityPoint, SessionSpec, SessionStatus, SessionSummary, TradeOutcome,
};
pub use strategy::{RandomStrategy, Strategy, TradeIntent};
pub use sweep::{sweep, SweepGrid, SweepOutcome};
