//! Read-only comparison of completed sessions.

use crate::session::{BacktestSession, SessionStatus};
use marketsim_core::domain::SessionId;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// One row of a session comparison, ordered best-first by Sharpe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRanking {
    pub session_id: SessionId,
    pub name: String,
    pub status: SessionStatus,
    pub final_balance: f64,
    pub annualized_return: f64,
    pub sharpe: f64,
    pub max_drawdown: f64,
    pub profit_factor: f64,
}

/// Rank sessions by their rolled-up summaries.
///
/// Pure aggregation over already-finished sessions: entries without a
/// summary (pending, running, failed runs) are skipped, nothing is mutated.
pub fn compare_sessions(sessions: &[BacktestSession]) -> Vec<SessionRanking> {
    let mut rankings: Vec<SessionRanking> = sessions
        .iter()
        .filter_map(|session| {
            session.summary.as_ref().map(|summary| SessionRanking {
                session_id: session.id.clone(),
                name: session.name.clone(),
                status: session.status,
                final_balance: summary.final_balance,
                annualized_return: summary.annualized_return,
                sharpe: summary.sharpe,
                max_drawdown: summary.max_drawdown,
                profit_factor: summary.profit_factor,
            })
        })
        .collect();
    rankings.sort_by(|a, b| b.sharpe.partial_cmp(&a.sharpe).unwrap_or(Ordering::Equal));
    rankings
}
