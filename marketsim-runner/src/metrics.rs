//! Performance metrics — pure functions that compute run statistics.
//!
//! Every metric is a pure function: equity curve and/or trade list in,
//! scalar out. Annualization uses the session interval's bars-per-year
//! factor, so intraday and daily sessions are comparable.

use crate::session::{EquityPoint, SessionSummary, TradeOutcome};
use marketsim_core::domain::BarInterval;

/// Per-bar returns from an equity curve.
pub fn returns(equity: &[f64]) -> Vec<f64> {
    if equity.len() < 2 {
        return Vec::new();
    }
    equity
        .windows(2)
        .map(|w| if w[0] > 0.0 { (w[1] - w[0]) / w[0] } else { 0.0 })
        .collect()
}

/// Annualized Sharpe ratio from per-bar returns (zero risk-free rate).
///
/// Returns 0.0 for fewer than 2 bars or zero variance.
pub fn sharpe_ratio(equity: &[f64], periods_per_year: f64) -> f64 {
    let rets = returns(equity);
    if rets.len() < 2 {
        return 0.0;
    }
    let mean = mean(&rets);
    let std = std_dev(&rets);
    if std < 1e-15 {
        return 0.0;
    }
    (mean / std) * periods_per_year.sqrt()
}

/// Maximum drawdown as a percentage of the running peak (never negative).
pub fn max_drawdown_pct(equity: &[f64]) -> f64 {
    let mut peak = f64::MIN;
    let mut max_dd = 0.0_f64;
    for &eq in equity {
        if eq > peak {
            peak = eq;
        }
        if peak > 0.0 {
            let dd = (peak - eq) / peak * 100.0;
            if dd > max_dd {
                max_dd = dd;
            }
        }
    }
    max_dd
}

/// Compound annualized growth rate over the curve.
///
/// Returns 0.0 for single-bar curves or non-positive equity.
pub fn annualized_return(equity: &[f64], periods_per_year: f64) -> f64 {
    if equity.len() < 2 {
        return 0.0;
    }
    let initial = equity[0];
    let final_eq = equity[equity.len() - 1];
    if initial <= 0.0 || final_eq <= 0.0 {
        return 0.0;
    }
    let periods = (equity.len() - 1) as f64;
    (final_eq / initial).powf(periods_per_year / periods) - 1.0
}

/// Fraction of trades that were winners.
pub fn win_rate(trades: &[TradeOutcome]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    trades.iter().filter(|t| t.is_winner()).count() as f64 / trades.len() as f64
}

/// Gross profits / gross losses, capped at 100.0 when losses are zero.
pub fn profit_factor(trades: &[TradeOutcome]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    let gross_profit: f64 = trades
        .iter()
        .filter(|t| t.net_pnl > 0.0)
        .map(|t| t.net_pnl)
        .sum();
    let gross_loss: f64 = trades
        .iter()
        .filter(|t| t.net_pnl < 0.0)
        .map(|t| t.net_pnl.abs())
        .sum();
    if gross_loss < 1e-10 {
        return if gross_profit > 0.0 { 100.0 } else { 0.0 };
    }
    (gross_profit / gross_loss).min(100.0)
}

/// Roll a run's result points and trade log into a session summary.
///
/// The summary's max drawdown is the maximum drawdown value observed across
/// the points, not a recomputation.
pub fn summarize(
    initial_balance: f64,
    interval: BarInterval,
    points: &[EquityPoint],
    trades: &[TradeOutcome],
) -> SessionSummary {
    let equity: Vec<f64> = points.iter().map(|p| p.equity).collect();
    let winning_trades = trades.iter().filter(|t| t.is_winner()).count();
    let periods_per_year = interval.periods_per_year();
    SessionSummary {
        final_balance: equity.last().copied().unwrap_or(initial_balance),
        total_trades: trades.len(),
        winning_trades,
        losing_trades: trades.len() - winning_trades,
        win_rate: win_rate(trades),
        profit_factor: profit_factor(trades),
        sharpe: sharpe_ratio(&equity, periods_per_year),
        max_drawdown: points.iter().map(|p| p.drawdown_pct).fold(0.0, f64::max),
        annualized_return: annualized_return(&equity, periods_per_year),
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}
