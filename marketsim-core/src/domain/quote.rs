//! Quote — the fundamental simulated market data unit.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Prices are clamped so no simulated value ever reaches zero or below.
pub const PRICE_FLOOR: f64 = 0.01;

/// Supported bar intervals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BarInterval {
    M1,
    M5,
    M15,
    H1,
    D1,
}

impl BarInterval {
    /// Parse an interval label. Unrecognized labels fall back to `H1` so a
    /// quote request never fails on the interval alone.
    pub fn parse_lossy(label: &str) -> Self {
        match label {
            "1m" => Self::M1,
            "5m" => Self::M5,
            "15m" => Self::M15,
            "1h" => Self::H1,
            "1d" => Self::D1,
            _ => Self::H1,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::M1 => "1m",
            Self::M5 => "5m",
            Self::M15 => "15m",
            Self::H1 => "1h",
            Self::D1 => "1d",
        }
    }

    pub fn duration(&self) -> Duration {
        match self {
            Self::M1 => Duration::minutes(1),
            Self::M5 => Duration::minutes(5),
            Self::M15 => Duration::minutes(15),
            Self::H1 => Duration::hours(1),
            Self::D1 => Duration::days(1),
        }
    }

    /// Number of bars in a trading year at this interval, used to annualize
    /// return and volatility figures. Assumes 252 trading days of 6.5 hours.
    pub fn periods_per_year(&self) -> f64 {
        match self {
            Self::M1 => 252.0 * 390.0,
            Self::M5 => 252.0 * 78.0,
            Self::M15 => 252.0 * 26.0,
            Self::H1 => 252.0 * 6.5,
            Self::D1 => 252.0,
        }
    }
}

impl fmt::Display for BarInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One simulated OHLCV snapshot with top-of-book bid/ask.
///
/// Immutable value: produced fresh per request, never mutated by the core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quote {
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
    pub bid: f64,
    pub ask: f64,
    pub bid_size: u64,
    pub ask_size: u64,
    pub interval: BarInterval,
    pub source: String,
    pub simulated: bool,
}

impl Quote {
    pub fn mid(&self) -> f64 {
        (self.bid + self.ask) / 2.0
    }

    pub fn spread(&self) -> f64 {
        self.ask - self.bid
    }

    /// OHLC/book sanity: high >= low, ask >= bid, strictly positive prices.
    pub fn is_sane(&self) -> bool {
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
            && self.ask >= self.bid
            && self.low > 0.0
            && self.bid > 0.0
    }
}
