//! Simulated quote generation.
//!
//! Quotes come from a pluggable base-price table perturbed by a seeded,
//! bounded random walk. Every stream is derived from the generator's master
//! seed, so requesting the same series twice yields the identical sequence.

use crate::clock::{Clock, SystemClock};
use crate::domain::{BarInterval, Quote, PRICE_FLOOR};
use crate::error::{SimError, SimResult};
use crate::rng::SimRng;
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

/// Per-bar move scale before condition multipliers (±1%).
const BASE_VOLATILITY: f64 = 0.01;
/// Fraction of the previous bar's move carried into the next bar, so the
/// walk trends slowly instead of being i.i.d. noise.
const CARRY_FRACTION: f64 = 0.3;
/// Upper bound on wick extension beyond the bar body.
const WICK_FRACTION: f64 = 0.004;
/// Bid/ask spread as a fraction of the last price.
const SPREAD_FRACTION: f64 = 0.0005;
const BASE_VOLUME: u64 = 1_000_000;
const BASE_BOOK_SIZE: u64 = 500;

/// Base-price lookup for simulated symbols.
///
/// This is a pluggable seam: real deployments inject a table fed by a live
/// price source; the built-in default serves pure simulation. Unknown
/// symbols resolve to the default price rather than an error.
#[derive(Debug, Clone)]
pub struct PriceTable {
    prices: HashMap<String, f64>,
    default_price: f64,
}

impl PriceTable {
    pub fn new(default_price: f64) -> Self {
        Self {
            prices: HashMap::new(),
            default_price,
        }
    }

    pub fn insert(&mut self, symbol: impl Into<String>, price: f64) {
        self.prices.insert(symbol.into(), price);
    }

    pub fn base_price(&self, symbol: &str) -> f64 {
        self.prices
            .get(symbol)
            .copied()
            .unwrap_or(self.default_price)
    }
}

impl Default for PriceTable {
    fn default() -> Self {
        let mut table = Self::new(100.0);
        for (symbol, price) in [
            ("AAPL", 178.5),
            ("MSFT", 412.3),
            ("GOOGL", 141.8),
            ("AMZN", 176.2),
            ("TSLA", 248.5),
            ("NVDA", 885.1),
            ("META", 505.6),
            ("SPY", 510.4),
            ("QQQ", 438.7),
            ("IWM", 201.9),
        ] {
            table.insert(symbol, price);
        }
        table
    }
}

/// Named market condition scaling a quote series.
///
/// Each condition maps to a fixed (volatility multiplier, per-bar trend
/// fraction, volume multiplier) triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarketCondition {
    HighVolatility,
    LowVolatility,
    Uptrend,
    Downtrend,
    Sideways,
    MarketCrash,
    MarketRally,
}

impl MarketCondition {
    pub fn label(&self) -> &'static str {
        match self {
            Self::HighVolatility => "HIGH_VOLATILITY",
            Self::LowVolatility => "LOW_VOLATILITY",
            Self::Uptrend => "UPTREND",
            Self::Downtrend => "DOWNTREND",
            Self::Sideways => "SIDEWAYS",
            Self::MarketCrash => "MARKET_CRASH",
            Self::MarketRally => "MARKET_RALLY",
        }
    }

    /// (volatility multiplier, per-bar trend fraction, volume multiplier).
    fn params(&self) -> (f64, f64, f64) {
        match self {
            Self::HighVolatility => (2.5, 0.0, 1.8),
            Self::LowVolatility => (0.4, 0.0, 0.7),
            Self::Uptrend => (1.0, 0.002, 1.0),
            Self::Downtrend => (1.0, -0.002, 1.0),
            Self::Sideways => (0.5, 0.0, 0.9),
            Self::MarketCrash => (3.0, -0.02, 2.5),
            Self::MarketRally => (2.0, 0.012, 2.0),
        }
    }
}

impl FromStr for MarketCondition {
    type Err = SimError;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        match tag {
            "HIGH_VOLATILITY" => Ok(Self::HighVolatility),
            "LOW_VOLATILITY" => Ok(Self::LowVolatility),
            "UPTREND" => Ok(Self::Uptrend),
            "DOWNTREND" => Ok(Self::Downtrend),
            "SIDEWAYS" => Ok(Self::Sideways),
            "MARKET_CRASH" => Ok(Self::MarketCrash),
            "MARKET_RALLY" => Ok(Self::MarketRally),
            other => Err(SimError::InvalidArgument(format!(
                "unknown market condition '{other}'"
            ))),
        }
    }
}

/// Lazy, finite sequence of simulated quotes.
///
/// The walk is bounded: each bar moves by at most roughly
/// `BASE_VOLATILITY * volatility multiplier` plus trend and carry, and no
/// price ever drops below [`PRICE_FLOOR`].
pub struct QuoteSeries {
    symbol: String,
    interval: BarInterval,
    next_ts: DateTime<Utc>,
    end: DateTime<Utc>,
    price: f64,
    carry: f64,
    vol_mult: f64,
    trend: f64,
    volume_mult: f64,
    rng: StdRng,
}

impl Iterator for QuoteSeries {
    type Item = Quote;

    fn next(&mut self) -> Option<Quote> {
        if self.next_ts >= self.end {
            return None;
        }

        let shock: f64 = self.rng.gen_range(-1.0..=1.0);
        let move_pct = shock * BASE_VOLATILITY * self.vol_mult + self.trend
            + CARRY_FRACTION * self.carry;
        self.carry = move_pct;

        let open = self.price;
        let close = (open * (1.0 + move_pct)).max(PRICE_FLOOR);
        let wick_up: f64 = self.rng.gen_range(0.0..WICK_FRACTION) * self.vol_mult;
        let wick_down: f64 = self.rng.gen_range(0.0..WICK_FRACTION) * self.vol_mult;
        let high = open.max(close) * (1.0 + wick_up);
        let low = (open.min(close) * (1.0 - wick_down)).max(PRICE_FLOOR);

        let spread = close * SPREAD_FRACTION;
        let bid = (close - spread / 2.0).max(PRICE_FLOOR);
        let ask = bid + spread;

        let volume =
            (BASE_VOLUME as f64 * self.volume_mult * self.rng.gen_range(0.5..1.5)) as u64;
        let bid_size =
            (BASE_BOOK_SIZE as f64 * self.volume_mult * self.rng.gen_range(0.5..1.5)) as u64;
        let ask_size =
            (BASE_BOOK_SIZE as f64 * self.volume_mult * self.rng.gen_range(0.5..1.5)) as u64;

        let quote = Quote {
            symbol: self.symbol.clone(),
            timestamp: self.next_ts,
            open,
            high,
            low,
            close,
            volume,
            bid,
            ask,
            bid_size,
            ask_size,
            interval: self.interval,
            source: "simulator".into(),
            simulated: true,
        };

        self.price = close;
        self.next_ts += self.interval.duration();
        Some(quote)
    }
}

/// Produces simulated quotes and quote series.
pub struct QuoteGenerator {
    prices: PriceTable,
    rng: SimRng,
    clock: Arc<dyn Clock>,
}

impl QuoteGenerator {
    pub fn new(seed: u64) -> Self {
        Self {
            prices: PriceTable::default(),
            rng: SimRng::new(seed),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_price_table(mut self, prices: PriceTable) -> Self {
        self.prices = prices;
        self
    }

    /// One simulated snapshot for `symbol` at the clock's current instant.
    ///
    /// Deterministic given the price table: the same base price always
    /// yields the same quote shape.
    pub fn current_quote(&self, symbol: &str) -> SimResult<Quote> {
        if symbol.is_empty() {
            return Err(SimError::InvalidArgument("symbol must not be empty".into()));
        }

        let base = self.prices.base_price(symbol);
        let spread = base * SPREAD_FRACTION;
        let bid = base - spread / 2.0;

        Ok(Quote {
            symbol: symbol.to_string(),
            timestamp: self.clock.now(),
            open: base,
            high: base * (1.0 + WICK_FRACTION),
            low: base * (1.0 - WICK_FRACTION),
            close: base,
            volume: BASE_VOLUME,
            bid,
            ask: bid + spread,
            bid_size: BASE_BOOK_SIZE,
            ask_size: BASE_BOOK_SIZE,
            interval: BarInterval::M1,
            source: "simulator".into(),
            simulated: true,
        })
    }

    /// A quote per bar over `[start, end)` at `interval_label` spacing.
    ///
    /// Unrecognized interval labels fall back to hourly bars. The series is
    /// restartable: calling this again with the same arguments yields the
    /// identical sequence.
    pub fn quote_series(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        interval_label: &str,
    ) -> SimResult<QuoteSeries> {
        if symbol.is_empty() {
            return Err(SimError::InvalidArgument("symbol must not be empty".into()));
        }
        if interval_label.is_empty() {
            return Err(SimError::InvalidArgument(
                "interval must not be empty".into(),
            ));
        }

        let interval = BarInterval::parse_lossy(interval_label);
        Ok(self.walk(
            symbol,
            self.prices.base_price(symbol),
            start,
            end,
            interval,
            (1.0, 0.0, 1.0),
            format!("series:{symbol}"),
            start.timestamp() as u64,
        ))
    }

    /// A series of `bars` quotes continuing from `quote` under `condition`.
    ///
    /// The condition's triple scales the walk's volatility, per-bar trend,
    /// and traded volume.
    pub fn condition_series(
        &self,
        quote: &Quote,
        condition: MarketCondition,
        bars: usize,
    ) -> SimResult<QuoteSeries> {
        if bars == 0 {
            return Err(SimError::InvalidArgument(
                "condition series must cover at least one bar".into(),
            ));
        }

        let start = quote.timestamp + quote.interval.duration();
        let end = start + quote.interval.duration() * bars as i32;
        Ok(self.walk(
            &quote.symbol,
            quote.close,
            start,
            end,
            quote.interval,
            condition.params(),
            format!("condition:{}:{}", quote.symbol, condition.label()),
            quote.timestamp.timestamp() as u64,
        ))
    }

    #[allow(clippy::too_many_arguments)]
    fn walk(
        &self,
        symbol: &str,
        start_price: f64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        interval: BarInterval,
        (vol_mult, trend, volume_mult): (f64, f64, f64),
        stream_label: String,
        stream_index: u64,
    ) -> QuoteSeries {
        QuoteSeries {
            symbol: symbol.to_string(),
            interval,
            next_ts: start,
            end,
            price: start_price.max(PRICE_FLOOR),
            carry: 0.0,
            vol_mult,
            trend,
            volume_mult,
            rng: self.rng.stream(&stream_label, stream_index),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap()
    }

    fn generator() -> QuoteGenerator {
        QuoteGenerator::new(42).with_clock(Arc::new(FixedClock::new(t0())))
    }

    #[test]
    fn current_quote_rejects_empty_symbol() {
        let err = generator().current_quote("").unwrap_err();
        assert!(matches!(err, SimError::InvalidArgument(_)));
    }

    #[test]
    fn current_quote_uses_table_price() {
        let quote = generator().current_quote("AAPL").unwrap();
        assert_eq!(quote.close, 178.5);
        assert!(quote.bid < quote.ask);
        assert!(quote.simulated);
        assert_eq!(quote.timestamp, t0());
        assert!(quote.is_sane());
    }

    #[test]
    fn unknown_symbol_gets_default_price() {
        let quote = generator().current_quote("ZZZZ").unwrap();
        assert_eq!(quote.close, 100.0);
    }

    #[test]
    fn series_rejects_empty_symbol_or_interval() {
        let gen = generator();
        let end = t0() + chrono::Duration::days(5);
        assert!(gen.quote_series("", t0(), end, "1d").is_err());
        assert!(gen.quote_series("AAPL", t0(), end, "").is_err());
    }

    #[test]
    fn series_bar_count_and_spacing() {
        let gen = generator();
        let end = t0() + chrono::Duration::days(5);
        let quotes: Vec<Quote> = gen.quote_series("AAPL", t0(), end, "1d").unwrap().collect();
        assert_eq!(quotes.len(), 5);
        for pair in quotes.windows(2) {
            assert_eq!(pair[1].timestamp - pair[0].timestamp, chrono::Duration::days(1));
        }
    }

    #[test]
    fn unknown_interval_falls_back_to_hourly() {
        let gen = generator();
        let end = t0() + chrono::Duration::hours(4);
        let quotes: Vec<Quote> = gen
            .quote_series("AAPL", t0(), end, "fortnight")
            .unwrap()
            .collect();
        assert_eq!(quotes.len(), 4);
        assert_eq!(quotes[0].interval, BarInterval::H1);
    }

    #[test]
    fn series_is_restartable() {
        let gen = generator();
        let end = t0() + chrono::Duration::days(30);
        let first: Vec<f64> = gen
            .quote_series("AAPL", t0(), end, "1d")
            .unwrap()
            .map(|q| q.close)
            .collect();
        let second: Vec<f64> = gen
            .quote_series("AAPL", t0(), end, "1d")
            .unwrap()
            .map(|q| q.close)
            .collect();
        assert_eq!(first, second);
    }

    #[test]
    fn series_quotes_are_sane_and_walk_from_table_price() {
        let gen = generator();
        let end = t0() + chrono::Duration::days(60);
        let quotes: Vec<Quote> = gen.quote_series("MSFT", t0(), end, "1d").unwrap().collect();
        assert_eq!(quotes[0].open, 412.3);
        for quote in &quotes {
            assert!(quote.is_sane(), "insane quote: {quote:?}");
        }
        // Bars chain: each open is the previous close.
        for pair in quotes.windows(2) {
            assert_eq!(pair[1].open, pair[0].close);
        }
    }

    #[test]
    fn uptrend_condition_drifts_upward() {
        let gen = generator();
        let base = gen.current_quote("AAPL").unwrap();
        let quotes: Vec<Quote> = gen
            .condition_series(&base, MarketCondition::Uptrend, 200)
            .unwrap()
            .collect();
        assert_eq!(quotes.len(), 200);
        assert!(quotes.last().unwrap().close > base.close);
    }

    #[test]
    fn crash_condition_drops_but_stays_positive() {
        let gen = generator();
        let base = gen.current_quote("AAPL").unwrap();
        let quotes: Vec<Quote> = gen
            .condition_series(&base, MarketCondition::MarketCrash, 100)
            .unwrap()
            .collect();
        assert!(quotes.last().unwrap().close < base.close);
        for quote in &quotes {
            assert!(quote.low >= PRICE_FLOOR);
            assert!(quote.bid >= PRICE_FLOOR);
        }
    }

    #[test]
    fn condition_series_rejects_zero_bars() {
        let gen = generator();
        let base = gen.current_quote("AAPL").unwrap();
        assert!(gen
            .condition_series(&base, MarketCondition::Sideways, 0)
            .is_err());
    }

    #[test]
    fn condition_tag_parsing() {
        assert_eq!(
            "MARKET_CRASH".parse::<MarketCondition>().unwrap(),
            MarketCondition::MarketCrash
        );
        let err = "LUNAR_ECLIPSE".parse::<MarketCondition>().unwrap_err();
        assert!(matches!(err, SimError::InvalidArgument(_)));
    }
}
