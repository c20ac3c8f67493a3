//! Strategy seam for the backtest engine.
//!
//! A strategy is consulted once per bar with one of the session's quotes and
//! decides whether to trade. The engine owns position sizing for exits
//! (always the full lot) and cash guards; the strategy owns entry shape.

use marketsim_core::domain::{OrderSide, OrderType, Quote};
use rand::rngs::StdRng;
use rand::Rng;

/// What a strategy wants done this bar.
#[derive(Debug, Clone, PartialEq)]
pub enum TradeIntent {
    Enter {
        side: OrderSide,
        order_type: OrderType,
        quantity: u32,
    },
    /// Close the symbol's open lot at market.
    Exit,
}

pub trait Strategy: Send + Sync {
    /// Decide on this bar's quote. `None` trades nothing. The rng is the
    /// run's seeded stream, so decisions are reproducible.
    fn decide(
        &self,
        quote: &Quote,
        has_open_position: bool,
        rng: &mut StdRng,
    ) -> Option<TradeIntent>;
}

/// Built-in randomized trade generator, used when no strategy is plugged in.
///
/// Fires with a fixed per-bar probability; exits an open lot, or enters with
/// side/type/quantity/price drawn from bounded distributions. A buy entry
/// opens a long lot, a sell entry a short one.
#[derive(Debug, Clone)]
pub struct RandomStrategy {
    trade_probability: f64,
    min_quantity: u32,
    max_quantity: u32,
    price_offset_pct: f64,
}

impl RandomStrategy {
    pub fn new(
        trade_probability: f64,
        min_quantity: u32,
        max_quantity: u32,
        price_offset_pct: f64,
    ) -> Self {
        Self {
            trade_probability,
            min_quantity,
            max_quantity,
            price_offset_pct,
        }
    }
}

impl Strategy for RandomStrategy {
    fn decide(
        &self,
        quote: &Quote,
        has_open_position: bool,
        rng: &mut StdRng,
    ) -> Option<TradeIntent> {
        if !rng.gen_bool(self.trade_probability) {
            return None;
        }
        if has_open_position {
            return Some(TradeIntent::Exit);
        }

        let side = if rng.gen_bool(0.5) {
            OrderSide::Buy
        } else {
            OrderSide::Sell
        };
        let touch = match side {
            OrderSide::Buy => quote.ask,
            OrderSide::Sell => quote.bid,
        };
        let quantity = rng.gen_range(self.min_quantity..=self.max_quantity);
        let offset = self.price_offset_pct;
        let order_type = match rng.gen_range(0..10u32) {
            0..=5 => OrderType::Market,
            6..=7 => OrderType::Limit {
                limit_price: touch * (1.0 + offset * rng.gen_range(-1.0..=1.0)),
            },
            // Stops arm away from the touch: above it for buys, below for
            // sells.
            _ => OrderType::Stop {
                stop_price: touch * (1.0 + side.sign() * offset * rng.gen_range(0.0..=1.0)),
            },
        };
        Some(TradeIntent::Enter {
            side,
            order_type,
            quantity,
        })
    }
}
