//! Order types and lifecycle states.

use super::ids::OrderId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    /// +1 for Buy, -1 for Sell.
    pub fn sign(&self) -> f64 {
        match self {
            Self::Buy => 1.0,
            Self::Sell => -1.0,
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buy => f.write_str("BUY"),
            Self::Sell => f.write_str("SELL"),
        }
    }
}

/// What kind of order and its price parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OrderType {
    /// Fill immediately at the touch (ask for buys, bid for sells).
    Market,
    /// Fill at limit price or better.
    Limit { limit_price: f64 },
    /// Triggers when the touch reaches the stop level, then fills as market.
    Stop { stop_price: f64 },
    /// Triggers at stop_price, then fills with limit semantics.
    StopLimit { stop_price: f64, limit_price: f64 },
    /// Platform order type the execution simulator does not resolve;
    /// submitting one for execution is rejected as unsupported.
    TrailingStop { trail_pct: f64 },
}

/// Order lifecycle states. Filled and Cancelled are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    Pending,
    Filled,
    Cancelled,
    Modified,
}

impl OrderStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Filled | Self::Cancelled)
    }
}

/// Cost-model outputs stamped onto an order when it fills.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionReport {
    pub fill_price: f64,
    pub fill_time: DateTime<Utc>,
    pub slippage: f64,
    pub latency_ms: u64,
    pub commission: f64,
}

/// A single order.
///
/// The execution simulator receives the order by mutable reference and
/// applies fills to the same order value passed in — the status/fill fields
/// mutate in place rather than a copy being returned. This is the only
/// intentional in-place mutation in the core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub symbol: String,
    pub side: OrderSide,
    pub order_type: OrderType,
    pub quantity: u32,
    pub status: OrderStatus,
    pub filled_quantity: u32,
    pub avg_fill_price: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Present once the order has filled.
    pub execution: Option<ExecutionReport>,
}

impl Order {
    pub fn new(
        id: OrderId,
        symbol: impl Into<String>,
        side: OrderSide,
        order_type: OrderType,
        quantity: u32,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            symbol: symbol.into(),
            side,
            order_type,
            quantity,
            status: OrderStatus::Pending,
            filled_quantity: 0,
            avg_fill_price: 0.0,
            created_at: now,
            updated_at: now,
            execution: None,
        }
    }

    /// Pending and Modified orders are still working; Filled and Cancelled
    /// are not.
    pub fn is_active(&self) -> bool {
        matches!(self.status, OrderStatus::Pending | OrderStatus::Modified)
    }
}
