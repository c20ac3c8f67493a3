//! Position tracking.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PositionSide {
    Long,
    Short,
}

impl PositionSide {
    pub fn sign(&self) -> f64 {
        match self {
            Self::Long => 1.0,
            Self::Short => -1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PositionStatus {
    Open,
    Closed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    pub side: PositionSide,
    pub quantity: u32,
    pub avg_entry_price: f64,
    pub status: PositionStatus,
    pub opened_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

impl Position {
    pub fn open(
        symbol: impl Into<String>,
        side: PositionSide,
        quantity: u32,
        entry_price: f64,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            side,
            quantity,
            avg_entry_price: entry_price,
            status: PositionStatus::Open,
            opened_at: now,
            closed_at: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.status == PositionStatus::Open
    }

    /// Signed market value at `price` (negative for shorts).
    pub fn market_value(&self, price: f64) -> f64 {
        self.side.sign() * self.quantity as f64 * price
    }

    /// P&L if the position were (or was) exited at `price`.
    pub fn pnl_at(&self, price: f64) -> f64 {
        self.side.sign() * self.quantity as f64 * (price - self.avg_entry_price)
    }

    pub fn close(&mut self, now: DateTime<Utc>) {
        self.status = PositionStatus::Closed;
        self.closed_at = Some(now);
    }
}
