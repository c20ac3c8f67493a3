use serde::{Deserialize, Serialize};
use std::fmt;

/// Order identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderId(pub String);

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Transaction identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransactionId(pub String);

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Backtest session identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Deterministic id generator.
///
/// Ids are monotone counters, not UUIDs — two runs that perform the same
/// operations in the same order produce the same ids, which keeps backtest
/// output reproducible.
#[derive(Debug, Default, Clone)]
pub struct IdGen {
    next_order: u64,
    next_transaction: u64,
}

impl IdGen {
    pub fn order_id(&mut self) -> OrderId {
        self.next_order += 1;
        OrderId(format!("ORD-{:06}", self.next_order))
    }

    pub fn transaction_id(&mut self) -> TransactionId {
        self.next_transaction += 1;
        TransactionId(format!("TXN-{:06}", self.next_transaction))
    }
}
