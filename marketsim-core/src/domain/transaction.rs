//! Balance-affecting transactions.

use super::ids::TransactionId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionKind {
    Deposit,
    Withdrawal,
    TradePnl,
    Dividend,
    Interest,
    Fee,
}

/// What a transaction's reference id points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReferenceKind {
    Order,
    Position,
}

/// One append-only ledger entry.
///
/// `balance_after` is the account's running total after `amount` is applied;
/// it is recorded when the transaction is produced and never recomputed
/// retroactively.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub account_id: String,
    pub kind: TransactionKind,
    /// Signed: positive credits the account, negative debits it.
    pub amount: f64,
    pub balance_after: f64,
    pub description: String,
    pub reference_id: Option<String>,
    pub reference_kind: Option<ReferenceKind>,
    pub timestamp: DateTime<Utc>,
}
