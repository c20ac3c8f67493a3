//! Virtual ledger — pure reducers from account events to transactions.
//!
//! Each function takes the account's current balance and produces a signed
//! [`Transaction`] whose `balance_after` is the new running total. Nothing
//! is stored here: persistence is the caller's job, and the caller replaces
//! its balance with `balance_after`.
//!
//! Concurrency contract: these functions are safe to call concurrently for
//! different accounts. When more than one caller touches the same account,
//! calls must be externally serialized (one logical sequence point per
//! account) so running balances stay consistent.

use crate::domain::{
    IdGen, Order, OrderSide, OrderStatus, Position, ReferenceKind, Transaction, TransactionKind,
};
use crate::error::{SimError, SimResult};
use chrono::{DateTime, Utc};

fn transaction(
    ids: &mut IdGen,
    account_id: &str,
    kind: TransactionKind,
    amount: f64,
    balance: f64,
    description: String,
    reference: Option<(String, ReferenceKind)>,
    now: DateTime<Utc>,
) -> Transaction {
    let (reference_id, reference_kind) = match reference {
        Some((id, kind)) => (Some(id), Some(kind)),
        None => (None, None),
    };
    Transaction {
        id: ids.transaction_id(),
        account_id: account_id.to_string(),
        kind,
        amount,
        balance_after: balance + amount,
        description,
        reference_id,
        reference_kind,
        timestamp: now,
    }
}

/// Reduce a filled order to its cash effect.
///
/// Cost is `fill_price × quantity` (sign flipped for sells) plus
/// commission; the transaction amount is `−cost`, so a net sell credits the
/// account. Requires a filled order with an execution report.
pub fn apply_fill(
    ids: &mut IdGen,
    account_id: &str,
    balance: f64,
    order: &Order,
    now: DateTime<Utc>,
) -> SimResult<Transaction> {
    if order.status != OrderStatus::Filled {
        return Err(SimError::InvalidState(format!(
            "order {} is {:?}, only filled orders post to the ledger",
            order.id, order.status
        )));
    }
    let report = order.execution.as_ref().ok_or_else(|| {
        SimError::InvalidState(format!("order {} has no execution report", order.id))
    })?;

    let notional = report.fill_price * order.filled_quantity as f64;
    let cost = match order.side {
        OrderSide::Buy => notional,
        OrderSide::Sell => -notional,
    } + report.commission;

    Ok(transaction(
        ids,
        account_id,
        TransactionKind::TradePnl,
        -cost,
        balance,
        format!(
            "{} {} {} @ {:.2}",
            order.side, order.filled_quantity, order.symbol, report.fill_price
        ),
        Some((order.id.0.clone(), ReferenceKind::Order)),
        now,
    ))
}

/// Reduce a position closure to a realized-P&L transaction.
///
/// Only closed positions realize P&L; an open position yields `None`
/// (unrealized P&L is a derived read, not a ledger event).
pub fn apply_position_close(
    ids: &mut IdGen,
    account_id: &str,
    balance: f64,
    position: &Position,
    market_price: f64,
    now: DateTime<Utc>,
) -> Option<Transaction> {
    if position.is_open() {
        return None;
    }
    let realized = position.pnl_at(market_price);
    Some(transaction(
        ids,
        account_id,
        TransactionKind::TradePnl,
        realized,
        balance,
        format!(
            "realized P&L {} {} @ {:.2}",
            position.quantity, position.symbol, market_price
        ),
        Some((position.symbol.clone(), ReferenceKind::Position)),
        now,
    ))
}

/// Credit a cash dividend of `per_share` across `quantity` shares.
pub fn apply_dividend(
    ids: &mut IdGen,
    account_id: &str,
    balance: f64,
    symbol: &str,
    per_share: f64,
    quantity: u32,
    now: DateTime<Utc>,
) -> SimResult<Transaction> {
    if symbol.is_empty() {
        return Err(SimError::InvalidArgument("symbol must not be empty".into()));
    }
    if per_share <= 0.0 || quantity == 0 {
        return Err(SimError::InvalidArgument(format!(
            "dividend requires positive per-share and quantity, got {per_share} x {quantity}"
        )));
    }
    let amount = per_share * quantity as f64;
    Ok(transaction(
        ids,
        account_id,
        TransactionKind::Dividend,
        amount,
        balance,
        format!("dividend {symbol} {per_share} x {quantity}"),
        None,
        now,
    ))
}

/// Credit interest at `rate` on the current balance.
pub fn apply_interest(
    ids: &mut IdGen,
    account_id: &str,
    balance: f64,
    rate: f64,
    now: DateTime<Utc>,
) -> SimResult<Transaction> {
    if rate <= 0.0 || balance <= 0.0 {
        return Err(SimError::InvalidArgument(format!(
            "interest requires positive rate and balance, got rate {rate} on {balance}"
        )));
    }
    let amount = balance * rate;
    Ok(transaction(
        ids,
        account_id,
        TransactionKind::Interest,
        amount,
        balance,
        format!("interest at {rate}"),
        None,
        now,
    ))
}

/// Debit a named fee. Always balance-decreasing.
pub fn apply_fee(
    ids: &mut IdGen,
    account_id: &str,
    balance: f64,
    fee_kind: &str,
    amount: f64,
    now: DateTime<Utc>,
) -> SimResult<Transaction> {
    if fee_kind.is_empty() {
        return Err(SimError::InvalidArgument(
            "fee kind must not be empty".into(),
        ));
    }
    if amount <= 0.0 {
        return Err(SimError::InvalidArgument(format!(
            "fee amount must be positive, got {amount}"
        )));
    }
    Ok(transaction(
        ids,
        account_id,
        TransactionKind::Fee,
        -amount,
        balance,
        format!("fee: {fee_kind}"),
        None,
        now,
    ))
}

/// Credit a cash deposit.
pub fn apply_deposit(
    ids: &mut IdGen,
    account_id: &str,
    balance: f64,
    amount: f64,
    now: DateTime<Utc>,
) -> SimResult<Transaction> {
    if amount <= 0.0 {
        return Err(SimError::InvalidArgument(format!(
            "deposit amount must be positive, got {amount}"
        )));
    }
    Ok(transaction(
        ids,
        account_id,
        TransactionKind::Deposit,
        amount,
        balance,
        "deposit".into(),
        None,
        now,
    ))
}

/// Debit a cash withdrawal. The account cannot go negative.
pub fn apply_withdrawal(
    ids: &mut IdGen,
    account_id: &str,
    balance: f64,
    amount: f64,
    now: DateTime<Utc>,
) -> SimResult<Transaction> {
    if amount <= 0.0 {
        return Err(SimError::InvalidArgument(format!(
            "withdrawal amount must be positive, got {amount}"
        )));
    }
    if amount > balance {
        return Err(SimError::InvalidArgument(format!(
            "withdrawal {amount} exceeds balance {balance}"
        )));
    }
    Ok(transaction(
        ids,
        account_id,
        TransactionKind::Withdrawal,
        -amount,
        balance,
        "withdrawal".into(),
        None,
        now,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ExecutionReport, OrderId, OrderType, PositionSide};
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 2, 14, 30, 0).unwrap()
    }

    fn filled_order(side: OrderSide, quantity: u32, fill_price: f64, commission: f64) -> Order {
        let mut order = Order::new(
            OrderId("ORD-000001".into()),
            "AAPL",
            side,
            OrderType::Market,
            quantity,
            now(),
        );
        order.status = OrderStatus::Filled;
        order.filled_quantity = quantity;
        order.avg_fill_price = fill_price;
        order.execution = Some(ExecutionReport {
            fill_price,
            fill_time: now(),
            slippage: 0.0,
            latency_ms: 0,
            commission,
        });
        order
    }

    #[test]
    fn buy_fill_debits_cost_plus_commission() {
        let mut ids = IdGen::default();
        let order = filled_order(OrderSide::Buy, 100, 100.0, 5.0);
        let txn = apply_fill(&mut ids, "acct-1", 50_000.0, &order, now()).unwrap();
        assert_eq!(txn.amount, -10_005.0);
        assert_eq!(txn.balance_after, 39_995.0);
        assert_eq!(txn.kind, TransactionKind::TradePnl);
        assert_eq!(txn.reference_kind, Some(ReferenceKind::Order));
    }

    #[test]
    fn sell_fill_credits_proceeds_net_of_commission() {
        let mut ids = IdGen::default();
        let order = filled_order(OrderSide::Sell, 100, 100.0, 5.0);
        let txn = apply_fill(&mut ids, "acct-1", 50_000.0, &order, now()).unwrap();
        assert_eq!(txn.amount, 9_995.0);
        assert_eq!(txn.balance_after, 59_995.0);
    }

    #[test]
    fn unfilled_order_is_rejected() {
        let mut ids = IdGen::default();
        let order = Order::new(
            OrderId("ORD-000002".into()),
            "AAPL",
            OrderSide::Buy,
            OrderType::Market,
            100,
            now(),
        );
        let err = apply_fill(&mut ids, "acct-1", 50_000.0, &order, now()).unwrap_err();
        assert!(matches!(err, SimError::InvalidState(_)));
    }

    #[test]
    fn replaying_a_fill_yields_the_same_delta() {
        let order = filled_order(OrderSide::Buy, 10, 99.5, 1.0);
        let mut ids = IdGen::default();
        let first = apply_fill(&mut ids, "acct-1", 10_000.0, &order, now()).unwrap();
        let second = apply_fill(&mut ids, "acct-1", first.balance_after, &order, now()).unwrap();
        assert_eq!(first.amount, second.amount);
        assert_eq!(
            second.balance_after - first.balance_after,
            first.balance_after - 10_000.0
        );
    }

    #[test]
    fn open_position_close_is_none() {
        let mut ids = IdGen::default();
        let position = Position::open("AAPL", PositionSide::Long, 100, 100.0, now());
        assert!(apply_position_close(&mut ids, "acct-1", 0.0, &position, 110.0, now()).is_none());
    }

    #[test]
    fn closed_long_realizes_pnl() {
        let mut ids = IdGen::default();
        let mut position = Position::open("AAPL", PositionSide::Long, 100, 100.0, now());
        position.close(now());
        let txn =
            apply_position_close(&mut ids, "acct-1", 1_000.0, &position, 110.0, now()).unwrap();
        assert_eq!(txn.amount, 1_000.0);
        assert_eq!(txn.balance_after, 2_000.0);
        assert_eq!(txn.reference_kind, Some(ReferenceKind::Position));
    }

    #[test]
    fn closed_short_realizes_inverse_pnl() {
        let mut ids = IdGen::default();
        let mut position = Position::open("AAPL", PositionSide::Short, 100, 100.0, now());
        position.close(now());
        let txn =
            apply_position_close(&mut ids, "acct-1", 1_000.0, &position, 110.0, now()).unwrap();
        assert_eq!(txn.amount, -1_000.0);
    }

    #[test]
    fn dividend_validation_and_amount() {
        let mut ids = IdGen::default();
        let txn =
            apply_dividend(&mut ids, "acct-1", 100_000.0, "AAPL", 0.26, 200, now()).unwrap();
        assert_eq!(txn.amount, 52.0);
        assert_eq!(txn.kind, TransactionKind::Dividend);

        assert!(apply_dividend(&mut ids, "acct-1", 0.0, "", 0.26, 200, now()).is_err());
        assert!(apply_dividend(&mut ids, "acct-1", 0.0, "AAPL", -0.26, 200, now()).is_err());
        assert!(apply_dividend(&mut ids, "acct-1", 0.0, "AAPL", 0.26, 0, now()).is_err());
    }

    #[test]
    fn interest_validation_and_amount() {
        let mut ids = IdGen::default();
        let txn = apply_interest(&mut ids, "acct-1", 10_000.0, 0.002, now()).unwrap();
        assert_eq!(txn.amount, 20.0);
        assert_eq!(txn.balance_after, 10_020.0);

        assert!(apply_interest(&mut ids, "acct-1", 10_000.0, 0.0, now()).is_err());
        assert!(apply_interest(&mut ids, "acct-1", -5.0, 0.002, now()).is_err());
    }

    #[test]
    fn fee_always_decreases_balance() {
        let mut ids = IdGen::default();
        let txn = apply_fee(&mut ids, "acct-1", 10_000.0, "wire transfer", 25.0, now()).unwrap();
        assert_eq!(txn.amount, -25.0);
        assert_eq!(txn.balance_after, 9_975.0);

        assert!(apply_fee(&mut ids, "acct-1", 10_000.0, "", 25.0, now()).is_err());
        assert!(apply_fee(&mut ids, "acct-1", 10_000.0, "wire", 0.0, now()).is_err());
    }

    #[test]
    fn deposit_and_withdrawal_guards() {
        let mut ids = IdGen::default();
        let txn = apply_deposit(&mut ids, "acct-1", 0.0, 5_000.0, now()).unwrap();
        assert_eq!(txn.balance_after, 5_000.0);

        let txn = apply_withdrawal(&mut ids, "acct-1", 5_000.0, 1_000.0, now()).unwrap();
        assert_eq!(txn.balance_after, 4_000.0);

        assert!(apply_deposit(&mut ids, "acct-1", 0.0, 0.0, now()).is_err());
        assert!(apply_withdrawal(&mut ids, "acct-1", 100.0, 200.0, now()).is_err());
    }

    #[test]
    fn transaction_ids_are_sequential() {
        let mut ids = IdGen::default();
        let a = apply_deposit(&mut ids, "acct-1", 0.0, 1.0, now()).unwrap();
        let b = apply_deposit(&mut ids, "acct-1", 1.0, 1.0, now()).unwrap();
        assert_eq!(a.id.0, "TXN-000001");
        assert_eq!(b.id.0, "TXN-000002");
    }
}
