//! Order execution simulator.
//!
//! Resolves one order against one simulated quote according to its type's
//! trigger rules, then stamps cost-model outputs (slippage, commission,
//! latency) onto the order. An order that does not cross simply stays
//! pending; that is an outcome, not an error.

use super::cost::{self, CostConfig};
use crate::domain::{Order, OrderSide, OrderStatus, OrderType, Quote, PRICE_FLOOR};
use crate::error::{SimError, SimResult};
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;

/// Outcome of one execution attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionOutcome {
    Filled,
    /// The order's trigger or limit condition was not met by this quote.
    Pending,
}

/// Field updates for [`ExecutionSimulator::modify`]. Absent fields are left
/// unchanged; price fields apply only where the order type carries them.
#[derive(Debug, Clone, Copy, Default)]
pub struct OrderChanges {
    pub quantity: Option<u32>,
    pub limit_price: Option<f64>,
    pub stop_price: Option<f64>,
}

/// Simulates order execution against generated quotes.
pub struct ExecutionSimulator {
    costs: CostConfig,
}

impl ExecutionSimulator {
    pub fn new(costs: CostConfig) -> SimResult<Self> {
        costs.validate()?;
        Ok(Self { costs })
    }

    /// Zero-cost simulator: fills land exactly on the touch.
    pub fn frictionless() -> Self {
        Self {
            costs: CostConfig::frictionless(),
        }
    }

    pub fn costs(&self) -> &CostConfig {
        &self.costs
    }

    /// Attempt to resolve `order` against `quote`.
    ///
    /// Fills are applied to the same order value passed in: on a fill the
    /// caller's order mutates in place (status, fill fields, execution
    /// report). No field is touched until the order type's branching has
    /// resolved to a fill decision, so a `Pending` outcome or an error
    /// leaves the order exactly as it was.
    pub fn execute(
        &self,
        order: &mut Order,
        quote: &Quote,
        rng: &mut StdRng,
        now: DateTime<Utc>,
    ) -> SimResult<ExecutionOutcome> {
        if order.status.is_terminal() {
            return Err(SimError::InvalidState(format!(
                "order {} is {:?} and cannot execute",
                order.id, order.status
            )));
        }
        if order.quantity == 0 {
            return Err(SimError::InvalidArgument(format!(
                "order {} has zero quantity",
                order.id
            )));
        }

        let raw_price = match (&order.order_type, order.side) {
            (OrderType::Market, OrderSide::Buy) => Some(quote.ask),
            (OrderType::Market, OrderSide::Sell) => Some(quote.bid),

            (OrderType::Limit { limit_price }, side) => {
                limit_fill_price(*limit_price, side, quote)
            }

            (OrderType::Stop { stop_price }, side) => {
                if stop_triggered(*stop_price, side, quote) {
                    match side {
                        OrderSide::Buy => Some(quote.ask),
                        OrderSide::Sell => Some(quote.bid),
                    }
                } else {
                    None
                }
            }

            (
                OrderType::StopLimit {
                    stop_price,
                    limit_price,
                },
                side,
            ) => {
                if stop_triggered(*stop_price, side, quote) {
                    limit_fill_price(*limit_price, side, quote)
                } else {
                    None
                }
            }

            (OrderType::TrailingStop { .. }, _) => {
                return Err(SimError::UnsupportedOrderType("TRAILING_STOP".into()));
            }
        };

        let Some(raw_price) = raw_price else {
            return Ok(ExecutionOutcome::Pending);
        };

        let slip = cost::slippage(&self.costs, raw_price, order.quantity, quote.volume);
        let fill_price = match order.side {
            OrderSide::Buy => raw_price + slip,
            OrderSide::Sell => (raw_price - slip).max(PRICE_FLOOR),
        };
        let commission = cost::commission(&self.costs, fill_price, order.quantity);
        let latency_ms = cost::latency_ms(&self.costs, rng);

        order.filled_quantity = order.quantity;
        order.avg_fill_price = fill_price;
        order.status = OrderStatus::Filled;
        order.updated_at = now;
        order.execution = Some(crate::domain::ExecutionReport {
            fill_price,
            fill_time: now,
            slippage: slip,
            latency_ms,
            commission,
        });

        Ok(ExecutionOutcome::Filled)
    }

    /// Cancel a working order. Terminal orders fail with `InvalidState`.
    pub fn cancel(&self, order: &mut Order, now: DateTime<Utc>) -> SimResult<()> {
        if !order.is_active() {
            return Err(SimError::InvalidState(format!(
                "cannot cancel order {} in status {:?}",
                order.id, order.status
            )));
        }
        order.status = OrderStatus::Cancelled;
        order.updated_at = now;
        Ok(())
    }

    /// Modify a working order's quantity and price levels. Terminal orders
    /// fail with `InvalidState`; modified orders stay executable.
    pub fn modify(
        &self,
        order: &mut Order,
        changes: &OrderChanges,
        now: DateTime<Utc>,
    ) -> SimResult<()> {
        if !order.is_active() {
            return Err(SimError::InvalidState(format!(
                "cannot modify order {} in status {:?}",
                order.id, order.status
            )));
        }
        if let Some(quantity) = changes.quantity {
            if quantity == 0 {
                return Err(SimError::InvalidArgument(
                    "modified quantity must be positive".into(),
                ));
            }
            order.quantity = quantity;
        }
        match &mut order.order_type {
            OrderType::Limit { limit_price } => {
                if let Some(new_limit) = changes.limit_price {
                    *limit_price = new_limit;
                }
            }
            OrderType::Stop { stop_price } => {
                if let Some(new_stop) = changes.stop_price {
                    *stop_price = new_stop;
                }
            }
            OrderType::StopLimit {
                stop_price,
                limit_price,
            } => {
                if let Some(new_stop) = changes.stop_price {
                    *stop_price = new_stop;
                }
                if let Some(new_limit) = changes.limit_price {
                    *limit_price = new_limit;
                }
            }
            OrderType::Market | OrderType::TrailingStop { .. } => {}
        }
        order.status = OrderStatus::Modified;
        order.updated_at = now;
        Ok(())
    }
}

/// Limit semantics: fill only if the touch crosses the limit; the fill price
/// is the better of the quote price and the limit price.
fn limit_fill_price(limit_price: f64, side: OrderSide, quote: &Quote) -> Option<f64> {
    match side {
        OrderSide::Buy if quote.ask <= limit_price => Some(quote.ask.min(limit_price)),
        OrderSide::Sell if quote.bid >= limit_price => Some(quote.bid.max(limit_price)),
        _ => None,
    }
}

/// Stop trigger: buy stops arm at or above the ask, sell stops at or below
/// the bid.
fn stop_triggered(stop_price: f64, side: OrderSide, quote: &Quote) -> bool {
    match side {
        OrderSide::Buy => quote.ask >= stop_price,
        OrderSide::Sell => quote.bid <= stop_price,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BarInterval, OrderId};
    use crate::execution::cost::{CommissionModel, SlippageModel};
    use chrono::TimeZone;
    use rand::SeedableRng;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 2, 14, 30, 0).unwrap()
    }

    fn quote(bid: f64, ask: f64) -> Quote {
        Quote {
            symbol: "AAPL".into(),
            timestamp: now(),
            open: (bid + ask) / 2.0,
            high: ask * 1.01,
            low: bid * 0.99,
            close: (bid + ask) / 2.0,
            volume: 1_000_000,
            bid,
            ask,
            bid_size: 500,
            ask_size: 500,
            interval: BarInterval::M1,
            source: "simulator".into(),
            simulated: true,
        }
    }

    fn order(side: OrderSide, order_type: OrderType, quantity: u32) -> Order {
        Order::new(OrderId("ORD-000001".into()), "AAPL", side, order_type, quantity, now())
    }

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    #[test]
    fn market_buy_fills_at_ask() {
        let sim = ExecutionSimulator::frictionless();
        let mut order = order(OrderSide::Buy, OrderType::Market, 100);
        let outcome = sim.execute(&mut order, &quote(99.95, 100.05), &mut rng(), now()).unwrap();
        assert_eq!(outcome, ExecutionOutcome::Filled);
        assert_eq!(order.status, OrderStatus::Filled);
        assert_eq!(order.filled_quantity, 100);
        assert_eq!(order.avg_fill_price, 100.05);
    }

    #[test]
    fn market_sell_fills_at_bid() {
        let sim = ExecutionSimulator::frictionless();
        let mut order = order(OrderSide::Sell, OrderType::Market, 100);
        sim.execute(&mut order, &quote(99.95, 100.05), &mut rng(), now()).unwrap();
        assert_eq!(order.avg_fill_price, 99.95);
    }

    #[test]
    fn slippage_raises_buy_fill_above_ask() {
        let costs = CostConfig {
            slippage_model: SlippageModel::Fixed,
            slippage_value: 0.10,
            ..CostConfig::frictionless()
        };
        let sim = ExecutionSimulator::new(costs).unwrap();
        let mut order = order(OrderSide::Buy, OrderType::Market, 100);
        sim.execute(&mut order, &quote(99.95, 100.05), &mut rng(), now()).unwrap();
        assert!((order.avg_fill_price - 100.15).abs() < 1e-10);
        let report = order.execution.unwrap();
        assert!((report.slippage - 0.10).abs() < 1e-10);
    }

    #[test]
    fn slippage_lowers_sell_fill_below_bid() {
        let costs = CostConfig {
            slippage_model: SlippageModel::Fixed,
            slippage_value: 0.10,
            ..CostConfig::frictionless()
        };
        let sim = ExecutionSimulator::new(costs).unwrap();
        let mut order = order(OrderSide::Sell, OrderType::Market, 100);
        sim.execute(&mut order, &quote(99.95, 100.05), &mut rng(), now()).unwrap();
        assert!((order.avg_fill_price - 99.85).abs() < 1e-10);
    }

    #[test]
    fn limit_buy_below_ask_stays_pending_without_mutation() {
        let sim = ExecutionSimulator::frictionless();
        let mut order = order(
            OrderSide::Buy,
            OrderType::Limit { limit_price: 99.0 },
            100,
        );
        let before = order.clone();
        let outcome = sim.execute(&mut order, &quote(99.95, 100.05), &mut rng(), now()).unwrap();
        assert_eq!(outcome, ExecutionOutcome::Pending);
        assert_eq!(order.status, before.status);
        assert_eq!(order.filled_quantity, 0);
        assert_eq!(order.updated_at, before.updated_at);
        assert!(order.execution.is_none());
    }

    #[test]
    fn limit_buy_fills_when_ask_crosses() {
        let sim = ExecutionSimulator::frictionless();
        let mut order = order(
            OrderSide::Buy,
            OrderType::Limit { limit_price: 100.10 },
            100,
        );
        let outcome = sim.execute(&mut order, &quote(99.95, 100.05), &mut rng(), now()).unwrap();
        assert_eq!(outcome, ExecutionOutcome::Filled);
        // Better of quote and limit: the ask.
        assert_eq!(order.avg_fill_price, 100.05);
    }

    #[test]
    fn limit_sell_fills_when_bid_crosses() {
        let sim = ExecutionSimulator::frictionless();
        let mut order = order(
            OrderSide::Sell,
            OrderType::Limit { limit_price: 99.90 },
            100,
        );
        sim.execute(&mut order, &quote(99.95, 100.05), &mut rng(), now()).unwrap();
        assert_eq!(order.avg_fill_price, 99.95);
    }

    #[test]
    fn stop_buy_waits_for_trigger_then_fills_like_market() {
        let sim = ExecutionSimulator::frictionless();
        let mut order = order(
            OrderSide::Buy,
            OrderType::Stop { stop_price: 101.0 },
            100,
        );
        let outcome = sim.execute(&mut order, &quote(99.95, 100.05), &mut rng(), now()).unwrap();
        assert_eq!(outcome, ExecutionOutcome::Pending);

        let outcome = sim.execute(&mut order, &quote(101.10, 101.20), &mut rng(), now()).unwrap();
        assert_eq!(outcome, ExecutionOutcome::Filled);
        assert_eq!(order.avg_fill_price, 101.20);
    }

    #[test]
    fn stop_sell_triggers_at_or_below_stop() {
        let sim = ExecutionSimulator::frictionless();
        let mut order = order(
            OrderSide::Sell,
            OrderType::Stop { stop_price: 99.0 },
            100,
        );
        assert_eq!(
            sim.execute(&mut order, &quote(99.95, 100.05), &mut rng(), now()).unwrap(),
            ExecutionOutcome::Pending
        );
        assert_eq!(
            sim.execute(&mut order, &quote(98.80, 98.90), &mut rng(), now()).unwrap(),
            ExecutionOutcome::Filled
        );
        assert_eq!(order.avg_fill_price, 98.80);
    }

    #[test]
    fn stop_limit_requires_both_conditions() {
        let sim = ExecutionSimulator::frictionless();
        let mut order = order(
            OrderSide::Buy,
            OrderType::StopLimit {
                stop_price: 101.0,
                limit_price: 101.5,
            },
            100,
        );
        // Stop not triggered.
        assert_eq!(
            sim.execute(&mut order, &quote(99.95, 100.05), &mut rng(), now()).unwrap(),
            ExecutionOutcome::Pending
        );
        // Stop triggered but ask above the limit.
        assert_eq!(
            sim.execute(&mut order, &quote(101.90, 102.00), &mut rng(), now()).unwrap(),
            ExecutionOutcome::Pending
        );
        // Both conditions met.
        assert_eq!(
            sim.execute(&mut order, &quote(101.20, 101.30), &mut rng(), now()).unwrap(),
            ExecutionOutcome::Filled
        );
        assert_eq!(order.avg_fill_price, 101.30);
    }

    #[test]
    fn trailing_stop_is_unsupported() {
        let sim = ExecutionSimulator::frictionless();
        let mut order = order(
            OrderSide::Sell,
            OrderType::TrailingStop { trail_pct: 0.05 },
            100,
        );
        let err = sim.execute(&mut order, &quote(99.95, 100.05), &mut rng(), now()).unwrap_err();
        assert!(matches!(err, SimError::UnsupportedOrderType(_)));
        assert_eq!(order.status, OrderStatus::Pending);
    }

    #[test]
    fn filled_order_cannot_execute_again() {
        let sim = ExecutionSimulator::frictionless();
        let mut order = order(OrderSide::Buy, OrderType::Market, 100);
        sim.execute(&mut order, &quote(99.95, 100.05), &mut rng(), now()).unwrap();
        let err = sim.execute(&mut order, &quote(99.95, 100.05), &mut rng(), now()).unwrap_err();
        assert!(matches!(err, SimError::InvalidState(_)));
    }

    #[test]
    fn zero_quantity_is_rejected() {
        let sim = ExecutionSimulator::frictionless();
        let mut order = order(OrderSide::Buy, OrderType::Market, 0);
        let err = sim.execute(&mut order, &quote(99.95, 100.05), &mut rng(), now()).unwrap_err();
        assert!(matches!(err, SimError::InvalidArgument(_)));
    }

    #[test]
    fn commission_stamped_on_fill() {
        let costs = CostConfig {
            commission_model: CommissionModel::Fixed,
            commission_value: 1.25,
            ..CostConfig::frictionless()
        };
        let sim = ExecutionSimulator::new(costs).unwrap();
        let mut order = order(OrderSide::Buy, OrderType::Market, 100);
        sim.execute(&mut order, &quote(99.95, 100.05), &mut rng(), now()).unwrap();
        assert_eq!(order.execution.unwrap().commission, 1.25);
    }

    #[test]
    fn cancel_pending_then_terminal_guard() {
        let sim = ExecutionSimulator::frictionless();
        let mut order = order(OrderSide::Buy, OrderType::Market, 100);
        sim.cancel(&mut order, now()).unwrap();
        assert_eq!(order.status, OrderStatus::Cancelled);

        let err = sim.cancel(&mut order, now()).unwrap_err();
        assert!(matches!(err, SimError::InvalidState(_)));
    }

    #[test]
    fn modify_updates_fields_and_stays_executable() {
        let sim = ExecutionSimulator::frictionless();
        let mut order = order(
            OrderSide::Buy,
            OrderType::Limit { limit_price: 99.0 },
            100,
        );
        sim.modify(
            &mut order,
            &OrderChanges {
                quantity: Some(50),
                limit_price: Some(100.10),
                stop_price: None,
            },
            now(),
        )
        .unwrap();
        assert_eq!(order.status, OrderStatus::Modified);
        assert_eq!(order.quantity, 50);

        // The modified order still fills once its new limit crosses.
        let outcome = sim.execute(&mut order, &quote(99.95, 100.05), &mut rng(), now()).unwrap();
        assert_eq!(outcome, ExecutionOutcome::Filled);
        assert_eq!(order.filled_quantity, 50);
    }

    #[test]
    fn modify_filled_order_fails() {
        let sim = ExecutionSimulator::frictionless();
        let mut order = order(OrderSide::Buy, OrderType::Market, 100);
        sim.execute(&mut order, &quote(99.95, 100.05), &mut rng(), now()).unwrap();
        let err = sim
            .modify(&mut order, &OrderChanges::default(), now())
            .unwrap_err();
        assert!(matches!(err, SimError::InvalidState(_)));
    }

    #[test]
    fn modify_rejects_zero_quantity() {
        let sim = ExecutionSimulator::frictionless();
        let mut order = order(OrderSide::Buy, OrderType::Market, 100);
        let err = sim
            .modify(
                &mut order,
                &OrderChanges {
                    quantity: Some(0),
                    ..OrderChanges::default()
                },
                now(),
            )
            .unwrap_err();
        assert!(matches!(err, SimError::InvalidArgument(_)));
    }
}
