//! Domain types — quotes, orders, positions, transactions, identifiers.

pub mod ids;
pub mod order;
pub mod position;
pub mod quote;
pub mod transaction;

pub use ids::{IdGen, OrderId, SessionId, TransactionId};
pub use order::{ExecutionReport, Order, OrderSide, OrderStatus, OrderType};
pub use position::{Position, PositionSide, PositionStatus};
pub use quote::{BarInterval, Quote, PRICE_FLOOR};
pub use transaction::{ReferenceKind, Transaction, TransactionKind};
