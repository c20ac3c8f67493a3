//! Simulation core — domain types, quote generation, order execution,
//! cost models, and the virtual ledger.
//!
//! This crate contains the deterministic heart of the paper-trading engine:
//! - Domain types (quotes, orders, positions, transactions, identifiers)
//! - Seeded quote generator and market event model
//! - Order execution simulator with slippage/commission/latency models
//! - Pure-reducer virtual ledger
//! - Clock and RNG abstractions that make every output reproducible
//!
//! Nothing here performs I/O or retains state across calls; all entities are
//! plain values owned by the caller. The one intentional exception is the
//! execution simulator's in-place order mutation, documented on
//! [`execution::ExecutionSimulator::execute`].

pub mod clock;
pub mod domain;
pub mod error;
pub mod execution;
pub mod ledger;
pub mod market;
pub mod rng;

pub use error::{SimError, SimResult};
