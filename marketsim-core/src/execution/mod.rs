//! Order execution — cost models and the fill simulator.

pub mod cost;
pub mod simulator;

pub use cost::{commission, latency_ms, slippage, CommissionModel, CostConfig, LatencyModel, SlippageModel};
pub use simulator::{ExecutionOutcome, ExecutionSimulator, OrderChanges};
