//! Cost models: slippage, commission, and simulated latency.
//!
//! All three are pure functions over a [`CostConfig`]. Model tags parsed
//! from configuration fall back to the zero-cost `None` variant when
//! unrecognized, so a composite simulation never fails on a cost tag.

use crate::error::{SimError, SimResult};
use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Tiered commission breakpoints and rates.
const TIER1_QTY: u32 = 100;
const TIER2_QTY: u32 = 1000;
const TIER1_RATE: f64 = 0.002;
const TIER2_RATE: f64 = 0.001;
const TIER3_RATE: f64 = 0.0005;

/// Realistic latency spike parameters. These are constants of the model,
/// not caller configuration.
const SPIKE_PROBABILITY: f64 = 0.05;
const SPIKE_FACTOR: f64 = 4.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SlippageModel {
    Fixed,
    Percentage,
    Variable,
    /// Zero slippage; also the fallback for unrecognized tags.
    None,
}

impl SlippageModel {
    pub fn parse_lossy(tag: &str) -> Self {
        match tag {
            "FIXED" => Self::Fixed,
            "PERCENTAGE" => Self::Percentage,
            "VARIABLE" => Self::Variable,
            _ => Self::None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommissionModel {
    Fixed,
    Percentage,
    Tiered,
    /// Zero commission; also the fallback for unrecognized tags.
    None,
}

impl CommissionModel {
    pub fn parse_lossy(tag: &str) -> Self {
        match tag {
            "FIXED" => Self::Fixed,
            "PERCENTAGE" => Self::Percentage,
            "TIERED" => Self::Tiered,
            _ => Self::None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LatencyModel {
    Fixed,
    Variable,
    Realistic,
    /// Zero latency; also the fallback for unrecognized tags.
    None,
}

impl LatencyModel {
    pub fn parse_lossy(tag: &str) -> Self {
        match tag {
            "FIXED" => Self::Fixed,
            "VARIABLE" => Self::Variable,
            "REALISTIC" => Self::Realistic,
            _ => Self::None,
        }
    }
}

/// Cost model configuration for a simulated venue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostConfig {
    pub slippage_model: SlippageModel,
    /// Dollars for Fixed, price fraction for Percentage/Variable.
    pub slippage_value: f64,
    pub commission_model: CommissionModel,
    /// Dollars for Fixed, notional fraction for Percentage.
    pub commission_value: f64,
    pub latency_model: LatencyModel,
    pub latency_base_ms: u64,
}

impl CostConfig {
    /// All models disabled: zero slippage, commission, and latency.
    pub fn frictionless() -> Self {
        Self {
            slippage_model: SlippageModel::None,
            slippage_value: 0.0,
            commission_model: CommissionModel::None,
            commission_value: 0.0,
            latency_model: LatencyModel::None,
            latency_base_ms: 0,
        }
    }

    /// Value fields must be non-negative.
    pub fn validate(&self) -> SimResult<()> {
        if self.slippage_value < 0.0 {
            return Err(SimError::InvalidArgument(format!(
                "slippage value must be non-negative, got {}",
                self.slippage_value
            )));
        }
        if self.commission_value < 0.0 {
            return Err(SimError::InvalidArgument(format!(
                "commission value must be non-negative, got {}",
                self.commission_value
            )));
        }
        Ok(())
    }
}

impl Default for CostConfig {
    fn default() -> Self {
        Self {
            slippage_model: SlippageModel::Percentage,
            slippage_value: 0.0005,
            commission_model: CommissionModel::Tiered,
            commission_value: 0.0,
            latency_model: LatencyModel::Fixed,
            latency_base_ms: 50,
        }
    }
}

/// Slippage amount in price units for an order of `quantity` at `price`.
///
/// The amount is always non-negative; the execution simulator applies it
/// against the trader (raising buy fills, lowering sell fills). The
/// Variable model scales percentage slippage by the order's share of
/// `book_volume`, capped at 1.0.
pub fn slippage(config: &CostConfig, price: f64, quantity: u32, book_volume: u64) -> f64 {
    match config.slippage_model {
        SlippageModel::Fixed => config.slippage_value,
        SlippageModel::Percentage => price * config.slippage_value,
        SlippageModel::Variable => {
            let ratio = if book_volume == 0 {
                1.0
            } else {
                (quantity as f64 / book_volume as f64).min(1.0)
            };
            price * config.slippage_value * ratio
        }
        SlippageModel::None => 0.0,
    }
}

/// Commission in dollars for an order of `quantity` at `price`.
///
/// The tiered model charges a decreasing rate on notional as quantity
/// crosses the 100 and 1000 breakpoints.
pub fn commission(config: &CostConfig, price: f64, quantity: u32) -> f64 {
    match config.commission_model {
        CommissionModel::Fixed => config.commission_value,
        CommissionModel::Percentage => price * quantity as f64 * config.commission_value,
        CommissionModel::Tiered => {
            let rate = if quantity <= TIER1_QTY {
                TIER1_RATE
            } else if quantity <= TIER2_QTY {
                TIER2_RATE
            } else {
                TIER3_RATE
            };
            price * quantity as f64 * rate
        }
        CommissionModel::None => 0.0,
    }
}

/// Simulated order latency in milliseconds.
///
/// Variable adds bounded jitter; Realistic additionally spikes by a fixed
/// factor with small probability.
pub fn latency_ms(config: &CostConfig, rng: &mut StdRng) -> u64 {
    let base = config.latency_base_ms;
    match config.latency_model {
        LatencyModel::Fixed => base,
        LatencyModel::Variable => base + rng.gen_range(0..=base / 2),
        LatencyModel::Realistic => {
            let latency = base + rng.gen_range(0..=base / 2);
            if rng.gen_bool(SPIKE_PROBABILITY) {
                (latency as f64 * SPIKE_FACTOR) as u64
            } else {
                latency
            }
        }
        LatencyModel::None => 0,
    }
}
