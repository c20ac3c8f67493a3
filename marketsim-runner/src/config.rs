//! Serializable runner configuration.
//!
//! A TOML file drives a run: the session window, the cost models, and the
//! trade-generator knobs. Model tags are free-form strings so that an
//! unrecognized tag degrades to the zero-cost model instead of failing the
//! whole configuration.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

use marketsim_core::execution::{CommissionModel, CostConfig, LatencyModel, SlippageModel};

use crate::engine::EngineParams;
use crate::session::SessionSpec;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Top-level configuration file.
#[derive(Debug, Clone, Deserialize)]
pub struct RunnerConfig {
    pub session: SessionSection,
    #[serde(default)]
    pub costs: CostsSection,
    #[serde(default)]
    pub engine: EngineSection,
}

/// `[session]` — what to backtest. Dates are RFC 3339 strings.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionSection {
    pub account_id: String,
    pub name: String,
    pub symbols: Vec<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(default = "default_interval")]
    pub interval: String,
    pub initial_balance: f64,
    #[serde(default)]
    pub strategy_id: String,
    #[serde(default)]
    pub strategy_params: BTreeMap<String, f64>,
}

fn default_interval() -> String {
    "1d".into()
}

/// `[costs]` — slippage/commission/latency model tags and values.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CostsSection {
    pub slippage_model: String,
    pub slippage_value: f64,
    pub commission_model: String,
    pub commission_value: f64,
    pub latency_model: String,
    pub latency_base_ms: u64,
}

impl Default for CostsSection {
    fn default() -> Self {
        Self {
            slippage_model: "PERCENTAGE".into(),
            slippage_value: 0.0005,
            commission_model: "TIERED".into(),
            commission_value: 0.0,
            latency_model: "FIXED".into(),
            latency_base_ms: 50,
        }
    }
}

/// `[engine]` — seed and trade-generator knobs.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineSection {
    pub seed: u64,
    pub trade_probability: f64,
    pub min_quantity: u32,
    pub max_quantity: u32,
    pub price_offset_pct: f64,
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            seed: 42,
            trade_probability: 0.15,
            min_quantity: 10,
            max_quantity: 200,
            price_offset_pct: 0.005,
        }
    }
}

impl RunnerConfig {
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.costs.slippage_value < 0.0 || self.costs.commission_value < 0.0 {
            return Err(ConfigError::Invalid(
                "cost values must be non-negative".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.engine.trade_probability) {
            return Err(ConfigError::Invalid(format!(
                "trade_probability must be within [0, 1], got {}",
                self.engine.trade_probability
            )));
        }
        if self.engine.min_quantity == 0 || self.engine.min_quantity > self.engine.max_quantity {
            return Err(ConfigError::Invalid(format!(
                "quantity bounds must satisfy 0 < min <= max, got {}..{}",
                self.engine.min_quantity, self.engine.max_quantity
            )));
        }
        Ok(())
    }

    pub fn session_spec(&self) -> SessionSpec {
        SessionSpec {
            account_id: self.session.account_id.clone(),
            name: self.session.name.clone(),
            start: self.session.start,
            end: self.session.end,
            symbols: self.session.symbols.clone(),
            interval: self.session.interval.clone(),
            initial_balance: self.session.initial_balance,
            strategy_id: self.session.strategy_id.clone(),
            strategy_params: self.session.strategy_params.clone(),
        }
    }

    pub fn cost_config(&self) -> CostConfig {
        CostConfig {
            slippage_model: SlippageModel::parse_lossy(&self.costs.slippage_model),
            slippage_value: self.costs.slippage_value,
            commission_model: CommissionModel::parse_lossy(&self.costs.commission_model),
            commission_value: self.costs.commission_value,
            latency_model: LatencyModel::parse_lossy(&self.costs.latency_model),
            latency_base_ms: self.costs.latency_base_ms,
        }
    }

    pub fn engine_params(&self) -> EngineParams {
        EngineParams {
            trade_probability: self.engine.trade_probability,
            min_quantity: self.engine.min_quantity,
            max_quantity: self.engine.max_quantity,
            price_offset_pct: self.engine.price_offset_pct,
            costs: self.cost_config(),
        }
    }

    pub fn seed(&self) -> u64 {
        self.engine.seed
    }
}
