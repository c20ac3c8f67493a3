//! Parameter sweeps over the engine's strategy knobs.
//!
//! Each grid cell runs its own session with its own engine, so cells share
//! no mutable state and fan out safely across threads.

use chrono::{DateTime, Utc};
use rayon::prelude::*;

use marketsim_core::error::SimError;

use crate::engine::{BacktestEngine, CancelToken, EngineParams, RunError};
use crate::session::{BacktestSession, SessionSpec, SessionSummary};

/// Grid of engine parameters to sweep.
#[derive(Debug, Clone)]
pub struct SweepGrid {
    pub seeds: Vec<u64>,
    pub trade_probabilities: Vec<f64>,
}

impl SweepGrid {
    pub fn size(&self) -> usize {
        self.seeds.len() * self.trade_probabilities.len()
    }
}

/// One completed grid cell.
#[derive(Debug, Clone)]
pub struct SweepOutcome {
    pub seed: u64,
    pub trade_probability: f64,
    pub summary: SessionSummary,
}

/// Run the session spec once per grid cell, in parallel.
///
/// Outcomes come back in grid order (seeds outer, probabilities inner)
/// regardless of which thread finished first.
pub fn sweep(
    spec: &SessionSpec,
    base_params: &EngineParams,
    grid: &SweepGrid,
    now: DateTime<Utc>,
) -> Result<Vec<SweepOutcome>, RunError> {
    let cells: Vec<(u64, f64)> = grid
        .seeds
        .iter()
        .flat_map(|&seed| {
            grid.trade_probabilities
                .iter()
                .map(move |&probability| (seed, probability))
        })
        .collect();

    cells
        .par_iter()
        .map(|&(seed, trade_probability)| {
            let mut session = BacktestSession::create(spec.clone(), now)?;
            let mut params = base_params.clone();
            params.trade_probability = trade_probability;
            let engine = BacktestEngine::new(seed, params)?;
            let report = engine.run(&mut session, &CancelToken::new())?;
            let summary = session.summary.clone().ok_or_else(|| {
                RunError::Sim(SimError::InvalidState(format!(
                    "sweep cell produced no summary: {}",
                    report.error.unwrap_or_else(|| "unknown failure".into())
                )))
            })?;
            Ok(SweepOutcome {
                seed,
                trade_probability,
                summary,
            })
        })
        .collect()
}
