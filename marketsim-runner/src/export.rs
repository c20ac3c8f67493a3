//! Run artifact export (CSV).
//!
//! Convenience writers for the values a run returns. This is not a store:
//! durable persistence stays with the caller's repository layer.

use anyhow::{Context, Result};
use std::path::Path;

use marketsim_core::domain::Transaction;

use crate::session::EquityPoint;

pub fn write_equity_csv(path: &Path, points: &[EquityPoint]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("failed to create equity CSV {}", path.display()))?;
    for point in points {
        writer
            .serialize(point)
            .context("failed to write equity row")?;
    }
    writer.flush().context("failed to flush equity CSV")?;
    Ok(())
}

pub fn write_transactions_csv(path: &Path, transactions: &[Transaction]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("failed to create transactions CSV {}", path.display()))?;
    for txn in transactions {
        writer
            .serialize(txn)
            .context("failed to write transaction row")?;
    }
    writer.flush().context("failed to flush transactions CSV")?;
    Ok(())
}
