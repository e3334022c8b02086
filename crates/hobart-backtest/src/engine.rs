//! Seam to the external portfolio backtester.

use crate::{BacktestJob, Result};
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Result of one backtest job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestOutcome {
    /// Year the job covered
    pub year: i32,
    /// Rebalance dates simulated
    pub periods: usize,
    /// Engine-defined statistics, keyed by name
    pub metrics: BTreeMap<String, f64>,
}

/// Runs one job on its slice of the alpha table.
///
/// Implementations are called concurrently from a worker pool and must not
/// rely on shared mutable state.
pub trait BacktestEngine: Send + Sync {
    /// Backtest `alphas`, the rows of `job.year`.
    ///
    /// # Errors
    ///
    /// Any error fails this job only.
    fn run(&self, job: &BacktestJob, alphas: &DataFrame) -> Result<BacktestOutcome>;
}
