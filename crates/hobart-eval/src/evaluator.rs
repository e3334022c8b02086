//! End-to-end IC evaluation of an alpha table.

use crate::ic::{IcMethod, IcSeries, join_forward_returns};
use crate::summary::IcSummary;
use crate::{EvalError, Result};
use polars::prelude::*;
use serde::Serialize;
use tracing::info;

/// Joins alphas to forward returns and computes the IC series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IcEvaluator {
    window: usize,
}

impl Default for IcEvaluator {
    fn default() -> Self {
        Self { window: 22 }
    }
}

impl IcEvaluator {
    /// Evaluator with a rolling window of `window` defined dates.
    pub fn new(window: usize) -> Result<Self> {
        if window == 0 {
            return Err(EvalError::InvalidWindow(window));
        }
        Ok(Self { window })
    }

    /// Rolling window length.
    pub const fn window(&self) -> usize {
        self.window
    }

    /// Evaluate `(date, entity_id, alpha, ..)` against
    /// `(date, entity_id, fwd_return)`.
    pub fn evaluate(&self, alphas: &DataFrame, forward: &DataFrame) -> Result<IcReport> {
        let joined = join_forward_returns(alphas.clone().lazy(), forward.clone().lazy()).collect()?;
        let series = IcSeries::from_joined(&joined)?;

        let rank = IcSummary::from_values(&series.defined(IcMethod::Rank));
        let pearson = IcSummary::from_values(&series.defined(IcMethod::Pearson));
        info!(
            pairs = joined.height(),
            dates = series.len(),
            rank_ic = rank.mean,
            pearson_ic = pearson.mean,
            "Evaluated information coefficients"
        );

        Ok(IcReport {
            window: self.window,
            pairs: joined.height(),
            series,
            rank,
            pearson,
        })
    }
}

/// Outcome of an IC evaluation.
#[derive(Debug, Clone, Serialize)]
pub struct IcReport {
    /// Rolling window used for smoothing
    pub window: usize,
    /// Joined (alpha, forward return) pairs
    pub pairs: usize,
    /// Daily ICs
    #[serde(skip)]
    pub series: IcSeries,
    /// Rank IC statistics
    pub rank: IcSummary,
    /// Pearson IC statistics
    pub pearson: IcSummary,
}

impl IcReport {
    /// Statistics for one method.
    pub const fn summary(&self, method: IcMethod) -> &IcSummary {
        match method {
            IcMethod::Rank => &self.rank,
            IcMethod::Pearson => &self.pearson,
        }
    }

    /// Daily, rolling and cumulative ICs as a table.
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        self.series.to_dataframe(self.window)
    }
}
