//! Rolling ordinary least squares.
//!
//! Coefficients at row `t` are the OLS fit over the complete rows among the
//! `window` most recent rows ending at `t`. A row is complete when the
//! response and every predictor are finite. A position with fewer than
//! `min_periods` complete rows, or whose normal equations are singular,
//! gets NaN coefficients; callers surface these as nulls.
//!
//! The normal-equation sums are updated incrementally as the window slides
//! and rebuilt from scratch once per `window` steps to bound accumulated
//! rounding error.

use crate::{Result, SignalError};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, s};
use rayon::prelude::*;
use std::ops::Range;

/// Pivots smaller than this fraction of the largest entry of `XᵀX` are
/// treated as zero.
pub const SINGULAR_TOLERANCE: f64 = 1e-10;

/// Rolling-window OLS estimator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RollingOls {
    window: usize,
    min_periods: usize,
}

impl RollingOls {
    /// Create an estimator; `min_periods` must lie in `1..=window`.
    pub fn new(window: usize, min_periods: usize) -> Result<Self> {
        if window == 0 {
            return Err(SignalError::InvalidConfig(
                "regression window must be at least 1".to_string(),
            ));
        }
        if min_periods == 0 || min_periods > window {
            return Err(SignalError::InvalidConfig(format!(
                "min_periods must lie in 1..={window}, got {min_periods}"
            )));
        }
        Ok(Self {
            window,
            min_periods,
        })
    }

    /// Window length in rows.
    pub const fn window(&self) -> usize {
        self.window
    }

    /// Complete rows required for a fit.
    pub const fn min_periods(&self) -> usize {
        self.min_periods
    }

    /// Fit one ordered series.
    ///
    /// `design` is `T x k` and should carry the constant column explicitly.
    /// Returns a `T x k` coefficient matrix.
    pub fn fit(&self, response: ArrayView1<'_, f64>, design: ArrayView2<'_, f64>) -> Array2<f64> {
        let (rows, k) = design.dim();
        debug_assert_eq!(rows, response.len());

        let mut coefficients = Array2::from_elem((rows, k), f64::NAN);
        let complete: Vec<bool> = (0..rows)
            .map(|t| response[t].is_finite() && design.row(t).iter().all(|x| x.is_finite()))
            .collect();

        let mut xtx = Array2::<f64>::zeros((k, k));
        let mut xty = Array1::<f64>::zeros(k);
        let mut count = 0usize;
        let mut since_rebuild = 0usize;

        for t in 0..rows {
            if complete[t] {
                accumulate(&mut xtx, &mut xty, design.row(t), response[t], 1.0);
                count += 1;
            }
            if t >= self.window {
                let expired = t - self.window;
                if complete[expired] {
                    accumulate(&mut xtx, &mut xty, design.row(expired), response[expired], -1.0);
                    count -= 1;
                }
            }

            since_rebuild += 1;
            if since_rebuild >= self.window {
                since_rebuild = 0;
                xtx.fill(0.0);
                xty.fill(0.0);
                for s in (t + 1).saturating_sub(self.window)..=t {
                    if complete[s] {
                        accumulate(&mut xtx, &mut xty, design.row(s), response[s], 1.0);
                    }
                }
            }

            if count >= self.min_periods
                && let Some(beta) = solve(&xtx, &xty)
            {
                coefficients.row_mut(t).assign(&beta);
            }
        }

        coefficients
    }

    /// Fit every group independently, in parallel.
    ///
    /// `groups` are disjoint row ranges, each holding one entity in date
    /// order. Rows outside every group keep NaN coefficients.
    pub fn fit_groups(
        &self,
        response: ArrayView1<'_, f64>,
        design: ArrayView2<'_, f64>,
        groups: &[Range<usize>],
    ) -> Array2<f64> {
        let blocks: Vec<(Range<usize>, Array2<f64>)> = groups
            .par_iter()
            .map(|range| {
                let block = self.fit(
                    response.slice(s![range.clone()]),
                    design.slice(s![range.clone(), ..]),
                );
                (range.clone(), block)
            })
            .collect();

        let mut coefficients = Array2::from_elem(design.dim(), f64::NAN);
        for (range, block) in blocks {
            coefficients.slice_mut(s![range, ..]).assign(&block);
        }
        coefficients
    }
}

fn accumulate(
    xtx: &mut Array2<f64>,
    xty: &mut Array1<f64>,
    x: ArrayView1<'_, f64>,
    y: f64,
    sign: f64,
) {
    let k = x.len();
    for i in 0..k {
        xty[i] += sign * x[i] * y;
        for j in 0..k {
            xtx[[i, j]] += sign * x[i] * x[j];
        }
    }
}

/// Solve `a x = b` by Gaussian elimination with partial pivoting.
///
/// Returns `None` when a pivot falls below [`SINGULAR_TOLERANCE`] relative
/// to the largest entry of `a`, or when the solution is not finite.
pub fn solve(a: &Array2<f64>, b: &Array1<f64>) -> Option<Array1<f64>> {
    let n = b.len();
    if a.dim() != (n, n) {
        return None;
    }

    let scale = a.iter().fold(0.0_f64, |m, v| m.max(v.abs()));
    if !scale.is_finite() || scale == 0.0 {
        return None;
    }
    let tolerance = scale * SINGULAR_TOLERANCE;

    let mut m = a.clone();
    let mut rhs = b.clone();

    for col in 0..n {
        let pivot = (col..n).max_by(|&i, &j| m[[i, col]].abs().total_cmp(&m[[j, col]].abs()))?;
        if m[[pivot, col]].abs() <= tolerance {
            return None;
        }
        if pivot != col {
            for j in 0..n {
                m.swap([col, j], [pivot, j]);
            }
            rhs.swap(col, pivot);
        }

        for row in (col + 1)..n {
            let factor = m[[row, col]] / m[[col, col]];
            if factor == 0.0 {
                continue;
            }
            for j in col..n {
                m[[row, j]] -= factor * m[[col, j]];
            }
            rhs[row] -= factor * rhs[col];
        }
    }

    let mut x = Array1::<f64>::zeros(n);
    for row in (0..n).rev() {
        let mut acc = rhs[row];
        for j in (row + 1)..n {
            acc -= m[[row, j]] * x[j];
        }
        x[row] = acc / m[[row, row]];
    }

    x.iter().all(|v| v.is_finite()).then_some(x)
}
