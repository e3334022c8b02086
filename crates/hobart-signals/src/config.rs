//! Signal and alpha configuration.
//!
//! One [`SignalConfig`] value describes an entire momentum variant: where the
//! per-period returns come from, how long they are accumulated, whether the
//! sum is volatility scaled, and how long the result is embargoed.

use crate::{Result, SignalError};
use hobart_data::FactorColumn;
use serde::{Deserialize, Serialize};

const fn default_regression_window() -> usize {
    252
}

const fn default_signal_window() -> usize {
    230
}

const fn default_lag() -> usize {
    21
}

const fn default_price_floor() -> f64 {
    5.0
}

const fn default_information_coefficient() -> f64 {
    0.05
}

/// Rolling factor regression parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegressionConfig {
    /// Factor returns regressed on, in addition to the constant
    pub factors: Vec<FactorColumn>,
    /// Rolling window length in rows (default: 252)
    #[serde(default = "default_regression_window")]
    pub window: usize,
    /// Complete rows required inside the window; defaults to `window`
    #[serde(default)]
    pub min_periods: Option<usize>,
}

impl RegressionConfig {
    /// Regression on `factors` with a full-window requirement.
    pub fn new(factors: Vec<FactorColumn>, window: usize) -> Self {
        Self {
            factors,
            window,
            min_periods: None,
        }
    }

    /// Effective minimum number of complete rows.
    pub fn min_periods(&self) -> usize {
        self.min_periods.unwrap_or(self.window)
    }
}

/// Per-period series the signal accumulates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SignalSource {
    /// Total return
    Return,
    /// Vendor idiosyncratic return
    SpecificReturn,
    /// Residual of a rolling factor regression of excess return
    FactorResidual(RegressionConfig),
}

impl SignalSource {
    /// Factors the source regresses on; empty for non-regression sources.
    pub fn factors(&self) -> &[FactorColumn] {
        match self {
            Self::FactorResidual(regression) => &regression.factors,
            Self::Return | Self::SpecificReturn => &[],
        }
    }
}

/// Series whose rolling standard deviation divides the accumulated signal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolBasis {
    /// Untransformed source series
    #[default]
    Raw,
    /// `ln(1 + x)` of the source series
    Transformed,
}

/// Volatility scaling of the accumulated signal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolScale {
    /// Rolling std window; defaults to the signal window
    #[serde(default)]
    pub window: Option<usize>,
    /// Series the std is measured on
    #[serde(default)]
    pub basis: VolBasis,
}

/// Configuration of a momentum signal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalConfig {
    /// Per-period input series
    pub source: SignalSource,
    /// Accumulation window in rows (default: 230)
    #[serde(default = "default_signal_window")]
    pub window: usize,
    /// Embargo in rows between the last input and the signal date (default: 21)
    #[serde(default = "default_lag")]
    pub lag: usize,
    /// Optional volatility scaling
    #[serde(default)]
    pub vol_scale: Option<VolScale>,
}

impl SignalConfig {
    /// Signal over `source` with default window and lag.
    pub const fn new(source: SignalSource) -> Self {
        Self {
            source,
            window: default_signal_window(),
            lag: default_lag(),
            vol_scale: None,
        }
    }

    /// Set the accumulation window.
    pub fn with_window(mut self, window: usize) -> Self {
        self.window = window;
        self
    }

    /// Set the embargo lag.
    pub fn with_lag(mut self, lag: usize) -> Self {
        self.lag = lag;
        self
    }

    /// Enable volatility scaling.
    pub fn with_vol_scale(mut self, vol_scale: VolScale) -> Self {
        self.vol_scale = Some(vol_scale);
        self
    }

    /// Window of the volatility divisor, if scaling is enabled.
    pub fn vol_window(&self) -> Option<usize> {
        self.vol_scale
            .map(|scale| scale.window.unwrap_or(self.window))
    }

    /// Rows of per-entity history needed before the first non-null signal.
    ///
    /// Assumes a gap-free history. The regression emits its first fit at
    /// row `min_periods`, the accumulation and the volatility divisor each
    /// need their own window of valid inputs on top of that, and the lag
    /// pushes the result further out.
    pub fn min_history(&self) -> usize {
        let accumulation = self.window.max(self.vol_window().unwrap_or(0));
        let warmup = match &self.source {
            SignalSource::FactorResidual(regression) => regression.min_periods().saturating_sub(1),
            SignalSource::Return | SignalSource::SpecificReturn => 0,
        };
        warmup + accumulation + self.lag
    }

    /// Reject windows and lags that can never produce a value.
    pub fn validate(&self) -> Result<()> {
        if self.window < 1 {
            return Err(SignalError::InvalidConfig(
                "signal window must be at least 1".to_string(),
            ));
        }
        if let Some(window) = self.vol_window()
            && window < 2
        {
            return Err(SignalError::InvalidConfig(format!(
                "volatility window must be at least 2, got {window}"
            )));
        }
        if let SignalSource::FactorResidual(regression) = &self.source {
            if regression.factors.is_empty() {
                return Err(SignalError::InvalidConfig(
                    "factor regression needs at least one factor".to_string(),
                ));
            }
            let mut seen = regression.factors.clone();
            seen.sort_by_key(|f| f.name());
            seen.dedup();
            if seen.len() != regression.factors.len() {
                return Err(SignalError::InvalidConfig(
                    "factor list contains duplicates".to_string(),
                ));
            }
            let k = regression.factors.len() + 1;
            if regression.min_periods() < k {
                return Err(SignalError::InvalidConfig(format!(
                    "min_periods {} is below the {k} coefficients being fitted",
                    regression.min_periods()
                )));
            }
            if regression.min_periods() > regression.window {
                return Err(SignalError::InvalidConfig(format!(
                    "min_periods {} exceeds regression window {}",
                    regression.min_periods(),
                    regression.window
                )));
            }
        }
        Ok(())
    }
}

/// Universe and alpha scaling parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlphaConfig {
    /// Previous-date price must be strictly above this (default: 5.0)
    #[serde(default = "default_price_floor")]
    pub price_floor: f64,
    /// Assumed information coefficient (default: 0.05)
    #[serde(default = "default_information_coefficient")]
    pub information_coefficient: f64,
}

impl Default for AlphaConfig {
    fn default() -> Self {
        Self {
            price_floor: default_price_floor(),
            information_coefficient: default_information_coefficient(),
        }
    }
}

impl AlphaConfig {
    /// Reject non-finite floors and non-positive coefficients.
    pub fn validate(&self) -> Result<()> {
        if !self.price_floor.is_finite() {
            return Err(SignalError::InvalidConfig(format!(
                "price floor must be finite, got {}",
                self.price_floor
            )));
        }
        if !(self.information_coefficient.is_finite() && self.information_coefficient > 0.0) {
            return Err(SignalError::InvalidConfig(format!(
                "information coefficient must be positive, got {}",
                self.information_coefficient
            )));
        }
        Ok(())
    }
}
