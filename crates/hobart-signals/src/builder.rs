//! Momentum signal construction.
//!
//! For every entity in date order:
//!
//! ```text
//! transformed = ln(1 + x)                       null when x <= -1
//! momentum    = rolling_sum(transformed, R)
//! momentum    = momentum / rolling_std(v, V)     optional, null when std = 0
//! signal      = shift(momentum, lag)
//! ```
//!
//! where `x` is the configured source series and `v` is either `x` or
//! `transformed`.

use crate::residual::{RESIDUAL, fit_factor_model};
use crate::{Result, SignalConfig, SignalError, SignalSource, VolBasis};
use hobart_data::Panel;
use hobart_data::schema::{DATE, ENTITY_ID, EXCESS_RETURN, RETURN, SPECIFIC_RETURN};
use polars::prelude::*;
use tracing::info;

/// Momentum signal, lagged.
pub const SIGNAL: &str = "signal";

/// `ln(1 + x)` of the source series.
pub const TRANSFORMED: &str = "transformed";

const MOMENTUM: &str = "momentum";
const VOLATILITY: &str = "volatility";

/// Builds the signal table from a prepared panel.
#[derive(Debug, Clone)]
pub struct SignalBuilder {
    config: SignalConfig,
}

impl SignalBuilder {
    /// Create a builder, rejecting invalid configurations.
    pub fn new(config: SignalConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// The configuration being built.
    pub const fn config(&self) -> &SignalConfig {
        &self.config
    }

    /// Column the signal accumulates.
    pub const fn source_column(&self) -> &'static str {
        match self.config.source {
            SignalSource::Return => RETURN,
            SignalSource::SpecificReturn => SPECIFIC_RETURN,
            SignalSource::FactorResidual(_) => RESIDUAL,
        }
    }

    /// Columns the panel must carry for this configuration.
    pub fn required_columns(&self) -> Vec<&'static str> {
        match &self.config.source {
            SignalSource::Return => vec![RETURN],
            SignalSource::SpecificReturn => vec![SPECIFIC_RETURN],
            SignalSource::FactorResidual(regression) => std::iter::once(EXCESS_RETURN)
                .chain(regression.factors.iter().map(|f| f.name()))
                .collect(),
        }
    }

    /// Fail fast on missing columns or a panel too short for any signal.
    pub fn check_panel(&self, panel: &Panel) -> Result<()> {
        for column in self.required_columns() {
            if panel.frame().column(column).is_err() {
                return Err(SignalError::MissingColumn(column.to_string()));
            }
        }

        let required = self.config.min_history();
        let available = panel.max_history()?;
        if available < required {
            return Err(SignalError::InsufficientHistory {
                required,
                available,
            });
        }
        Ok(())
    }

    /// Build the signal table.
    ///
    /// Returns every panel row sorted by `(entity_id, date)` with
    /// `transformed` and `signal` appended, plus the `B_*` coefficient and
    /// `residual` columns for regression sources.
    pub fn build(&self, panel: &Panel) -> Result<DataFrame> {
        self.check_panel(panel)?;

        let frame = match &self.config.source {
            SignalSource::FactorResidual(regression) => {
                fit_factor_model(panel.frame().clone(), regression)?
            }
            SignalSource::Return | SignalSource::SpecificReturn => panel.frame().clone(),
        };

        let signals = self.accumulate(frame.lazy()).collect()?;

        info!(
            rows = signals.height(),
            non_null = signals.height() - signals.column(SIGNAL)?.null_count(),
            "Built signal"
        );
        Ok(signals)
    }

    /// Transform, accumulate, scale and lag the source column.
    pub fn accumulate(&self, frame: LazyFrame) -> LazyFrame {
        let source = self.source_column();
        let by_entity = [col(ENTITY_ID)];

        let frame = frame
            .sort([ENTITY_ID, DATE], SortMultipleOptions::default())
            .with_column(
                when(col(source).gt(lit(-1.0)))
                    .then(col(source).log1p())
                    .otherwise(lit(NULL))
                    .cast(DataType::Float64)
                    .alias(TRANSFORMED),
            )
            .with_column(
                col(TRANSFORMED)
                    .rolling_sum(window(self.config.window))
                    .over(by_entity.clone())
                    .alias(MOMENTUM),
            );

        let frame = match (self.config.vol_scale, self.config.vol_window()) {
            (Some(scale), Some(vol_window)) => {
                let basis = match scale.basis {
                    VolBasis::Raw => source,
                    VolBasis::Transformed => TRANSFORMED,
                };
                frame
                    .with_column(
                        col(basis)
                            .rolling_std(window(vol_window))
                            .over(by_entity.clone())
                            .alias(VOLATILITY),
                    )
                    .with_column(
                        when(col(VOLATILITY).gt(lit(0.0)))
                            .then(col(MOMENTUM) / col(VOLATILITY))
                            .otherwise(lit(NULL))
                            .cast(DataType::Float64)
                            .alias(MOMENTUM),
                    )
                    .drop([VOLATILITY])
            }
            _ => frame,
        };

        frame
            .with_column(
                col(MOMENTUM)
                    .shift(lit(self.config.lag as i64))
                    .over(by_entity)
                    .alias(SIGNAL),
            )
            .drop([MOMENTUM])
    }
}

fn window(size: usize) -> RollingOptionsFixedWindow {
    RollingOptionsFixedWindow {
        window_size: size,
        min_periods: size,
        ..Default::default()
    }
}
