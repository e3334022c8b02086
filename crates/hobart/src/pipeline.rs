//! The parameterised alpha pipeline.
//!
//! One [`Pipeline`] replaces the per-experiment scripts: every variant is the
//! same stage sequence driven by an [`ExperimentConfig`].

use crate::{ExperimentConfig, PipelineError, Result};
use derive_more::Display;
use hobart_data::schema::{DATE, ENTITY_ID};
use hobart_data::{Panel, PanelSource, forward_returns, load_panel};
use hobart_eval::{IcEvaluator, IcReport};
use hobart_signals::{
    AlphaConverter, CONSTANT, SignalBuilder, SignalSource, UniverseFilter, coefficient_column,
    fit_factor_model, score_signals,
};
use polars::prelude::*;
use tracing::{info, info_span, warn};

/// Pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Stage {
    /// Load and prepare the panel
    #[display("load")]
    Load,
    /// Build the lagged signal
    #[display("signal")]
    Signal,
    /// Apply the tradable-universe filter
    #[display("filter")]
    Filter,
    /// Cross-sectional z-score
    #[display("score")]
    Score,
    /// Scale scores into alphas
    #[display("alpha")]
    Alpha,
    /// Information coefficients
    #[display("evaluate")]
    Evaluate,
}

impl Stage {
    /// Every stage in order.
    pub const ALL: [Self; 6] = [
        Self::Load,
        Self::Signal,
        Self::Filter,
        Self::Score,
        Self::Alpha,
        Self::Evaluate,
    ];
}

/// Everything a run produces.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    /// Rows in the prepared panel
    pub panel_rows: usize,
    /// Entities in the prepared panel
    pub entities: usize,
    /// Signal table, including coefficients and residuals for regression sources
    pub signals: DataFrame,
    /// `(date, entity_id, alpha, predicted_beta)`
    pub alphas: DataFrame,
    /// `(date, entity_id, fwd_return)`
    pub forward: DataFrame,
    /// IC series and statistics
    pub ics: IcReport,
}

/// Runs every stage for one experiment.
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: ExperimentConfig,
    builder: SignalBuilder,
    filter: UniverseFilter,
    converter: AlphaConverter,
    evaluator: IcEvaluator,
}

impl Pipeline {
    /// Validate `config` and set up the stages.
    pub fn new(config: ExperimentConfig) -> Result<Self> {
        config.validate()?;
        let builder = SignalBuilder::new(config.signal.clone())?;
        let filter = UniverseFilter::new(config.alpha.price_floor);
        let converter = AlphaConverter::new(config.alpha.information_coefficient);
        let evaluator = IcEvaluator::new(config.evaluation.ic_window)?;
        Ok(Self {
            config,
            builder,
            filter,
            converter,
            evaluator,
        })
    }

    /// Configuration being run.
    pub const fn config(&self) -> &ExperimentConfig {
        &self.config
    }

    /// Load the panel this experiment needs.
    pub fn load(&self, source: &dyn PanelSource) -> Result<Panel> {
        let _span = info_span!("stage", name = %Stage::Load).entered();
        let panel = load_panel(source, &self.config.prepare_options())?;
        info!(
            rows = panel.height(),
            entities = panel.entity_count()?,
            start = %self.config.data.start,
            end = %self.config.data.end,
            "Loaded panel"
        );
        Ok(panel)
    }

    /// Load from `source` and run every stage.
    pub fn run(&self, source: &dyn PanelSource) -> Result<PipelineOutput> {
        self.run_with(source, |_| {})
    }

    /// Like [`run`](Self::run), calling `on_stage` as each stage starts.
    pub fn run_with(
        &self,
        source: &dyn PanelSource,
        mut on_stage: impl FnMut(Stage),
    ) -> Result<PipelineOutput> {
        on_stage(Stage::Load);
        let panel = self.load(source)?;
        self.run_panel_with(&panel, on_stage)
    }

    /// Run every stage after loading on an already prepared panel.
    pub fn run_panel(&self, panel: &Panel) -> Result<PipelineOutput> {
        self.run_panel_with(panel, |_| {})
    }

    fn run_panel_with(
        &self,
        panel: &Panel,
        mut on_stage: impl FnMut(Stage),
    ) -> Result<PipelineOutput> {
        on_stage(Stage::Signal);
        let signals = {
            let _span = info_span!("stage", name = %Stage::Signal).entered();
            self.builder.build(panel)?
        };

        on_stage(Stage::Filter);
        let filtered = {
            let _span = info_span!("stage", name = %Stage::Filter).entered();
            let filtered = self.filter.apply(signals.clone().lazy()).collect()?;
            if filtered.height() == 0 {
                warn!(
                    price_floor = self.filter.price_floor(),
                    "No rows survived the universe filter"
                );
            } else {
                info!(
                    rows = filtered.height(),
                    dropped = signals.height() - filtered.height(),
                    "Filtered universe"
                );
            }
            filtered
        };

        on_stage(Stage::Score);
        let scored = {
            let _span = info_span!("stage", name = %Stage::Score).entered();
            score_signals(filtered.lazy()).collect()?
        };

        on_stage(Stage::Alpha);
        let alphas = {
            let _span = info_span!("stage", name = %Stage::Alpha).entered();
            let alphas = self.converter.convert(scored.lazy()).collect()?;
            info!(
                rows = alphas.height(),
                information_coefficient = self.converter.information_coefficient(),
                "Converted scores to alphas"
            );
            alphas
        };

        on_stage(Stage::Evaluate);
        let (forward, ics) = {
            let _span = info_span!("stage", name = %Stage::Evaluate).entered();
            let forward = forward_returns(panel)?;
            let ics = self.evaluator.evaluate(&alphas, &forward)?;
            (forward, ics)
        };

        Ok(PipelineOutput {
            panel_rows: panel.height(),
            entities: panel.entity_count()?,
            signals,
            alphas,
            forward,
            ics,
        })
    }

    /// Rolling regression coefficients, without building a signal.
    ///
    /// Returns `(date, entity_id, B_const, B_<factor>..)` sorted by date and
    /// entity. Only regression sources have coefficients.
    pub fn betas(&self, panel: &Panel) -> Result<DataFrame> {
        let SignalSource::FactorResidual(regression) = &self.config.signal.source else {
            return Err(PipelineError::InvalidConfig(format!(
                "signal '{}' does not fit a factor regression",
                self.config.name()
            )));
        };

        let _span = info_span!("stage", name = "betas").entered();
        let fitted = fit_factor_model(panel.frame().clone(), regression)?;
        let columns: Vec<Expr> = [col(DATE), col(ENTITY_ID)]
            .into_iter()
            .chain(
                std::iter::once(CONSTANT)
                    .chain(regression.factors.iter().map(|f| f.name()))
                    .map(|r| col(coefficient_column(r))),
            )
            .collect();
        let betas = fitted
            .lazy()
            .select(columns)
            .sort([DATE, ENTITY_ID], SortMultipleOptions::default())
            .collect()?;
        info!(rows = betas.height(), "Fitted factor betas");
        Ok(betas)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_names() {
        let names: Vec<String> = Stage::ALL.iter().map(ToString::to_string).collect();
        assert_eq!(
            names,
            vec!["load", "signal", "filter", "score", "alpha", "evaluate"]
        );
    }

    #[test]
    fn test_invalid_config_rejected_before_running() {
        let mut config = ExperimentConfig::preset("ff3_momentum").unwrap();
        config.signal.window = 0;
        assert!(matches!(Pipeline::new(config), Err(PipelineError::Signal(_))));
    }
}
