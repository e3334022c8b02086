//! Hands a finished alpha table to the configured backtest dispatcher.

use crate::{ExperimentConfig, Result};
use hobart_backtest::{
    AlphaSource, BacktestEngine, BacktestEnvironment, CommandEngine, DispatchConfig,
    DispatchReport, Dispatcher, LocalDispatcher, SlurmDispatcher, plan_jobs,
};
use polars::prelude::DataFrame;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

type Progress = Arc<dyn Fn(usize, usize) + Send + Sync>;

/// Chooses and drives the dispatcher named by `backtest.dispatch`.
#[derive(Default)]
pub struct BacktestLauncher {
    environment: BacktestEnvironment,
    dry_run: bool,
    engine: Option<Arc<dyn BacktestEngine>>,
    progress: Option<Progress>,
}

impl fmt::Debug for BacktestLauncher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BacktestLauncher")
            .field("environment", &self.environment)
            .field("dry_run", &self.dry_run)
            .field("engine", &self.engine.is_some())
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

impl BacktestLauncher {
    /// Launcher for jobs deployed into `environment`.
    pub fn new(environment: BacktestEnvironment) -> Self {
        Self {
            environment,
            ..Default::default()
        }
    }

    /// Plan and write scripts without running or submitting anything.
    pub const fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Run local jobs through `engine` instead of the configured worker.
    pub fn with_engine(mut self, engine: Arc<dyn BacktestEngine>) -> Self {
        self.engine = Some(engine);
        self
    }

    /// Report local progress as `(finished, total)`.
    pub fn with_progress(
        mut self,
        progress: impl Fn(usize, usize) + Send + Sync + 'static,
    ) -> Self {
        self.progress = Some(Arc::new(progress));
        self
    }

    /// Dispatch `alphas`, already persisted at `alpha_path`.
    ///
    /// Returns `None` when dispatch is disabled, or for a local dry run.
    pub fn launch(
        &self,
        config: &ExperimentConfig,
        alphas: &DataFrame,
        alpha_path: &Path,
    ) -> Result<Option<DispatchReport>> {
        let dispatch = &config.backtest.dispatch;
        if *dispatch == DispatchConfig::None {
            info!("Backtest dispatch disabled");
            return Ok(None);
        }

        let jobs = plan_jobs(config.name(), alphas, &config.backtest)?;
        info!(
            jobs = jobs.len(),
            mode = dispatch.kind(),
            gamma = config.backtest.gamma,
            constraints = %config.backtest.constraint_list(),
            "Planned backtest jobs"
        );

        let report = match dispatch {
            DispatchConfig::None => return Ok(None),
            DispatchConfig::Local { .. } if self.dry_run => {
                info!("Dry run, skipping local backtests");
                return Ok(None);
            }
            DispatchConfig::Local { n_cpus, worker } => {
                let engine: Arc<dyn BacktestEngine> = match &self.engine {
                    Some(engine) => Arc::clone(engine),
                    None => Arc::new(CommandEngine::new(
                        worker,
                        config.output.results_dir.join("jobs"),
                        1,
                    )?),
                };
                let mut dispatcher = LocalDispatcher::new(engine, *n_cpus)?;
                if let Some(progress) = &self.progress {
                    let progress = Arc::clone(progress);
                    dispatcher = dispatcher.with_progress(move |done, total| progress(done, total));
                }
                dispatcher.dispatch(&jobs, &AlphaSource::InMemory(Arc::new(alphas.clone())))?
            }
            DispatchConfig::Slurm(settings) => SlurmDispatcher::new(
                settings.clone(),
                self.environment.clone(),
                &config.output.results_dir,
            )
            .dry_run(self.dry_run)
            .dispatch(&jobs, &AlphaSource::Persisted(alpha_path.to_path_buf()))?,
        };
        Ok(Some(report))
    }
}
