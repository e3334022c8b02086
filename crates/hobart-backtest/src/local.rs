//! Local worker-pool dispatch.

use crate::dispatch::{DispatchReport, Dispatcher, JobFailure, LocalReport};
use crate::job::job_slice;
use crate::{AlphaSource, BacktestEngine, BacktestError, BacktestJob, Result};
use rayon::prelude::*;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{info, warn};

/// Called with `(finished, total)` after each job.
pub type ProgressCallback = Box<dyn Fn(usize, usize) + Send + Sync>;

/// Runs jobs on a fixed-size `rayon` pool through a [`BacktestEngine`].
pub struct LocalDispatcher {
    engine: Arc<dyn BacktestEngine>,
    n_cpus: usize,
    progress: Option<ProgressCallback>,
}

impl fmt::Debug for LocalDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalDispatcher")
            .field("n_cpus", &self.n_cpus)
            .field("progress", &self.progress.is_some())
            .finish_non_exhaustive()
    }
}

impl LocalDispatcher {
    /// Pool of `n_cpus` workers.
    pub fn new(engine: Arc<dyn BacktestEngine>, n_cpus: usize) -> Result<Self> {
        if n_cpus == 0 {
            return Err(BacktestError::InvalidConfig(
                "local dispatch needs at least one cpu".to_string(),
            ));
        }
        Ok(Self {
            engine,
            n_cpus,
            progress: None,
        })
    }

    /// Report progress after every finished job.
    pub fn with_progress(
        mut self,
        callback: impl Fn(usize, usize) + Send + Sync + 'static,
    ) -> Self {
        self.progress = Some(Box::new(callback));
        self
    }

    /// Worker count.
    pub const fn n_cpus(&self) -> usize {
        self.n_cpus
    }
}

impl Dispatcher for LocalDispatcher {
    fn dispatch(&self, jobs: &[BacktestJob], source: &AlphaSource) -> Result<DispatchReport> {
        let alphas = source.load()?;
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.n_cpus)
            .build()?;

        info!(jobs = jobs.len(), n_cpus = self.n_cpus, "Running backtests locally");

        let finished = AtomicUsize::new(0);
        let results: Vec<_> = pool.install(|| {
            jobs.par_iter()
                .map(|job| {
                    let result = job_slice(&alphas, job)
                        .and_then(|slice| self.engine.run(job, &slice));
                    let done = finished.fetch_add(1, Ordering::Relaxed) + 1;
                    if let Some(progress) = &self.progress {
                        progress(done, jobs.len());
                    }
                    (job.year, result)
                })
                .collect()
        });

        let mut report = LocalReport::default();
        for (year, result) in results {
            match result {
                Ok(outcome) => report.outcomes.push(outcome),
                Err(e) => {
                    warn!(year, error = %e, "Backtest job failed");
                    report.failures.push(JobFailure {
                        year,
                        error: e.to_string(),
                    });
                }
            }
        }

        info!(
            succeeded = report.outcomes.len(),
            failed = report.failures.len(),
            "Local backtests finished"
        );
        Ok(DispatchReport::Local(report))
    }
}
