//! Engine that shells out to an external worker program.
//!
//! The worker receives one year of alphas as a Parquet file and the same
//! arguments a cluster task receives. If its last stdout line is a JSON
//! object of numbers, those become the job's metrics.

use crate::{BacktestEngine, BacktestError, BacktestJob, BacktestOutcome, Result};
use hobart_data::schema::DATE;
use polars::prelude::*;
use std::collections::BTreeMap;
use std::fs::File;
use std::path::PathBuf;
use std::process::Command;
use tracing::debug;

/// Runs a worker command per job.
#[derive(Debug, Clone)]
pub struct CommandEngine {
    program: String,
    args: Vec<String>,
    work_dir: PathBuf,
    n_cpus: usize,
}

impl CommandEngine {
    /// Engine running `worker`, split on whitespace, with job files in
    /// `work_dir`.
    pub fn new(worker: &str, work_dir: impl Into<PathBuf>, n_cpus: usize) -> Result<Self> {
        let mut parts = worker.split_whitespace().map(str::to_string);
        let Some(program) = parts.next() else {
            return Err(BacktestError::InvalidConfig(
                "worker command is empty".to_string(),
            ));
        };
        Ok(Self {
            program,
            args: parts.collect(),
            work_dir: work_dir.into(),
            n_cpus,
        })
    }

    /// File the job's alphas are written to.
    pub fn job_file(&self, job: &BacktestJob) -> PathBuf {
        self.work_dir
            .join(format!("{}_{}_alphas.parquet", job.signal, job.year))
    }
}

impl BacktestEngine for CommandEngine {
    fn run(&self, job: &BacktestJob, alphas: &DataFrame) -> Result<BacktestOutcome> {
        std::fs::create_dir_all(&self.work_dir)?;
        let path = self.job_file(job);
        let mut slice = alphas.clone();
        ParquetWriter::new(File::create(&path)?).finish(&mut slice)?;

        let constraints = job
            .constraints
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",");
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg("--signal")
            .arg(&job.signal)
            .arg("--data")
            .arg(&path)
            .arg("--year")
            .arg(job.year.to_string())
            .arg("--gamma")
            .arg(job.gamma.to_string())
            .arg("--constraints")
            .arg(constraints)
            .arg("--n-cpus")
            .arg(self.n_cpus.to_string())
            .output()?;

        if !output.status.success() {
            return Err(BacktestError::Engine {
                year: job.year,
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        debug!(year = job.year, output = %stdout.trim(), "Worker finished");
        Ok(BacktestOutcome {
            year: job.year,
            periods: alphas.column(DATE)?.n_unique()?,
            metrics: parse_metrics(&stdout),
        })
    }
}

/// Metrics from the last non-empty stdout line, if it is a JSON object.
fn parse_metrics(stdout: &str) -> BTreeMap<String, f64> {
    stdout
        .lines()
        .rev()
        .find(|line| !line.trim().is_empty())
        .and_then(|line| serde_json::from_str::<BTreeMap<String, f64>>(line.trim()).ok())
        .unwrap_or_default()
}
