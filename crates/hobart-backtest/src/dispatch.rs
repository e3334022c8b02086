//! Dispatch contract shared by the local pool and the cluster.

use crate::{AlphaSource, BacktestJob, BacktestOutcome, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Sends a planned job set somewhere to run.
pub trait Dispatcher {
    /// Run or submit `jobs` against `source`.
    ///
    /// # Errors
    ///
    /// Returns an error if the job set as a whole cannot be dispatched.
    /// Failures of individual jobs are reported, not raised.
    fn dispatch(&self, jobs: &[BacktestJob], source: &AlphaSource) -> Result<DispatchReport>;
}

/// A job that did not produce an outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobFailure {
    /// Year of the job
    pub year: i32,
    /// Error message
    pub error: String,
}

/// Results of a local run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocalReport {
    /// Outcomes of successful jobs, in year order
    pub outcomes: Vec<BacktestOutcome>,
    /// Failed jobs, in year order
    pub failures: Vec<JobFailure>,
}

impl LocalReport {
    /// Number of jobs run.
    pub fn jobs(&self) -> usize {
        self.outcomes.len() + self.failures.len()
    }

    /// Whether every job succeeded.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// A cluster submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlurmSubmission {
    /// Batch script written for the array job
    pub script: PathBuf,
    /// Array size
    pub jobs: usize,
    /// False in dry-run mode
    pub submitted: bool,
    /// Scheduler job id, when submitted
    pub scheduler_id: Option<String>,
}

/// What a dispatcher did.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum DispatchReport {
    /// Jobs ran in this process
    Local(LocalReport),
    /// Jobs were handed to the scheduler
    Slurm(SlurmSubmission),
}
