//! Backtest and dispatch configuration.

use crate::{BacktestError, Result};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;

const fn default_gamma() -> f64 {
    60.0
}

fn default_constraints() -> Vec<Constraint> {
    vec![Constraint::ZeroBeta, Constraint::ZeroInvestment]
}

const fn default_n_cpus() -> usize {
    8
}

fn default_mem() -> String {
    "32G".to_string()
}

fn default_time() -> String {
    "03:00:00".to_string()
}

fn default_mail_type() -> String {
    "BEGIN,END,FAIL".to_string()
}

const fn default_max_concurrent_jobs() -> usize {
    30
}

fn default_worker() -> String {
    "backtest-worker".to_string()
}

/// Optimizer constraint understood by the external backtester.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
pub enum Constraint {
    /// Portfolio beta of zero
    ZeroBeta,
    /// Weights sum to zero
    ZeroInvestment,
    /// Weights sum to one
    FullInvestment,
    /// No short positions
    LongOnly,
    /// Portfolio beta of one
    UnitBeta,
}

/// What an experiment hands to the backtester.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestConfig {
    /// Risk aversion of the mean-variance optimizer (default: 60)
    #[serde(default = "default_gamma")]
    pub gamma: f64,
    /// Optimizer constraints (default: ZeroBeta, ZeroInvestment)
    #[serde(default = "default_constraints")]
    pub constraints: Vec<Constraint>,
    /// Where the jobs run
    #[serde(default)]
    pub dispatch: DispatchConfig,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            gamma: default_gamma(),
            constraints: default_constraints(),
            dispatch: DispatchConfig::default(),
        }
    }
}

impl BacktestConfig {
    /// Reject non-positive gamma, duplicated constraints and empty pools.
    pub fn validate(&self) -> Result<()> {
        if !self.gamma.is_finite() || self.gamma <= 0.0 {
            return Err(BacktestError::InvalidConfig(format!(
                "gamma must be positive, got {}",
                self.gamma
            )));
        }

        let mut seen = HashSet::new();
        for constraint in &self.constraints {
            if !seen.insert(constraint) {
                return Err(BacktestError::InvalidConfig(format!(
                    "constraint {constraint} listed twice"
                )));
            }
        }

        match &self.dispatch {
            DispatchConfig::None => Ok(()),
            DispatchConfig::Local { n_cpus, .. } if *n_cpus == 0 => Err(
                BacktestError::InvalidConfig("local dispatch needs at least one cpu".to_string()),
            ),
            DispatchConfig::Local { worker, .. } if worker.trim().is_empty() => Err(
                BacktestError::InvalidConfig("local worker command is empty".to_string()),
            ),
            DispatchConfig::Local { .. } => Ok(()),
            DispatchConfig::Slurm(settings) => settings.validate(),
        }
    }

    /// Constraints joined with commas, as passed to workers.
    pub fn constraint_list(&self) -> String {
        self.constraints
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Dispatch mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DispatchConfig {
    /// Skip the backtest
    None,
    /// Fixed-size worker pool on this machine
    Local {
        /// Worker threads (default: 8)
        #[serde(default = "default_n_cpus")]
        n_cpus: usize,
        /// Program run per job by the bundled command engine
        #[serde(default = "default_worker")]
        worker: String,
    },
    /// Array job on a Slurm cluster
    Slurm(SlurmSettings),
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self::Local {
            n_cpus: default_n_cpus(),
            worker: default_worker(),
        }
    }
}

impl DispatchConfig {
    /// Short mode name.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Local { .. } => "local",
            Self::Slurm(_) => "slurm",
        }
    }
}

/// Resources requested for each cluster job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlurmSettings {
    /// CPUs per task (default: 8)
    #[serde(default = "default_n_cpus")]
    pub n_cpus: usize,
    /// Memory per task (default: "32G")
    #[serde(default = "default_mem")]
    pub mem: String,
    /// Wall-clock limit per task (default: "03:00:00")
    #[serde(default = "default_time")]
    pub time: String,
    /// Events that trigger a notification mail (default: "BEGIN,END,FAIL")
    #[serde(default = "default_mail_type")]
    pub mail_type: String,
    /// Array throttle (default: 30)
    #[serde(default = "default_max_concurrent_jobs")]
    pub max_concurrent_jobs: usize,
    /// Program each task runs against one year of alphas
    #[serde(default = "default_worker")]
    pub worker: String,
}

impl Default for SlurmSettings {
    fn default() -> Self {
        Self {
            n_cpus: default_n_cpus(),
            mem: default_mem(),
            time: default_time(),
            mail_type: default_mail_type(),
            max_concurrent_jobs: default_max_concurrent_jobs(),
            worker: default_worker(),
        }
    }
}

impl SlurmSettings {
    fn validate(&self) -> Result<()> {
        if self.n_cpus == 0 {
            return Err(BacktestError::InvalidConfig(
                "slurm n_cpus must be at least 1".to_string(),
            ));
        }
        if self.max_concurrent_jobs == 0 {
            return Err(BacktestError::InvalidConfig(
                "slurm max_concurrent_jobs must be at least 1".to_string(),
            ));
        }
        if self.worker.trim().is_empty() {
            return Err(BacktestError::InvalidConfig(
                "slurm worker command is empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Deployment details read from the environment by the binary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BacktestEnvironment {
    /// Directory cluster jobs `cd` into before running
    pub project_root: Option<PathBuf>,
    /// Recipient of scheduler notifications
    pub notify_email: Option<String>,
}
