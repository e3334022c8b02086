#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/hobart/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod command;
pub mod config;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod job;
pub mod local;
pub mod slurm;

pub use command::CommandEngine;
pub use config::{BacktestConfig, BacktestEnvironment, Constraint, DispatchConfig, SlurmSettings};
pub use dispatch::{DispatchReport, Dispatcher, JobFailure, LocalReport, SlurmSubmission};
pub use engine::{BacktestEngine, BacktestOutcome};
pub use error::{BacktestError, Result};
pub use job::{AlphaSource, BacktestJob, job_slice, plan_jobs};
pub use local::{LocalDispatcher, ProgressCallback};
pub use slurm::SlurmDispatcher;

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
