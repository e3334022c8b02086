#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/hobart/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod artifacts;
pub mod config;
pub mod error;
pub mod launch;
pub mod pipeline;

// Re-export main types from sub-crates
pub use hobart_backtest as backtest;
pub use hobart_data as data;
pub use hobart_eval as eval;
pub use hobart_output as output;
pub use hobart_signals as signals;

pub use artifacts::{ArtifactPaths, write_artifacts, write_betas, write_report};
pub use config::{
    DataConfig, EvaluationConfig, ExperimentConfig, ExperimentInfo, OutputConfig, Overrides,
    preset_names,
};
pub use error::{PipelineError, Result};
pub use launch::BacktestLauncher;
pub use pipeline::{Pipeline, PipelineOutput, Stage};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
