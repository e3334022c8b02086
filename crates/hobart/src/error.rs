//! Error types for experiment runs.

use thiserror::Error;

/// Result type for experiment operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Any failure of an experiment run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Experiment configuration rejected
    #[error("Invalid experiment configuration: {0}")]
    InvalidConfig(String),

    /// No built-in experiment with this name
    #[error("Unknown preset '{0}'")]
    UnknownPreset(String),

    /// TOML could not be parsed
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// TOML could not be written
    #[error("TOML serialization error: {0}")]
    TomlWrite(#[from] toml::ser::Error),

    /// Data layer error
    #[error(transparent)]
    Data(#[from] hobart_data::DataError),

    /// Signal construction error
    #[error(transparent)]
    Signal(#[from] hobart_signals::SignalError),

    /// IC evaluation error
    #[error(transparent)]
    Eval(#[from] hobart_eval::EvalError),

    /// Artifact export error
    #[error(transparent)]
    Export(#[from] hobart_output::ExportError),

    /// Run report error
    #[error(transparent)]
    Report(#[from] hobart_output::ReportError),

    /// Backtest dispatch error
    #[error(transparent)]
    Backtest(#[from] hobart_backtest::BacktestError),

    /// Polars error
    #[error("Polars error: {0}")]
    Polars(#[from] polars::prelude::PolarsError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
