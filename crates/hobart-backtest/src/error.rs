//! Error types for backtest dispatch.

use thiserror::Error;

/// Result type for backtest operations.
pub type Result<T> = std::result::Result<T, BacktestError>;

/// Errors raised while planning or dispatching backtest jobs.
#[derive(Debug, Error)]
pub enum BacktestError {
    /// Configuration value out of range
    #[error("Invalid backtest configuration: {0}")]
    InvalidConfig(String),

    /// A column needed for planning is absent from the alpha table
    #[error("Missing column '{0}' in alpha table")]
    MissingColumn(String),

    /// The alpha table holds no dated rows
    #[error("Alpha table has no dates to backtest")]
    NoJobs,

    /// The dispatcher cannot read the given alpha source
    #[error("Unsupported alpha source: {0}")]
    InvalidSource(String),

    /// The engine failed on one job
    #[error("Backtest for {year} failed: {message}")]
    Engine {
        /// Year of the failing job
        year: i32,
        /// Engine error message
        message: String,
    },

    /// The scheduler rejected the submission
    #[error("Job submission failed: {0}")]
    Submission(String),

    /// Worker pool could not be created
    #[error("Thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    /// Data layer error
    #[error(transparent)]
    Data(#[from] hobart_data::DataError),

    /// Polars error
    #[error("Polars error: {0}")]
    Polars(#[from] polars::prelude::PolarsError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
