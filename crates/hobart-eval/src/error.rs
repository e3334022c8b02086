//! Error types for IC evaluation.

use thiserror::Error;

/// Result type for evaluation operations.
pub type Result<T> = std::result::Result<T, EvalError>;

/// Errors that can occur during evaluation.
#[derive(Debug, Error)]
pub enum EvalError {
    /// An input table lacks a required column
    #[error("Missing column '{0}'")]
    MissingColumn(String),

    /// Rolling window of zero length
    #[error("IC window must be at least 1, got {0}")]
    InvalidWindow(usize),

    /// Polars error
    #[error("Polars error: {0}")]
    Polars(#[from] polars::prelude::PolarsError),
}
