//! Error types for signal construction.

use thiserror::Error;

/// Result type for signal operations.
pub type Result<T> = std::result::Result<T, SignalError>;

/// Errors raised while building signals, scores or alphas.
///
/// Degenerate numerics never produce an error; they produce nulls.
#[derive(Debug, Error)]
pub enum SignalError {
    /// A column needed by a stage is absent from its input
    #[error("Missing column '{0}'")]
    MissingColumn(String),

    /// Configuration value out of range
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// No entity has enough history for a single non-null signal
    #[error("Insufficient history: signal needs {required} dates per entity, longest history is {available}")]
    InsufficientHistory {
        /// Dates needed before the first signal value
        required: usize,
        /// Longest per-entity history in the panel
        available: usize,
    },

    /// Data layer error
    #[error(transparent)]
    Data(#[from] hobart_data::DataError),

    /// Polars error
    #[error("Polars error: {0}")]
    Polars(#[from] polars::prelude::PolarsError),
}
