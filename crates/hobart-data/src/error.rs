//! Error types for data operations.

use thiserror::Error;

/// Result type for data operations.
pub type Result<T> = std::result::Result<T, DataError>;

/// Errors that can occur while loading or preparing panel data.
#[derive(Debug, Error)]
pub enum DataError {
    /// A required column is absent from an input table
    #[error("Missing column '{column}' in {table} table")]
    MissingColumn {
        /// Table that was inspected ("asset" or "factor")
        table: &'static str,
        /// Name of the missing column
        column: String,
    },

    /// Invalid date range
    #[error("Invalid date range: start {start} is after end {end}")]
    InvalidDateRange {
        /// Start date of the range
        start: String,
        /// End date of the range
        end: String,
    },

    /// A date column could not be interpreted as calendar dates
    #[error("Unparsable dates in column '{column}': {reason}")]
    InvalidDate {
        /// Column holding the dates
        column: String,
        /// Underlying parse failure
        reason: String,
    },

    /// The same (entity_id, date) pair appears more than once
    #[error("Duplicate observation for entity {entity_id} on {date}")]
    DuplicateKey {
        /// Entity identifier
        entity_id: String,
        /// Date of the duplicated observation
        date: String,
    },

    /// No rows survived loading and date filtering
    #[error("Panel is empty between {start} and {end}")]
    EmptyPanel {
        /// Start date of the requested range
        start: String,
        /// End date of the requested range
        end: String,
    },

    /// File extension is not a supported table format
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    /// Polars error
    #[error("Polars error: {0}")]
    Polars(#[from] polars::prelude::PolarsError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
