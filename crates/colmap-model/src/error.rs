//! Error types for model-level validation.

use thiserror::Error;

/// Errors raised when a value violates a data model invariant.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    /// A confidence score is NaN or outside `[0, 1]`.
    #[error("confidence {value} for column {column_index} is outside [0, 1]")]
    ConfidenceOutOfRange { column_index: usize, value: f64 },

    /// A column index does not reference a header position.
    #[error("column index {column_index} is out of bounds for {column_count} columns")]
    ColumnIndexOutOfBounds {
        column_index: usize,
        column_count: usize,
    },

    /// Two entries claim the same source column.
    #[error("column index {column_index} is claimed more than once")]
    DuplicateColumnIndex { column_index: usize },

    /// A source column is neither mapped nor listed as extra.
    #[error("column index {column_index} is missing from the mapping result")]
    MissingColumn { column_index: usize },

    /// Unknown mapping format string.
    #[error("unknown mapping format '{0}' (expected \"spec\" or \"table\")")]
    InvalidFormat(String),

    /// Rating outside the binary {1, 5} encoding.
    #[error("rating {0} is not allowed (expected 1 or 5)")]
    InvalidRating(i32),
}

/// Result type for model operations.
pub type Result<T> = std::result::Result<T, ModelError>;
