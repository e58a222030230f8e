//! Error types for risk computations.

use thiserror::Error;

/// Result type for risk operations.
pub type Result<T> = std::result::Result<T, RiskError>;

/// Errors that can occur while computing risk statistics.
#[derive(Debug, Error)]
pub enum RiskError {
    /// Input violates the contract of the operation
    #[error("Invalid input for {context}: {reason}")]
    InvalidInput {
        /// Column, factor or operation the input belongs to
        context: String,
        /// What is wrong with it
        reason: String,
    },

    /// Computation has no well-defined result for this input
    #[error("Degenerate computation for {context}: {reason}")]
    DegenerateComputation {
        /// Column, factor or operation being computed
        context: String,
        /// Why the result is undefined
        reason: String,
    },

    /// Missing or non-finite value inside the analysed window
    #[error("Data quality: column {column} has a missing or non-finite value at row {index}")]
    DataQuality {
        /// Column holding the bad value
        column: String,
        /// Row position of the bad value
        index: usize,
    },

    /// Missing required column in input data
    #[error("Missing required column: {0}")]
    MissingColumn(String),

    /// Vector and matrix shapes do not line up
    #[error("Dimension mismatch for {context}: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// What was being compared
        context: String,
        /// Expected dimension
        expected: usize,
        /// Actual dimension
        actual: usize,
    },

    /// Insufficient data for the computation
    #[error("Insufficient data: need {required} periods, got {available}")]
    InsufficientData {
        /// Required number of periods
        required: usize,
        /// Available number of periods
        available: usize,
    },

    /// Regression design matrix is rank deficient
    #[error("Rank deficient design matrix: rank {rank} < columns {columns}")]
    RankDeficient {
        /// Numerical rank
        rank: usize,
        /// Number of regressors
        columns: usize,
    },

    /// Invalid date range
    #[error("Invalid date range: start {start} is after end {end}")]
    InvalidDateRange {
        /// Start date of the range
        start: String,
        /// End date of the range
        end: String,
    },

    /// Polars DataFrame error
    #[error("DataFrame error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// I/O error while loading input
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl RiskError {
    pub(crate) fn invalid(context: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            context: context.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn degenerate(context: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::DegenerateComputation {
            context: context.into(),
            reason: reason.into(),
        }
    }

    /// Returns whether the error stems from the input data rather than from
    /// the DataFrame engine or the filesystem.
    #[must_use]
    pub const fn is_data_error(&self) -> bool {
        !matches!(self, Self::Polars(_) | Self::Io(_) | Self::Json(_))
    }
}
