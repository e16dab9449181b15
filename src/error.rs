//! Error types for the scoring engine

use thiserror::Error;

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

/// Hard failures raised by the engine.
///
/// A weight mismatch is not an error; it is reported through
/// [`crate::scoring::Composite::weight_mismatch`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// Malformed tier table (empty bounds, unsorted, gaps, overlaps)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Score sits below the lowest tier's lower bound
    #[error("Score {score} is below the lowest tier bound {lowest}")]
    OutOfRange { score: f64, lowest: f64 },

    /// Rejected argument (bad top-N, empty tiers, negative tolerance, ...)
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl EngineError {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        EngineError::Configuration(msg.into())
    }

    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        EngineError::InvalidArgument(msg.into())
    }
}
