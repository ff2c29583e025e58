//! # Computation Errors

use thiserror::Error;

/// Result type for computation calls
pub type ComputationResult<T> = Result<T, ComputationError>;

/// Failures of a computation function
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ComputationError {
    #[error("Computation backend error: {0}")]
    Backend(String),

    #[error("Computation timeout after {0}ms")]
    Timeout(u64),

    #[error("Invalid query payload: {0}")]
    InvalidPayload(String),
}

impl ComputationError {
    /// Stable code for logs and CLI output
    pub fn code(&self) -> &'static str {
        match self {
            ComputationError::Backend(_) => "CHART_COMPUTATION_BACKEND",
            ComputationError::Timeout(_) => "CHART_COMPUTATION_TIMEOUT",
            ComputationError::InvalidPayload(_) => "CHART_COMPUTATION_INVALID_PAYLOAD",
        }
    }
}
