//! # Explain Errors

use thiserror::Error;

use crate::computation::ComputationError;

/// Result type for explain operations
pub type ExplainResult<T> = Result<T, ExplainError>;

/// Explain failures
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExplainError {
    #[error("Computation failed: {0}")]
    Computation(#[from] ComputationError),

    #[error("Invalid explain request: {0}")]
    InvalidRequest(String),
}

impl ExplainError {
    /// Stable code for logs and CLI output
    pub fn code(&self) -> &'static str {
        match self {
            ExplainError::Computation(e) => e.code(),
            ExplainError::InvalidRequest(_) => "CHART_EXPLAIN_INVALID_REQUEST",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_computation_error() {
        let err: ExplainError = ComputationError::Timeout(10).into();
        assert_eq!(err.code(), "CHART_COMPUTATION_TIMEOUT");
        assert!(err.to_string().starts_with("Computation failed"));
    }
}
