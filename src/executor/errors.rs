//! Executor error types
//!
//! Error codes:
//! - CHART_STEP_INVALID (ERROR)
//! - CHART_EXECUTION_FAILED (ERROR)

use std::fmt;

use crate::observability::Severity;

/// Executor error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutorErrorCode {
    /// A step is structurally unusable (empty sort key list, zero bins, ...)
    ChartStepInvalid,
    /// General execution failure
    ChartExecutionFailed,
}

impl ExecutorErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            ExecutorErrorCode::ChartStepInvalid => "CHART_STEP_INVALID",
            ExecutorErrorCode::ChartExecutionFailed => "CHART_EXECUTION_FAILED",
        }
    }

    /// Returns the severity level for this error
    pub fn severity(&self) -> Severity {
        Severity::Error
    }
}

impl fmt::Display for ExecutorErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Executor error with code, message and optional step position
#[derive(Debug)]
pub struct ExecutorError {
    code: ExecutorErrorCode,
    message: String,
    step: Option<usize>,
}

impl ExecutorError {
    /// Create a step-invalid error for the step at `index`
    pub fn step_invalid(index: usize, reason: impl Into<String>) -> Self {
        Self {
            code: ExecutorErrorCode::ChartStepInvalid,
            message: reason.into(),
            step: Some(index),
        }
    }

    /// Create an execution failed error
    pub fn execution_failed(reason: impl Into<String>) -> Self {
        Self {
            code: ExecutorErrorCode::ChartExecutionFailed,
            message: reason.into(),
            step: None,
        }
    }

    pub fn code(&self) -> ExecutorErrorCode {
        self.code
    }

    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Index of the offending step, if known
    pub fn step(&self) -> Option<usize> {
        self.step
    }
}

impl fmt::Display for ExecutorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.code.severity(), self.code.code(), self.message)?;
        if let Some(index) = self.step {
            write!(f, " [step {}]", index)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExecutorError {}

/// Result type for executor operations
pub type ExecutorResult<T> = Result<T, ExecutorError>;
