//! Result types for workflow execution

use serde::Serialize;

use super::value::Row;

/// Result of running a workflow
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExecutionResult {
    /// Rows in result order, after pagination
    pub rows: Vec<Row>,
    /// Number of input rows
    pub scanned_count: usize,
    /// Number of rows the last step produced, before pagination
    pub total_count: usize,
    /// Kinds of steps that were skipped as unknown, in encounter order
    pub unknown_steps: Vec<String>,
}

impl ExecutionResult {
    /// Creates an empty result
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns true if no rows were returned
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns the number of returned rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if pagination dropped rows
    pub fn is_truncated(&self) -> bool {
        self.rows.len() < self.total_count
    }

    pub fn iter(&self) -> impl Iterator<Item = &Row> {
        self.rows.iter()
    }

    /// Consumes the result, returning its rows
    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_execution_result_empty() {
        let result = ExecutionResult::empty();
        assert!(result.is_empty());
        assert_eq!(result.len(), 0);
        assert!(!result.is_truncated());
    }

    #[test]
    fn test_truncation() {
        let result = ExecutionResult {
            rows: vec![Row::new()],
            scanned_count: 10,
            total_count: 3,
            unknown_steps: Vec::new(),
        };
        assert!(result.is_truncated());
        assert_eq!(result.into_rows().len(), 1);
    }
}
