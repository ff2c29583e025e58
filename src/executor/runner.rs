//! Workflow runner
//!
//! # Execution Flow (strict order)
//!
//! 1. Each step runs on the full output of its predecessor
//! 2. Unknown steps are logged, counted, and passed through
//! 3. Offset/limit pagination applies once, to the final rows
//!
//! Execution is deterministic: same rows + same steps = same output.

use std::sync::Arc;

use super::aggregate::ViewExecutor;
use super::errors::{ExecutorError, ExecutorResult};
use super::filters::PredicateFilter;
use super::result::ExecutionResult;
use super::sorter::ResultSorter;
use super::transform::TransformExecutor;
use super::value::Row;
use crate::observability::{
    log_event_with_fields, Event, MetricsRegistry, ObservationScope, Severity,
};
use crate::workflow::{TransformExpr, ViewQuery, WorkflowStep};

/// Runs workflows against in-memory rows
#[derive(Debug, Clone, Default)]
pub struct WorkflowRunner {
    metrics: Option<Arc<MetricsRegistry>>,
}

impl WorkflowRunner {
    /// Creates a runner without metrics
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a runner that records into `metrics`
    pub fn with_metrics(metrics: Arc<MetricsRegistry>) -> Self {
        Self {
            metrics: Some(metrics),
        }
    }

    /// Runs the workflow and returns the paginated rows
    pub fn run(
        &self,
        rows: &[Row],
        steps: &[WorkflowStep],
        offset: Option<usize>,
        limit: Option<usize>,
    ) -> Vec<Row> {
        self.execute(rows, steps, offset, limit).into_rows()
    }

    /// Runs the workflow, reporting counts alongside the rows
    pub fn execute(
        &self,
        rows: &[Row],
        steps: &[WorkflowStep],
        offset: Option<usize>,
        limit: Option<usize>,
    ) -> ExecutionResult {
        let steps_count = steps.len().to_string();
        let scope = ObservationScope::with_fields(
            "WORKFLOW",
            Severity::Trace,
            &[("steps", steps_count.as_str())],
        );

        let mut unknown_steps = Vec::new();
        let mut current = rows.to_vec();
        for (index, step) in steps.iter().enumerate() {
            current = self.apply_step(current, step, index, &mut unknown_steps);
        }

        let total_count = current.len();
        let paged = paginate(current, offset, limit);

        if let Some(metrics) = &self.metrics {
            metrics.increment_workflows_executed();
            metrics.add_rows_returned(paged.len() as u64);
        }

        let returned = paged.len().to_string();
        scope.complete_with_fields(&[("rows", returned.as_str())]);

        ExecutionResult {
            rows: paged,
            scanned_count: rows.len(),
            total_count,
            unknown_steps,
        }
    }

    fn apply_step(
        &self,
        rows: Vec<Row>,
        step: &WorkflowStep,
        index: usize,
        unknown_steps: &mut Vec<String>,
    ) -> Vec<Row> {
        if let Some(metrics) = &self.metrics {
            metrics.increment_steps_executed();
        }

        match step {
            WorkflowStep::Filter { filters } => PredicateFilter::filter_rows(rows, filters),
            WorkflowStep::Transform { transform } => TransformExecutor::apply(rows, transform),
            WorkflowStep::View { query } => ViewExecutor::apply(rows, query),
            WorkflowStep::Sort { by, sort } => {
                let mut rows = rows;
                ResultSorter::sort(&mut rows, by, *sort);
                rows
            }
            WorkflowStep::Unknown { kind } => {
                let position = index.to_string();
                log_event_with_fields(
                    Event::UnknownStep,
                    &[("kind", kind.as_str()), ("step", position.as_str())],
                );
                if let Some(metrics) = &self.metrics {
                    metrics.increment_unknown_steps();
                }
                unknown_steps.push(kind.clone());
                rows
            }
        }
    }

    /// Rejects structurally unusable workflows.
    ///
    /// Unknown steps are not errors; they pass through at run time.
    pub fn validate_workflow(steps: &[WorkflowStep]) -> ExecutorResult<()> {
        for (index, step) in steps.iter().enumerate() {
            match step {
                WorkflowStep::Sort { by, .. } if by.is_empty() => {
                    return Err(ExecutorError::step_invalid(index, "sort step has no fields"));
                }
                WorkflowStep::View { query } if query.is_empty() => {
                    return Err(ExecutorError::step_invalid(index, "view step has no queries"));
                }
                WorkflowStep::View { query } => {
                    for q in query {
                        if let ViewQuery::Aggregate { measures, .. } = q {
                            if let Some(m) = measures.iter().find(|m| m.as_field_key.is_empty()) {
                                return Err(ExecutorError::step_invalid(
                                    index,
                                    format!("measure on '{}' has an empty output key", m.field),
                                ));
                            }
                        }
                    }
                }
                WorkflowStep::Transform { transform } => {
                    for t in transform {
                        if t.key.is_empty() {
                            return Err(ExecutorError::step_invalid(
                                index,
                                "transform has an empty output key",
                            ));
                        }
                        if let TransformExpr::Bin { num: 0, field } = &t.expression {
                            return Err(ExecutorError::step_invalid(
                                index,
                                format!("bin on '{}' requests zero buckets", field),
                            ));
                        }
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }
}

/// Slices `offset..offset + limit`, clamped to the row count.
///
/// A missing or zero limit runs to the end.
pub fn paginate(rows: Vec<Row>, offset: Option<usize>, limit: Option<usize>) -> Vec<Row> {
    let start = offset.unwrap_or(0).min(rows.len());
    let end = match limit {
        Some(limit) if limit > 0 => start.saturating_add(limit).min(rows.len()),
        _ => rows.len(),
    };
    rows.into_iter().skip(start).take(end - start).collect()
}
