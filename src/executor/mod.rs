//! Workflow executor
//!
//! Consumes compiled workflow steps and produces deterministic rows.
//!
//! # Step semantics
//!
//! - `filter`: keep rows matching every predicate, order preserved
//! - `transform`: add derived fields, other keys untouched
//! - `view`: group + aggregate, or project raw rows
//! - `sort`: stable multi-field sort
//! - anything else: logged, counted, rows passed through
//!
//! Pagination is applied once after the last step.

mod aggregate;
mod errors;
mod filters;
mod result;
mod runner;
mod sorter;
mod temporal;
mod transform;
mod value;

pub use aggregate::{aggregate_values, ViewExecutor};
pub use errors::{ExecutorError, ExecutorErrorCode, ExecutorResult};
pub use filters::PredicateFilter;
pub use result::ExecutionResult;
pub use runner::{paginate, WorkflowRunner};
pub use sorter::ResultSorter;
pub use temporal::{parse_epoch_ms, parse_timestamp};
pub use transform::TransformExecutor;
pub use value::{as_finite_f64, compare_values, display_value, finite_field, group_key, number, values_equal, Row};
