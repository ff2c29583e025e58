//! Declarative query workflows
//!
//! A workflow is an ordered list of steps compiled from a chart view:
//!
//! 1. `transform` - derived fields (binning, logs, date drills)
//! 2. `filter` - per-field predicates, all combined with AND
//! 3. `view` - grouping + aggregation, or a raw projection
//! 4. `sort` - stable ordering by one or more fields
//!
//! Step order is significant and is preserved exactly as compiled.
//! Steps of an unrecognized kind survive deserialization as
//! [`WorkflowStep::Unknown`] so the executor can report and skip them.

mod builder;
mod step;

pub use builder::{ViewFilter, WorkflowBuilder};
pub use step::{
    BoundKind, FieldTransform, FilterRule, MeasureSpec, Predicate, SortOrder, TimeUnit,
    TransformExpr, ViewQuery, WorkflowStep, DEFAULT_BIN_COUNT,
};
