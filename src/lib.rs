//! chartflow - deterministic chart query workflows and selection explanations
//!
//! - [`workflow`]: declarative steps and the view compiler
//! - [`executor`]: in-memory step execution
//! - [`computation`]: the async query boundary and per-context cache
//! - [`insights`]: explain-by-selection search, ranking and session state

pub mod cli;
pub mod computation;
pub mod config;
pub mod context;
pub mod executor;
pub mod insights;
pub mod observability;
pub mod schema;
pub mod workflow;

pub use computation::{data_query, ComputationError, ComputationFunction, LocalComputation, QueryPayload};
pub use config::EngineConfig;
pub use context::EngineContext;
pub use executor::{ExecutionResult, Row, WorkflowRunner};
pub use insights::{ExplainEngine, ExplainError, ExplainRequest, ExplainSession, ExplanationCandidate};
pub use schema::{Aggregation, Field};
pub use workflow::{Predicate, WorkflowBuilder, WorkflowStep};
