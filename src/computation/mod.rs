//! Computation boundary
//!
//! Every query the engine issues goes through one async contract,
//! [`ComputationFunction`]. The engine does not know whether rows are
//! computed in-process or by a remote service.
//!
//! Results may be memoized in a [`QueryCache`] owned by the caller's
//! [`EngineContext`](crate::context::EngineContext). Nothing is cached
//! process-wide. Cache entries are keyed by the computation's
//! [`source_id`](ComputationFunction::source_id) as well as the payload, so one
//! context can serve several backends without mixing their rows.

mod errors;

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::context::EngineContext;
use crate::executor::{Row, WorkflowRunner};
use crate::observability::{log_event_with_fields, Event, MetricsRegistry};
use crate::workflow::WorkflowStep;

pub use errors::{ComputationError, ComputationResult};

/// A workflow plus pagination, as sent to a computation function
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryPayload {
    pub workflow: Vec<WorkflowStep>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

impl QueryPayload {
    /// Payload for the whole result
    pub fn new(workflow: Vec<WorkflowStep>) -> Self {
        Self {
            workflow,
            offset: None,
            limit: None,
        }
    }

    /// Restricts the result to a page
    pub fn with_page(mut self, offset: Option<usize>, limit: Option<usize>) -> Self {
        self.offset = offset;
        self.limit = limit;
        self
    }

    /// Canonical key for memoization
    pub fn cache_key(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Boxed future returned by computation functions
pub type ComputationFuture<'a> =
    Pin<Box<dyn Future<Output = ComputationResult<Vec<Row>>> + Send + 'a>>;

/// Runs a query payload and returns rows
pub trait ComputationFunction: Send + Sync {
    fn query(&self, payload: QueryPayload) -> ComputationFuture<'_>;

    /// Identity of the data this function answers from.
    ///
    /// Two functions must share an id only if they return the same rows for
    /// the same payload. Backends whose data changes should fold a version in.
    fn source_id(&self) -> &str;
}

/// In-process computation over an owned dataset
#[derive(Debug, Clone)]
pub struct LocalComputation {
    rows: Arc<Vec<Row>>,
    runner: WorkflowRunner,
    source_id: String,
}

impl LocalComputation {
    pub fn new(rows: Vec<Row>) -> Self {
        Self::with_runner(rows, WorkflowRunner::new())
    }

    /// Records workflow metrics into `metrics`
    pub fn with_metrics(rows: Vec<Row>, metrics: Arc<MetricsRegistry>) -> Self {
        Self::with_runner(rows, WorkflowRunner::with_metrics(metrics))
    }

    fn with_runner(rows: Vec<Row>, runner: WorkflowRunner) -> Self {
        Self {
            rows: Arc::new(rows),
            runner,
            source_id: format!("local:{}", Uuid::new_v4()),
        }
    }

    /// The dataset
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }
}

impl ComputationFunction for LocalComputation {
    fn query(&self, payload: QueryPayload) -> ComputationFuture<'_> {
        Box::pin(async move {
            WorkflowRunner::validate_workflow(&payload.workflow)
                .map_err(|e| ComputationError::InvalidPayload(e.to_string()))?;
            Ok(self
                .runner
                .run(&self.rows, &payload.workflow, payload.offset, payload.limit))
        })
    }

    fn source_id(&self) -> &str {
        &self.source_id
    }
}

/// Caller-owned memo of payload to rows
#[derive(Debug, Default)]
pub struct QueryCache {
    entries: RwLock<HashMap<String, Vec<Row>>>,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached rows for `key`, if present
    pub fn get(&self, key: &str) -> Option<Vec<Row>> {
        self.entries.read().ok()?.get(key).cloned()
    }

    /// Stores rows under `key`
    pub fn insert(&self, key: String, rows: Vec<Row>) {
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(key, rows);
        }
    }

    /// Number of cached payloads
    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every entry
    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.write() {
            entries.clear();
        }
    }
}

/// Runs `workflow` through `computation`, consulting the context's cache
pub async fn data_query(
    ctx: &EngineContext,
    computation: &dyn ComputationFunction,
    workflow: Vec<WorkflowStep>,
) -> ComputationResult<Vec<Row>> {
    let payload = QueryPayload::new(workflow);
    let key = ctx
        .config()
        .cache_enabled
        .then(|| format!("{}|{}", computation.source_id(), payload.cache_key()));

    if let Some(rows) = key.as_deref().and_then(|k| ctx.cache().get(k)) {
        ctx.metrics().increment_cache_hits();
        log_event_with_fields(Event::CacheHit, &[]);
        return Ok(rows);
    }

    ctx.metrics().increment_computation_calls();
    match computation.query(payload).await {
        Ok(rows) => {
            if let Some(key) = key {
                ctx.cache().insert(key, rows.clone());
            }
            Ok(rows)
        }
        Err(err) => {
            ctx.metrics().increment_computation_failures();
            let reason = err.to_string();
            log_event_with_fields(
                Event::ComputationFailed,
                &[("code", err.code()), ("reason", reason.as_str())],
            );
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::{Predicate, SortOrder};
    use serde_json::{json, Value};

    fn dataset() -> Vec<Row> {
        (0..5)
            .map(|i| match json!({"i": i, "even": i % 2 == 0}) {
                Value::Object(map) => map,
                _ => unreachable!(),
            })
            .collect()
    }

    struct Failing;

    impl ComputationFunction for Failing {
        fn query(&self, _payload: QueryPayload) -> ComputationFuture<'_> {
            Box::pin(async { Err(ComputationError::Backend("unavailable".into())) })
        }

        fn source_id(&self) -> &str {
            "failing"
        }
    }

    #[tokio::test]
    async fn test_local_computation_runs_workflow() {
        let local = LocalComputation::new(dataset());
        let payload = QueryPayload::new(vec![
            WorkflowStep::filter(vec![Predicate::one_of("even", vec![json!(true)])]),
            WorkflowStep::sort(vec!["i".into()], SortOrder::Descending),
        ])
        .with_page(Some(1), Some(1));

        let rows = local.query(payload).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["i"], json!(2));
    }

    #[tokio::test]
    async fn test_local_computation_rejects_invalid_workflow() {
        let local = LocalComputation::new(dataset());
        let err = local
            .query(QueryPayload::new(vec![WorkflowStep::sort(vec![], SortOrder::Ascending)]))
            .await
            .unwrap_err();
        assert!(matches!(err, ComputationError::InvalidPayload(_)));
    }

    #[tokio::test]
    async fn test_data_query_uses_cache() {
        let ctx = EngineContext::default();
        let local = LocalComputation::new(dataset());
        let workflow = vec![WorkflowStep::filter(vec![Predicate::one_of(
            "even",
            vec![json!(false)],
        )])];

        let first = data_query(&ctx, &local, workflow.clone()).await.unwrap();
        let second = data_query(&ctx, &local, workflow).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(ctx.cache().len(), 1);
        let snap = ctx.metrics().snapshot();
        assert_eq!(snap.computation_calls, 1);
        assert_eq!(snap.cache_hits, 1);
    }

    #[tokio::test]
    async fn test_cache_separates_computations() {
        let ctx = EngineContext::default();
        let single = LocalComputation::new(dataset().into_iter().take(1).collect());
        let full = LocalComputation::new(dataset());
        let workflow = vec![WorkflowStep::sort(vec!["i".into()], SortOrder::Ascending)];

        let first = data_query(&ctx, &single, workflow.clone()).await.unwrap();
        let second = data_query(&ctx, &full, workflow.clone()).await.unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(second.len(), 5);
        assert_eq!(ctx.cache().len(), 2);

        // A clone answers from the same rows and shares entries
        let again = data_query(&ctx, &full.clone(), workflow).await.unwrap();
        assert_eq!(again, second);
        assert_eq!(ctx.metrics().snapshot().cache_hits, 1);
    }

    #[tokio::test]
    async fn test_data_query_failure_is_counted() {
        let ctx = EngineContext::default();
        let err = data_query(&ctx, &Failing, vec![]).await.unwrap_err();

        assert_eq!(err, ComputationError::Backend("unavailable".into()));
        assert_eq!(ctx.metrics().snapshot().computation_failures, 1);
        assert!(ctx.cache().is_empty());
    }

    #[test]
    fn test_cache_clear() {
        let cache = QueryCache::new();
        cache.insert("k".into(), dataset());
        assert_eq!(cache.get("k").map(|r| r.len()), Some(5));
        cache.clear();
        assert!(cache.get("k").is_none());
    }
}
