//! Explain session state
//!
//! A session tracks the most recent explain request for one chart. Every
//! request gets a monotonically increasing [`RequestToken`]; a result is
//! applied only if its token is still the latest, so a slow response to an
//! old selection can never overwrite a newer one.
//!
//! Methods take `&self` so concurrent tasks can share one session.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;

use super::errors::ExplainResult;
use super::explain::{ExplainEngine, ExplainRequest, ExplanationCandidate};
use crate::observability::{log_event_with_fields, Event, MetricsRegistry};
use crate::workflow::Predicate;

/// Identifies one explain request
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct RequestToken(u64);

impl RequestToken {
    pub fn value(&self) -> u64 {
        self.0
    }
}

/// Why a session has nothing to show
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptyReason {
    /// The mark carried no usable dimension value
    NoValidSelection,
    /// The search ran but found no candidate
    NoExplanations,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum ExplainStatus {
    #[default]
    Idle,
    Loading {
        token: RequestToken,
    },
    Ready {
        candidates: Vec<ExplanationCandidate>,
        selected_index: usize,
    },
    Empty(EmptyReason),
    Error {
        message: String,
    },
}

/// Latest-request-wins explain state
#[derive(Debug, Default)]
pub struct ExplainSession {
    latest: AtomicU64,
    status: Mutex<ExplainStatus>,
    metrics: Option<Arc<MetricsRegistry>>,
}

impl ExplainSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts discarded results in `metrics`
    pub fn with_metrics(metrics: Arc<MetricsRegistry>) -> Self {
        Self {
            metrics: Some(metrics),
            ..Self::default()
        }
    }

    fn state(&self) -> MutexGuard<'_, ExplainStatus> {
        self.status.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn issue(&self) -> RequestToken {
        RequestToken(self.latest.fetch_add(1, Ordering::SeqCst) + 1)
    }

    fn is_latest(&self, token: RequestToken) -> bool {
        self.latest.load(Ordering::SeqCst) == token.0
    }

    /// Current status
    pub fn status(&self) -> ExplainStatus {
        self.state().clone()
    }

    /// The candidate currently on display, if any
    pub fn selected(&self) -> Option<ExplanationCandidate> {
        match &*self.state() {
            ExplainStatus::Ready {
                candidates,
                selected_index,
            } => candidates.get(*selected_index).cloned(),
            _ => None,
        }
    }

    /// Starts a request, superseding any in flight.
    ///
    /// Returns `None` without a token to wait on when there is nothing to
    /// explain.
    pub fn begin(&self, predicates: &[Predicate]) -> Option<RequestToken> {
        let token = self.issue();
        let mut state = self.state();
        if predicates.is_empty() {
            *state = ExplainStatus::Empty(EmptyReason::NoValidSelection);
            return None;
        }
        *state = ExplainStatus::Loading { token };
        Some(token)
    }

    /// Applies a result if `token` is still the latest. Returns whether it was
    /// applied.
    pub fn complete(&self, token: RequestToken, result: ExplainResult<Vec<ExplanationCandidate>>) -> bool {
        let mut state = self.state();
        if !self.is_latest(token) {
            if let Some(metrics) = &self.metrics {
                metrics.increment_stale_results();
            }
            let stale = token.0.to_string();
            let latest = self.latest.load(Ordering::SeqCst).to_string();
            log_event_with_fields(
                Event::StaleResultDiscarded,
                &[("latest", latest.as_str()), ("token", stale.as_str())],
            );
            return false;
        }

        *state = match result {
            Ok(candidates) if candidates.is_empty() => ExplainStatus::Empty(EmptyReason::NoExplanations),
            Ok(candidates) => ExplainStatus::Ready {
                candidates,
                selected_index: 0,
            },
            Err(err) => ExplainStatus::Error {
                message: err.to_string(),
            },
        };
        true
    }

    /// Back to idle; in-flight results become stale
    pub fn reset(&self) {
        self.issue();
        *self.state() = ExplainStatus::Idle;
    }

    /// Chooses the displayed candidate. Returns false outside `Ready` or when
    /// `index` is out of range.
    pub fn select(&self, index: usize) -> bool {
        match &mut *self.state() {
            ExplainStatus::Ready {
                candidates,
                selected_index,
            } if index < candidates.len() => {
                *selected_index = index;
                true
            }
            _ => false,
        }
    }

    /// Begins, waits out the configured debounce, runs the search and
    /// completes. Returns whether this run's outcome is the one on display.
    pub async fn run(&self, engine: &ExplainEngine<'_>, request: &ExplainRequest) -> bool {
        let Some(token) = self.begin(&request.predicates) else {
            return true;
        };

        tokio::time::sleep(engine.context().config().debounce()).await;
        if !self.is_latest(token) {
            return false;
        }

        let result = engine.explain(request).await;
        self.complete(token, result)
    }
}
