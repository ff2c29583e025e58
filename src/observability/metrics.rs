//! Metrics registry
//!
//! - Counters only (no gauges, no histograms)
//! - Monotonic increase
//! - Thread-safe but lock-minimal

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Operational counters for workflow and explain processing
///
/// All counters use Relaxed atomics; readers see eventually consistent values.
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    workflows_executed: AtomicU64,
    steps_executed: AtomicU64,
    unknown_steps: AtomicU64,
    rows_returned: AtomicU64,
    computation_calls: AtomicU64,
    computation_failures: AtomicU64,
    cache_hits: AtomicU64,
    explain_runs: AtomicU64,
    candidates_emitted: AtomicU64,
    candidates_skipped: AtomicU64,
    stale_results_discarded: AtomicU64,
}

impl MetricsRegistry {
    /// Create a new metrics registry with all counters at zero
    pub fn new() -> Self {
        Self::default()
    }

    // Workflow metrics

    pub fn increment_workflows_executed(&self) {
        self.workflows_executed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_steps_executed(&self) {
        self.steps_executed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_unknown_steps(&self) {
        self.unknown_steps.fetch_add(1, Ordering::Relaxed);
    }

    /// Add rows returned by a finished workflow
    pub fn add_rows_returned(&self, rows: u64) {
        self.rows_returned.fetch_add(rows, Ordering::Relaxed);
    }

    // Computation metrics

    pub fn increment_computation_calls(&self) {
        self.computation_calls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_computation_failures(&self) {
        self.computation_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_cache_hits(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    // Explain metrics

    pub fn increment_explain_runs(&self) {
        self.explain_runs.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_candidates_emitted(&self, count: u64) {
        self.candidates_emitted.fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_candidates_skipped(&self) {
        self.candidates_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_stale_results(&self) {
        self.stale_results_discarded.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current snapshot of all metrics as JSON
    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.snapshot()).unwrap_or_else(|_| "{}".to_string())
    }

    /// Get all metrics as a snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            workflows_executed: self.workflows_executed.load(Ordering::Relaxed),
            steps_executed: self.steps_executed.load(Ordering::Relaxed),
            unknown_steps: self.unknown_steps.load(Ordering::Relaxed),
            rows_returned: self.rows_returned.load(Ordering::Relaxed),
            computation_calls: self.computation_calls.load(Ordering::Relaxed),
            computation_failures: self.computation_failures.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            explain_runs: self.explain_runs.load(Ordering::Relaxed),
            candidates_emitted: self.candidates_emitted.load(Ordering::Relaxed),
            candidates_skipped: self.candidates_skipped.load(Ordering::Relaxed),
            stale_results_discarded: self.stale_results_discarded.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time snapshot of all metrics
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct MetricsSnapshot {
    pub workflows_executed: u64,
    pub steps_executed: u64,
    pub unknown_steps: u64,
    pub rows_returned: u64,
    pub computation_calls: u64,
    pub computation_failures: u64,
    pub cache_hits: u64,
    pub explain_runs: u64,
    pub candidates_emitted: u64,
    pub candidates_skipped: u64,
    pub stale_results_discarded: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_registry_is_zero() {
        let metrics = MetricsRegistry::new();
        assert_eq!(metrics.snapshot(), MetricsSnapshot::default());
    }

    #[test]
    fn test_counters_increment() {
        let metrics = MetricsRegistry::new();
        metrics.increment_workflows_executed();
        metrics.increment_unknown_steps();
        metrics.add_rows_returned(42);
        metrics.add_candidates_emitted(3);

        let snap = metrics.snapshot();
        assert_eq!(snap.workflows_executed, 1);
        assert_eq!(snap.unknown_steps, 1);
        assert_eq!(snap.rows_returned, 42);
        assert_eq!(snap.candidates_emitted, 3);
    }

    #[test]
    fn test_to_json() {
        let metrics = MetricsRegistry::new();
        metrics.increment_cache_hits();

        let parsed: serde_json::Value = serde_json::from_str(&metrics.to_json()).unwrap();
        assert_eq!(parsed["cache_hits"], 1);
        assert_eq!(parsed["explain_runs"], 0);
    }

    #[test]
    fn test_concurrent_increments() {
        use std::sync::Arc;
        use std::thread;

        let metrics = Arc::new(MetricsRegistry::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let m = Arc::clone(&metrics);
                thread::spawn(move || {
                    for _ in 0..250 {
                        m.increment_steps_executed();
                    }
                })
            })
            .collect();

        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(metrics.snapshot().steps_executed, 1000);
    }
}
