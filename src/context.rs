//! Engine context
//!
//! Bundles what a caller owns for the lifetime of a chart: configuration,
//! metrics and the query cache. Drop or [`EngineContext::dispose`] it when the
//! dataset changes.

use std::sync::Arc;

use crate::computation::QueryCache;
use crate::config::EngineConfig;
use crate::observability::MetricsRegistry;

/// Caller-owned engine state
#[derive(Debug, Default)]
pub struct EngineContext {
    config: EngineConfig,
    metrics: Arc<MetricsRegistry>,
    cache: QueryCache,
}

impl EngineContext {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            metrics: Arc::new(MetricsRegistry::new()),
            cache: QueryCache::new(),
        }
    }

    /// Shares an existing metrics registry
    pub fn with_metrics(config: EngineConfig, metrics: Arc<MetricsRegistry>) -> Self {
        Self {
            config,
            metrics,
            cache: QueryCache::new(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn metrics(&self) -> &Arc<MetricsRegistry> {
        &self.metrics
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    /// Releases cached results
    pub fn dispose(&self) {
        self.cache.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispose_clears_cache() {
        let ctx = EngineContext::new(EngineConfig::default());
        ctx.cache().insert("k".into(), Vec::new());
        assert_eq!(ctx.cache().len(), 1);

        ctx.dispose();
        assert!(ctx.cache().is_empty());
    }

    #[test]
    fn test_shared_metrics() {
        let metrics = Arc::new(MetricsRegistry::new());
        let ctx = EngineContext::with_metrics(EngineConfig::default(), Arc::clone(&metrics));
        ctx.metrics().increment_explain_runs();
        assert_eq!(metrics.snapshot().explain_runs, 1);
    }
}
