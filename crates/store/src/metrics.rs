//! Prometheus metrics for store operations

use prometheus::{Histogram, HistogramOpts, IntCounterVec, Opts, Registry};
use thiserror::Error;

/// Errors from metrics registration.
#[derive(Debug, Error)]
pub enum MetricsError {
    /// Prometheus registry failure.
    #[error("Prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),
}

/// Counters and timings for ledger store operations.
pub struct StoreMetrics {
    /// Operations attempted, labeled by operation.
    pub operations_total: IntCounterVec,
    /// Operations that returned an error, labeled by operation.
    pub operations_failed_total: IntCounterVec,
    /// Commit latency.
    pub commit_duration_seconds: Histogram,
}

impl StoreMetrics {
    /// Create and register the metrics.
    pub fn new(registry: &Registry) -> Result<Self, MetricsError> {
        let operations_total = IntCounterVec::new(
            Opts::new(
                "commio_store_operations_total",
                "Total number of ledger store operations",
            ),
            &["operation"],
        )?;

        let operations_failed_total = IntCounterVec::new(
            Opts::new(
                "commio_store_operations_failed_total",
                "Total number of failed ledger store operations",
            ),
            &["operation"],
        )?;

        let commit_duration_seconds = Histogram::with_opts(HistogramOpts::new(
            "commio_store_commit_duration_seconds",
            "Duration of ledger store commits",
        ))?;

        registry.register(Box::new(operations_total.clone()))?;
        registry.register(Box::new(operations_failed_total.clone()))?;
        registry.register(Box::new(commit_duration_seconds.clone()))?;

        Ok(Self {
            operations_total,
            operations_failed_total,
            commit_duration_seconds,
        })
    }

    #[cfg(test)]
    pub fn new_unregistered() -> Self {
        Self {
            operations_total: IntCounterVec::new(
                Opts::new("test_store_operations_total", "test"),
                &["operation"],
            )
            .unwrap(),
            operations_failed_total: IntCounterVec::new(
                Opts::new("test_store_operations_failed_total", "test"),
                &["operation"],
            )
            .unwrap(),
            commit_duration_seconds: Histogram::with_opts(HistogramOpts::new(
                "test_store_commit_duration_seconds",
                "test",
            ))
            .unwrap(),
        }
    }
}
