//! Prometheus metrics for facade operations

use prometheus::{IntCounter, IntCounterVec, Opts, Registry};
use thiserror::Error;

/// Errors from metrics registration.
#[derive(Debug, Error)]
pub enum MetricsError {
    /// Prometheus registry failure.
    #[error("Prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),
}

/// Counters for reputation service operations.
pub struct ServiceMetrics {
    /// Vote commands processed, labeled by resulting action.
    pub votes_total: IntCounterVec,
    /// Optimistic-concurrency retries performed.
    pub conflict_retries_total: IntCounter,
    /// Badges awarded.
    pub badges_awarded_total: IntCounter,
    /// Refund clamps (ledger inconsistencies) observed.
    pub ledger_inconsistencies_total: IntCounter,
}

impl ServiceMetrics {
    /// Create and register the metrics.
    pub fn new(registry: &Registry) -> Result<Self, MetricsError> {
        let votes_total = IntCounterVec::new(
            Opts::new(
                "commio_service_votes_total",
                "Total vote commands processed",
            ),
            &["action"],
        )?;

        let conflict_retries_total = IntCounter::new(
            "commio_service_conflict_retries_total",
            "Total optimistic-concurrency retries",
        )?;

        let badges_awarded_total = IntCounter::new(
            "commio_service_badges_awarded_total",
            "Total badges awarded",
        )?;

        let ledger_inconsistencies_total = IntCounter::new(
            "commio_service_ledger_inconsistencies_total",
            "Total clamped credit refunds",
        )?;

        registry.register(Box::new(votes_total.clone()))?;
        registry.register(Box::new(conflict_retries_total.clone()))?;
        registry.register(Box::new(badges_awarded_total.clone()))?;
        registry.register(Box::new(ledger_inconsistencies_total.clone()))?;

        Ok(Self {
            votes_total,
            conflict_retries_total,
            badges_awarded_total,
            ledger_inconsistencies_total,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_metrics_creation() {
        let registry = Registry::new();
        let metrics = ServiceMetrics::new(&registry).expect("metrics");

        assert_eq!(metrics.conflict_retries_total.get(), 0);
        assert_eq!(metrics.votes_total.with_label_values(&["cast"]).get(), 0);
    }
}
