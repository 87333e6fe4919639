//! Metrics collection for observability
//!
//! This module provides Prometheus metrics for monitoring the ledger.
//!
//! # Metrics
//!
//! - `divvy_expenses_total` - Total number of expenses recorded
//! - `divvy_transactions_completed_total` - Total transactions completed
//! - `divvy_transactions_failed_total` - Total transactions terminally failed
//! - `divvy_transaction_retries_total` - Total retry attempts
//! - `divvy_transaction_amount_minor_units` - Histogram of transaction amounts

use prometheus::{Histogram, HistogramOpts, IntCounter, Opts, Registry};
use std::sync::Arc;

/// Metrics collector
#[derive(Clone)]
pub struct Metrics {
    /// Total expenses recorded
    pub expenses_total: IntCounter,

    /// Total transactions completed
    pub transactions_completed_total: IntCounter,

    /// Total transactions terminally failed
    pub transactions_failed_total: IntCounter,

    /// Total retry attempts
    pub transaction_retries_total: IntCounter,

    /// Transaction amount histogram (minor units)
    pub transaction_amount: Histogram,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl Metrics {
    /// Create new metrics collector
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let expenses_total = IntCounter::with_opts(Opts::new(
            "divvy_expenses_total",
            "Total number of expenses recorded",
        ))?;
        registry.register(Box::new(expenses_total.clone()))?;

        let transactions_completed_total = IntCounter::with_opts(Opts::new(
            "divvy_transactions_completed_total",
            "Total transactions completed",
        ))?;
        registry.register(Box::new(transactions_completed_total.clone()))?;

        let transactions_failed_total = IntCounter::with_opts(Opts::new(
            "divvy_transactions_failed_total",
            "Total transactions terminally failed",
        ))?;
        registry.register(Box::new(transactions_failed_total.clone()))?;

        let transaction_retries_total = IntCounter::with_opts(Opts::new(
            "divvy_transaction_retries_total",
            "Total retry attempts",
        ))?;
        registry.register(Box::new(transaction_retries_total.clone()))?;

        let transaction_amount = Histogram::with_opts(
            HistogramOpts::new(
                "divvy_transaction_amount_minor_units",
                "Histogram of transaction amounts in minor units",
            )
            .buckets(vec![
                100.0, 500.0, 1_000.0, 5_000.0, 10_000.0, 50_000.0, 100_000.0, 500_000.0,
            ]),
        )?;
        registry.register(Box::new(transaction_amount.clone()))?;

        Ok(Self {
            expenses_total,
            transactions_completed_total,
            transactions_failed_total,
            transaction_retries_total,
            transaction_amount,
            registry,
        })
    }

    /// Record expense creation
    pub fn record_expense(&self) {
        self.expenses_total.inc();
    }

    /// Record transaction completion
    pub fn record_transaction_completed(&self, amount_minor_units: i64) {
        self.transactions_completed_total.inc();
        self.transaction_amount.observe(amount_minor_units as f64);
    }

    /// Record terminal transaction failure
    pub fn record_transaction_failed(&self) {
        self.transactions_failed_total.inc();
    }

    /// Record a retry attempt
    pub fn record_retry(&self) {
        self.transaction_retries_total.inc();
    }

    /// Get metrics registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new().expect("Failed to create metrics")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        let metrics = Metrics::new().unwrap();
        assert_eq!(metrics.expenses_total.get(), 0);
        assert_eq!(metrics.transactions_completed_total.get(), 0);
    }

    #[test]
    fn test_record_expense() {
        let metrics = Metrics::new().unwrap();
        metrics.record_expense();
        metrics.record_expense();
        assert_eq!(metrics.expenses_total.get(), 2);
    }

    #[test]
    fn test_record_transaction_completed() {
        let metrics = Metrics::new().unwrap();
        metrics.record_transaction_completed(2500);
        assert_eq!(metrics.transactions_completed_total.get(), 1);
    }

    #[test]
    fn test_record_retry_and_failure() {
        let metrics = Metrics::new().unwrap();
        metrics.record_retry();
        metrics.record_retry();
        metrics.record_transaction_failed();
        assert_eq!(metrics.transaction_retries_total.get(), 2);
        assert_eq!(metrics.transactions_failed_total.get(), 1);
    }
}
