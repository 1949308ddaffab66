//! Metrics module for the usage gate.
//! Provides Prometheus metrics for gate decisions and committed usage.

use prometheus::{Encoder, IntCounter, IntCounterVec, TextEncoder, opts, register_int_counter,
    register_int_counter_vec};
use service_core::error::AppError;
use std::sync::OnceLock;

/// Pre-call decisions by method and outcome
pub static DECISIONS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

/// Accounts provisioned on first call
pub static PROVISIONED_ACCOUNTS_TOTAL: OnceLock<IntCounter> = OnceLock::new();

/// Billing customers created on first call
pub static CUSTOMERS_CREATED_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

/// Absolute usage committed to the billing ledger
pub static COMMITTED_USAGE_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

/// Usage commits rejected by the billing ledger
pub static COMMIT_FAILURES_TOTAL: OnceLock<IntCounter> = OnceLock::new();

/// Initialize all metrics. Call once at startup.
pub fn init_metrics() {
    DECISIONS_TOTAL.get_or_init(|| {
        register_int_counter_vec!(
            opts!(
                "usage_gate_decisions_total",
                "Pre-call gate decisions by method and outcome"
            ),
            &["method", "outcome"]
        )
        .expect("Failed to register DECISIONS_TOTAL")
    });

    PROVISIONED_ACCOUNTS_TOTAL.get_or_init(|| {
        register_int_counter!(opts!(
            "usage_gate_provisioned_accounts_total",
            "Accounts provisioned on their first authenticated call"
        ))
        .expect("Failed to register PROVISIONED_ACCOUNTS_TOTAL")
    });

    CUSTOMERS_CREATED_TOTAL.get_or_init(|| {
        register_int_counter_vec!(
            opts!(
                "usage_gate_customers_created_total",
                "Billing customers created by owner kind"
            ),
            &["owner_kind"]
        )
        .expect("Failed to register CUSTOMERS_CREATED_TOTAL")
    });

    COMMITTED_USAGE_TOTAL.get_or_init(|| {
        register_int_counter_vec!(
            opts!(
                "usage_gate_committed_usage_total",
                "Absolute usage committed to the billing ledger by category"
            ),
            &["category"]
        )
        .expect("Failed to register COMMITTED_USAGE_TOTAL")
    });

    COMMIT_FAILURES_TOTAL.get_or_init(|| {
        register_int_counter!(opts!(
            "usage_gate_commit_failures_total",
            "Usage commits that failed after the handler succeeded"
        ))
        .expect("Failed to register COMMIT_FAILURES_TOTAL")
    });
}

/// Get metrics in Prometheus text format.
pub fn get_metrics() -> Result<String, AppError> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| AppError::InternalError(anyhow::anyhow!("Failed to encode metrics: {}", e)))?;
    String::from_utf8(buffer)
        .map_err(|e| AppError::InternalError(anyhow::anyhow!("Metrics are not UTF-8: {}", e)))
}

/// Record a pre-call decision.
pub fn record_decision(method: &str, outcome: &str) {
    if let Some(counter) = DECISIONS_TOTAL.get() {
        counter.with_label_values(&[method, outcome]).inc();
    }
}

/// Record an account provisioned by the gate.
pub fn record_provisioned_account() {
    if let Some(counter) = PROVISIONED_ACCOUNTS_TOTAL.get() {
        counter.inc();
    }
}

/// Record a billing customer created by the gate.
pub fn record_customer_created(owner_kind: &str) {
    if let Some(counter) = CUSTOMERS_CREATED_TOTAL.get() {
        counter.with_label_values(&[owner_kind]).inc();
    }
}

/// Record usage committed to the ledger.
pub fn record_committed_usage(category: &str, delta: i64) {
    if let Some(counter) = COMMITTED_USAGE_TOTAL.get() {
        counter
            .with_label_values(&[category])
            .inc_by(delta.unsigned_abs());
    }
}

/// Record a failed usage commit.
pub fn record_commit_failure() {
    if let Some(counter) = COMMIT_FAILURES_TOTAL.get() {
        counter.inc();
    }
}
