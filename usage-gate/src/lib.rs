//! usage-gate: usage metering and quota enforcement for multi-tenant gRPC
//! services.
//!
//! Every metered call passes through [`UsageGate::pre_call`] before its
//! handler and [`UsageGate::post_call`] after it. The pre-call hook
//! provisions first-time users, keeps the billing customer in sync, and
//! rejects calls the owner has no quota for. Storage writes receive a
//! [`StorageQuota`] through the [`CallContext`]. The post-call hook commits
//! the bytes the handler recorded there.

pub mod classifier;
pub mod config;
pub mod context;
pub mod gate;
pub mod models;
pub mod services;

pub use classifier::{MethodCategory, MethodRule, MethodTable};
pub use config::{AnonymousCallPolicy, GateConfig};
pub use context::CallContext;
pub use gate::{MeteredStream, QuotaDecision, UsageGate, UsageGateBuilder};
pub use models::{
    Account, AccountContext, AccountKind, ApiKey, BackendIdentity, Customer, CustomerOptions,
    StorageQuota, SubscriptionStatus, UNLIMITED, Usage, UsageKind,
};
pub use services::{AccountStore, BillingLedger, Provisioner};

/// Load configuration, install tracing and register metrics.
///
/// Returns the loaded configuration for use with [`UsageGateBuilder::config`].
pub fn init(config: Option<GateConfig>) -> Result<GateConfig, service_core::AppError> {
    let config = match config {
        Some(config) => config,
        None => GateConfig::load()?,
    };
    service_core::observability::init_tracing(&config.observability)?;
    services::init_metrics();

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        service_name = %config.observability.service_name,
        metering_enabled = config.metering.enabled,
        "Usage gate initialized"
    );

    Ok(config)
}
