//! Per-category quota evaluation.

use service_core::error::AppError;

use crate::classifier::MethodCategory;
use crate::context::CallContext;
use crate::models::{Customer, StorageQuota, UNLIMITED, UsageKind};

/// Outcome of evaluating a call against the owner's quotas.
#[derive(Debug, Clone)]
pub enum QuotaDecision {
    /// Proceed; nothing to hand to the handler.
    Allow,
    /// Proceed; the handler enforces the byte-level limit against this quota.
    AllowStorage(StorageQuota),
    /// Stop the call with `RESOURCE_EXHAUSTED`.
    Deny { kind: UsageKind, reason: String },
}

impl QuotaDecision {
    pub fn is_allowed(&self) -> bool {
        !matches!(self, QuotaDecision::Deny { .. })
    }

    /// Convert a denial into its error, passing allowed decisions through.
    pub fn into_result(self) -> Result<Self, AppError> {
        match self {
            QuotaDecision::Deny { reason, .. } => Err(AppError::ResourceExhausted(reason)),
            allowed => Ok(allowed),
        }
    }
}

/// Decide whether a call of `category` may proceed for `customer`.
///
/// Storage writes are never denied here: capacity is in bytes, so whether a
/// write fits is decided by the handler against the returned quota.
pub fn evaluate(customer: &Customer, category: MethodCategory) -> QuotaDecision {
    match category {
        MethodCategory::StorageWrite => {
            let stored = customer.usage(UsageKind::StoredData);
            let available = if customer.billable {
                UNLIMITED
            } else {
                stored.free
            };
            QuotaDecision::AllowStorage(StorageQuota::new(stored.total, available))
        }
        MethodCategory::RecordRead => {
            deny_if_exhausted(customer, UsageKind::InstanceReads, "threaddb reads")
        }
        MethodCategory::RecordWrite => {
            deny_if_exhausted(customer, UsageKind::InstanceWrites, "threaddb writes")
        }
        MethodCategory::Exempt | MethodCategory::Unmetered => QuotaDecision::Allow,
    }
}

fn deny_if_exhausted(customer: &Customer, kind: UsageKind, what: &str) -> QuotaDecision {
    if customer.free_quota_exhausted(kind) {
        QuotaDecision::Deny {
            kind,
            reason: format!("{} exhausted: exceeds free quota", what),
        }
    } else {
        QuotaDecision::Allow
    }
}

/// Attach what the handler needs from an allowed decision to the call context.
pub fn decorate(ctx: CallContext, decision: QuotaDecision) -> CallContext {
    match decision {
        QuotaDecision::AllowStorage(quota) => ctx.with_storage_quota(quota),
        QuotaDecision::Allow | QuotaDecision::Deny { .. } => ctx,
    }
}
