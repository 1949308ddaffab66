//! Billing customer model.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// Subscription status as reported by the billing ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    /// No paid subscription; the customer runs on the free tier.
    #[default]
    None,
    Trialing,
    Active,
    Incomplete,
    PastDue,
    Canceled,
    IncompleteExpired,
    Unpaid,
}

/// Why a subscription is not in good standing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SubscriptionError {
    #[error("subscription canceled")]
    Canceled,
    #[error("subscription expired")]
    Expired,
    #[error("subscription payment required")]
    PaymentRequired,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::None => "",
            SubscriptionStatus::Trialing => "trialing",
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Incomplete => "incomplete",
            SubscriptionStatus::PastDue => "past_due",
            SubscriptionStatus::Canceled => "canceled",
            SubscriptionStatus::IncompleteExpired => "incomplete_expired",
            SubscriptionStatus::Unpaid => "unpaid",
        }
    }

    pub fn from_string(s: &str) -> Self {
        match s {
            "trialing" => SubscriptionStatus::Trialing,
            "active" => SubscriptionStatus::Active,
            "incomplete" => SubscriptionStatus::Incomplete,
            "past_due" => SubscriptionStatus::PastDue,
            "canceled" => SubscriptionStatus::Canceled,
            "incomplete_expired" => SubscriptionStatus::IncompleteExpired,
            "unpaid" => SubscriptionStatus::Unpaid,
            _ => SubscriptionStatus::None,
        }
    }

    /// Fails when the subscription no longer entitles the customer to service.
    ///
    /// Past-due subscriptions are still in their grace period and pass.
    pub fn check(&self) -> Result<(), SubscriptionError> {
        match self {
            SubscriptionStatus::Canceled => Err(SubscriptionError::Canceled),
            SubscriptionStatus::IncompleteExpired => Err(SubscriptionError::Expired),
            SubscriptionStatus::Unpaid => Err(SubscriptionError::PaymentRequired),
            _ => Ok(()),
        }
    }
}

/// Usage counter category in the billing ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UsageKind {
    StoredData,
    NetworkEgress,
    InstanceReads,
    InstanceWrites,
}

impl UsageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            UsageKind::StoredData => "stored_data",
            UsageKind::NetworkEgress => "network_egress",
            UsageKind::InstanceReads => "instance_reads",
            UsageKind::InstanceWrites => "instance_writes",
        }
    }
}

impl fmt::Display for UsageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A daily usage counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Usage {
    /// Free-tier quantity still available today.
    pub free: i64,
    /// Quantity consumed so far.
    pub total: i64,
}

/// Billing customer for an owning entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub key: String,
    pub email: String,
    pub parent_key: Option<String>,
    pub subscription_status: SubscriptionStatus,
    pub billable: bool,
    #[serde(default)]
    pub daily_usage: HashMap<UsageKind, Usage>,
}

impl Customer {
    /// Counter for `kind`; a counter the ledger did not report reads as zero.
    pub fn usage(&self, kind: UsageKind) -> Usage {
        self.daily_usage.get(&kind).copied().unwrap_or_default()
    }

    /// True when the customer is gated by free quota and none is left for `kind`.
    pub fn free_quota_exhausted(&self, kind: UsageKind) -> bool {
        !self.billable && self.usage(kind).free <= 0
    }
}

/// Options for creating a billing customer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustomerOptions {
    pub email: String,
    pub parent_key: Option<String>,
}

impl CustomerOptions {
    pub fn with_email(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            parent_key: None,
        }
    }

    pub fn parent_key(mut self, key: impl Into<String>) -> Self {
        self.parent_key = Some(key.into());
        self
    }
}
