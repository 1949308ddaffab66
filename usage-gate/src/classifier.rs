//! Method classification.
//!
//! Every fully-qualified gRPC method maps to a [`MethodRule`]. Methods missing
//! from the table are metered but belong to no quota category.

use std::collections::HashMap;

use crate::models::UsageKind;

/// Quota category of a method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MethodCategory {
    /// The gate does not apply.
    Exempt,
    /// Adds or removes stored bytes.
    StorageWrite,
    /// Reads from a record database.
    RecordRead,
    /// Writes to a record database.
    RecordWrite,
    /// Identity and billing standing are checked, but no category quota applies.
    Unmetered,
}

impl MethodCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            MethodCategory::Exempt => "exempt",
            MethodCategory::StorageWrite => "storage_write",
            MethodCategory::RecordRead => "record_read",
            MethodCategory::RecordWrite => "record_write",
            MethodCategory::Unmetered => "unmetered",
        }
    }

    /// Ledger counter this category draws from.
    pub fn usage_kind(&self) -> Option<UsageKind> {
        match self {
            MethodCategory::StorageWrite => Some(UsageKind::StoredData),
            MethodCategory::RecordRead => Some(UsageKind::InstanceReads),
            MethodCategory::RecordWrite => Some(UsageKind::InstanceWrites),
            MethodCategory::Exempt | MethodCategory::Unmetered => None,
        }
    }
}

/// How the gate treats a single method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodRule {
    /// Callable before an identity exists (signup, health checks).
    pub identity_exempt: bool,
    /// Requires identity but is never metered (session and billing management).
    pub usage_exempt: bool,
    pub category: MethodCategory,
}

impl MethodRule {
    pub const fn identity_exempt() -> Self {
        Self {
            identity_exempt: true,
            usage_exempt: false,
            category: MethodCategory::Exempt,
        }
    }

    pub const fn usage_exempt() -> Self {
        Self {
            identity_exempt: false,
            usage_exempt: true,
            category: MethodCategory::Exempt,
        }
    }

    pub const fn metered(category: MethodCategory) -> Self {
        Self {
            identity_exempt: false,
            usage_exempt: false,
            category,
        }
    }

    pub fn is_exempt(&self) -> bool {
        self.identity_exempt || self.usage_exempt || self.category == MethodCategory::Exempt
    }
}

const HUB: &str = "/api.hubd.pb.APIService/";
const BILLING: &str = "/api.billingd.pb.APIService/";
const BUCKETS: &str = "/api.bucketsd.pb.APIService/";
const THREADS: &str = "/threads.pb.API/";
const HEALTH: &str = "/grpc.health.v1.Health/";

/// Built-in rules, as `(service prefix, method, rule)`.
const DEFAULT_RULES: &[(&str, &str, MethodRule)] = &[
    // Callable without an account.
    (HUB, "Signup", MethodRule::identity_exempt()),
    (HUB, "Signin", MethodRule::identity_exempt()),
    (HUB, "IsUsernameAvailable", MethodRule::identity_exempt()),
    (HUB, "IsOrgNameAvailable", MethodRule::identity_exempt()),
    (HEALTH, "Check", MethodRule::identity_exempt()),
    (HEALTH, "Watch", MethodRule::identity_exempt()),
    // Account, key, org and billing management.
    (HUB, "Signout", MethodRule::usage_exempt()),
    (HUB, "GetSessionInfo", MethodRule::usage_exempt()),
    (HUB, "GetIdentity", MethodRule::usage_exempt()),
    (HUB, "CreateKey", MethodRule::usage_exempt()),
    (HUB, "InvalidateKey", MethodRule::usage_exempt()),
    (HUB, "ListKeys", MethodRule::usage_exempt()),
    (HUB, "CreateOrg", MethodRule::usage_exempt()),
    (HUB, "GetOrg", MethodRule::usage_exempt()),
    (HUB, "ListOrgs", MethodRule::usage_exempt()),
    (HUB, "RemoveOrg", MethodRule::usage_exempt()),
    (HUB, "InviteToOrg", MethodRule::usage_exempt()),
    (HUB, "LeaveOrg", MethodRule::usage_exempt()),
    (HUB, "SetupBilling", MethodRule::usage_exempt()),
    (HUB, "GetBillingSession", MethodRule::usage_exempt()),
    (HUB, "ListBillingUsers", MethodRule::usage_exempt()),
    (HUB, "DestroyAccount", MethodRule::usage_exempt()),
    (BILLING, "GetCustomer", MethodRule::usage_exempt()),
    // Bucket writes.
    (BUCKETS, "Create", MethodRule::metered(MethodCategory::StorageWrite)),
    (BUCKETS, "PushPath", MethodRule::metered(MethodCategory::StorageWrite)),
    (BUCKETS, "SetPath", MethodRule::metered(MethodCategory::StorageWrite)),
    (BUCKETS, "Remove", MethodRule::metered(MethodCategory::StorageWrite)),
    (BUCKETS, "RemovePath", MethodRule::metered(MethodCategory::StorageWrite)),
    (BUCKETS, "PushPathAccessRoles", MethodRule::metered(MethodCategory::StorageWrite)),
    // Thread database reads.
    (THREADS, "Verify", MethodRule::metered(MethodCategory::RecordRead)),
    (THREADS, "Has", MethodRule::metered(MethodCategory::RecordRead)),
    (THREADS, "Find", MethodRule::metered(MethodCategory::RecordRead)),
    (THREADS, "FindByID", MethodRule::metered(MethodCategory::RecordRead)),
    (THREADS, "ReadTransaction", MethodRule::metered(MethodCategory::RecordRead)),
    (THREADS, "Listen", MethodRule::metered(MethodCategory::RecordRead)),
    // Thread database writes.
    (THREADS, "Create", MethodRule::metered(MethodCategory::RecordWrite)),
    (THREADS, "Save", MethodRule::metered(MethodCategory::RecordWrite)),
    (THREADS, "Delete", MethodRule::metered(MethodCategory::RecordWrite)),
    (THREADS, "WriteTransaction", MethodRule::metered(MethodCategory::RecordWrite)),
];

/// Lookup table from fully-qualified method name to [`MethodRule`].
#[derive(Debug, Clone)]
pub struct MethodTable {
    rules: HashMap<String, MethodRule>,
}

impl Default for MethodTable {
    fn default() -> Self {
        let rules = DEFAULT_RULES
            .iter()
            .map(|(service, method, rule)| (format!("{}{}", service, method), *rule))
            .collect();
        Self { rules }
    }
}

impl MethodTable {
    /// A table with no entries; every method is [`MethodCategory::Unmetered`].
    pub fn empty() -> Self {
        Self {
            rules: HashMap::new(),
        }
    }

    /// Add or replace the rule for `method`.
    pub fn with_rule(mut self, method: impl Into<String>, rule: MethodRule) -> Self {
        self.rules.insert(method.into(), rule);
        self
    }

    pub fn rule(&self, method: &str) -> MethodRule {
        self.rules
            .get(method)
            .copied()
            .unwrap_or(MethodRule::metered(MethodCategory::Unmetered))
    }

    pub fn classify(&self, method: &str) -> MethodCategory {
        let rule = self.rule(method);
        if rule.is_exempt() {
            MethodCategory::Exempt
        } else {
            rule.category
        }
    }

    pub fn is_identity_exempt(&self, method: &str) -> bool {
        self.rule(method).identity_exempt
    }

    pub fn is_usage_exempt(&self, method: &str) -> bool {
        self.rule(method).usage_exempt
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
