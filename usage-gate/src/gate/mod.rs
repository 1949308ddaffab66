//! The usage gate: pre-call and post-call hooks run around every RPC.
//!
//! The pre-call hook resolves the caller, provisions first-time users,
//! synchronizes the billing customer and evaluates quotas. The post-call hook
//! commits the usage the handler recorded. [`UsageGate::unary`] and
//! [`UsageGate::server_streaming`] wrap both hooks around a handler.

mod accounts;
mod adapter;
mod commit;
mod customers;
pub mod quota;

use dashmap::DashMap;
use secrecy::Secret;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{Span, instrument, warn};

use service_core::error::AppError;

use crate::classifier::{MethodCategory, MethodTable};
use crate::config::{AnonymousCallPolicy, GateConfig};
use crate::context::CallContext;
use crate::services::{AccountStore, BillingLedger, Provisioner, record_decision};

pub use adapter::MeteredStream;
pub use quota::{QuotaDecision, decorate, evaluate};

const OUTCOME_ALLOWED: &str = "allowed";
const OUTCOME_SKIPPED: &str = "skipped";

/// Usage metering and quota enforcement gate.
///
/// Cheap to clone; clones share collaborators and the provisioning locks.
#[derive(Clone)]
pub struct UsageGate {
    inner: Arc<GateInner>,
}

struct GateInner {
    methods: MethodTable,
    accounts: Arc<dyn AccountStore>,
    billing: Option<Arc<dyn BillingLedger>>,
    provisioner: Option<Arc<dyn Provisioner>>,
    admin_token: Option<Secret<String>>,
    anonymous_calls: AnonymousCallPolicy,
    provision_locks: DashMap<String, Arc<Mutex<()>>>,
}

/// Builder for [`UsageGate`].
pub struct UsageGateBuilder {
    methods: MethodTable,
    accounts: Arc<dyn AccountStore>,
    billing: Option<Arc<dyn BillingLedger>>,
    provisioner: Option<Arc<dyn Provisioner>>,
    admin_token: Option<Secret<String>>,
    anonymous_calls: AnonymousCallPolicy,
    metering_enabled: bool,
}

impl UsageGateBuilder {
    /// Billing ledger to meter against. Without one the gate is inert.
    pub fn billing(mut self, billing: Arc<dyn BillingLedger>) -> Self {
        self.billing = Some(billing);
        self
    }

    /// Provisioning service for backend identities of new users.
    pub fn provisioner(mut self, provisioner: Arc<dyn Provisioner>) -> Self {
        self.provisioner = Some(provisioner);
        self
    }

    pub fn methods(mut self, methods: MethodTable) -> Self {
        self.methods = methods;
        self
    }

    pub fn anonymous_calls(mut self, policy: AnonymousCallPolicy) -> Self {
        self.anonymous_calls = policy;
        self
    }

    pub fn admin_token(mut self, token: Secret<String>) -> Self {
        self.admin_token = Some(token);
        self
    }

    /// Apply the metering switch, anonymous-call policy and admin token.
    pub fn config(mut self, config: &GateConfig) -> Self {
        self.metering_enabled = config.metering.enabled;
        self.anonymous_calls = config.metering.anonymous_calls;
        if let Some(token) = &config.provisioning.admin_token {
            self.admin_token = Some(token.clone());
        }
        self
    }

    pub fn build(self) -> UsageGate {
        let billing = if self.metering_enabled {
            self.billing
        } else {
            None
        };

        if billing.is_some() {
            tracing::info!(
                provisioning = self.provisioner.is_some(),
                anonymous_calls = ?self.anonymous_calls,
                "Usage metering enabled"
            );
        } else {
            tracing::info!("Usage metering disabled");
        }

        UsageGate {
            inner: Arc::new(GateInner {
                methods: self.methods,
                accounts: self.accounts,
                billing,
                provisioner: self.provisioner,
                admin_token: self.admin_token,
                anonymous_calls: self.anonymous_calls,
                provision_locks: DashMap::new(),
            }),
        }
    }
}

impl UsageGate {
    pub fn builder(accounts: Arc<dyn AccountStore>) -> UsageGateBuilder {
        UsageGateBuilder {
            methods: MethodTable::default(),
            accounts,
            billing: None,
            provisioner: None,
            admin_token: None,
            anonymous_calls: AnonymousCallPolicy::default(),
            metering_enabled: true,
        }
    }

    /// Whether the gate meters calls at all.
    pub fn is_metering(&self) -> bool {
        self.inner.billing.is_some()
    }

    pub fn methods(&self) -> &MethodTable {
        &self.inner.methods
    }

    /// Pre-call hook.
    ///
    /// Returns the context to hand to the handler. Any error aborts the call
    /// before the handler runs.
    #[instrument(
        name = "usage_gate.pre_call",
        skip_all,
        fields(method = %ctx.method(), category, owner)
    )]
    pub async fn pre_call(&self, ctx: CallContext) -> Result<CallContext, AppError> {
        let method = ctx.method().to_string();
        match self.run_pre_call(ctx).await {
            Ok((ctx, outcome)) => {
                record_decision(&method, outcome);
                Ok(ctx)
            }
            Err(e) => {
                record_decision(&method, outcome_label(&e));
                Err(e)
            }
        }
    }

    async fn run_pre_call(
        &self,
        ctx: CallContext,
    ) -> Result<(CallContext, &'static str), AppError> {
        let Some(billing) = self.inner.billing.as_deref() else {
            return Ok((ctx, OUTCOME_SKIPPED));
        };

        let category = self.inner.methods.classify(ctx.method());
        Span::current().record("category", category.as_str());
        if category == MethodCategory::Exempt {
            return Ok((ctx, OUTCOME_SKIPPED));
        }

        let Some(account) = ctx.account().cloned() else {
            if self.inner.anonymous_calls.admits() {
                return Ok((ctx, OUTCOME_SKIPPED));
            }
            warn!("Rejected metered call without an account");
            return Err(AppError::Unauthorized(anyhow::anyhow!(
                "Account required for {}",
                ctx.method()
            )));
        };

        let account = self.resolve_account(account).await?;
        let owner = account.owner().clone();
        Span::current().record("owner", owner.key.as_str());
        let ctx = ctx.with_account(account);

        let customer = self.sync_customer(billing, &ctx, &owner).await?;

        let decision = evaluate(&customer, category).into_result().map_err(|e| {
            warn!(owner = %owner.key, error = %e, "Call denied by quota");
            e
        })?;

        Ok((decorate(ctx, decision), OUTCOME_ALLOWED))
    }
}

fn outcome_label(err: &AppError) -> &'static str {
    match err {
        AppError::Unauthorized(_) => "denied_unauthenticated",
        AppError::Forbidden(_) => "denied_permission_denied",
        AppError::FailedPrecondition(_) => "denied_failed_precondition",
        AppError::ResourceExhausted(_) => "denied_resource_exhausted",
        _ => "error",
    }
}
