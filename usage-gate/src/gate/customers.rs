//! Billing customer synchronization and account-wide standing checks.

use tracing::{error, info, warn};

use service_core::error::AppError;

use super::UsageGate;
use crate::context::CallContext;
use crate::models::{Account, Customer, CustomerOptions, UsageKind};
use crate::services::{BillingLedger, record_customer_created};

impl UsageGate {
    /// Fetch the owner's billing customer, creating it on first use, and
    /// verify the owner is in good standing.
    pub(crate) async fn sync_customer(
        &self,
        billing: &dyn BillingLedger,
        ctx: &CallContext,
        owner: &Account,
    ) -> Result<Customer, AppError> {
        let customer = match billing.get_customer(&owner.key).await {
            Ok(customer) => customer,
            Err(e) if e.is_not_found() => self.create_customer(billing, ctx, owner).await?,
            Err(e) => {
                error!(owner = %owner.key, error = %e, "Failed to fetch billing customer");
                return Err(e);
            }
        };

        check_standing(&customer)?;
        Ok(customer)
    }

    async fn create_customer(
        &self,
        billing: &dyn BillingLedger,
        ctx: &CallContext,
        owner: &Account,
    ) -> Result<Customer, AppError> {
        let mut options = CustomerOptions::with_email(&owner.email);
        if owner.is_user() {
            let Some(api_key) = ctx.api_key() else {
                warn!(owner = %owner.key, "Cannot create user customer without an API key");
                return Err(AppError::Forbidden(anyhow::anyhow!("Bad API key")));
            };
            options = options.parent_key(&api_key.owner);
        }

        billing.create_customer(&owner.key, options).await?;
        record_customer_created(owner.kind.as_str());
        info!(owner = %owner.key, kind = owner.kind.as_str(), "Created billing customer");

        // The creation ack does not carry the full record.
        billing.get_customer(&owner.key).await
    }
}

/// Checks that apply to every metered call regardless of its category.
fn check_standing(customer: &Customer) -> Result<(), AppError> {
    if let Err(e) = customer.subscription_status.check() {
        warn!(
            customer = %customer.key,
            status = customer.subscription_status.as_str(),
            "Subscription not in good standing"
        );
        return Err(AppError::FailedPrecondition(e.into()));
    }

    if customer.free_quota_exhausted(UsageKind::NetworkEgress) {
        warn!(customer = %customer.key, "Network egress free quota exhausted");
        return Err(AppError::ResourceExhausted(
            "network egress exhausted: exceeds free quota".to_string(),
        ));
    }

    Ok(())
}
