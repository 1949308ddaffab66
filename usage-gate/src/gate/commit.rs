//! Post-call usage commit.

use std::collections::HashMap;
use tracing::{debug, error, instrument};

use service_core::error::AppError;

use super::UsageGate;
use crate::classifier::MethodCategory;
use crate::context::CallContext;
use crate::models::UsageKind;
use crate::services::{record_commit_failure, record_committed_usage};

impl UsageGate {
    /// Post-call hook, run only after the handler succeeded.
    ///
    /// Adds the storage delta the handler recorded to the owner's
    /// `stored_data` counter. A failure here fails the call even though the
    /// handler's side effects have already happened.
    #[instrument(name = "usage_gate.post_call", skip_all, fields(method = %ctx.method()))]
    pub async fn post_call(&self, ctx: &CallContext) -> Result<(), AppError> {
        let Some(billing) = self.inner.billing.as_deref() else {
            return Ok(());
        };
        if self.inner.methods.classify(ctx.method()) != MethodCategory::StorageWrite {
            return Ok(());
        }
        let Some(account) = ctx.account() else {
            return Ok(());
        };
        let Some(quota) = ctx.storage_quota() else {
            return Ok(());
        };

        let owner = &account.owner().key;
        let delta = quota.delta();
        billing
            .inc_customer_usage(owner, HashMap::from([(UsageKind::StoredData, delta)]))
            .await
            .map_err(|e| {
                record_commit_failure();
                error!(owner = %owner, delta, error = %e, "Failed to commit storage usage");
                e
            })?;

        record_committed_usage(UsageKind::StoredData.as_str(), delta);
        debug!(owner = %owner, delta, "Committed storage usage");
        Ok(())
    }
}
