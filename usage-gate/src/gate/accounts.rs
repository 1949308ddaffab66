//! Account resolution and first-call provisioning.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{error, info};

use service_core::error::AppError;

use super::UsageGate;
use crate::models::{Account, AccountContext};
use crate::services::record_provisioned_account;

impl UsageGate {
    /// Make sure the calling user has a durable account record.
    ///
    /// Returns the context unchanged unless the user is new, in which case a
    /// backend identity is provisioned (when a provisioner is configured) and
    /// the persisted record replaces the user in the returned context.
    pub(crate) async fn resolve_account(
        &self,
        account: AccountContext,
    ) -> Result<AccountContext, AppError> {
        if !account.user.needs_provisioning() {
            return Ok(account);
        }

        let key = account.user.key.clone();
        let slot = ProvisionSlot::acquire(&self.inner.provision_locks, &key);
        let user = {
            let _held = slot.lock().await;
            self.provision_user(&key).await?
        };

        Ok(account.with_user(user))
    }

    async fn provision_user(&self, key: &str) -> Result<Account, AppError> {
        // A concurrent first call may have finished while we waited.
        match self.inner.accounts.find_user(key).await? {
            Some(existing) if existing.created_at.is_some() => return Ok(existing),
            _ => {}
        }

        let identity = match &self.inner.provisioner {
            Some(provisioner) => {
                let identity = provisioner
                    .create_backend_identity(self.inner.admin_token.as_ref())
                    .await
                    .map_err(|e| {
                        error!(account = %key, error = %e, "Failed to provision backend identity");
                        e
                    })?;
                Some(identity)
            }
            None => None,
        };

        let user = self
            .inner
            .accounts
            .create_user(key, identity)
            .await
            .map_err(|e| {
                error!(account = %key, error = %e, "Failed to persist new account");
                e
            })?;

        record_provisioned_account();
        info!(
            account = %key,
            backend_identity = user.backend_identity.is_some(),
            "Provisioned new account"
        );

        Ok(user)
    }
}

/// Claim on a per-key provisioning lock.
///
/// Dropping the claim removes the map entry once no other call holds it,
/// including when the owning future is cancelled mid-provisioning.
struct ProvisionSlot<'a> {
    locks: &'a DashMap<String, Arc<Mutex<()>>>,
    key: &'a str,
    lock: Arc<Mutex<()>>,
}

impl<'a> ProvisionSlot<'a> {
    fn acquire(locks: &'a DashMap<String, Arc<Mutex<()>>>, key: &'a str) -> Self {
        let lock = locks.entry(key.to_string()).or_default().clone();
        Self { locks, key, lock }
    }

    async fn lock(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().await
    }
}

impl Drop for ProvisionSlot<'_> {
    fn drop(&mut self) {
        // The map and this slot are the only holders.
        self.locks
            .remove_if(self.key, |_, lock| Arc::strong_count(lock) == 2);
    }
}
