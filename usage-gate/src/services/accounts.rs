use async_trait::async_trait;
use service_core::error::AppError;

use crate::models::{Account, BackendIdentity};

/// Durable account records.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Fetch a user's persisted record, if one exists.
    async fn find_user(&self, key: &str) -> Result<Option<Account>, AppError>;

    /// Persist a user record, attaching `identity` when one was provisioned.
    ///
    /// Implementations upsert by `key`.
    async fn create_user(
        &self,
        key: &str,
        identity: Option<BackendIdentity>,
    ) -> Result<Account, AppError>;
}
