use async_trait::async_trait;
use secrecy::Secret;
use service_core::error::AppError;

use crate::models::BackendIdentity;

/// External service issuing per-user backend storage identities.
#[async_trait]
pub trait Provisioner: Send + Sync {
    /// Create a backend identity, authorized with the gate's admin token.
    async fn create_backend_identity(
        &self,
        admin_token: Option<&Secret<String>>,
    ) -> Result<BackendIdentity, AppError>;
}
