use async_trait::async_trait;
use service_core::error::AppError;
use std::collections::HashMap;

use crate::models::{Customer, CustomerOptions, UsageKind};

/// Billing ledger client.
///
/// `get_customer` reports a missing customer as [`AppError::NotFound`]
/// (a `NOT_FOUND` status converts into it). `inc_customer_usage` must apply
/// each delta atomically.
#[async_trait]
pub trait BillingLedger: Send + Sync {
    async fn get_customer(&self, key: &str) -> Result<Customer, AppError>;

    async fn create_customer(&self, key: &str, options: CustomerOptions) -> Result<(), AppError>;

    async fn inc_customer_usage(
        &self,
        key: &str,
        deltas: HashMap<UsageKind, i64>,
    ) -> Result<(), AppError>;
}
