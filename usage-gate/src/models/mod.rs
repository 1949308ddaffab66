//! Domain models for the usage gate.

pub mod account;
pub mod customer;
pub mod quota;

pub use account::{Account, AccountContext, AccountKind, ApiKey, BackendIdentity};
pub use customer::{
    Customer, CustomerOptions, SubscriptionError, SubscriptionStatus, Usage, UsageKind,
};
pub use quota::{StorageQuota, UNLIMITED};
