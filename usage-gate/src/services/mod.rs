//! Collaborators of the gate and its metrics.

pub mod accounts;
pub mod billing;
pub mod metrics;
pub mod provisioning;

pub use accounts::AccountStore;
pub use billing::BillingLedger;
pub use metrics::{
    get_metrics, init_metrics, record_commit_failure, record_committed_usage,
    record_customer_created, record_decision, record_provisioned_account,
};
pub use provisioning::Provisioner;
