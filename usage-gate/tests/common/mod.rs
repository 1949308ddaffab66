//! Test helper module for usage-gate integration tests.
//!
//! Provides in-memory collaborators and request builders.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use secrecy::{ExposeSecret, Secret};
use service_core::error::AppError;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tonic::Request;
use usage_gate::{
    Account, AccountContext, AccountKind, AccountStore, ApiKey, BackendIdentity, BillingLedger,
    Customer, CustomerOptions, Provisioner, SubscriptionStatus, Usage, UsageGate, UsageKind,
};

pub const TEST_USER: &str = "user-1";
pub const TEST_USER_EMAIL: &str = "user@example.com";
pub const TEST_ORG: &str = "org-1";
pub const TEST_ORG_EMAIL: &str = "org@example.com";
pub const TEST_DEVELOPER: &str = "dev-1";
pub const TEST_ADMIN_TOKEN: &str = "admin-secret";

pub const PUSH_PATH: &str = "/api.bucketsd.pb.APIService/PushPath";
pub const LIST_PATH: &str = "/api.bucketsd.pb.APIService/ListPath";
pub const THREADS_FIND: &str = "/threads.pb.API/Find";
pub const THREADS_LISTEN: &str = "/threads.pb.API/Listen";
pub const THREADS_SAVE: &str = "/threads.pb.API/Save";
pub const SIGNUP: &str = "/api.hubd.pb.APIService/Signup";
pub const GET_SESSION_INFO: &str = "/api.hubd.pb.APIService/GetSessionInfo";

/// Free quota granted to customers the in-memory ledger creates.
pub const FREE_QUOTA: i64 = 1_000;

/// Account store backed by a map.
#[derive(Default)]
pub struct InMemoryAccounts {
    users: Mutex<HashMap<String, Account>>,
    creates: AtomicUsize,
    create_fault: Mutex<Option<tonic::Status>>,
}

impl InMemoryAccounts {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn create_count(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    pub fn user(&self, key: &str) -> Option<Account> {
        self.users.lock().unwrap().get(key).cloned()
    }

    /// Make `create_user` fail with `status` from now on.
    pub fn fail_creates(&self, status: tonic::Status) {
        *self.create_fault.lock().unwrap() = Some(status);
    }

    /// Store an already-provisioned user.
    pub fn insert(&self, account: Account) {
        self.users
            .lock()
            .unwrap()
            .insert(account.key.clone(), account);
    }
}

#[async_trait]
impl AccountStore for InMemoryAccounts {
    async fn find_user(&self, key: &str) -> Result<Option<Account>, AppError> {
        Ok(self.user(key))
    }

    async fn create_user(
        &self,
        key: &str,
        identity: Option<BackendIdentity>,
    ) -> Result<Account, AppError> {
        // Give concurrent first calls a chance to interleave.
        tokio::time::sleep(Duration::from_millis(5)).await;
        if let Some(status) = self.create_fault.lock().unwrap().clone() {
            return Err(AppError::from(status));
        }
        self.creates.fetch_add(1, Ordering::SeqCst);

        let account = Account {
            key: key.to_string(),
            kind: AccountKind::User,
            email: TEST_USER_EMAIL.to_string(),
            created_at: Some(Utc::now()),
            backend_identity: identity,
        };
        self.insert(account.clone());
        Ok(account)
    }
}

/// Provisioner that hands out numbered identities.
#[derive(Default)]
pub struct CountingProvisioner {
    calls: AtomicUsize,
    tokens: Mutex<Vec<Option<String>>>,
    fault: Mutex<Option<tonic::Status>>,
}

impl CountingProvisioner {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Make every provisioning call fail with `status` from now on.
    pub fn fail(&self, status: tonic::Status) {
        *self.fault.lock().unwrap() = Some(status);
    }

    /// Admin tokens received, in call order.
    pub fn tokens(&self) -> Vec<Option<String>> {
        self.tokens.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provisioner for CountingProvisioner {
    async fn create_backend_identity(
        &self,
        admin_token: Option<&Secret<String>>,
    ) -> Result<BackendIdentity, AppError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.tokens
            .lock()
            .unwrap()
            .push(admin_token.map(|t| t.expose_secret().clone()));
        if let Some(status) = self.fault.lock().unwrap().clone() {
            return Err(AppError::from(status));
        }
        Ok(BackendIdentity {
            id: format!("identity-{}", n),
            token: Secret::new(format!("token-{}", n)),
        })
    }
}

/// Which ledger operation should fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerFault {
    Get,
    Create,
    Increment,
}

/// Billing ledger backed by a map, recording every call.
#[derive(Default)]
pub struct InMemoryLedger {
    customers: Mutex<HashMap<String, Customer>>,
    created: Mutex<Vec<(String, CustomerOptions)>>,
    increments: Mutex<Vec<(String, HashMap<UsageKind, i64>)>>,
    gets: AtomicUsize,
    fault: Mutex<Option<(LedgerFault, tonic::Status)>>,
}

impl InMemoryLedger {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn insert(&self, customer: Customer) {
        self.customers
            .lock()
            .unwrap()
            .insert(customer.key.clone(), customer);
    }

    pub fn customer(&self, key: &str) -> Option<Customer> {
        self.customers.lock().unwrap().get(key).cloned()
    }

    pub fn created(&self) -> Vec<(String, CustomerOptions)> {
        self.created.lock().unwrap().clone()
    }

    pub fn increments(&self) -> Vec<(String, HashMap<UsageKind, i64>)> {
        self.increments.lock().unwrap().clone()
    }

    pub fn get_count(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    /// Make `op` fail with `status` from now on.
    pub fn fail(&self, op: LedgerFault, status: tonic::Status) {
        *self.fault.lock().unwrap() = Some((op, status));
    }

    fn fault_for(&self, op: LedgerFault) -> Option<AppError> {
        match &*self.fault.lock().unwrap() {
            Some((fault, status)) if *fault == op => Some(AppError::from(status.clone())),
            _ => None,
        }
    }
}

#[async_trait]
impl BillingLedger for InMemoryLedger {
    async fn get_customer(&self, key: &str) -> Result<Customer, AppError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.fault_for(LedgerFault::Get) {
            return Err(err);
        }
        self.customer(key)
            .ok_or_else(|| AppError::from(tonic::Status::not_found("customer not found")))
    }

    async fn create_customer(&self, key: &str, options: CustomerOptions) -> Result<(), AppError> {
        if let Some(err) = self.fault_for(LedgerFault::Create) {
            return Err(err);
        }
        self.created
            .lock()
            .unwrap()
            .push((key.to_string(), options.clone()));
        let mut customer = free_customer(key);
        customer.email = options.email;
        customer.parent_key = options.parent_key;
        self.insert(customer);
        Ok(())
    }

    async fn inc_customer_usage(
        &self,
        key: &str,
        deltas: HashMap<UsageKind, i64>,
    ) -> Result<(), AppError> {
        if let Some(err) = self.fault_for(LedgerFault::Increment) {
            return Err(err);
        }
        if let Some(customer) = self.customers.lock().unwrap().get_mut(key) {
            for (kind, delta) in &deltas {
                customer.daily_usage.entry(*kind).or_default().total += delta;
            }
        }
        self.increments
            .lock()
            .unwrap()
            .push((key.to_string(), deltas));
        Ok(())
    }
}

/// A free-tier customer with [`FREE_QUOTA`] left on every counter.
pub fn free_customer(key: &str) -> Customer {
    Customer {
        key: key.to_string(),
        email: format!("{}@example.com", key),
        parent_key: None,
        subscription_status: SubscriptionStatus::None,
        billable: false,
        daily_usage: [
            UsageKind::StoredData,
            UsageKind::NetworkEgress,
            UsageKind::InstanceReads,
            UsageKind::InstanceWrites,
        ]
        .into_iter()
        .map(|kind| {
            (
                kind,
                Usage {
                    free: FREE_QUOTA,
                    total: 0,
                },
            )
        })
        .collect(),
    }
}

/// Set the free and total amounts of one counter.
pub fn with_usage(mut customer: Customer, kind: UsageKind, free: i64, total: i64) -> Customer {
    customer.daily_usage.insert(kind, Usage { free, total });
    customer
}

/// A user that has already been persisted.
pub fn existing_user(key: &str) -> Account {
    Account {
        created_at: Some(Utc::now()),
        ..Account::unprovisioned(key, AccountKind::User, TEST_USER_EMAIL)
    }
}

pub fn new_user(key: &str) -> Account {
    Account::unprovisioned(key, AccountKind::User, TEST_USER_EMAIL)
}

pub fn org(key: &str) -> Account {
    Account {
        created_at: Some(Utc::now()),
        ..Account::unprovisioned(key, AccountKind::Org, TEST_ORG_EMAIL)
    }
}

pub fn api_key() -> ApiKey {
    ApiKey {
        key: "api-key-1".to_string(),
        owner: TEST_DEVELOPER.to_string(),
    }
}

/// Build a request as the authentication layer would leave it.
pub fn authed_request<T>(message: T, account: AccountContext, key: Option<ApiKey>) -> Request<T> {
    let mut request = Request::new(message);
    request.extensions_mut().insert(account);
    if let Some(key) = key {
        request.extensions_mut().insert(key);
    }
    request
        .metadata_mut()
        .insert("x-request-id", "test-request".parse().unwrap());
    request
}

/// Gate, ledger and account store wired together.
pub struct TestGate {
    pub gate: UsageGate,
    pub accounts: Arc<InMemoryAccounts>,
    pub ledger: Arc<InMemoryLedger>,
    pub provisioner: Arc<CountingProvisioner>,
}

impl TestGate {
    /// Metering gate with a provisioner and an admin token.
    pub fn new() -> Self {
        let accounts = InMemoryAccounts::new();
        let ledger = InMemoryLedger::new();
        let provisioner = CountingProvisioner::new();
        let gate = UsageGate::builder(accounts.clone())
            .billing(ledger.clone())
            .provisioner(provisioner.clone())
            .admin_token(Secret::new(TEST_ADMIN_TOKEN.to_string()))
            .build();
        Self {
            gate,
            accounts,
            ledger,
            provisioner,
        }
    }

    /// Metering gate without a provisioner.
    pub fn without_provisioner() -> Self {
        let accounts = InMemoryAccounts::new();
        let ledger = InMemoryLedger::new();
        let gate = UsageGate::builder(accounts.clone())
            .billing(ledger.clone())
            .build();
        Self {
            gate,
            accounts,
            ledger,
            provisioner: CountingProvisioner::new(),
        }
    }

    /// Register a persisted user that already has a customer.
    pub fn with_existing_user(self, customer: Customer) -> Self {
        self.accounts.insert(existing_user(&customer.key));
        self.ledger.insert(customer);
        self
    }
}
