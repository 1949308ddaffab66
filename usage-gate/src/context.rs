//! Call-scoped accounting record.

use tonic::Request;

use crate::models::{AccountContext, ApiKey, StorageQuota};

/// Everything the gate knows about one in-flight call.
///
/// The gate builds it from the request before the handler runs, passes it to
/// the handler alongside the request, and reads the same value back in the
/// post-call hook. Clones share the storage delta.
#[derive(Debug, Clone)]
pub struct CallContext {
    method: String,
    account: Option<AccountContext>,
    api_key: Option<ApiKey>,
    storage_quota: Option<StorageQuota>,
}

impl CallContext {
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            account: None,
            api_key: None,
            storage_quota: None,
        }
    }

    /// Pick up the account and API key the authentication layer placed in
    /// the request extensions.
    pub fn from_request<T>(method: impl Into<String>, request: &Request<T>) -> Self {
        let extensions = request.extensions();
        Self {
            method: method.into(),
            account: extensions.get::<AccountContext>().cloned(),
            api_key: extensions.get::<ApiKey>().cloned(),
            storage_quota: None,
        }
    }

    pub fn with_account(mut self, account: AccountContext) -> Self {
        self.account = Some(account);
        self
    }

    pub fn with_api_key(mut self, api_key: ApiKey) -> Self {
        self.api_key = Some(api_key);
        self
    }

    /// Attach the storage quota the handler enforces and reports against.
    pub fn with_storage_quota(mut self, quota: StorageQuota) -> Self {
        self.storage_quota = Some(quota);
        self
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn account(&self) -> Option<&AccountContext> {
        self.account.as_ref()
    }

    pub fn api_key(&self) -> Option<&ApiKey> {
        self.api_key.as_ref()
    }

    pub fn storage_quota(&self) -> Option<&StorageQuota> {
        self.storage_quota.as_ref()
    }

    /// Copy this context into the request so handlers written as plain
    /// tonic services can read it from the extensions.
    pub fn attach<T>(&self, request: &mut Request<T>) {
        if let Some(account) = &self.account {
            request.extensions_mut().insert(account.clone());
        }
        request.extensions_mut().insert(self.clone());
    }
}
