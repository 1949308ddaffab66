//! Account model.

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};

/// Account kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountKind {
    User,
    Org,
}

impl AccountKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountKind::User => "user",
            AccountKind::Org => "org",
        }
    }
}

/// Credential issued by the provisioning service for a new user.
#[derive(Debug, Clone, Deserialize)]
pub struct BackendIdentity {
    pub id: String,
    pub token: Secret<String>,
}

impl PartialEq for BackendIdentity {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.token.expose_secret() == other.token.expose_secret()
    }
}

impl Eq for BackendIdentity {}

/// A user or organization account.
///
/// `created_at` is `None` until the account record has been persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub key: String,
    pub kind: AccountKind,
    pub email: String,
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing)]
    pub backend_identity: Option<BackendIdentity>,
}

impl Account {
    /// Build an account that has been authenticated but not yet persisted.
    pub fn unprovisioned(key: impl Into<String>, kind: AccountKind, email: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            kind,
            email: email.into(),
            created_at: None,
            backend_identity: None,
        }
    }

    pub fn is_user(&self) -> bool {
        self.kind == AccountKind::User
    }

    /// A user seen for the first time still needs its durable record.
    pub fn needs_provisioning(&self) -> bool {
        self.created_at.is_none() && self.is_user()
    }
}

/// The authenticated principal of a call.
///
/// Placed in request extensions by the authentication layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountContext {
    pub user: Account,
    pub org: Option<Account>,
}

impl AccountContext {
    pub fn new(user: Account, org: Option<Account>) -> Self {
        Self { user, org }
    }

    /// The entity whose billing customer accumulates usage: the organization
    /// when acting on its behalf, otherwise the user.
    pub fn owner(&self) -> &Account {
        self.org.as_ref().unwrap_or(&self.user)
    }

    /// Replace the user, keeping the organization scope.
    pub fn with_user(self, user: Account) -> Self {
        Self { user, org: self.org }
    }
}

/// API key presented by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiKey {
    pub key: String,
    /// Key of the account that issued this API key.
    pub owner: String,
}
