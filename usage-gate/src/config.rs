//! Configuration for the usage gate.

use secrecy::Secret;
use serde::Deserialize;
use service_core::config::ObservabilityConfig;
use service_core::error::AppError;

/// What to do with a call that carries no authenticated account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnonymousCallPolicy {
    /// Let the call through unmetered. Methods that run before an identity
    /// exists depend on this.
    #[default]
    PassThrough,
    /// Fail the call with `UNAUTHENTICATED`.
    Reject,
}

impl AnonymousCallPolicy {
    /// Whether a call without an account may proceed.
    pub fn admits(&self) -> bool {
        match self {
            AnonymousCallPolicy::PassThrough => true,
            AnonymousCallPolicy::Reject => false,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct MeteringConfig {
    /// When false the gate lets every call through untouched.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub anonymous_calls: AnonymousCallPolicy,
}

fn default_enabled() -> bool {
    true
}

impl Default for MeteringConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            anonymous_calls: AnonymousCallPolicy::default(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ProvisioningConfig {
    /// Admin credential for the provisioning service.
    #[serde(default)]
    pub admin_token: Option<Secret<String>>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GateConfig {
    #[serde(default = "default_observability")]
    pub observability: ObservabilityConfig,
    #[serde(default)]
    pub metering: MeteringConfig,
    #[serde(default)]
    pub provisioning: ProvisioningConfig,
}

fn default_observability() -> ObservabilityConfig {
    ObservabilityConfig {
        service_name: "usage-gate".to_string(),
        ..ObservabilityConfig::default()
    }
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            observability: default_observability(),
            metering: MeteringConfig::default(),
            provisioning: ProvisioningConfig::default(),
        }
    }
}

impl GateConfig {
    /// Load from `usage-gate.*` and `USAGE_GATE__*` environment variables,
    /// e.g. `USAGE_GATE__METERING__ENABLED=false`.
    pub fn load() -> Result<Self, AppError> {
        service_core::config::load("usage-gate", "USAGE_GATE")
    }
}
