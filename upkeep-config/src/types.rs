//! Strongly typed configuration values.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Placeholder substituted with the tenant slug in `tenant_host_template`.
pub const TENANT_PLACEHOLDER: &str = "{tenant}";

/// Default outbound request ceiling.
pub const DEFAULT_REQUESTS_PER_SECOND: u32 = 10;

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpkeepConfig {
    pub api: ApiConfig,
    pub routes: RouteConfig,
    pub storage: StorageConfig,
}

/// Backend hosts and transport behaviour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Bare console domain; any extra leftmost label is a tenant slug.
    pub base_domain: String,
    /// API base URL used for the admin portal and the main site.
    pub platform_host: String,
    /// API base URL for tenants, containing `{tenant}`.
    pub tenant_host_template: String,
    pub requests_per_second: u32,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_domain: "app.example.com".to_string(),
            platform_host: "https://api.example.com".to_string(),
            tenant_host_template: "https://{tenant}.api.example.com".to_string(),
            requests_per_second: DEFAULT_REQUESTS_PER_SECOND,
            max_retries: 1,
            retry_delay_ms: 0,
            timeout_secs: 30,
        }
    }
}

impl ApiConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Console routes the engine redirects to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouteConfig {
    pub login: String,
}

impl Default for RouteConfig {
    fn default() -> Self {
        Self {
            login: "/login".to_string(),
        }
    }
}

/// Where persisted credentials live.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub credentials_path: Option<PathBuf>,
}

impl StorageConfig {
    /// Configured path, else `~/.upkeep/credentials`.
    pub fn credentials_path(&self) -> Option<PathBuf> {
        self.credentials_path
            .clone()
            .or_else(|| dirs::home_dir().map(|home| home.join(".upkeep").join("credentials")))
    }
}

impl UpkeepConfig {
    /// Reject values the transport cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api.requests_per_second == 0 {
            return Err(ConfigError::invalid(
                "api.requests_per_second",
                "must be greater than zero",
            ));
        }
        if !self.api.tenant_host_template.contains(TENANT_PLACEHOLDER) {
            return Err(ConfigError::invalid(
                "api.tenant_host_template",
                format!("must contain {TENANT_PLACEHOLDER}"),
            ));
        }
        if self.api.base_domain.trim().is_empty() {
            return Err(ConfigError::invalid("api.base_domain", "must not be empty"));
        }
        if !self.routes.login.starts_with('/') {
            return Err(ConfigError::invalid("routes.login", "must be an absolute path"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        let config = UpkeepConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.api.requests_per_second, 10);
        assert_eq!(config.api.max_retries, 1);
        assert_eq!(config.api.retry_delay(), Duration::ZERO);
        assert_eq!(config.routes.login, "/login");
    }

    #[test]
    fn zero_rate_rejected() {
        let mut config = UpkeepConfig::default();
        config.api.requests_per_second = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { ref key, .. }) if key == "api.requests_per_second"
        ));
    }

    #[test]
    fn template_without_placeholder_rejected() {
        let mut config = UpkeepConfig::default();
        config.api.tenant_host_template = "https://api.example.com".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn explicit_credentials_path_wins() {
        let storage = StorageConfig {
            credentials_path: Some(PathBuf::from("/tmp/creds.json")),
        };
        assert_eq!(
            storage.credentials_path(),
            Some(PathBuf::from("/tmp/creds.json"))
        );
    }
}
