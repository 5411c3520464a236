//! Upkeep configuration management using Figment
//!
//! Layers serialized defaults, `~/.upkeep/upkeep.*`, `./.upkeep/upkeep.*`,
//! an optional explicit file and `UPKEEP_`-prefixed environment variables
//! into one typed [`UpkeepConfig`].
//!
//! ```no_run
//! use upkeep_config::load_configuration;
//!
//! let config = load_configuration()?;
//! println!("platform API: {}", config.api.platform_host);
//! # Ok::<(), upkeep_config::ConfigError>(())
//! ```
//!
//! Environment variables use `__` for nesting:
//!
//! ```bash
//! export UPKEEP_API__BASE_DOMAIN="console.acme-cmms.io"
//! export UPKEEP_API__REQUESTS_PER_SECOND=5
//! export UPKEEP_ROUTES__LOGIN="/auth/login"
//! ```

pub mod error;
pub mod provider;
pub mod types;

pub use error::ConfigError;
pub use provider::ConfigProvider;
pub use types::{
    ApiConfig, RouteConfig, StorageConfig, UpkeepConfig, DEFAULT_REQUESTS_PER_SECOND,
    TENANT_PLACEHOLDER,
};

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Load configuration from the standard locations and the environment.
pub fn load_configuration() -> ConfigResult<UpkeepConfig> {
    ConfigProvider::new().load()
}
