//! Wiring shared by every command: configuration, schemas, credentials and
//! a client bound to the selected tenant.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use tracing::debug;
use upkeep_config::{ConfigProvider, UpkeepConfig};
use upkeep_fields::{defaults, SchemaRegistry};
use upkeep_transport::{
    ApiClient, FileCredentialStore, Navigator, Notice, NoticeLevel, Notifier, TenantContext,
};

/// Prints notices to stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalNotifier;

impl Notifier for TerminalNotifier {
    fn notify(&self, notice: Notice) {
        let prefix = match notice.level {
            NoticeLevel::Info => "info",
            NoticeLevel::Success => "ok",
            NoticeLevel::Warning => "warning",
            NoticeLevel::Error => "error",
        };
        eprintln!("{prefix}: {}", notice.message);
    }
}

/// A terminal has no page to leave; a redirect means "sign in again".
#[derive(Debug, Clone)]
pub struct TerminalNavigator {
    path: String,
}

impl TerminalNavigator {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

impl Navigator for TerminalNavigator {
    fn current_path(&self) -> String {
        self.path.clone()
    }

    fn redirect(&self, location: &str) {
        eprintln!("Session expired or missing. Run `upkeep login --token <TOKEN>` ({location})");
    }
}

pub struct Host {
    pub config: UpkeepConfig,
    pub registry: SchemaRegistry,
}

impl Host {
    pub async fn load(config_file: Option<&Path>, schemas: Option<&Path>) -> Result<Self> {
        let mut provider = ConfigProvider::new();
        if let Some(path) = config_file {
            provider = provider.with_file(path);
        }
        let config = provider.load().context("failed to load configuration")?;

        let mut builder = SchemaRegistry::builder().with_defaults(defaults::builtin());
        if let Some(dir) = schemas.map(Path::to_path_buf).or_else(default_schema_dir) {
            debug!(dir = %dir.display(), "using schema overrides");
            builder = builder.with_overrides(dir);
        }
        let registry = builder.build().await.context("failed to load schemas")?;

        Ok(Self { config, registry })
    }

    pub fn credentials(&self) -> Result<FileCredentialStore> {
        self.config
            .storage
            .credentials_path()
            .map(FileCredentialStore::new)
            .ok_or_else(|| anyhow!("no credentials path configured and no home directory"))
    }

    /// Client for the tenant selected by `hostname`, or the main site.
    pub fn client(&self, hostname: Option<&str>, path: &str) -> Result<ApiClient> {
        let tenant = self.tenant(hostname);
        let client = ApiClient::builder(&self.config, tenant)
            .credentials(Arc::new(self.credentials()?))
            .notifier(Arc::new(TerminalNotifier))
            .navigator(Arc::new(TerminalNavigator::new(path)))
            .build()?;
        Ok(client)
    }

    pub fn tenant(&self, hostname: Option<&str>) -> TenantContext {
        hostname
            .map(|host| TenantContext::from_hostname(host, &self.config.api.base_domain))
            .unwrap_or_else(TenantContext::main_site)
    }
}

/// `./.upkeep/schemas`, then `~/.upkeep/schemas`, if either exists.
fn default_schema_dir() -> Option<PathBuf> {
    let project = std::env::current_dir()
        .ok()
        .map(|cwd| cwd.join(".upkeep").join("schemas"));
    let global = dirs::home_dir().map(|home| home.join(".upkeep").join("schemas"));
    [project, global].into_iter().flatten().find(|dir| dir.is_dir())
}
