//! Hostname-derived tenant routing.
//!
//! The browser hostname is the only input: no server round-trip decides
//! whether a page belongs to a tenant, the admin portal or the main site.

use serde::Serialize;
use upkeep_config::{ApiConfig, TENANT_PLACEHOLDER};

/// Slug that selects the platform admin portal instead of a tenant.
pub const ADMIN_SLUG: &str = "admin";

/// Leading labels treated as the bare domain.
const MAIN_SITE_ALIASES: [&str; 1] = ["www"];

/// Which part of the console a page belongs to. Fixed for the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TenantContext {
    tenant_slug: Option<String>,
    is_admin_portal: bool,
    is_main_site: bool,
}

impl TenantContext {
    /// Derive the context from a hostname, given the bare console domain.
    ///
    /// A hostname with more labels than `base_domain` has its leftmost label
    /// taken as the tenant slug. `admin` selects the admin portal.
    pub fn from_hostname(hostname: &str, base_domain: &str) -> Self {
        let host = normalize_host(hostname);
        let base_labels = normalize_host(base_domain).split('.').count();
        let labels: Vec<&str> = host.split('.').collect();

        let slug = (labels.len() > base_labels)
            .then(|| labels[0])
            .filter(|label| !label.is_empty() && !MAIN_SITE_ALIASES.contains(label));

        match slug {
            Some(ADMIN_SLUG) => Self::admin_portal(),
            Some(slug) => Self::tenant(slug),
            None => Self::main_site(),
        }
    }

    pub fn tenant(slug: impl Into<String>) -> Self {
        Self {
            tenant_slug: Some(slug.into()),
            is_admin_portal: false,
            is_main_site: false,
        }
    }

    pub fn admin_portal() -> Self {
        Self {
            tenant_slug: None,
            is_admin_portal: true,
            is_main_site: false,
        }
    }

    pub fn main_site() -> Self {
        Self {
            tenant_slug: None,
            is_admin_portal: false,
            is_main_site: true,
        }
    }

    pub fn tenant_slug(&self) -> Option<&str> {
        self.tenant_slug.as_deref()
    }

    pub fn is_admin_portal(&self) -> bool {
        self.is_admin_portal
    }

    pub fn is_main_site(&self) -> bool {
        self.is_main_site
    }
}

/// Lower-case, drop a trailing dot and any `:port`.
fn normalize_host(hostname: &str) -> String {
    let host = hostname.trim().to_ascii_lowercase();
    let host = match host.rsplit_once(':') {
        Some((name, port)) if port.chars().all(|c| c.is_ascii_digit()) => name.to_string(),
        _ => host,
    };
    host.trim_end_matches('.').to_string()
}

/// API base URLs for the platform and for tenants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiHosts {
    platform_host: String,
    tenant_template: String,
}

impl ApiHosts {
    pub fn new(platform_host: impl Into<String>, tenant_template: impl Into<String>) -> Self {
        Self {
            platform_host: platform_host.into(),
            tenant_template: tenant_template.into(),
        }
    }

    pub fn from_config(config: &ApiConfig) -> Self {
        Self::new(&config.platform_host, &config.tenant_host_template)
    }

    /// Tenant pages talk to the tenant host; admin and main site to the platform.
    pub fn resolve(&self, tenant: &TenantContext) -> String {
        match tenant.tenant_slug() {
            Some(slug) => self.tenant_template.replace(TENANT_PLACEHOLDER, slug),
            None => self.platform_host.clone(),
        }
    }
}
