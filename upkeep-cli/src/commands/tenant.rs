//! `upkeep tenant <hostname>`

use comfy_table::{presets::UTF8_FULL, Table};
use upkeep_config::UpkeepConfig;
use upkeep_transport::{ApiHosts, CredentialStore, Session, TenantContext};

use crate::host::Host;

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "no"
    }
}

pub fn render(hostname: &str, config: &UpkeepConfig, store: &dyn CredentialStore) -> String {
    let tenant = TenantContext::from_hostname(hostname, &config.api.base_domain);
    let api_host = ApiHosts::from_config(&config.api).resolve(&tenant);
    let session = Session::bootstrap(store);
    let signed_in = match (&session.user, session.authenticated) {
        (Some(user), true) => format!("yes ({})", user.email),
        (None, true) => "yes".to_string(),
        (_, false) => "no".to_string(),
    };

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Property", "Value"]);
    table.add_row(vec!["Hostname", hostname]);
    table.add_row(vec!["Tenant", tenant.tenant_slug().unwrap_or("-")]);
    table.add_row(vec!["Admin portal", yes_no(tenant.is_admin_portal())]);
    table.add_row(vec!["Main site", yes_no(tenant.is_main_site())]);
    table.add_row(vec!["API host", api_host.as_str()]);
    table.add_row(vec!["Signed in", signed_in.as_str()]);
    table.to_string()
}

pub fn run(host: &Host, hostname: &str) -> anyhow::Result<()> {
    let store = host.credentials()?;
    println!("{}", render(hostname, &host.config, &store));
    Ok(())
}
