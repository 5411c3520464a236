//! `upkeep login` / `upkeep logout`

use anyhow::{Context, Result};
use tracing::info;
use upkeep_transport::{CredentialStore, StoredCredentials};

use crate::host::Host;

pub fn login(store: &dyn CredentialStore, token: &str, refresh: Option<&str>) -> Result<()> {
    let mut credentials = StoredCredentials::new(token.trim());
    if let Some(refresh) = refresh {
        credentials = credentials.with_refresh_token(refresh.trim());
    }
    store
        .save(&credentials)
        .context("failed to save credentials")?;
    info!("credentials saved");
    Ok(())
}

pub fn logout(store: &dyn CredentialStore) -> Result<()> {
    store.clear().context("failed to remove credentials")?;
    info!("credentials cleared");
    Ok(())
}

pub fn run_login(host: &Host, token: &str, refresh: Option<&str>) -> Result<()> {
    let store = host.credentials()?;
    login(&store, token, refresh)?;
    println!("Signed in. Credentials saved to {}", store.path().display());
    Ok(())
}

pub fn run_logout(host: &Host) -> Result<()> {
    logout(&host.credentials()?)?;
    println!("Signed out.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use upkeep_transport::FileCredentialStore;

    #[test]
    fn login_then_logout_round_trips_through_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCredentialStore::new(dir.path().join("nested").join("credentials"));

        login(&store, " abc ", Some("r1")).unwrap();
        assert_eq!(store.access_token().as_deref(), Some("abc"));
        assert_eq!(store.refresh_token().as_deref(), Some("r1"));

        logout(&store).unwrap();
        assert_eq!(store.access_token(), None);
        logout(&store).unwrap();
    }
}
