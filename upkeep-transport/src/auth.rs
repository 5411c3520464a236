//! Persisted credentials and the session derived from them.
//!
//! The transport never caches a token: every request asks the store, so a
//! refresh written by another process is picked up on the next call.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// What a login leaves behind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredCredentials {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Serialized current-user record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
}

impl StoredCredentials {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            ..Default::default()
        }
    }

    pub fn with_refresh_token(mut self, token: impl Into<String>) -> Self {
        self.refresh_token = Some(token.into());
        self
    }

    pub fn with_user(mut self, user: &CurrentUser) -> Self {
        self.user = serde_json::to_string(user).ok();
        self
    }
}

/// Persistent storage for credentials.
pub trait CredentialStore: Send + Sync {
    /// Current stored credentials, read fresh.
    fn load(&self) -> Option<StoredCredentials>;

    fn save(&self, credentials: &StoredCredentials) -> std::io::Result<()>;

    fn clear(&self) -> std::io::Result<()>;

    fn access_token(&self) -> Option<String> {
        self.load()
            .map(|c| c.access_token)
            .filter(|token| !token.is_empty())
    }

    fn refresh_token(&self) -> Option<String> {
        self.load().and_then(|c| c.refresh_token)
    }

    /// The serialized current-user record.
    fn current_user(&self) -> Option<String> {
        self.load().and_then(|c| c.user)
    }
}

/// Credentials held in process memory.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    inner: Mutex<Option<StoredCredentials>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            inner: Mutex::new(Some(StoredCredentials::new(token))),
        }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn load(&self) -> Option<StoredCredentials> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn save(&self, credentials: &StoredCredentials) -> std::io::Result<()> {
        *self.inner.lock().unwrap_or_else(PoisonError::into_inner) = Some(credentials.clone());
        Ok(())
    }

    fn clear(&self) -> std::io::Result<()> {
        *self.inner.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}

/// Credentials in a JSON file, re-read on every access.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CredentialStore for FileCredentialStore {
    fn load(&self) -> Option<StoredCredentials> {
        if !self.path.exists() {
            return None;
        }
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) => {
                warn!(path = %self.path.display(), %e, "cannot read credentials");
                return None;
            }
        };
        match serde_json::from_str(&contents) {
            Ok(credentials) => Some(credentials),
            Err(e) => {
                warn!(path = %self.path.display(), %e, "ignoring unreadable credentials");
                None
            }
        }
    }

    fn save(&self, credentials: &StoredCredentials) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = serde_json::to_string_pretty(credentials)?;
        let mut file = fs::File::create(&self.path)?;
        file.write_all(contents.as_bytes())?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.path, fs::Permissions::from_mode(0o600))?;
        }

        debug!(path = %self.path.display(), "credentials saved");
        Ok(())
    }

    fn clear(&self) -> std::io::Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)?;
            debug!(path = %self.path.display(), "credentials cleared");
        }
        Ok(())
    }
}

/// The signed-in user as stored at login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Tenant company the user belongs to, absent for platform admins.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
}

/// Who is signed in, read once at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub user: Option<CurrentUser>,
    pub authenticated: bool,
}

impl Session {
    pub fn bootstrap(store: &dyn CredentialStore) -> Self {
        let Some(credentials) = store.load() else {
            return Self::default();
        };
        let user = credentials
            .user
            .as_deref()
            .and_then(|raw| match serde_json::from_str::<CurrentUser>(raw) {
                Ok(user) => Some(user),
                Err(e) => {
                    warn!(%e, "stored user record is unreadable");
                    None
                }
            });
        Self {
            user,
            authenticated: !credentials.access_token.is_empty(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn user() -> CurrentUser {
        CurrentUser {
            id: "u-1".into(),
            email: "tech@acme.io".into(),
            name: Some("Dana".into()),
            company: Some("acme".into()),
        }
    }

    #[test]
    fn memory_store_round_trip_and_clear() {
        let store = MemoryCredentialStore::with_token("abc");
        assert_eq!(store.access_token().as_deref(), Some("abc"));
        store.clear().unwrap();
        assert_eq!(store.access_token(), None);
    }

    #[test]
    fn file_store_picks_up_external_refresh() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested/credentials");
        let store = FileCredentialStore::new(&path);
        assert_eq!(store.access_token(), None);

        store
            .save(&StoredCredentials::new("first").with_refresh_token("r1"))
            .unwrap();
        assert_eq!(store.access_token().as_deref(), Some("first"));

        let other = FileCredentialStore::new(&path);
        other.save(&StoredCredentials::new("second")).unwrap();
        assert_eq!(store.access_token().as_deref(), Some("second"));
        assert_eq!(store.refresh_token(), None);

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }

        store.clear().unwrap();
        assert!(!path.exists());
        store.clear().unwrap();
    }

    #[test]
    fn session_reads_stored_user() {
        let store = MemoryCredentialStore::new();
        assert_eq!(Session::bootstrap(&store), Session::default());

        store
            .save(&StoredCredentials::new("tok").with_user(&user()))
            .unwrap();
        let session = Session::bootstrap(&store);
        assert!(session.authenticated);
        assert_eq!(session.user, Some(user()));
    }

    #[test]
    fn session_tolerates_corrupt_user() {
        let store = MemoryCredentialStore::new();
        let mut credentials = StoredCredentials::new("tok");
        credentials.user = Some("{not json".into());
        store.save(&credentials).unwrap();
        let session = Session::bootstrap(&store);
        assert!(session.authenticated);
        assert_eq!(session.user, None);
    }
}
