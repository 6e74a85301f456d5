//! Cookie jar persisted to a JSON file.
//!
//! The whole jar is rewritten after every mutation, through a temporary
//! file renamed into place, so a crash never leaves a half-written jar.
//!
//! ```json
//! {
//!   "cookies": {
//!     "refreshToken": {
//!       "name": "refreshToken",
//!       "value": "...",
//!       "domain": "shop.example.com",
//!       "path": "/",
//!       "expires": "2026-01-15T09:00:00Z",
//!       "http_only": false,
//!       "secure": true,
//!       "same_site": "lax"
//!     }
//!   }
//! }
//! ```

use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use pickup_application::ports::{Clock, CookieScope, CredentialStore, StoreError};
use pickup_domain::CookieJar;

use crate::serialization::{from_json_bytes, to_json_stable_bytes};

/// [`CredentialStore`] that survives restarts.
pub struct FileCredentialStore {
    path: PathBuf,
    jar: Mutex<CookieJar>,
    scope: CookieScope,
    clock: Arc<dyn Clock>,
}

impl FileCredentialStore {
    /// Opens the jar at `path`. A missing file is an empty jar.
    ///
    /// Expired cookies are dropped on load.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn open(
        path: impl Into<PathBuf>,
        scope: CookieScope,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, StoreError> {
        let path = path.into();
        let mut jar = match std::fs::read(&path) {
            Ok(bytes) => from_json_bytes::<CookieJar>(&bytes)
                .map_err(|e| StoreError::Serialization(format!("{}: {e}", path.display())))?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => CookieJar::new(),
            Err(e) => return Err(e.into()),
        };
        jar.cleanup_expired(clock.now());
        tracing::debug!(path = %path.display(), cookies = jar.len(), "credential file opened");

        Ok(Self {
            path,
            jar: Mutex::new(jar),
            scope,
            clock,
        })
    }

    /// Default location under the user's data directory.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        dirs::data_dir().map(|dir| dir.join("pickup").join("credentials.json"))
    }

    /// File backing this store.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, jar: &CookieJar) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            to_json_stable_bytes(jar).map_err(|e| StoreError::Serialization(e.to_string()))?;

        let staging = self.path.with_extension("json.tmp");
        std::fs::write(&staging, content)?;
        restrict_permissions(&staging)?;
        std::fs::rename(&staging, &self.path)?;
        Ok(())
    }

    fn mutate(&self, change: impl FnOnce(&mut CookieJar)) -> Result<(), StoreError> {
        let mut jar = self.jar.lock().unwrap_or_else(PoisonError::into_inner);
        change(&mut jar);
        jar.cleanup_expired(self.clock.now());
        self.persist(&jar)
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> io::Result<()> {
    Ok(())
}

impl CredentialStore for FileCredentialStore {
    fn set(&self, name: &str, value: &str, expires: DateTime<Utc>) -> Result<(), StoreError> {
        let cookie = self.scope.cookie(name, value, expires);
        self.mutate(|jar| {
            jar.remove(name);
            jar.set(cookie);
        })
    }

    fn get(&self, name: &str) -> Option<String> {
        let jar = self.jar.lock().unwrap_or_else(PoisonError::into_inner);
        jar.get(name, self.clock.now()).map(|c| c.value.clone())
    }

    fn delete(&self, name: &str) -> Result<(), StoreError> {
        self.mutate(|jar| {
            jar.remove(name);
        })
    }
}
