//! Refresh credential storage.

use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Duration, Utc};
use pickup_domain::{CookieJar, REFRESH_TOKEN_COOKIE, RefreshToken};

use crate::ports::{Clock, CookieScope, CredentialStore, StoreError};

/// In-process cookie jar implementing [`CredentialStore`].
pub struct MemoryCredentialStore {
    jar: Mutex<CookieJar>,
    scope: CookieScope,
    clock: Arc<dyn Clock>,
}

impl MemoryCredentialStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new(scope: CookieScope, clock: Arc<dyn Clock>) -> Self {
        Self {
            jar: Mutex::new(CookieJar::new()),
            scope,
            clock,
        }
    }

    /// Number of cookies currently held, expired ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.jar.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Returns true if no cookies are held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Expiry of the cookie stored under `name`.
    #[must_use]
    pub fn expires_at(&self, name: &str) -> Option<DateTime<Utc>> {
        let jar = self.jar.lock().unwrap_or_else(PoisonError::into_inner);
        jar.get(name, self.clock.now()).and_then(|c| c.expires)
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn set(&self, name: &str, value: &str, expires: DateTime<Utc>) -> Result<(), StoreError> {
        let cookie = self.scope.cookie(name, value, expires);
        let mut jar = self.jar.lock().unwrap_or_else(PoisonError::into_inner);
        jar.remove(name);
        jar.set(cookie);
        Ok(())
    }

    fn get(&self, name: &str) -> Option<String> {
        let jar = self.jar.lock().unwrap_or_else(PoisonError::into_inner);
        jar.get(name, self.clock.now()).map(|c| c.value.clone())
    }

    fn delete(&self, name: &str) -> Result<(), StoreError> {
        self.jar
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name);
        Ok(())
    }
}

/// Reads and writes the refresh token with the configured lifetime.
#[derive(Clone)]
pub struct RefreshCredentials {
    store: Arc<dyn CredentialStore>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl RefreshCredentials {
    /// Wraps a store. Saved tokens expire `ttl` after being written.
    #[must_use]
    pub fn new(store: Arc<dyn CredentialStore>, clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self { store, clock, ttl }
    }

    /// The stored refresh token, if any. Blank values count as absent.
    #[must_use]
    pub fn load(&self) -> Option<RefreshToken> {
        self.store
            .get(REFRESH_TOKEN_COOKIE)
            .and_then(|raw| RefreshToken::new(raw).ok())
    }

    /// Stores `token`, resetting its expiry. Returns the new expiry.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    pub fn save(&self, token: &RefreshToken) -> Result<DateTime<Utc>, StoreError> {
        let expires = self.clock.now() + self.ttl;
        self.store.set(REFRESH_TOKEN_COOKIE, token.as_str(), expires)?;
        Ok(expires)
    }

    /// Deletes the stored refresh token.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    pub fn forget(&self) -> Result<(), StoreError> {
        self.store.delete(REFRESH_TOKEN_COOKIE)
    }

    /// The underlying store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn CredentialStore> {
        &self.store
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::test_support::FixedClock;
    use pretty_assertions::assert_eq;

    fn store_with_clock() -> (Arc<MemoryCredentialStore>, Arc<FixedClock>) {
        let clock = Arc::new(FixedClock::at_epoch());
        let store = Arc::new(MemoryCredentialStore::new(
            CookieScope::new("shop.example.com", "/"),
            clock.clone(),
        ));
        (store, clock)
    }

    #[test]
    fn test_set_then_get_returns_value() {
        let (store, clock) = store_with_clock();
        store
            .set("refreshToken", "r1", clock.now() + Duration::days(1))
            .unwrap();
        assert_eq!(store.get("refreshToken"), Some("r1".to_string()));
    }

    #[test]
    fn test_delete_then_get_is_absent() {
        let (store, clock) = store_with_clock();
        store
            .set("refreshToken", "r1", clock.now() + Duration::days(1))
            .unwrap();
        store.delete("refreshToken").unwrap();
        assert_eq!(store.get("refreshToken"), None);

        // deleting again is fine
        store.delete("refreshToken").unwrap();
    }

    #[test]
    fn test_overwrite_keeps_single_entry() {
        let (store, clock) = store_with_clock();
        store.set("refreshToken", "r1", clock.now() + Duration::days(1)).unwrap();
        store.set("refreshToken", "r2", clock.now() + Duration::days(2)).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("refreshToken"), Some("r2".to_string()));
        assert_eq!(
            store.expires_at("refreshToken"),
            Some(clock.now() + Duration::days(2))
        );
    }

    #[test]
    fn test_expired_entry_is_absent() {
        let (store, clock) = store_with_clock();
        store.set("refreshToken", "r1", clock.now() + Duration::hours(1)).unwrap();
        clock.advance(Duration::hours(2));
        assert_eq!(store.get("refreshToken"), None);
    }

    #[test]
    fn test_refresh_credentials_ttl() {
        let (store, clock) = store_with_clock();
        let credentials = RefreshCredentials::new(store.clone(), clock.clone(), Duration::days(14));

        assert!(credentials.load().is_none());
        let expires = credentials.save(&RefreshToken::new("r1").unwrap()).unwrap();
        assert_eq!(expires, clock.now() + Duration::days(14));
        assert_eq!(credentials.load().unwrap().as_str(), "r1");

        credentials.forget().unwrap();
        assert!(credentials.load().is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_blank_stored_value_is_absent() {
        let (store, clock) = store_with_clock();
        store.set(REFRESH_TOKEN_COOKIE, "", clock.now() + Duration::days(1)).unwrap();
        let credentials = RefreshCredentials::new(store, clock, Duration::days(14));
        assert!(credentials.load().is_none());
    }
}
