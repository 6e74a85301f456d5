//! In-memory session context.
//!
//! Holds the access token for the lifetime of the running client. Every
//! write bumps an epoch counter in the same atomic update, which lets the
//! gateway tell whether the token changed since a request was sent.

use pickup_domain::AccessToken;
use tokio::sync::watch;

/// Point-in-time view of the session.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionSnapshot {
    /// Current access token.
    pub access_token: Option<AccessToken>,
    /// Number of writes so far.
    pub epoch: u64,
}

impl SessionSnapshot {
    /// Returns true if an access token is held.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.access_token.is_some()
    }
}

/// Reactive holder of the current access token.
#[derive(Debug)]
pub struct SessionContext {
    state: watch::Sender<SessionSnapshot>,
}

impl SessionContext {
    /// Creates a context with no access token.
    #[must_use]
    pub fn new() -> Self {
        let (state, _) = watch::channel(SessionSnapshot::default());
        Self { state }
    }

    /// Current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.borrow().clone()
    }

    /// Current access token.
    #[must_use]
    pub fn access_token(&self) -> Option<AccessToken> {
        self.state.borrow().access_token.clone()
    }

    /// Current epoch.
    #[must_use]
    pub fn epoch(&self) -> u64 {
        self.state.borrow().epoch
    }

    /// Replaces the access token. Returns the new epoch.
    pub fn set_access_token(&self, token: Option<AccessToken>) -> u64 {
        let mut epoch = 0;
        self.state.send_modify(|snapshot| {
            snapshot.access_token = token;
            snapshot.epoch += 1;
            epoch = snapshot.epoch;
        });
        epoch
    }

    /// Drops the access token. Returns the new epoch.
    pub fn clear(&self) -> u64 {
        self.set_access_token(None)
    }

    /// Receiver notified on every change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.state.subscribe()
    }
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::new()
    }
}
