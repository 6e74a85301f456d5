//! Client session lifecycle.
//!
//! One [`ClientSession`] exists per application run. It owns the session
//! context, the refresh credential accessor, the gateway and the
//! notification hub, and handles login, logout and messages from a host
//! shell.

use std::sync::Arc;

use pickup_domain::{ClientConfig, InboundMessage, OutboundMessage, RefreshToken, TokenPair};

use crate::auth::{AuthenticatedGateway, GatewaySettings, RefreshCredentials, SessionContext};
use crate::error::GatewayResult;
use crate::notifications::NotificationHub;
use crate::ports::{ApiTransport, Clock, CredentialStore, HostBridge, LoginNavigator, StoreError};

/// Assembles a [`ClientSession`].
pub struct ClientSessionBuilder {
    config: ClientConfig,
    transport: Arc<dyn ApiTransport>,
    store: Arc<dyn CredentialStore>,
    clock: Arc<dyn Clock>,
    navigator: Arc<dyn LoginNavigator>,
    bridge: Option<Arc<dyn HostBridge>>,
}

impl ClientSessionBuilder {
    /// Attach a host shell bridge.
    #[must_use]
    pub fn host_bridge(mut self, bridge: Arc<dyn HostBridge>) -> Self {
        self.bridge = Some(bridge);
        self
    }

    /// Builds the session.
    #[must_use]
    pub fn build(self) -> ClientSession {
        let session = Arc::new(SessionContext::new());
        let credentials =
            RefreshCredentials::new(self.store, self.clock, self.config.refresh_token_ttl());

        let mut gateway = AuthenticatedGateway::new(
            self.transport,
            session.clone(),
            credentials.clone(),
            self.navigator,
            GatewaySettings::from_config(&self.config),
        );
        if let Some(bridge) = &self.bridge {
            gateway = gateway.with_host_bridge(bridge.clone());
        }

        ClientSession {
            config: self.config,
            session,
            credentials,
            gateway: Arc::new(gateway),
            hub: NotificationHub::new(),
            bridge: self.bridge,
        }
    }
}

/// Everything one running client needs to talk to the API.
pub struct ClientSession {
    config: ClientConfig,
    session: Arc<SessionContext>,
    credentials: RefreshCredentials,
    gateway: Arc<AuthenticatedGateway>,
    hub: NotificationHub,
    bridge: Option<Arc<dyn HostBridge>>,
}

impl ClientSession {
    /// Starts building a session.
    #[must_use]
    pub fn builder(
        config: ClientConfig,
        transport: Arc<dyn ApiTransport>,
        store: Arc<dyn CredentialStore>,
        clock: Arc<dyn Clock>,
        navigator: Arc<dyn LoginNavigator>,
    ) -> ClientSessionBuilder {
        ClientSessionBuilder {
            config,
            transport,
            store,
            clock,
            navigator,
            bridge: None,
        }
    }

    /// Configuration this session was built with.
    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// The session context.
    #[must_use]
    pub const fn context(&self) -> &Arc<SessionContext> {
        &self.session
    }

    /// The authenticated gateway.
    #[must_use]
    pub const fn gateway(&self) -> &Arc<AuthenticatedGateway> {
        &self.gateway
    }

    /// The notification hub.
    #[must_use]
    pub const fn hub(&self) -> &NotificationHub {
        &self.hub
    }

    /// Whether a refresh credential is stored.
    #[must_use]
    pub fn has_refresh_token(&self) -> bool {
        self.credentials.load().is_some()
    }

    /// Announces readiness to the host shell.
    pub fn announce_ready(&self) {
        self.post(&OutboundMessage::WebviewReady);
    }

    /// Re-establishes an access token from a stored refresh credential.
    ///
    /// Does nothing when no credential is stored.
    ///
    /// # Errors
    ///
    /// Returns the refresh failure; the session has then been ended.
    pub async fn restore(&self) -> GatewayResult<bool> {
        if !self.has_refresh_token() {
            return Ok(false);
        }
        self.gateway.refresh_now().await?;
        Ok(true)
    }

    /// Records a token pair obtained by logging in.
    ///
    /// # Errors
    ///
    /// Returns an error if the refresh credential cannot be stored.
    pub fn establish(&self, pair: TokenPair) -> Result<(), StoreError> {
        let TokenPair {
            access_token,
            refresh_token,
        } = pair;
        self.credentials.save(&refresh_token)?;
        self.session.set_access_token(Some(access_token));
        self.post(&OutboundMessage::TokenUpdate {
            token: refresh_token.into_inner(),
        });
        tracing::info!("session established");
        Ok(())
    }

    /// Ends the session: forgets both tokens and tells the host.
    ///
    /// # Errors
    ///
    /// Returns an error if the refresh credential cannot be deleted. The
    /// access token is cleared regardless.
    pub fn logout(&self) -> Result<(), StoreError> {
        self.session.clear();
        self.post(&OutboundMessage::Logout);
        tracing::info!("session ended by logout");
        self.credentials.forget()
    }

    /// Applies a message from the host shell.
    ///
    /// `AUTO_LOGIN` stores the host's credential as the refresh token and
    /// drops any access token, so the next request re-establishes one.
    ///
    /// # Errors
    ///
    /// Returns an error if the credential cannot be stored.
    pub fn handle_inbound(&self, message: InboundMessage) -> Result<(), StoreError> {
        match message {
            InboundMessage::AutoLogin { token } => {
                let Ok(token) = RefreshToken::new(token) else {
                    tracing::warn!("ignoring AUTO_LOGIN with empty token");
                    return Ok(());
                };
                self.credentials.save(&token)?;
                self.session.clear();
                tracing::info!(refresh_token = %token.preview(), "auto login credential received");
                Ok(())
            }
        }
    }

    fn post(&self, message: &OutboundMessage) {
        if let Some(bridge) = &self.bridge {
            bridge.post(message);
        }
    }
}
