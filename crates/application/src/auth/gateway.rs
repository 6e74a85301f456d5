//! Authenticated request gateway.
//!
//! Every request goes out with the current access token. A 401 on a
//! request that has not been retried triggers the refresh protocol:
//!
//! ```text
//! Initial ──401──▶ Refreshing ──ok──▶ Retrying ──2xx──▶ Completed
//!    │                 │                  │
//!    │                 └─no token/denied─▶ Failed (session ended, login redirect)
//!    └──other status──────────────────────┴──────────▶ Failed (surfaced unchanged)
//! ```
//!
//! Refreshes are single-flight per session: they serialise on one async
//! lock, and a request that finds the session epoch moved while it waited
//! reuses the outcome of the refresh that moved it instead of starting
//! another one.

use std::sync::Arc;

use pickup_domain::{
    ApiEnvelope, ApiRequest, ApiResponse, ClientConfig, Cookie, HttpMethod, OutboundMessage,
    REFRESH_TOKEN_COOKIE, RefreshMode, RefreshToken, TokenPair,
};
use serde::de::DeserializeOwned;
use serde_json::json;
use tokio::sync::Mutex;

use super::credentials::RefreshCredentials;
use super::session_context::SessionContext;
use crate::error::{GatewayError, GatewayResult};
use crate::ports::{ApiTransport, HostBridge, LoginNavigator};

/// Endpoints and refresh behaviour of the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewaySettings {
    /// Refresh endpoint path.
    pub refresh_path: String,
    /// Login entry point the user is redirected to.
    pub login_path: String,
    /// How the refresh credential is presented.
    pub refresh_mode: RefreshMode,
}

impl GatewaySettings {
    /// Extracts the gateway settings from a client configuration.
    #[must_use]
    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            refresh_path: config.refresh_path.clone(),
            login_path: config.login_path.clone(),
            refresh_mode: config.refresh_mode,
        }
    }
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self::from_config(&ClientConfig::default())
    }
}

/// Where a single request is in the refresh protocol.
#[derive(Debug)]
pub enum RequestPhase {
    /// About to send for the first time.
    Initial,
    /// Got a 401; recovering the session. `observed_epoch` is the session
    /// epoch the failed attempt was sent under.
    Refreshing {
        /// Session epoch at send time.
        observed_epoch: u64,
    },
    /// Resending once with the refreshed token.
    Retrying,
    /// Finished with a success response.
    Completed(ApiResponse),
    /// Finished with an error.
    Failed(GatewayError),
}

impl RequestPhase {
    /// Short name for logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Initial => "initial",
            Self::Refreshing { .. } => "refreshing",
            Self::Retrying => "retrying",
            Self::Completed(_) => "completed",
            Self::Failed(_) => "failed",
        }
    }
}

/// Sends API requests on behalf of the signed-in user.
pub struct AuthenticatedGateway {
    transport: Arc<dyn ApiTransport>,
    session: Arc<SessionContext>,
    credentials: RefreshCredentials,
    navigator: Arc<dyn LoginNavigator>,
    bridge: Option<Arc<dyn HostBridge>>,
    settings: GatewaySettings,
    refresh_gate: Mutex<()>,
}

impl AuthenticatedGateway {
    /// Creates a gateway.
    #[must_use]
    pub fn new(
        transport: Arc<dyn ApiTransport>,
        session: Arc<SessionContext>,
        credentials: RefreshCredentials,
        navigator: Arc<dyn LoginNavigator>,
        settings: GatewaySettings,
    ) -> Self {
        Self {
            transport,
            session,
            credentials,
            navigator,
            bridge: None,
            settings,
            refresh_gate: Mutex::new(()),
        }
    }

    /// Broadcast refreshes and forced logouts to a host shell.
    #[must_use]
    pub fn with_host_bridge(mut self, bridge: Arc<dyn HostBridge>) -> Self {
        self.bridge = Some(bridge);
        self
    }

    /// The session context this gateway reads and updates.
    #[must_use]
    pub const fn session(&self) -> &Arc<SessionContext> {
        &self.session
    }

    /// The refresh credential accessor.
    #[must_use]
    pub const fn credentials(&self) -> &RefreshCredentials {
        &self.credentials
    }

    /// Active settings.
    #[must_use]
    pub const fn settings(&self) -> &GatewaySettings {
        &self.settings
    }

    /// Sends `request`, recovering from one expired access token.
    ///
    /// # Errors
    ///
    /// - [`GatewayError::NoRefreshToken`] / [`GatewayError::RefreshDenied`]
    ///   when the session could not be recovered (the user has been
    ///   redirected to login)
    /// - [`GatewayError::Status`] for any other error status, including a
    ///   401 on the retried request
    /// - [`GatewayError::Transport`] when no response arrived
    pub async fn send(&self, request: ApiRequest) -> GatewayResult<ApiResponse> {
        let mut request = request;
        let mut phase = RequestPhase::Initial;

        loop {
            phase = match phase {
                RequestPhase::Initial | RequestPhase::Retrying => self.dispatch(&request).await,
                RequestPhase::Refreshing { observed_epoch } => {
                    match self.recover(observed_epoch).await {
                        Ok(()) => {
                            request.retried = true;
                            RequestPhase::Retrying
                        }
                        Err(error) => RequestPhase::Failed(error),
                    }
                }
                RequestPhase::Completed(response) => return Ok(response),
                RequestPhase::Failed(error) => return Err(error),
            };
            tracing::trace!(
                method = %request.method,
                path = %request.path,
                phase = phase.name(),
                "request phase"
            );
        }
    }

    /// Sends `request` and decodes the success body as `T`.
    ///
    /// # Errors
    ///
    /// Same as [`send`](Self::send), plus [`GatewayError::Decode`].
    pub async fn send_json<T: DeserializeOwned>(&self, request: ApiRequest) -> GatewayResult<T> {
        let response = self.send(request).await?;
        response
            .decode()
            .map_err(|e| GatewayError::Decode(e.to_string()))
    }

    /// Sends `request` and unwraps a `{ "data": T }` success body.
    ///
    /// # Errors
    ///
    /// Same as [`send_json`](Self::send_json).
    pub async fn send_data<T: DeserializeOwned>(&self, request: ApiRequest) -> GatewayResult<T> {
        let envelope: ApiEnvelope<T> = self.send_json(request).await?;
        Ok(envelope.data)
    }

    /// Exchanges the stored refresh token for a new pair right away.
    ///
    /// Used at startup, when the in-memory access token is gone but a
    /// refresh credential survived.
    ///
    /// # Errors
    ///
    /// Same failure handling as the refresh step of [`send`](Self::send).
    pub async fn refresh_now(&self) -> GatewayResult<()> {
        let observed_epoch = self.session.epoch();
        self.recover(observed_epoch).await
    }

    async fn dispatch(&self, request: &ApiRequest) -> RequestPhase {
        let snapshot = self.session.snapshot();
        let response = match self
            .transport
            .send(request, snapshot.access_token.as_ref())
            .await
        {
            Ok(response) => response,
            Err(error) => return RequestPhase::Failed(error.into()),
        };

        if response.is_success() {
            RequestPhase::Completed(response)
        } else if response.is_unauthorized() && !request.retried {
            tracing::debug!(path = %request.path, "access token rejected");
            RequestPhase::Refreshing {
                observed_epoch: snapshot.epoch,
            }
        } else {
            RequestPhase::Failed(GatewayError::Status {
                status: response.status,
                body: response.text(),
            })
        }
    }

    async fn recover(&self, observed_epoch: u64) -> GatewayResult<()> {
        let _gate = self.refresh_gate.lock().await;

        let current = self.session.snapshot();
        let stored = self.credentials.load();
        if current.epoch != observed_epoch {
            if current.is_authenticated() {
                tracing::debug!("access token already replaced, skipping refresh");
                return Ok(());
            }
            // a cleared token with a stored credential (auto login) is still recoverable
            if stored.is_none() {
                return Err(GatewayError::RefreshDenied {
                    status: None,
                    message: "session ended while waiting for refresh".to_string(),
                });
            }
        }

        let Some(refresh_token) = stored else {
            tracing::warn!("no refresh token stored, ending session");
            self.end_session();
            return Err(GatewayError::NoRefreshToken);
        };

        let pair = match self.exchange(&refresh_token).await {
            Ok(pair) => pair,
            Err(error @ GatewayError::Transport(_)) => {
                tracing::warn!(%error, "refresh endpoint unreachable, keeping credentials");
                return Err(error);
            }
            Err(error) => {
                tracing::warn!(%error, "refresh rejected, ending session");
                self.end_session();
                return Err(error);
            }
        };

        let TokenPair {
            access_token,
            refresh_token,
        } = pair;
        tracing::info!(access_token = %access_token.preview(), "access token refreshed");
        if let Err(error) = self.credentials.save(&refresh_token) {
            tracing::warn!(%error, "failed to persist refreshed credential");
        }
        self.session.set_access_token(Some(access_token));
        self.post(&OutboundMessage::TokenUpdate {
            token: refresh_token.into_inner(),
        });
        Ok(())
    }

    async fn exchange(&self, refresh_token: &RefreshToken) -> GatewayResult<TokenPair> {
        let path = self.settings.refresh_path.as_str();
        let request = match self.settings.refresh_mode {
            RefreshMode::Body => {
                ApiRequest::post(path, json!({ "refreshToken": refresh_token.as_str() }))
            }
            RefreshMode::Cookie => ApiRequest::new(HttpMethod::Post, path).with_header(
                "Cookie",
                Cookie::new(REFRESH_TOKEN_COOKIE, refresh_token.as_str()).to_cookie_header(),
            ),
        };

        let response = self.transport.send(&request, None).await?;
        if !response.is_success() {
            return Err(GatewayError::RefreshDenied {
                status: Some(response.status),
                message: response.text(),
            });
        }

        let envelope: ApiEnvelope<TokenPair> =
            response.decode().map_err(|e| GatewayError::RefreshDenied {
                status: Some(response.status),
                message: format!("malformed refresh response: {e}"),
            })?;
        Ok(envelope.data)
    }

    fn end_session(&self) {
        if let Err(error) = self.credentials.forget() {
            tracing::warn!(%error, "failed to delete refresh token");
        }
        self.session.clear();
        self.post(&OutboundMessage::Logout);
        self.navigator.redirect_to_login(&self.settings.login_path);
    }

    fn post(&self, message: &OutboundMessage) {
        if let Some(bridge) = &self.bridge {
            bridge.post(message);
        }
    }
}
