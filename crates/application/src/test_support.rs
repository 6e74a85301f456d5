//! Fakes shared by the unit tests of this crate.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use pickup_domain::{
    AccessToken, ApiRequest, ApiResponse, HttpMethod, OutboundMessage, REFRESH_TOKEN_COOKIE,
};
use serde_json::{Value, json};

use crate::auth::{
    AuthenticatedGateway, GatewaySettings, MemoryCredentialStore, RefreshCredentials,
    SessionContext,
};
use crate::ports::{
    ApiTransport, Clock, CookieScope, CredentialStore, HostBridge, LoginNavigator, TransportError,
};

pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn at_epoch() -> Self {
        Self {
            now: Mutex::new(Utc.with_ymd_and_hms(2026, 1, 1, 9, 0, 0).unwrap()),
        }
    }

    pub fn advance(&self, by: chrono::Duration) {
        let mut now = self.now.lock().unwrap();
        *now += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub method: HttpMethod,
    pub path: String,
    pub body: Option<Value>,
    pub headers: Vec<(String, String)>,
    pub token: Option<String>,
    pub retried: bool,
}

type Responder = dyn Fn(&RecordedCall) -> Result<ApiResponse, TransportError> + Send + Sync;

pub struct ScriptedTransport {
    responder: Box<Responder>,
    calls: Mutex<Vec<RecordedCall>>,
    delays: Vec<(String, Duration)>,
}

impl ScriptedTransport {
    pub fn new(
        responder: impl Fn(&RecordedCall) -> Result<ApiResponse, TransportError>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        Self {
            responder: Box::new(responder),
            calls: Mutex::new(Vec::new()),
            delays: Vec::new(),
        }
    }

    /// Protected resource that accepts only `valid_token`, plus a refresh
    /// endpoint answering with `refresh`.
    pub fn protected(
        valid_token: &'static str,
        refresh: impl Fn(&RecordedCall) -> Result<ApiResponse, TransportError> + Send + Sync + 'static,
    ) -> Self {
        Self::new(move |call| {
            if call.path == "/auth/refresh" {
                return refresh(call);
            }
            if call.token.as_deref() == Some(valid_token) {
                Ok(ApiResponse::json(200, &json!({"data": {"ok": true}})))
            } else {
                Ok(ApiResponse::json(401, &json!({"message": "unauthorized"})))
            }
        })
    }

    pub fn with_delay(mut self, path: &str, delay: Duration) -> Self {
        self.delays.push((path.to_string(), delay));
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, path: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.path == path)
            .count()
    }
}

#[async_trait]
impl ApiTransport for ScriptedTransport {
    async fn send(
        &self,
        request: &ApiRequest,
        access_token: Option<&AccessToken>,
    ) -> Result<ApiResponse, TransportError> {
        let call = RecordedCall {
            method: request.method,
            path: request.path.clone(),
            body: request.body.clone(),
            headers: request.headers.clone(),
            token: access_token.map(|t| t.as_str().to_string()),
            retried: request.retried,
        };
        self.calls.lock().unwrap().push(call.clone());

        let delay = self
            .delays
            .iter()
            .find(|(path, _)| *path == call.path)
            .map(|(_, d)| *d);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        (self.responder)(&call)
    }
}

pub fn refresh_ok(
    access: &'static str,
    refresh: &'static str,
) -> impl Fn(&RecordedCall) -> Result<ApiResponse, TransportError> + Send + Sync + 'static {
    move |_| {
        Ok(ApiResponse::json(
            200,
            &json!({"data": {"accessToken": access, "refreshToken": refresh}}),
        ))
    }
}

pub fn refresh_status(
    status: u16,
) -> impl Fn(&RecordedCall) -> Result<ApiResponse, TransportError> + Send + Sync + 'static {
    move |_| Ok(ApiResponse::json(status, &json!({"message": "invalid refresh token"})))
}

#[derive(Default)]
pub struct RecordingNavigator {
    redirects: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    pub fn redirects(&self) -> Vec<String> {
        self.redirects.lock().unwrap().clone()
    }
}

impl LoginNavigator for RecordingNavigator {
    fn redirect_to_login(&self, login_path: &str) {
        self.redirects.lock().unwrap().push(login_path.to_string());
    }
}

#[derive(Default)]
pub struct RecordingBridge {
    messages: Mutex<Vec<OutboundMessage>>,
}

impl RecordingBridge {
    pub fn messages(&self) -> Vec<OutboundMessage> {
        self.messages.lock().unwrap().clone()
    }
}

impl HostBridge for RecordingBridge {
    fn post(&self, message: &OutboundMessage) {
        self.messages.lock().unwrap().push(message.clone());
    }
}

pub struct Harness {
    pub gateway: Arc<AuthenticatedGateway>,
    pub transport: Arc<ScriptedTransport>,
    pub session: Arc<SessionContext>,
    pub store: Arc<MemoryCredentialStore>,
    pub clock: Arc<FixedClock>,
    pub navigator: Arc<RecordingNavigator>,
    pub bridge: Arc<RecordingBridge>,
    pub credentials: RefreshCredentials,
}

impl Harness {
    pub fn new(transport: ScriptedTransport) -> Self {
        Self::with_settings(transport, GatewaySettings::default())
    }

    pub fn with_settings(transport: ScriptedTransport, settings: GatewaySettings) -> Self {
        let transport = Arc::new(transport);
        let clock = Arc::new(FixedClock::at_epoch());
        let store = Arc::new(MemoryCredentialStore::new(
            CookieScope::new("shop.example.com", "/"),
            clock.clone(),
        ));
        let credentials =
            RefreshCredentials::new(store.clone(), clock.clone(), chrono::Duration::days(14));
        let session = Arc::new(SessionContext::new());
        let navigator = Arc::new(RecordingNavigator::default());
        let bridge = Arc::new(RecordingBridge::default());
        let gateway = Arc::new(
            AuthenticatedGateway::new(
                transport.clone(),
                session.clone(),
                credentials.clone(),
                navigator.clone(),
                settings,
            )
            .with_host_bridge(bridge.clone()),
        );
        Self {
            gateway,
            transport,
            session,
            store,
            clock,
            navigator,
            bridge,
            credentials,
        }
    }

    pub fn with_access_token(self, token: &str) -> Self {
        self.session
            .set_access_token(Some(AccessToken::new(token).unwrap()));
        self
    }

    pub fn with_refresh_token(self, token: &str) -> Self {
        self.store
            .set(
                REFRESH_TOKEN_COOKIE,
                token,
                self.clock.now() + chrono::Duration::days(14),
            )
            .unwrap();
        self
    }
}
