//! Socket.IO client connection feeding the notification hub.
//!
//! The channel connects as soon as it is created and keeps reconnecting
//! with jittered exponential backoff until it is shut down, the server
//! ends the namespace session, or the server refuses the namespace
//! connect. Events that arrive while disconnected are lost.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use pickup_application::{NotificationHub, SessionContext};
use pickup_domain::{ClientConfig, ConnectionState, RealtimeSettings};
use rand::Rng;
use serde_json::{Value, json};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::{self, Message};
use url::Url;

use super::packet::{
    DEFAULT_NAMESPACE, EnginePacket, PacketError, SocketPacket, connect_error_message,
};

/// Errors from the realtime channel.
#[derive(Debug, thiserror::Error)]
pub enum RealtimeError {
    /// Endpoint cannot be used.
    #[error("invalid realtime URL: {0}")]
    InvalidUrl(String),

    /// WebSocket transport failure.
    #[error("WebSocket error: {0}")]
    WebSocket(Box<tungstenite::Error>),

    /// Connect or handshake took too long.
    #[error("handshake timed out after {0:?}")]
    Timeout(Duration),

    /// The server spoke something other than Engine.IO v4.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The server refused the namespace connect.
    #[error("connection rejected: {0}")]
    Rejected(String),
}

impl From<tungstenite::Error> for RealtimeError {
    fn from(error: tungstenite::Error) -> Self {
        Self::WebSocket(Box::new(error))
    }
}

impl From<PacketError> for RealtimeError {
    fn from(error: PacketError) -> Self {
        Self::Protocol(error.to_string())
    }
}

/// WebSocket URL and namespace for a configured endpoint.
///
/// The endpoint's path names the namespace, as with Socket.IO clients;
/// the Engine.IO path is always `/socket.io/`.
///
/// # Errors
///
/// Returns an error for schemes other than http(s) and ws(s).
pub fn socket_target(endpoint: &Url) -> Result<(Url, String), RealtimeError> {
    let scheme = match endpoint.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => {
            return Err(RealtimeError::InvalidUrl(format!(
                "unsupported scheme '{other}': {endpoint}"
            )));
        }
    };

    let namespace = match endpoint.path().trim_end_matches('/') {
        "" => DEFAULT_NAMESPACE.to_string(),
        path => path.to_string(),
    };

    let mut url = endpoint.clone();
    url.set_scheme(scheme)
        .map_err(|()| RealtimeError::InvalidUrl(endpoint.to_string()))?;
    url.set_path("/socket.io/");
    url.query_pairs_mut()
        .append_pair("EIO", "4")
        .append_pair("transport", "websocket");
    Ok((url, namespace))
}

/// Handle to a running realtime connection.
pub struct RealtimeChannel {
    state: watch::Receiver<ConnectionState>,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl RealtimeChannel {
    /// Starts connecting to the configured endpoint.
    ///
    /// The access token current at each (re)connect is sent as the
    /// namespace auth payload. Must be called inside a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint is invalid.
    pub fn connect(
        config: &ClientConfig,
        session: Arc<SessionContext>,
        hub: NotificationHub,
    ) -> Result<Self, RealtimeError> {
        let endpoint = config
            .realtime_endpoint()
            .map_err(|e| RealtimeError::InvalidUrl(e.to_string()))?;
        let (url, namespace) = socket_target(&endpoint)?;

        let (state_tx, state_rx) = watch::channel(ConnectionState::Connecting);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let worker = Worker {
            url,
            namespace,
            settings: config.realtime.clone(),
            session,
            hub,
            state: state_tx,
        };
        let task = tokio::spawn(worker.run(shutdown_rx));

        Ok(Self {
            state: state_rx,
            shutdown: shutdown_tx,
            task,
        })
    }

    /// Current connection state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Receiver observing every state change.
    #[must_use]
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    /// Closes the connection and waits for the background task to end.
    pub async fn shutdown(self) {
        self.shutdown.send_replace(true);
        if let Err(error) = self.task.await {
            tracing::warn!(%error, "realtime task ended abnormally");
        }
    }
}

/// How a connection that did not fail ended.
enum Outcome {
    /// Dropped or timed out; worth reconnecting.
    Lost(&'static str),
    /// The server ended the namespace session.
    ServerDisconnect,
}

struct Worker {
    url: Url,
    namespace: String,
    settings: RealtimeSettings,
    session: Arc<SessionContext>,
    hub: NotificationHub,
    state: watch::Sender<ConnectionState>,
}

impl Worker {
    async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut failures = 0_u32;

        loop {
            let outcome = tokio::select! {
                outcome = self.connection(&mut failures) => outcome,
                _ = shutdown.changed() => break,
            };

            match outcome {
                Ok(Outcome::ServerDisconnect) => {
                    tracing::info!(
                        namespace = %self.namespace,
                        "server ended the realtime session"
                    );
                    break;
                }
                Err(RealtimeError::Rejected(reason)) => {
                    tracing::warn!(%reason, "realtime connection rejected");
                    self.set_state(ConnectionState::Failed);
                    return;
                }
                Ok(Outcome::Lost(reason)) => tracing::warn!(reason, "realtime connection lost"),
                Err(error) => tracing::warn!(%error, "realtime connection failed"),
            }

            failures = failures.saturating_add(1);
            let max = self.settings.max_reconnect_attempts;
            if !self.settings.auto_reconnect || (max > 0 && failures >= max) {
                self.set_state(ConnectionState::Failed);
                return;
            }

            self.set_state(ConnectionState::Reconnecting);
            let delay = jittered(self.settings.reconnect_delay(failures));
            tracing::debug!(attempt = failures, ?delay, "reconnecting");
            tokio::select! {
                () = tokio::time::sleep(delay) => {}
                _ = shutdown.changed() => break,
            }
        }

        self.set_state(ConnectionState::Closed);
    }

    fn set_state(&self, state: ConnectionState) {
        let previous = self.state.send_replace(state);
        if previous != state {
            tracing::debug!(from = previous.as_str(), to = state.as_str(), "realtime state");
        }
    }

    async fn connection(&self, failures: &mut u32) -> Result<Outcome, RealtimeError> {
        let timeout = self.settings.connect_timeout();
        let (stream, _) =
            tokio::time::timeout(timeout, tokio_tungstenite::connect_async(self.url.as_str()))
                .await
                .map_err(|_| RealtimeError::Timeout(timeout))??;
        let (mut sink, mut source) = stream.split();

        let frame = tokio::time::timeout(timeout, source.next())
            .await
            .map_err(|_| RealtimeError::Timeout(timeout))?;
        let handshake = match frame {
            Some(Ok(Message::Text(text))) => match EnginePacket::decode(&text)? {
                EnginePacket::Open(handshake) => handshake,
                other => {
                    return Err(RealtimeError::Protocol(format!(
                        "expected open packet, got {other:?}"
                    )));
                }
            },
            Some(Ok(other)) => {
                return Err(RealtimeError::Protocol(format!(
                    "unexpected frame before handshake: {other:?}"
                )));
            }
            Some(Err(error)) => return Err(error.into()),
            None => return Ok(Outcome::Lost("closed during handshake")),
        };
        tracing::debug!(
            sid = %handshake.sid,
            ping_interval = handshake.ping_interval,
            "engine session opened"
        );

        let auth = self
            .session
            .access_token()
            .map(|token| json!({ "token": token.as_str() }));
        let connect = SocketPacket::Connect {
            namespace: self.namespace.clone(),
            payload: auth,
        };
        sink.send(Message::Text(connect.into_engine().encode()))
            .await?;

        let liveness =
            Duration::from_millis(handshake.ping_interval.saturating_add(handshake.ping_timeout));
        loop {
            let frame = match tokio::time::timeout(liveness, source.next()).await {
                Err(_) => return Ok(Outcome::Lost("ping timeout")),
                Ok(None) => return Ok(Outcome::Lost("transport closed")),
                Ok(Some(frame)) => frame?,
            };
            let text = match frame {
                Message::Text(text) => text,
                Message::Close(_) => return Ok(Outcome::Lost("transport closed")),
                _ => continue,
            };

            let packet = match EnginePacket::decode(&text) {
                Ok(packet) => packet,
                Err(error) => {
                    tracing::warn!(%error, "dropping realtime frame");
                    continue;
                }
            };
            match packet {
                EnginePacket::Ping(data) => {
                    sink.send(Message::Text(EnginePacket::Pong(data).encode()))
                        .await?;
                }
                EnginePacket::Close => return Ok(Outcome::Lost("server closed the transport")),
                EnginePacket::Message(data) => {
                    if let Some(outcome) = self.on_socket_packet(&data, failures)? {
                        return Ok(outcome);
                    }
                }
                EnginePacket::Open(_)
                | EnginePacket::Pong(_)
                | EnginePacket::Upgrade
                | EnginePacket::Noop => {}
            }
        }
    }

    fn on_socket_packet(
        &self,
        data: &str,
        failures: &mut u32,
    ) -> Result<Option<Outcome>, RealtimeError> {
        let packet = match SocketPacket::decode(data) {
            Ok(packet) => packet,
            Err(error) => {
                tracing::warn!(%error, "dropping realtime packet");
                return Ok(None);
            }
        };

        match packet {
            SocketPacket::Connect { namespace, .. } if namespace == self.namespace => {
                *failures = 0;
                self.set_state(ConnectionState::Connected);
                tracing::info!(%namespace, "realtime channel connected");
            }
            SocketPacket::ConnectError { payload, .. } => {
                return Err(RealtimeError::Rejected(connect_error_message(
                    payload.as_ref(),
                )));
            }
            SocketPacket::Disconnect { namespace } if namespace == self.namespace => {
                return Ok(Some(Outcome::ServerDisconnect));
            }
            SocketPacket::Event {
                namespace,
                name,
                args,
                ..
            } if namespace == self.namespace => {
                let payload = args.into_iter().next().unwrap_or(Value::Null);
                let delivered = self.hub.dispatch(&name, payload);
                tracing::debug!(event = %name, delivered, "realtime event");
            }
            _ => {}
        }
        Ok(None)
    }
}

/// Randomises `delay` by up to half in either direction.
fn jittered(delay: Duration) -> Duration {
    delay.mul_f64(rand::rng().random_range(0.5..=1.5))
}
