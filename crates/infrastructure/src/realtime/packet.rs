//! Engine.IO v4 and Socket.IO v5 text packet codec.
//!
//! Every WebSocket text frame is one Engine.IO packet: a type digit
//! followed by its data. Socket.IO packets travel inside Engine.IO
//! `message` packets as `<type>[<namespace>,][<ack id>][<json>]`, where
//! the default namespace `/` is omitted.

use serde::Deserialize;
use serde_json::Value;

/// Default Socket.IO namespace.
pub const DEFAULT_NAMESPACE: &str = "/";

/// Errors from decoding a frame.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PacketError {
    /// Frame was empty.
    #[error("empty packet")]
    Empty,

    /// Unknown packet type digit.
    #[error("unknown packet type '{0}'")]
    UnknownType(char),

    /// Binary packets need attachments this client does not read.
    #[error("binary packets are not supported")]
    Binary,

    /// Payload was not the JSON the packet type requires.
    #[error("malformed payload: {0}")]
    Payload(String),
}

/// Handshake data carried by the Engine.IO `open` packet.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenHandshake {
    /// Engine.IO session id.
    pub sid: String,
    /// Transports the server offers to upgrade to.
    #[serde(default)]
    pub upgrades: Vec<String>,
    /// Milliseconds between server pings.
    pub ping_interval: u64,
    /// Milliseconds the server waits for a pong.
    pub ping_timeout: u64,
    /// Largest accepted payload in bytes.
    #[serde(default)]
    pub max_payload: Option<u64>,
}

/// An Engine.IO packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnginePacket {
    /// `0`: session opened.
    Open(OpenHandshake),
    /// `1`: transport closing.
    Close,
    /// `2`: heartbeat from the server.
    Ping(String),
    /// `3`: heartbeat answer.
    Pong(String),
    /// `4`: carries a Socket.IO packet.
    Message(String),
    /// `5`: transport upgrade.
    Upgrade,
    /// `6`: no-op.
    Noop,
}

impl EnginePacket {
    /// Decodes one text frame.
    ///
    /// # Errors
    ///
    /// Returns an error for empty frames, unknown types and malformed
    /// handshakes.
    pub fn decode(frame: &str) -> Result<Self, PacketError> {
        let mut chars = frame.chars();
        let kind = chars.next().ok_or(PacketError::Empty)?;
        let data = chars.as_str();

        match kind {
            '0' => serde_json::from_str(data)
                .map(Self::Open)
                .map_err(|e| PacketError::Payload(e.to_string())),
            '1' => Ok(Self::Close),
            '2' => Ok(Self::Ping(data.to_string())),
            '3' => Ok(Self::Pong(data.to_string())),
            '4' => Ok(Self::Message(data.to_string())),
            '5' => Ok(Self::Upgrade),
            '6' => Ok(Self::Noop),
            other => Err(PacketError::UnknownType(other)),
        }
    }

    /// Encodes a client-originated packet. The handshake is server-only
    /// and encodes as a bare `0`.
    #[must_use]
    pub fn encode(&self) -> String {
        match self {
            Self::Open(_) => "0".to_string(),
            Self::Close => "1".to_string(),
            Self::Ping(data) => format!("2{data}"),
            Self::Pong(data) => format!("3{data}"),
            Self::Message(data) => format!("4{data}"),
            Self::Upgrade => "5".to_string(),
            Self::Noop => "6".to_string(),
        }
    }
}

/// A Socket.IO packet.
#[derive(Debug, Clone, PartialEq)]
pub enum SocketPacket {
    /// `0`: namespace connect. Client side carries the auth payload, server
    /// side the socket id.
    Connect {
        /// Namespace.
        namespace: String,
        /// Auth (client) or `{ "sid": ... }` (server).
        payload: Option<Value>,
    },
    /// `1`: namespace disconnect.
    Disconnect {
        /// Namespace.
        namespace: String,
    },
    /// `2`: event.
    Event {
        /// Namespace.
        namespace: String,
        /// Acknowledgement id requested by the sender.
        ack_id: Option<u64>,
        /// Event name.
        name: String,
        /// Event arguments.
        args: Vec<Value>,
    },
    /// `3`: acknowledgement.
    Ack {
        /// Namespace.
        namespace: String,
        /// Id being acknowledged.
        ack_id: u64,
        /// Acknowledgement arguments.
        args: Vec<Value>,
    },
    /// `4`: namespace connect refused.
    ConnectError {
        /// Namespace.
        namespace: String,
        /// Error details, usually `{ "message": ... }`.
        payload: Option<Value>,
    },
}

impl SocketPacket {
    /// Connect to the default namespace with an optional auth payload.
    #[must_use]
    pub fn connect(auth: Option<Value>) -> Self {
        Self::Connect {
            namespace: DEFAULT_NAMESPACE.to_string(),
            payload: auth,
        }
    }

    /// Decodes the data of an Engine.IO `message` packet.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown or binary types and malformed JSON.
    pub fn decode(data: &str) -> Result<Self, PacketError> {
        let mut chars = data.chars();
        let kind = chars.next().ok_or(PacketError::Empty)?;
        if matches!(kind, '5' | '6') {
            return Err(PacketError::Binary);
        }
        let rest = chars.as_str();

        let (namespace, rest) = match rest.strip_prefix('/') {
            Some(_) => match rest.find(',') {
                Some(comma) => (&rest[..comma], &rest[comma + 1..]),
                None => (rest, ""),
            },
            None => (DEFAULT_NAMESPACE, rest),
        };
        let namespace = namespace.to_string();

        let digits = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
        let ack_id = if digits == 0 {
            None
        } else {
            Some(
                rest[..digits]
                    .parse::<u64>()
                    .map_err(|e| PacketError::Payload(e.to_string()))?,
            )
        };

        let json = &rest[digits..];
        let payload = if json.is_empty() {
            None
        } else {
            Some(
                serde_json::from_str::<Value>(json)
                    .map_err(|e| PacketError::Payload(e.to_string()))?,
            )
        };

        match kind {
            '0' => Ok(Self::Connect { namespace, payload }),
            '1' => Ok(Self::Disconnect { namespace }),
            '2' => {
                let mut args = expect_array(payload)?;
                if args.is_empty() {
                    return Err(PacketError::Payload("event without a name".to_string()));
                }
                let Value::String(name) = args.remove(0) else {
                    return Err(PacketError::Payload("event name is not a string".to_string()));
                };
                Ok(Self::Event {
                    namespace,
                    ack_id,
                    name,
                    args,
                })
            }
            '3' => Ok(Self::Ack {
                namespace,
                ack_id: ack_id
                    .ok_or_else(|| PacketError::Payload("ack without an id".to_string()))?,
                args: expect_array(payload)?,
            }),
            '4' => Ok(Self::ConnectError { namespace, payload }),
            other => Err(PacketError::UnknownType(other)),
        }
    }

    /// Encodes as the data of an Engine.IO `message` packet.
    #[must_use]
    pub fn encode(&self) -> String {
        match self {
            Self::Connect { namespace, payload } => {
                format!("0{}{}", namespace_prefix(namespace), json_or_empty(payload.as_ref()))
            }
            Self::Disconnect { namespace } => format!("1{}", namespace_prefix(namespace)),
            Self::Event {
                namespace,
                ack_id,
                name,
                args,
            } => {
                let mut items = Vec::with_capacity(args.len() + 1);
                items.push(Value::String(name.clone()));
                items.extend(args.iter().cloned());
                format!(
                    "2{}{}{}",
                    namespace_prefix(namespace),
                    ack_id.map(|id| id.to_string()).unwrap_or_default(),
                    Value::Array(items)
                )
            }
            Self::Ack {
                namespace,
                ack_id,
                args,
            } => format!(
                "3{}{ack_id}{}",
                namespace_prefix(namespace),
                Value::Array(args.clone())
            ),
            Self::ConnectError { namespace, payload } => {
                format!("4{}{}", namespace_prefix(namespace), json_or_empty(payload.as_ref()))
            }
        }
    }

    /// Wraps this packet in an Engine.IO `message` packet.
    #[must_use]
    pub fn into_engine(self) -> EnginePacket {
        EnginePacket::Message(self.encode())
    }
}

fn expect_array(payload: Option<Value>) -> Result<Vec<Value>, PacketError> {
    match payload {
        Some(Value::Array(items)) => Ok(items),
        None => Ok(Vec::new()),
        Some(_) => Err(PacketError::Payload("expected a JSON array".to_string())),
    }
}

fn namespace_prefix(namespace: &str) -> String {
    if namespace == DEFAULT_NAMESPACE {
        String::new()
    } else {
        format!("{namespace},")
    }
}

fn json_or_empty(payload: Option<&Value>) -> String {
    payload.map(Value::to_string).unwrap_or_default()
}

/// Message carried by a `ConnectError`, if any.
#[must_use]
pub fn connect_error_message(payload: Option<&Value>) -> String {
    payload
        .and_then(|p| p.get("message"))
        .and_then(Value::as_str)
        .unwrap_or("connection refused")
        .to_string()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_decode_open_handshake() {
        let packet = EnginePacket::decode(
            r#"0{"sid":"lv_VI97HAXpY6yYWAAAC","upgrades":[],"pingInterval":25000,"pingTimeout":20000,"maxPayload":1000000}"#,
        )
        .unwrap();

        let EnginePacket::Open(handshake) = packet else {
            panic!("expected open");
        };
        assert_eq!(handshake.sid, "lv_VI97HAXpY6yYWAAAC");
        assert_eq!(handshake.ping_interval, 25_000);
        assert_eq!(handshake.ping_timeout, 20_000);
        assert_eq!(handshake.max_payload, Some(1_000_000));
    }

    #[test]
    fn test_engine_heartbeat() {
        assert_eq!(EnginePacket::decode("2").unwrap(), EnginePacket::Ping(String::new()));
        assert_eq!(EnginePacket::Pong(String::new()).encode(), "3");
        let ping = EnginePacket::decode("2upgrade").unwrap();
        assert_eq!(ping, EnginePacket::Ping("upgrade".to_string()));
    }

    #[test]
    fn test_engine_errors() {
        assert_eq!(EnginePacket::decode(""), Err(PacketError::Empty));
        assert_eq!(EnginePacket::decode("9"), Err(PacketError::UnknownType('9')));
        assert!(matches!(EnginePacket::decode("0{}"), Err(PacketError::Payload(_))));
    }

    #[test]
    fn test_decode_event_on_default_namespace() {
        let packet = SocketPacket::decode(r#"2["newOrder",{"orderId":42}]"#).unwrap();
        assert_eq!(
            packet,
            SocketPacket::Event {
                namespace: "/".to_string(),
                ack_id: None,
                name: "newOrder".to_string(),
                args: vec![json!({"orderId": 42})],
            }
        );
    }

    #[test]
    fn test_decode_event_with_namespace_and_ack() {
        let packet = SocketPacket::decode(r#"2/biz,12["orderUpdate",{"orderId":7},"x"]"#).unwrap();
        let SocketPacket::Event {
            namespace,
            ack_id,
            name,
            args,
        } = packet
        else {
            panic!("expected event");
        };
        assert_eq!(namespace, "/biz");
        assert_eq!(ack_id, Some(12));
        assert_eq!(name, "orderUpdate");
        assert_eq!(args.len(), 2);
    }

    #[test]
    fn test_connect_encoding() {
        assert_eq!(SocketPacket::connect(None).encode(), "0");
        assert_eq!(
            SocketPacket::connect(Some(json!({"token": "a1"})))
                .into_engine()
                .encode(),
            r#"40{"token":"a1"}"#
        );
        assert_eq!(
            SocketPacket::Connect {
                namespace: "/biz".to_string(),
                payload: None
            }
            .encode(),
            "0/biz,"
        );
    }

    #[test]
    fn test_decode_connect_ack_and_error() {
        assert_eq!(
            SocketPacket::decode(r#"0{"sid":"abc"}"#).unwrap(),
            SocketPacket::Connect {
                namespace: "/".to_string(),
                payload: Some(json!({"sid": "abc"})),
            }
        );

        let packet = SocketPacket::decode(r#"4{"message":"Not authorized"}"#).unwrap();
        let SocketPacket::ConnectError { payload, .. } = packet else {
            panic!("expected connect error");
        };
        assert_eq!(connect_error_message(payload.as_ref()), "Not authorized");
        assert_eq!(connect_error_message(None), "connection refused");
    }

    #[test]
    fn test_event_encoding_matches_wire_form() {
        let packet = SocketPacket::Event {
            namespace: "/".to_string(),
            ack_id: Some(3),
            name: "ping".to_string(),
            args: vec![json!(1)],
        };
        assert_eq!(packet.encode(), r#"23["ping",1]"#);
        assert_eq!(SocketPacket::decode(&packet.encode()).unwrap(), packet);
    }

    #[test]
    fn test_socket_errors() {
        let binary = r#"51-["x",{"_placeholder":true,"num":0}]"#;
        assert_eq!(SocketPacket::decode(binary), Err(PacketError::Binary));
        assert!(matches!(SocketPacket::decode("2{}"), Err(PacketError::Payload(_))));
        assert!(matches!(SocketPacket::decode("2[1]"), Err(PacketError::Payload(_))));
        assert!(matches!(SocketPacket::decode("2[]"), Err(PacketError::Payload(_))));
    }
}
