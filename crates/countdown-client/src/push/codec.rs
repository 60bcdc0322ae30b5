//! Engine.IO v4 / Socket.IO v5 text framing.
//!
//! Every websocket text frame is one Engine.IO packet: a single digit type
//! followed by its payload. Socket.IO packets travel inside Engine.IO
//! `message` packets, so an event looks like `42["timer_update",{...}]`.
//! Binary attachments are not used by the timer service and are rejected.

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("empty packet")]
    Empty,

    #[error("unknown packet type '{0}'")]
    UnknownType(char),

    #[error("invalid packet payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error("malformed event: {0}")]
    MalformedEvent(String),

    #[error("binary packets are not supported")]
    Binary,
}

pub type Result<T> = std::result::Result<T, CodecError>;

/// Handshake data from the Engine.IO `open` packet.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenInfo {
    pub sid: String,
    #[serde(default)]
    pub upgrades: Vec<String>,
    #[serde(default)]
    pub ping_interval: u64,
    #[serde(default)]
    pub ping_timeout: u64,
    #[serde(default)]
    pub max_payload: Option<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EnginePacket {
    Open(OpenInfo),
    Close,
    Ping(String),
    Pong(String),
    Message(String),
    Upgrade,
    Noop,
}

impl EnginePacket {
    pub fn encode(&self) -> String {
        match self {
            EnginePacket::Open(info) => format!(
                "0{}",
                serde_json::json!({
                    "sid": info.sid,
                    "upgrades": info.upgrades,
                    "pingInterval": info.ping_interval,
                    "pingTimeout": info.ping_timeout,
                })
            ),
            EnginePacket::Close => "1".to_string(),
            EnginePacket::Ping(data) => format!("2{}", data),
            EnginePacket::Pong(data) => format!("3{}", data),
            EnginePacket::Message(data) => format!("4{}", data),
            EnginePacket::Upgrade => "5".to_string(),
            EnginePacket::Noop => "6".to_string(),
        }
    }

    pub fn decode(frame: &str) -> Result<Self> {
        let mut chars = frame.chars();
        let kind = chars.next().ok_or(CodecError::Empty)?;
        let data = chars.as_str();

        Ok(match kind {
            '0' => EnginePacket::Open(serde_json::from_str(data)?),
            '1' => EnginePacket::Close,
            '2' => EnginePacket::Ping(data.to_string()),
            '3' => EnginePacket::Pong(data.to_string()),
            '4' => EnginePacket::Message(data.to_string()),
            '5' => EnginePacket::Upgrade,
            '6' => EnginePacket::Noop,
            other => return Err(CodecError::UnknownType(other)),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SocketPacket {
    /// Client: namespace connect request. Server: connect ack with `{sid}`.
    Connect(Option<Value>),
    Disconnect,
    Event {
        name: String,
        args: Vec<Value>,
        ack_id: Option<u64>,
    },
    Ack {
        ack_id: u64,
        args: Vec<Value>,
    },
    ConnectError(Value),
}

impl SocketPacket {
    pub fn event(name: impl Into<String>, payload: Value) -> Self {
        SocketPacket::Event {
            name: name.into(),
            args: vec![payload],
            ack_id: None,
        }
    }

    /// Encode for the default namespace.
    pub fn encode(&self) -> String {
        match self {
            SocketPacket::Connect(None) => "0".to_string(),
            SocketPacket::Connect(Some(auth)) => format!("0{}", auth),
            SocketPacket::Disconnect => "1".to_string(),
            SocketPacket::Event { name, args, ack_id } => {
                let mut items = Vec::with_capacity(args.len() + 1);
                items.push(Value::String(name.clone()));
                items.extend(args.iter().cloned());
                let ack = ack_id.map(|id| id.to_string()).unwrap_or_default();
                format!("2{}{}", ack, Value::Array(items))
            }
            SocketPacket::Ack { ack_id, args } => {
                format!("3{}{}", ack_id, Value::Array(args.clone()))
            }
            SocketPacket::ConnectError(data) => format!("4{}", data),
        }
    }

    /// Decode a Socket.IO packet. A namespace prefix is accepted and dropped.
    pub fn decode(data: &str) -> Result<Self> {
        let mut chars = data.chars();
        let kind = chars.next().ok_or(CodecError::Empty)?;
        let rest = strip_namespace(chars.as_str());

        match kind {
            '0' => Ok(SocketPacket::Connect(parse_optional(rest)?)),
            '1' => Ok(SocketPacket::Disconnect),
            '2' => {
                let (ack_id, body) = split_ack_id(rest);
                let mut items = match serde_json::from_str::<Value>(body)? {
                    Value::Array(items) => items,
                    other => return Err(CodecError::MalformedEvent(other.to_string())),
                };
                if items.is_empty() {
                    return Err(CodecError::MalformedEvent("missing event name".to_string()));
                }
                let name = match items.remove(0) {
                    Value::String(name) => name,
                    other => return Err(CodecError::MalformedEvent(other.to_string())),
                };
                Ok(SocketPacket::Event {
                    name,
                    args: items,
                    ack_id,
                })
            }
            '3' => {
                let (ack_id, body) = split_ack_id(rest);
                let ack_id = ack_id
                    .ok_or_else(|| CodecError::MalformedEvent("ack without id".to_string()))?;
                let args = match serde_json::from_str::<Value>(body)? {
                    Value::Array(args) => args,
                    other => vec![other],
                };
                Ok(SocketPacket::Ack { ack_id, args })
            }
            '4' => Ok(SocketPacket::ConnectError(
                parse_optional(rest)?.unwrap_or(Value::Null),
            )),
            '5' | '6' => Err(CodecError::Binary),
            other => Err(CodecError::UnknownType(other)),
        }
    }
}

/// Wrap a Socket.IO packet in an Engine.IO message frame.
pub fn encode_message(packet: &SocketPacket) -> String {
    EnginePacket::Message(packet.encode()).encode()
}

/// Human-readable reason from a `connect_error` payload.
pub fn connect_error_message(data: &Value) -> String {
    data.get("message")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| data.to_string())
}

fn strip_namespace(data: &str) -> &str {
    if data.starts_with('/') {
        match data.find(',') {
            Some(idx) => &data[idx + 1..],
            None => "",
        }
    } else {
        data
    }
}

fn split_ack_id(data: &str) -> (Option<u64>, &str) {
    let digits = data.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return (None, data);
    }
    (data[..digits].parse().ok(), &data[digits..])
}

fn parse_optional(data: &str) -> Result<Option<Value>> {
    if data.is_empty() {
        Ok(None)
    } else {
        Ok(Some(serde_json::from_str(data)?))
    }
}
