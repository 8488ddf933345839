//! Engine.IO v4 / Socket.IO v5 text framing over a websocket.
//!
//! Every websocket text frame is one Engine.IO packet: a single digit type
//! followed by the payload. Engine.IO `message` packets (type `4`) carry a
//! Socket.IO packet, itself a digit type, an optional `/namespace,`, an
//! optional ack id and a JSON payload. Binary attachments are not used.

use serde::Deserialize;
use serde_json::Value;

use crate::error::{LiveScoreError, Result};

/// Path appended to the socket URL to open a websocket-only Engine.IO session.
pub const ENGINE_IO_PATH: &str = "/socket.io/?EIO=4&transport=websocket";

/// Handshake data sent by the server in the Engine.IO `open` packet.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenInfo {
    pub sid: String,
    #[serde(default)]
    pub ping_interval: u64,
    #[serde(default)]
    pub ping_timeout: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Packet {
    Open(OpenInfo),
    Close,
    Ping,
    Pong,
    Noop,
    /// Socket.IO connect. Client side carries the auth object, server side the sid.
    Connect(Option<Value>),
    Disconnect,
    Event { name: String, data: Value },
    ConnectError(Value),
}

impl Packet {
    pub fn event(name: impl Into<String>, data: Value) -> Self {
        Packet::Event {
            name: name.into(),
            data,
        }
    }

    pub fn encode(&self) -> String {
        match self {
            Packet::Open(info) => format!(
                "0{}",
                serde_json::json!({
                    "sid": info.sid,
                    "pingInterval": info.ping_interval,
                    "pingTimeout": info.ping_timeout,
                })
            ),
            Packet::Close => "1".to_string(),
            Packet::Ping => "2".to_string(),
            Packet::Pong => "3".to_string(),
            Packet::Noop => "6".to_string(),
            Packet::Connect(None) => "40".to_string(),
            Packet::Connect(Some(auth)) => format!("40{auth}"),
            Packet::Disconnect => "41".to_string(),
            Packet::Event { name, data } => {
                let args = if data.is_null() {
                    Value::Array(vec![Value::String(name.clone())])
                } else {
                    Value::Array(vec![Value::String(name.clone()), data.clone()])
                };
                format!("42{args}")
            }
            Packet::ConnectError(data) => format!("44{data}"),
        }
    }

    pub fn decode(frame: &str) -> Result<Packet> {
        let mut chars = frame.chars();
        let kind = chars
            .next()
            .ok_or_else(|| LiveScoreError::Protocol("empty frame".to_string()))?;
        let rest = chars.as_str();
        match kind {
            '0' => serde_json::from_str(rest)
                .map(Packet::Open)
                .map_err(|e| LiveScoreError::Protocol(format!("bad open packet: {e}"))),
            '1' => Ok(Packet::Close),
            '2' => Ok(Packet::Ping),
            '3' => Ok(Packet::Pong),
            '4' => decode_socket_packet(rest),
            '6' => Ok(Packet::Noop),
            other => Err(LiveScoreError::Protocol(format!(
                "unsupported engine.io packet type '{other}'"
            ))),
        }
    }
}

fn decode_socket_packet(body: &str) -> Result<Packet> {
    let mut chars = body.chars();
    let kind = chars
        .next()
        .ok_or_else(|| LiveScoreError::Protocol("empty socket.io packet".to_string()))?;
    let mut rest = chars.as_str();

    // "/admin,..." namespaces; the default namespace is omitted on the wire.
    if rest.starts_with('/') {
        rest = rest.split_once(',').map(|(_, tail)| tail).unwrap_or("");
    }
    let rest = rest.trim_start_matches(|c: char| c.is_ascii_digit());
    let payload = if rest.is_empty() {
        None
    } else {
        Some(
            serde_json::from_str::<Value>(rest)
                .map_err(|e| LiveScoreError::Protocol(format!("bad socket.io payload: {e}")))?,
        )
    };

    match kind {
        '0' => Ok(Packet::Connect(payload)),
        '1' => Ok(Packet::Disconnect),
        '2' => {
            let Some(Value::Array(mut args)) = payload else {
                return Err(LiveScoreError::Protocol(
                    "event payload is not an array".to_string(),
                ));
            };
            if args.is_empty() {
                return Err(LiveScoreError::Protocol("event without a name".to_string()));
            }
            let name = match args.remove(0) {
                Value::String(name) => name,
                other => {
                    return Err(LiveScoreError::Protocol(format!(
                        "event name is not a string: {other}"
                    )))
                }
            };
            let data = args.into_iter().next().unwrap_or(Value::Null);
            Ok(Packet::Event { name, data })
        }
        '4' => Ok(Packet::ConnectError(payload.unwrap_or(Value::Null))),
        other => Err(LiveScoreError::Protocol(format!(
            "unsupported socket.io packet type '{other}'"
        ))),
    }
}
