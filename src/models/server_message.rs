use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Typed server-to-client frames, discriminated by the `type` field.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProtocolFrame {
    /// Handshake frame. The server sends this once after accepting the
    /// connection; it never arrives when the credentials were rejected.
    Welcome,

    /// Server heartbeat, sent every few seconds. The payload is an epoch
    /// timestamp but is not interpreted; receipt alone refreshes the
    /// staleness deadline.
    Ping {
        /// Epoch seconds at the server, if present.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<JsonValue>,
    },

    /// The subscription for `identifier` is registered and live.
    ConfirmSubscription {
        /// Canonical channel identifier JSON, as a string.
        identifier: String,
    },

    /// The server refused the subscription for `identifier`.
    RejectSubscription {
        /// Canonical channel identifier JSON, as a string.
        identifier: String,
    },

    /// The server is closing the connection.
    Disconnect {
        /// Why the server is disconnecting (e.g. "unauthorized").
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
        /// Whether the client is allowed to reconnect. Absent means yes.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reconnect: Option<bool>,
    },
}

/// Any frame the server sends.
///
/// Broadcasts carry no `type` tag, only `{identifier, message}`, so the
/// typed frames are tried first and everything else that fits the broadcast
/// shape is routed as channel traffic.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ServerMessage {
    /// A typed protocol frame.
    Protocol(ProtocolFrame),

    /// A channel broadcast.
    Broadcast {
        /// Canonical identifier of the subscription this payload belongs to.
        identifier: String,
        /// The broadcast payload.
        message: JsonValue,
    },
}

impl ServerMessage {
    /// Parse a raw text frame.
    pub fn parse(raw: &str) -> crate::error::Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }
}
