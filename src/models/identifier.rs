use std::collections::BTreeMap;
use std::fmt;

use serde_json::{Map, Value as JsonValue};

use crate::error::{CableError, Result};

/// Channel parameters, ordered so serialization is canonical.
pub type ChannelParams = BTreeMap<String, JsonValue>;

/// Reserved parameter key; the channel name itself travels under it.
const CHANNEL_KEY: &str = "channel";

/// A channel name plus its parameter set.
///
/// The canonical JSON form `{"channel": <name>, ...params}` (keys sorted) is
/// both the wire identifier sent to the server and the registry key on the
/// client side. Determinism is the point: two parameter sets with the same
/// entries always produce the same key, so they address the same logical
/// subscription regardless of how the caller assembled them.
///
/// # Example
///
/// ```rust
/// use reink_cable::{ChannelIdentifier, ChannelParams};
///
/// let mut params = ChannelParams::new();
/// params.insert("room_id".to_string(), serde_json::json!(7));
/// let identifier = ChannelIdentifier::with_params("ChatChannel", params).unwrap();
/// assert_eq!(identifier.key(), r#"{"channel":"ChatChannel","room_id":7}"#);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelIdentifier {
    channel: String,
    params: ChannelParams,
}

impl ChannelIdentifier {
    /// Identifier for a channel without parameters.
    pub fn new(channel: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            params: ChannelParams::new(),
        }
    }

    /// Identifier for a channel with parameters.
    ///
    /// Rejects the reserved `"channel"` parameter key, which would collide
    /// with the channel name in the wire form.
    pub fn with_params(channel: impl Into<String>, params: ChannelParams) -> Result<Self> {
        if params.contains_key(CHANNEL_KEY) {
            return Err(CableError::ConfigurationError(format!(
                "'{CHANNEL_KEY}' is a reserved parameter key"
            )));
        }
        Ok(Self {
            channel: channel.into(),
            params,
        })
    }

    /// Parse a wire identifier string back into its parts.
    ///
    /// Used to match inbound frames against the registry even if the server
    /// re-serialized the identifier with a different key order.
    pub fn from_wire(raw: &str) -> Result<Self> {
        let mut object: Map<String, JsonValue> = serde_json::from_str(raw)?;
        let channel = match object.remove(CHANNEL_KEY) {
            Some(JsonValue::String(name)) => name,
            _ => {
                return Err(CableError::SerializationError(format!(
                    "identifier has no string '{CHANNEL_KEY}' field: {raw}"
                )))
            }
        };
        Ok(Self {
            channel,
            params: object.into_iter().collect(),
        })
    }

    /// The channel name.
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// The parameter set.
    pub fn params(&self) -> &ChannelParams {
        &self.params
    }

    /// Canonical JSON form: wire identifier and registry key.
    pub fn key(&self) -> String {
        let mut object = Map::new();
        object.insert(CHANNEL_KEY.to_string(), JsonValue::String(self.channel.clone()));
        for (name, value) in &self.params {
            object.insert(name.clone(), value.clone());
        }
        JsonValue::Object(object).to_string()
    }
}

impl fmt::Display for ChannelIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

/// Handle returned by a successful subscribe call.
///
/// Carries the identifier needed to unsubscribe later; dropping the handle
/// does not unsubscribe.
#[derive(Debug, Clone)]
pub struct ChannelSubscription {
    identifier: ChannelIdentifier,
}

impl ChannelSubscription {
    pub(crate) fn new(identifier: ChannelIdentifier) -> Self {
        Self { identifier }
    }

    /// The identifier this subscription was registered under.
    pub fn identifier(&self) -> &ChannelIdentifier {
        &self.identifier
    }

    /// The registry key this subscription was registered under.
    pub fn key(&self) -> String {
        self.identifier.key()
    }
}
