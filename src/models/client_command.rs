use serde::{Deserialize, Serialize};

/// Client-to-server command frames.
///
/// The cable protocol discriminates outbound frames on a `command` field and
/// addresses channels through an `identifier` string holding the canonical
/// JSON of `{"channel": ..., ...params}` (see
/// [`ChannelIdentifier`](super::ChannelIdentifier)).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum ClientCommand {
    /// Register a channel subscription. The server answers with
    /// `confirm_subscription` or `reject_subscription` for the same
    /// identifier.
    Subscribe {
        /// Canonical channel identifier JSON, as a string.
        identifier: String,
    },

    /// Remove a channel subscription.
    Unsubscribe {
        /// Canonical channel identifier JSON, as a string.
        identifier: String,
    },
}

impl ClientCommand {
    /// The identifier the command addresses.
    pub fn identifier(&self) -> &str {
        match self {
            ClientCommand::Subscribe { identifier } => identifier,
            ClientCommand::Unsubscribe { identifier } => identifier,
        }
    }
}
