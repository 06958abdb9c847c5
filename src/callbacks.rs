//! Per-channel lifecycle callbacks.
//!
//! Each subscription carries its own callback bundle, wired by the caller of
//! [`CableClient::subscribe`](crate::client::CableClient::subscribe):
//!
//! - [`on_connected`](ChannelCallbacks::on_connected): fired when the server
//!   confirms the subscription (and again after every reconnect)
//! - [`on_disconnected`](ChannelCallbacks::on_disconnected): fired when the
//!   underlying connection drops or is closed
//! - [`on_message`](ChannelCallbacks::on_message): fired for every broadcast
//!   routed to this channel
//!
//! # Example
//!
//! ```rust
//! use reink_cable::ChannelCallbacks;
//!
//! let callbacks = ChannelCallbacks::new()
//!     .on_connected(|| println!("channel live"))
//!     .on_disconnected(|reason| println!("channel down: {}", reason))
//!     .on_message(|payload| println!("broadcast: {}", payload));
//! assert!(callbacks.has_any());
//! ```

use std::fmt;
use std::sync::Arc;

use serde_json::Value as JsonValue;

/// Reason for a disconnect event.
#[derive(Debug, Clone)]
pub struct DisconnectReason {
    /// Human-readable description of why the connection closed.
    pub message: String,
    /// WebSocket close code, if available (e.g. 1000 = normal, 1006 = abnormal).
    pub code: Option<u16>,
}

impl DisconnectReason {
    /// Create a new disconnect reason with a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
        }
    }

    /// Create a new disconnect reason with a message and close code.
    pub fn with_code(message: impl Into<String>, code: u16) -> Self {
        Self {
            message: message.into(),
            code: Some(code),
        }
    }
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(code) = self.code {
            write!(f, "{} (code: {})", self.message, code)
        } else {
            write!(f, "{}", self.message)
        }
    }
}

/// Type alias for the on_connected callback.
pub type OnConnectedCallback = Arc<dyn Fn() + Send + Sync>;

/// Type alias for the on_disconnected callback.
pub type OnDisconnectedCallback = Arc<dyn Fn(DisconnectReason) + Send + Sync>;

/// Type alias for the on_message callback.
pub type OnMessageCallback = Arc<dyn Fn(JsonValue) + Send + Sync>;

/// Lifecycle callbacks for one channel subscription.
///
/// All callbacks are optional; register only what you need. Callbacks are
/// `Send + Sync` so they can be invoked from the connection task.
#[derive(Clone, Default)]
pub struct ChannelCallbacks {
    /// Called when the server confirms the subscription.
    pub(crate) on_connected: Option<OnConnectedCallback>,

    /// Called when the underlying connection drops or is closed.
    pub(crate) on_disconnected: Option<OnDisconnectedCallback>,

    /// Called with the payload of every broadcast on this channel.
    pub(crate) on_message: Option<OnMessageCallback>,
}

impl fmt::Debug for ChannelCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelCallbacks")
            .field("on_connected", &self.on_connected.is_some())
            .field("on_disconnected", &self.on_disconnected.is_some())
            .field("on_message", &self.on_message.is_some())
            .finish()
    }
}

impl ChannelCallbacks {
    /// Create a new empty `ChannelCallbacks` (no callbacks registered).
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback invoked when the server confirms the subscription.
    ///
    /// Re-fires after every reconnect, once the subscription is confirmed
    /// again.
    pub fn on_connected(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_connected = Some(Arc::new(f));
        self
    }

    /// Register a callback invoked when the underlying connection drops.
    ///
    /// The callback receives a [`DisconnectReason`] with details about why
    /// the connection was closed.
    pub fn on_disconnected(
        mut self,
        f: impl Fn(DisconnectReason) + Send + Sync + 'static,
    ) -> Self {
        self.on_disconnected = Some(Arc::new(f));
        self
    }

    /// Register a callback invoked with each broadcast payload on this
    /// channel.
    pub fn on_message(mut self, f: impl Fn(JsonValue) + Send + Sync + 'static) -> Self {
        self.on_message = Some(Arc::new(f));
        self
    }

    /// Returns `true` if any callback is registered.
    pub fn has_any(&self) -> bool {
        self.on_connected.is_some() || self.on_disconnected.is_some() || self.on_message.is_some()
    }

    // ---------------------------------------------------------------
    // Dispatch helpers
    // ---------------------------------------------------------------
    //
    // Public so that Consumer implementations outside this crate (including
    // test doubles) can dispatch events to their subscribers.

    /// Dispatch the on_connected event.
    pub fn emit_connected(&self) {
        if let Some(cb) = &self.on_connected {
            cb();
        }
    }

    /// Dispatch the on_disconnected event.
    pub fn emit_disconnected(&self, reason: DisconnectReason) {
        if let Some(cb) = &self.on_disconnected {
            cb(reason);
        }
    }

    /// Dispatch the on_message event.
    pub fn emit_message(&self, payload: JsonValue) {
        if let Some(cb) = &self.on_message {
            cb(payload);
        }
    }
}
