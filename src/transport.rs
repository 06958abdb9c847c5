//! Transport abstraction for the cable client.
//!
//! The client never opens sockets itself; it asks an injected [`Transport`]
//! for a [`Consumer`] bound to a URL. That keeps the connection manager
//! deterministic under test (substitute transports record calls instead of
//! dialing) and keeps protocol details out of the lifecycle logic.
//!
//! The production implementation is [`websocket::WebSocketTransport`].

pub mod websocket;

use std::sync::Arc;

use async_trait::async_trait;
use url::Url;

use crate::callbacks::ChannelCallbacks;
use crate::error::Result;
use crate::models::ChannelIdentifier;

/// Factory for cable consumers. One capability: create a consumer given a
/// URL.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Open a consumer connected to `url`.
    ///
    /// The URL already carries the identity's credential query parameters.
    /// Implementations return an error when the connection cannot be
    /// established; they do not retry a connection that never existed.
    async fn create_consumer(&self, url: Url) -> Result<Arc<dyn Consumer>>;
}

/// One live cable connection, multiplexing channel subscriptions.
#[async_trait]
pub trait Consumer: Send + Sync + std::fmt::Debug {
    /// Register a subscription for `identifier`, wiring its callbacks.
    ///
    /// Subscribing again under an identifier already held replaces the
    /// previous binding; implementations unsubscribe the old one first so a
    /// server-side subscription is never leaked.
    async fn subscribe(
        &self,
        identifier: ChannelIdentifier,
        callbacks: ChannelCallbacks,
    ) -> Result<()>;

    /// Remove the subscription for `identifier`. Idempotent.
    async fn unsubscribe(&self, identifier: &ChannelIdentifier) -> Result<()>;

    /// Close the connection. All subscriptions are dropped with it; no
    /// individual unsubscribe calls are required first.
    async fn disconnect(&self);

    /// Whether the connection is currently open.
    fn is_connected(&self) -> bool;
}

pub use websocket::WebSocketTransport;
