// Reason Ink real-time client library
// Provides the cable connection manager, channel subscriptions over a single
// shared WebSocket, and the observable selection state for the
// concept/chapter hierarchy.

pub mod callbacks;
pub mod client;
pub mod endpoint;
pub mod error;
pub mod identity;
pub mod models;
pub mod observable;
pub mod store;
pub mod timeouts;
pub mod transport;

// Re-export commonly used types
pub use callbacks::{ChannelCallbacks, DisconnectReason};
pub use client::{CableClient, CableClientBuilder};
pub use endpoint::{CableEndpoint, LOCAL_CABLE_URL, PRODUCTION_CABLE_URL};
pub use error::{CableError, Result, UnavailableReason};
pub use identity::Identity;
pub use models::{
    ChannelIdentifier, ChannelParams, ChannelSubscription, Chapter, ClientCommand, Concept,
    ConnectionOptions, ProtocolFrame, ServerMessage,
};
pub use observable::Observable;
pub use store::SelectionStore;
pub use timeouts::CableTimeouts;
pub use transport::{Consumer, Transport, WebSocketTransport};
