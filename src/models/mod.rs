//! Data models for the reink-cable client.
//!
//! Defines the cable wire frames (client commands, server messages), the
//! channel identifier and its canonical registry key, connection options,
//! and the content models held by the selection store.

pub mod client_command;
pub mod connection_options;
pub mod content;
pub mod identifier;
pub mod server_message;

#[cfg(test)]
mod tests;

pub use client_command::ClientCommand;
pub use connection_options::ConnectionOptions;
pub use content::{Chapter, Concept};
pub use identifier::{ChannelIdentifier, ChannelParams, ChannelSubscription};
pub use server_message::{ProtocolFrame, ServerMessage};
