//! Authenticated identity supplied by the embedding application.
//!
//! The cable client never authenticates users itself. The application owns a
//! `watch` channel carrying `Option<Identity>` (None while logged out) and
//! hands the receiver to [`CableClientBuilder::identity_watch`]. This module
//! only defines the value carried on that channel.
//!
//! [`CableClientBuilder::identity_watch`]: crate::client::CableClientBuilder::identity_watch

use serde::{Deserialize, Serialize};

/// The authenticated user's credentials as seen by the cable layer.
///
/// Both fields are opaque here: `email` identifies the account and `token`
/// is the bearer token the backend issued at login. They are appended to the
/// cable URL as the `user_email` and `user_token` query parameters.
///
/// Equality is by value; a change in either field counts as an identity
/// change and forces the next connection to be re-established.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Identity {
    /// Account email address.
    pub email: String,

    /// Bearer token issued by the backend at login.
    /// Note: tokens should not be logged; log the email instead.
    pub token: String,
}

impl Identity {
    /// Create a new identity.
    pub fn new(email: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            token: token.into(),
        }
    }
}
