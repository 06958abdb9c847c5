//! Cable client with builder pattern.
//!
//! Owns at most one live cable connection, multiplexes channel subscriptions
//! over it, and keeps its lifecycle synchronized with the application's
//! authenticated identity.

use crate::{
    callbacks::ChannelCallbacks,
    endpoint::CableEndpoint,
    error::{CableError, Result, UnavailableReason},
    identity::Identity,
    models::{ChannelIdentifier, ChannelParams, ChannelSubscription, ConnectionOptions},
    timeouts::CableTimeouts,
    transport::{Consumer, Transport, WebSocketTransport},
};
use std::{collections::HashMap, fmt, sync::Arc};
use tokio::{
    sync::{watch, Mutex},
    task::JoinHandle,
};

/// Lazily-initialized cable connection manager.
///
/// The client holds no connection until the first successful
/// [`acquire_connection`](Self::acquire_connection) while an [`Identity`] is
/// present; subsequent acquires return the same shared consumer. When the
/// identity is cleared or replaced, the connection is torn down so the next
/// acquire reconnects with fresh credentials.
///
/// Use [`CableClientBuilder`] to construct instances.
///
/// # Examples
///
/// ```rust,no_run
/// use reink_cable::{CableClient, CableEndpoint, Identity};
/// use std::sync::Arc;
/// use tokio::sync::watch;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let (identity_tx, identity_rx) = watch::channel(None);
///
/// let client = Arc::new(
///     CableClient::builder()
///         .endpoint(CableEndpoint::for_host("app.reasonink.com")?)
///         .identity_watch(identity_rx)
///         .build()?,
/// );
/// let _watcher = client.spawn_identity_watch();
///
/// identity_tx.send(Some(Identity::new("alice@example.com", "secret-token")))?;
/// let connection = client.acquire_connection().await?;
/// assert!(connection.is_connected());
/// # Ok(())
/// # }
/// ```
pub struct CableClient {
    endpoint: CableEndpoint,
    transport: Arc<dyn Transport>,
    identity: watch::Receiver<Option<Identity>>,
    enabled: bool,
    state: Mutex<CableState>,
}

/// Mutable state guarded by the client's single async mutex.
///
/// Holding the lock across consumer creation is what makes
/// `acquire_connection` single-flight: concurrent first callers serialize,
/// and the losers observe the winner's stored consumer.
#[derive(Default)]
struct CableState {
    consumer: Option<Arc<dyn Consumer>>,
    /// Identity the current consumer was created for.
    connected_as: Option<Identity>,
    /// Registered subscriptions, keyed by canonical identifier JSON.
    channels: HashMap<String, ChannelIdentifier>,
}

impl CableClient {
    /// Create a new builder for configuring the client
    pub fn builder() -> CableClientBuilder {
        CableClientBuilder::new()
    }

    /// Get (lazily creating) the shared cable connection.
    ///
    /// Idempotent: while an identity is present, repeated calls return the
    /// same consumer instance. If the identity changed since the consumer was
    /// created, the stale consumer is torn down and a fresh one is connected
    /// as the new user.
    ///
    /// # Errors
    ///
    /// [`CableError::Unavailable`] when the client is disabled or no identity
    /// is present (retryable, not a fault); transport errors when the
    /// connection attempt itself fails.
    pub async fn acquire_connection(&self) -> Result<Arc<dyn Consumer>> {
        let identity = self.current_identity()?;
        let mut state = self.state.lock().await;
        self.ensure_consumer(&mut state, identity).await
    }

    /// Subscribe to a channel, creating the connection if needed.
    ///
    /// The `(channel, params)` pair is serialized into a canonical identifier
    /// that is both the wire identifier and the registry key, so two calls
    /// whose params hold the same entries address the same subscription: the
    /// second call's callbacks replace the first's.
    ///
    /// # Example
    /// ```rust,no_run
    /// # use reink_cable::{ChannelCallbacks, ChannelParams};
    /// # async fn example(client: &reink_cable::CableClient) -> reink_cable::Result<()> {
    /// let mut params = ChannelParams::new();
    /// params.insert("room_id".to_string(), serde_json::json!(7));
    ///
    /// let callbacks = ChannelCallbacks::new()
    ///     .on_message(|payload| println!("got: {}", payload));
    ///
    /// let subscription = client.subscribe("ChatChannel", params, callbacks).await?;
    /// println!("subscribed as {}", subscription.key());
    /// # Ok(())
    /// # }
    /// ```
    pub async fn subscribe(
        &self,
        channel: impl Into<String>,
        params: ChannelParams,
        callbacks: ChannelCallbacks,
    ) -> Result<ChannelSubscription> {
        let identity = self.current_identity()?;
        let identifier = ChannelIdentifier::with_params(channel, params)?;

        let mut state = self.state.lock().await;
        let consumer = self.ensure_consumer(&mut state, identity).await?;
        consumer.subscribe(identifier.clone(), callbacks).await?;
        state.channels.insert(identifier.key(), identifier.clone());

        log::debug!("[reink-cable] Subscribed to {}", identifier);
        Ok(ChannelSubscription::new(identifier))
    }

    /// Unsubscribe from a channel.
    ///
    /// Idempotent: returns `Ok(())` when the client is disabled or no
    /// subscription is registered under the computed identifier. Otherwise
    /// removes the registry entry and issues exactly one transport-level
    /// unsubscribe.
    pub async fn unsubscribe(
        &self,
        channel: impl Into<String>,
        params: ChannelParams,
    ) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }
        let identifier = ChannelIdentifier::with_params(channel, params)?;
        let key = identifier.key();

        let mut state = self.state.lock().await;
        if state.channels.remove(&key).is_none() {
            return Ok(());
        }
        log::debug!("[reink-cable] Unsubscribing from {}", key);
        match state.consumer {
            Some(ref consumer) => consumer.unsubscribe(&identifier).await,
            None => Ok(()),
        }
    }

    /// Close the connection and drop all subscriptions.
    ///
    /// Idempotent; a no-op when the client is disabled or holds no
    /// connection. Individual unsubscribes are not sent since the connection
    /// teardown cascades server-side.
    pub async fn disconnect(&self) {
        if !self.enabled {
            return;
        }
        let mut state = self.state.lock().await;
        if state.consumer.is_some() {
            log::info!("[reink-cable] Disconnecting the cable");
            self.teardown_locked(&mut state).await;
        }
    }

    /// Spawn the background task reacting to identity transitions.
    ///
    /// Call once after construction. The task disconnects the cable when the
    /// identity is cleared or replaced while a connection exists; it never
    /// connects eagerly, leaving creation to the next
    /// [`acquire_connection`](Self::acquire_connection). Ends when the
    /// identity sender is dropped.
    pub fn spawn_identity_watch(self: &Arc<Self>) -> JoinHandle<()> {
        if !self.enabled {
            // A disabled client never holds a connection to tear down.
            return tokio::spawn(async {});
        }
        let client = Arc::clone(self);
        let mut identity_rx = self.identity.clone();
        tokio::spawn(async move {
            while identity_rx.changed().await.is_ok() {
                let current = identity_rx.borrow_and_update().clone();
                client.react_to_identity_change(current).await;
            }
            log::debug!("[reink-cable] Identity watch closed, stopping");
        })
    }

    /// Whether the client currently holds a live connection.
    pub async fn is_connected(&self) -> bool {
        let state = self.state.lock().await;
        match state.consumer {
            Some(ref consumer) => consumer.is_connected(),
            None => false,
        }
    }

    /// Registry keys of the active subscriptions, sorted.
    ///
    /// Reflects what this client has subscribed and not yet unsubscribed. A
    /// subscription the server rejected is dropped at the consumer level
    /// (logged at warn, no callback fires) but stays listed here until
    /// [`unsubscribe`](Self::unsubscribe) is called; rejection has no
    /// callback surface in the cable protocol.
    pub async fn active_channels(&self) -> Vec<String> {
        let state = self.state.lock().await;
        let mut keys: Vec<String> = state.channels.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// The configured endpoint (without credentials).
    pub fn endpoint(&self) -> &CableEndpoint {
        &self.endpoint
    }

    /// Whether the client was built for a client execution context.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Resolve the current identity, or the typed unavailability.
    fn current_identity(&self) -> Result<Identity> {
        if !self.enabled {
            return Err(CableError::Unavailable(UnavailableReason::Disabled));
        }
        match self.identity.borrow().clone() {
            Some(identity) => Ok(identity),
            None => {
                log::debug!("[reink-cable] No identity present, cable unavailable");
                Err(CableError::Unavailable(UnavailableReason::NoIdentity))
            }
        }
    }

    /// Return the live consumer for `identity`, creating it if needed.
    ///
    /// Runs under the state lock, which is held across the creation await so
    /// concurrent callers cannot race a duplicate connection into existence.
    async fn ensure_consumer(
        &self,
        state: &mut CableState,
        identity: Identity,
    ) -> Result<Arc<dyn Consumer>> {
        if let Some(ref consumer) = state.consumer {
            if state.connected_as.as_ref() == Some(&identity) {
                return Ok(Arc::clone(consumer));
            }
            // The consumer carries a previous user's credentials.
            log::info!(
                "[reink-cable] Identity changed to {}, replacing the stale cable connection",
                identity.email
            );
            self.teardown_locked(state).await;
        }

        log::debug!("[reink-cable] Creating cable consumer for {}", identity.email);
        let url = self.endpoint.authorized_url(&identity);
        let consumer = match self.transport.create_consumer(url).await {
            Ok(consumer) => consumer,
            Err(e) => {
                log::error!("[reink-cable] Failed to create cable consumer: {}", e);
                return Err(e);
            }
        };

        state.consumer = Some(Arc::clone(&consumer));
        state.connected_as = Some(identity);
        Ok(consumer)
    }

    /// Close the consumer and clear all connection state. Lock must be held.
    async fn teardown_locked(&self, state: &mut CableState) {
        if let Some(consumer) = state.consumer.take() {
            consumer.disconnect().await;
        }
        state.channels.clear();
        state.connected_as = None;
    }

    async fn react_to_identity_change(&self, current: Option<Identity>) {
        let mut state = self.state.lock().await;
        if state.consumer.is_none() {
            // Nothing live; the connection stays lazy until the next acquire.
            return;
        }
        match current {
            None => {
                log::info!("[reink-cable] Identity cleared, disconnecting the cable");
                self.teardown_locked(&mut state).await;
            }
            Some(identity) => {
                if state.connected_as.as_ref() != Some(&identity) {
                    log::info!(
                        "[reink-cable] Identity changed to {}, disconnecting the stale cable",
                        identity.email
                    );
                    self.teardown_locked(&mut state).await;
                }
            }
        }
    }
}

impl fmt::Debug for CableClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CableClient")
            .field("endpoint", &self.endpoint)
            .field("enabled", &self.enabled)
            .finish()
    }
}

/// Builder for configuring [`CableClient`] instances.
pub struct CableClientBuilder {
    endpoint: Option<CableEndpoint>,
    identity: Option<watch::Receiver<Option<Identity>>>,
    transport: Option<Arc<dyn Transport>>,
    timeouts: CableTimeouts,
    connection_options: ConnectionOptions,
    enabled: bool,
}

impl CableClientBuilder {
    fn new() -> Self {
        Self {
            endpoint: None,
            identity: None,
            transport: None,
            timeouts: CableTimeouts::default(),
            connection_options: ConnectionOptions::default(),
            enabled: true,
        }
    }

    /// Set the cable endpoint (required)
    pub fn endpoint(mut self, endpoint: CableEndpoint) -> Self {
        self.endpoint = Some(endpoint);
        self
    }

    /// Set the identity observable the client follows (required)
    pub fn identity_watch(mut self, identity: watch::Receiver<Option<Identity>>) -> Self {
        self.identity = Some(identity);
        self
    }

    /// Inject a custom transport.
    ///
    /// Defaults to [`WebSocketTransport`] configured with the builder's
    /// timeouts and connection options. A substitute implementation makes the
    /// client fully testable without a server.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Set timeout configuration for connection and handshake waits
    pub fn timeouts(mut self, timeouts: CableTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Set reconnection behavior for the default transport
    pub fn connection_options(mut self, options: ConnectionOptions) -> Self {
        self.connection_options = options;
        self
    }

    /// Mark the client as running outside a client execution context
    /// (e.g. server-side rendering). Every operation short-circuits: acquire
    /// and subscribe report [`CableError::Unavailable`], the rest no-op.
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Build the client
    pub fn build(self) -> Result<CableClient> {
        let endpoint = self
            .endpoint
            .ok_or_else(|| CableError::ConfigurationError("endpoint is required".into()))?;
        let identity = self
            .identity
            .ok_or_else(|| CableError::ConfigurationError("identity_watch is required".into()))?;

        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(WebSocketTransport::new(
                self.timeouts,
                self.connection_options,
            )),
        };

        Ok(CableClient {
            endpoint,
            transport,
            identity,
            enabled: self.enabled,
            state: Mutex::new(CableState::default()),
        })
    }
}
