//! WebSocket transport speaking the cable wire protocol.
//!
//! Provides a single WebSocket connection multiplexed across multiple
//! channel subscriptions. Handles:
//!
//! - The welcome handshake (credentials travel in the URL; the server only
//!   welcomes accepted connections)
//! - Routing of confirmations, rejections, and broadcasts to the owning
//!   subscription's callbacks
//! - Heartbeat staleness detection (the server pings every few seconds)
//! - Automatic reconnection with exponential backoff
//! - Re-subscription of all active channels after a reconnect

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde_json::Value as JsonValue;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant as TokioInstant;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::{client::IntoClientRequest, protocol::Message};
use url::Url;

use crate::callbacks::{ChannelCallbacks, DisconnectReason};
use crate::error::{CableError, Result};
use crate::models::{
    ChannelIdentifier, ClientCommand, ConnectionOptions, ProtocolFrame, ServerMessage,
};
use crate::timeouts::CableTimeouts;
use crate::transport::{Consumer, Transport};

type WsStream = tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<TcpStream>>;

/// Maximum text frame size accepted from the server (16 MiB).
const MAX_TEXT_FRAME_BYTES: usize = 16 << 20;

/// Maximum sleep duration that won't overflow `Instant + Duration`.
/// ~100 years is far enough into the future to be effectively "never".
const FAR_FUTURE: Duration = Duration::from_secs(100 * 365 * 24 * 3600);

/// Capacity of the command channel into the connection task.
const CMD_CHANNEL_CAPACITY: usize = 256;

// ── Commands ────────────────────────────────────────────────────────────────

/// Commands sent from the public API to the background connection task.
enum ConsumerCmd {
    /// Register a subscription over the shared connection.
    Subscribe {
        identifier: ChannelIdentifier,
        callbacks: ChannelCallbacks,
        result_tx: oneshot::Sender<Result<()>>,
    },
    /// Remove a subscription by registry key.
    Unsubscribe { key: String },
    /// Gracefully shut down the connection.
    Disconnect,
}

// ── Per-channel state ───────────────────────────────────────────────────────

/// Internal state for each active subscription within the shared connection.
struct ChannelEntry {
    callbacks: ChannelCallbacks,
    /// Whether the server has confirmed this subscription since the last
    /// (re)connect. Gates `on_connected` so duplicate confirm frames fire it
    /// once per connection.
    confirmed: bool,
}

// ── Transport factory ───────────────────────────────────────────────────────

/// Production [`Transport`]: opens WebSocket consumers speaking the cable
/// protocol.
///
/// Timeouts and reconnect policy are fixed at construction and shared by
/// every consumer this transport creates.
#[derive(Debug, Clone)]
pub struct WebSocketTransport {
    timeouts: CableTimeouts,
    options: ConnectionOptions,
}

impl WebSocketTransport {
    /// Create a transport with the given timeouts and reconnect policy.
    pub fn new(timeouts: CableTimeouts, options: ConnectionOptions) -> Self {
        Self { timeouts, options }
    }
}

impl Default for WebSocketTransport {
    fn default() -> Self {
        Self::new(CableTimeouts::default(), ConnectionOptions::default())
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn create_consumer(&self, url: Url) -> Result<Arc<dyn Consumer>> {
        let consumer =
            WebSocketConsumer::connect(url, self.timeouts.clone(), self.options.clone()).await?;
        Ok(Arc::new(consumer))
    }
}

// ── WebSocketConsumer (public handle) ───────────────────────────────────────

/// A single WebSocket cable connection that multiplexes subscriptions.
///
/// Created via [`WebSocketTransport::create_consumer`]. Subscribe and
/// unsubscribe calls send commands to a background task that owns the
/// WebSocket stream.
pub struct WebSocketConsumer {
    /// Channel to the background connection task.
    cmd_tx: mpsc::Sender<ConsumerCmd>,
    /// Whether the WebSocket is currently open and welcomed.
    connected: Arc<AtomicBool>,
    /// Reconnection attempt counter (resets on success).
    reconnect_attempts: Arc<AtomicU32>,
    /// Background task handle.
    _task: JoinHandle<()>,
}

impl std::fmt::Debug for WebSocketConsumer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebSocketConsumer")
            .field("connected", &self.connected)
            .field("reconnect_attempts", &self.reconnect_attempts)
            .finish_non_exhaustive()
    }
}

impl WebSocketConsumer {
    /// Open the connection and complete the welcome handshake.
    ///
    /// The initial connection is not retried: a consumer either starts out
    /// live or is never created. Auto-reconnection only applies to
    /// connections lost after this point.
    pub(crate) async fn connect(
        url: Url,
        timeouts: CableTimeouts,
        options: ConnectionOptions,
    ) -> Result<Self> {
        let stream = establish_cable(&url, &timeouts).await?;

        let (cmd_tx, cmd_rx) = mpsc::channel::<ConsumerCmd>(CMD_CHANNEL_CAPACITY);
        let connected = Arc::new(AtomicBool::new(true));
        let reconnect_attempts = Arc::new(AtomicU32::new(0));

        let connected_clone = connected.clone();
        let reconnect_clone = reconnect_attempts.clone();
        let task = tokio::spawn(async move {
            consumer_task(
                stream,
                cmd_rx,
                url,
                timeouts,
                options,
                connected_clone,
                reconnect_clone,
            )
            .await;
        });

        Ok(Self {
            cmd_tx,
            connected,
            reconnect_attempts,
            _task: task,
        })
    }

    /// Number of reconnection attempts since the last successful connect.
    pub fn reconnect_attempts(&self) -> u32 {
        self.reconnect_attempts.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Consumer for WebSocketConsumer {
    async fn subscribe(
        &self,
        identifier: ChannelIdentifier,
        callbacks: ChannelCallbacks,
    ) -> Result<()> {
        let (result_tx, result_rx) = oneshot::channel();

        self.cmd_tx
            .send(ConsumerCmd::Subscribe {
                identifier,
                callbacks,
                result_tx,
            })
            .await
            .map_err(|_| {
                CableError::WebSocketError("Connection task is not running".to_string())
            })?;

        result_rx.await.map_err(|_| {
            CableError::WebSocketError(
                "Connection task died before confirming subscribe".to_string(),
            )
        })?
    }

    async fn unsubscribe(&self, identifier: &ChannelIdentifier) -> Result<()> {
        self.cmd_tx
            .send(ConsumerCmd::Unsubscribe {
                key: identifier.key(),
            })
            .await
            .map_err(|_| {
                CableError::WebSocketError("Connection task is not running".to_string())
            })?;
        Ok(())
    }

    async fn disconnect(&self) {
        let _ = self.cmd_tx.send(ConsumerCmd::Disconnect).await;
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }
}

impl Drop for WebSocketConsumer {
    fn drop(&mut self) {
        // Best-effort shutdown signal.
        let _ = self.cmd_tx.try_send(ConsumerCmd::Disconnect);
    }
}

// ── Connection establishment ────────────────────────────────────────────────

/// Open the WebSocket and wait for the server's welcome frame.
async fn establish_cable(url: &Url, timeouts: &CableTimeouts) -> Result<WsStream> {
    // The URL carries the credential query; log the host only.
    log::debug!(
        "[reink-cable] Opening cable connection to {}",
        url.host_str().unwrap_or("<no-host>")
    );

    let request = url.as_str().into_client_request().map_err(|e| {
        CableError::WebSocketError(format!("Failed to build WebSocket request: {}", e))
    })?;

    let connect_result = if !CableTimeouts::is_no_timeout(timeouts.connection_timeout) {
        tokio::time::timeout(timeouts.connection_timeout, connect_async(request)).await
    } else {
        Ok(connect_async(request).await)
    };

    let mut ws_stream = match connect_result {
        Ok(Ok((stream, _response))) => stream,
        Ok(Err(tokio_tungstenite::tungstenite::error::Error::Http(response))) => {
            let message = match response.status().as_u16() {
                401 => "Unauthorized: cable endpoint rejected the credentials".to_string(),
                403 => "Forbidden: access to cable endpoint denied".to_string(),
                code => format!("Cable HTTP error: {}", code),
            };
            return Err(CableError::WebSocketError(message));
        }
        Ok(Err(e)) => {
            return Err(CableError::WebSocketError(format!("Connection failed: {}", e)));
        }
        Err(_) => {
            return Err(CableError::TimeoutError(format!(
                "Connection timeout ({:?})",
                timeouts.connection_timeout
            )));
        }
    };

    wait_for_welcome(&mut ws_stream, timeouts.welcome_timeout).await?;
    log::info!("[reink-cable] Cable connection established");

    Ok(ws_stream)
}

/// Wait for the welcome frame, tolerating heartbeats and other interleaved
/// frames until the deadline.
async fn wait_for_welcome(ws_stream: &mut WsStream, welcome_timeout: Duration) -> Result<()> {
    let deadline = TokioInstant::now() + welcome_timeout;
    loop {
        let remaining = deadline.saturating_duration_since(TokioInstant::now());
        if remaining.is_zero() {
            return Err(CableError::TimeoutError(format!(
                "Welcome timeout ({:?})",
                welcome_timeout
            )));
        }

        match tokio::time::timeout(remaining, ws_stream.next()).await {
            Ok(Some(Ok(Message::Text(text)))) => match ServerMessage::parse(&text) {
                Ok(ServerMessage::Protocol(ProtocolFrame::Welcome)) => return Ok(()),
                Ok(ServerMessage::Protocol(ProtocolFrame::Disconnect { reason, .. })) => {
                    return Err(CableError::WebSocketError(format!(
                        "Server refused the connection: {}",
                        reason.unwrap_or_else(|| "no reason given".to_string())
                    )));
                }
                // Tolerate other frames while waiting for the welcome.
                Ok(_) => continue,
                Err(e) => {
                    log::warn!(
                        "[reink-cable] Unparseable frame during welcome handshake: {}",
                        e
                    );
                    continue;
                }
            },
            Ok(Some(Ok(Message::Ping(payload)))) => {
                // Reply to pings during the handshake.
                let _ = ws_stream.send(Message::Pong(payload)).await;
            }
            Ok(Some(Ok(Message::Pong(_) | Message::Binary(_) | Message::Frame(_)))) => {
                continue;
            }
            Ok(Some(Ok(Message::Close(_)))) => {
                return Err(CableError::WebSocketError(
                    "Connection closed during welcome handshake".to_string(),
                ));
            }
            Ok(Some(Err(e))) => {
                return Err(CableError::WebSocketError(format!(
                    "WebSocket error during welcome handshake: {}",
                    e
                )));
            }
            Ok(None) => {
                return Err(CableError::WebSocketError(
                    "Connection closed before welcome arrived".to_string(),
                ));
            }
            Err(_) => {
                return Err(CableError::TimeoutError(format!(
                    "Welcome timeout ({:?})",
                    welcome_timeout
                )));
            }
        }
    }
}

// ── Wire helpers ────────────────────────────────────────────────────────────

/// Send a subscribe command for `key` over the WebSocket.
async fn send_subscribe(ws: &mut WsStream, key: &str) -> Result<()> {
    let command = ClientCommand::Subscribe {
        identifier: key.to_string(),
    };
    let payload = serde_json::to_string(&command).map_err(|e| {
        CableError::SerializationError(format!("Failed to serialize subscribe: {}", e))
    })?;
    ws.send(Message::Text(payload.into()))
        .await
        .map_err(|e| CableError::WebSocketError(format!("Failed to send subscribe: {}", e)))
}

/// Send an unsubscribe command for `key` over the WebSocket.
async fn send_unsubscribe(ws: &mut WsStream, key: &str) -> Result<()> {
    let command = ClientCommand::Unsubscribe {
        identifier: key.to_string(),
    };
    let payload = serde_json::to_string(&command).map_err(|e| {
        CableError::SerializationError(format!("Failed to serialize unsubscribe: {}", e))
    })?;
    ws.send(Message::Text(payload.into()))
        .await
        .map_err(|e| CableError::WebSocketError(format!("Failed to send unsubscribe: {}", e)))
}

// ── Frame routing ───────────────────────────────────────────────────────────

/// Resolve an inbound identifier string to the registry key it was stored
/// under. Exact match first; otherwise re-canonicalize, since the server may
/// re-serialize the identifier with a different key order.
fn resolve_key(identifier: &str, subs: &HashMap<String, ChannelEntry>) -> Option<String> {
    if subs.contains_key(identifier) {
        return Some(identifier.to_string());
    }
    ChannelIdentifier::from_wire(identifier)
        .ok()
        .map(|parsed| parsed.key())
        .filter(|key| subs.contains_key(key))
}

/// Mark a subscription confirmed and fire its `on_connected` callback.
fn confirm_subscription(identifier: &str, subs: &mut HashMap<String, ChannelEntry>) {
    match resolve_key(identifier, subs) {
        Some(key) => {
            if let Some(entry) = subs.get_mut(&key) {
                if !entry.confirmed {
                    entry.confirmed = true;
                    log::debug!("[reink-cable] Subscription confirmed: {}", key);
                    entry.callbacks.emit_connected();
                }
            }
        }
        None => {
            log::debug!(
                "[reink-cable] Confirmation for unknown identifier: {}",
                identifier
            );
        }
    }
}

/// Drop a subscription the server refused. The caller's callbacks never
/// fired for it, so no disconnect event is emitted.
fn reject_subscription(identifier: &str, subs: &mut HashMap<String, ChannelEntry>) {
    match resolve_key(identifier, subs) {
        Some(key) => {
            subs.remove(&key);
            log::warn!("[reink-cable] Subscription rejected by server: {}", key);
        }
        None => {
            log::debug!(
                "[reink-cable] Rejection for unknown identifier: {}",
                identifier
            );
        }
    }
}

/// Route a broadcast payload to the owning subscription's `on_message`.
fn route_broadcast(identifier: &str, message: JsonValue, subs: &HashMap<String, ChannelEntry>) {
    match resolve_key(identifier, subs) {
        Some(key) => {
            if let Some(entry) = subs.get(&key) {
                entry.callbacks.emit_message(message);
            }
        }
        None => {
            log::debug!(
                "[reink-cable] No subscription for broadcast identifier: {}",
                identifier
            );
        }
    }
}

/// Fire `on_disconnected` for every subscription and reset their confirmed
/// flags so confirmations after a reconnect fire `on_connected` again.
fn notify_disconnected(subs: &mut HashMap<String, ChannelEntry>, reason: &DisconnectReason) {
    for entry in subs.values_mut() {
        entry.confirmed = false;
        entry.callbacks.emit_disconnected(reason.clone());
    }
}

/// Re-subscribe all active channels after a successful reconnect.
async fn resubscribe_all(ws: &mut WsStream, subs: &HashMap<String, ChannelEntry>) {
    log::info!(
        "[reink-cable] Re-subscribing {} active channel(s) after reconnect",
        subs.len()
    );
    for key in subs.keys() {
        if let Err(e) = send_subscribe(ws, key).await {
            log::warn!("[reink-cable] Failed to re-subscribe {}: {}", key, e);
        }
    }
}

// ── Background connection task ──────────────────────────────────────────────

/// The main background task managing the cable connection.
///
/// Lifecycle:
/// 1. Starts with an established, welcomed WebSocket stream
/// 2. Event loop: read frames + process commands + watch heartbeat staleness
/// 3. On connection loss: notify subscriptions, then auto-reconnect with
///    exponential backoff (unless disabled or forbidden by the server)
/// 4. On reconnect: re-subscribe all active channels
async fn consumer_task(
    initial_stream: WsStream,
    mut cmd_rx: mpsc::Receiver<ConsumerCmd>,
    url: Url,
    timeouts: CableTimeouts,
    options: ConnectionOptions,
    connected: Arc<AtomicBool>,
    reconnect_attempts: Arc<AtomicU32>,
) {
    let mut subs: HashMap<String, ChannelEntry> = HashMap::new();
    let mut ws_stream: Option<WsStream> = Some(initial_stream);
    let mut shutdown_requested = false;
    // Set when the server's disconnect frame forbids reconnecting.
    let mut reconnect_forbidden = false;

    // Staleness configuration: the server heartbeats every few seconds, so
    // prolonged silence means the connection is dead.
    let has_staleness = !timeouts.stale_threshold.is_zero();
    let stale_dur = if has_staleness {
        timeouts.stale_threshold
    } else {
        FAR_FUTURE
    };
    let mut stale_deadline = TokioInstant::now() + stale_dur;

    loop {
        if shutdown_requested {
            // Send unsubscribe for all channels and close.
            if let Some(ref mut ws) = ws_stream {
                for key in subs.keys() {
                    let _ = send_unsubscribe(ws, key).await;
                }
                let _ = ws.close(None).await;
            }
            let was_connected = connected.swap(false, Ordering::SeqCst);
            if was_connected {
                notify_disconnected(&mut subs, &DisconnectReason::new("Client disconnected"));
            }
            return;
        }

        if let Some(ref mut ws) = ws_stream {
            // Active connection: multiplex between frames, commands, and the
            // staleness deadline.
            let stale_sleep = tokio::time::sleep_until(stale_deadline);
            tokio::pin!(stale_sleep);

            tokio::select! {
                biased;

                // Heartbeat staleness: nothing arrived in too long.
                _ = &mut stale_sleep, if has_staleness => {
                    log::warn!(
                        "[reink-cable] No frame within {:?}, treating connection as stale",
                        stale_dur
                    );
                    connected.store(false, Ordering::SeqCst);
                    notify_disconnected(
                        &mut subs,
                        &DisconnectReason::new(format!("Heartbeat stale after {:?}", stale_dur)),
                    );
                    ws_stream = None;
                    // Fall through to reconnection
                    continue;
                }

                // Commands from the public API
                cmd = cmd_rx.recv() => {
                    match cmd {
                        Some(ConsumerCmd::Subscribe { identifier, callbacks, result_tx }) => {
                            let key = identifier.key();
                            // A second subscribe under the same identifier
                            // replaces the first; unsubscribe the old binding
                            // on the server so nothing leaks.
                            if subs.contains_key(&key) {
                                log::debug!(
                                    "[reink-cable] Replacing existing subscription '{}', unsubscribing the old one first",
                                    key
                                );
                                let _ = send_unsubscribe(ws, &key).await;
                                subs.remove(&key);
                            }
                            let result = send_subscribe(ws, &key).await;
                            if result.is_ok() {
                                subs.insert(key, ChannelEntry { callbacks, confirmed: false });
                            }
                            let _ = result_tx.send(result);
                        },
                        Some(ConsumerCmd::Unsubscribe { key }) => {
                            if subs.remove(&key).is_some() {
                                let _ = send_unsubscribe(ws, &key).await;
                            } else {
                                log::debug!("[reink-cable] Unsubscribe for unknown key: {}", key);
                            }
                        },
                        Some(ConsumerCmd::Disconnect) | None => {
                            shutdown_requested = true;
                            continue;
                        },
                    }
                }

                // WebSocket frames
                frame = ws.next() => {
                    // Any frame received proves the connection is alive.
                    stale_deadline = TokioInstant::now() + stale_dur;

                    match frame {
                        Some(Ok(Message::Text(text))) => {
                            if text.len() > MAX_TEXT_FRAME_BYTES {
                                log::warn!(
                                    "[reink-cable] Text frame too large ({} bytes), dropping",
                                    text.len()
                                );
                                continue;
                            }
                            match ServerMessage::parse(&text) {
                                Ok(ServerMessage::Protocol(ProtocolFrame::Welcome)) => {
                                    log::debug!("[reink-cable] Welcome frame received");
                                },
                                Ok(ServerMessage::Protocol(ProtocolFrame::Ping { .. })) => {
                                    // Receipt already refreshed the staleness deadline.
                                },
                                Ok(ServerMessage::Protocol(ProtocolFrame::ConfirmSubscription { identifier })) => {
                                    confirm_subscription(&identifier, &mut subs);
                                },
                                Ok(ServerMessage::Protocol(ProtocolFrame::RejectSubscription { identifier })) => {
                                    reject_subscription(&identifier, &mut subs);
                                },
                                Ok(ServerMessage::Protocol(ProtocolFrame::Disconnect { reason, reconnect })) => {
                                    let reason_text = reason
                                        .unwrap_or_else(|| "server requested disconnect".to_string());
                                    let allow_reconnect = reconnect.unwrap_or(true);
                                    log::info!(
                                        "[reink-cable] Server disconnect: {} (reconnect allowed: {})",
                                        reason_text,
                                        allow_reconnect
                                    );
                                    connected.store(false, Ordering::SeqCst);
                                    notify_disconnected(&mut subs, &DisconnectReason::new(reason_text));
                                    if !allow_reconnect {
                                        reconnect_forbidden = true;
                                    }
                                    ws_stream = None;
                                    // Fall through to reconnection
                                    continue;
                                },
                                Ok(ServerMessage::Broadcast { identifier, message }) => {
                                    route_broadcast(&identifier, message, &subs);
                                },
                                Err(e) => {
                                    log::warn!("[reink-cable] Failed to parse frame: {}", e);
                                },
                            }
                        },
                        Some(Ok(Message::Binary(_))) => {
                            // The cable protocol is text-only.
                            log::debug!("[reink-cable] Ignoring unexpected binary frame");
                        },
                        Some(Ok(Message::Close(frame))) => {
                            let reason = if let Some(f) = frame {
                                DisconnectReason::with_code(f.reason.to_string(), f.code.into())
                            } else {
                                DisconnectReason::new("Server closed connection")
                            };
                            connected.store(false, Ordering::SeqCst);
                            notify_disconnected(&mut subs, &reason);
                            ws_stream = None;
                            // Fall through to reconnection
                            continue;
                        },
                        Some(Ok(Message::Ping(payload))) => {
                            let _ = ws.send(Message::Pong(payload)).await;
                        },
                        Some(Ok(Message::Pong(_))) => {},
                        Some(Ok(Message::Frame(_))) => {},
                        Some(Err(e)) => {
                            connected.store(false, Ordering::SeqCst);
                            notify_disconnected(
                                &mut subs,
                                &DisconnectReason::new(format!("WebSocket error: {}", e)),
                            );
                            ws_stream = None;
                            continue;
                        },
                        None => {
                            connected.store(false, Ordering::SeqCst);
                            notify_disconnected(
                                &mut subs,
                                &DisconnectReason::new("WebSocket stream ended"),
                            );
                            ws_stream = None;
                            continue;
                        },
                    }
                }
            }
        } else {
            // ── Not connected: attempt reconnection or drain commands ──

            let can_reconnect = options.auto_reconnect && !reconnect_forbidden;
            if !can_reconnect || shutdown_requested {
                // Just process commands without a connection.
                match cmd_rx.recv().await {
                    Some(ConsumerCmd::Subscribe { result_tx, .. }) => {
                        let _ = result_tx.send(Err(CableError::WebSocketError(
                            "Not connected and reconnection is disabled".to_string(),
                        )));
                    },
                    Some(ConsumerCmd::Unsubscribe { key }) => {
                        subs.remove(&key);
                    },
                    Some(ConsumerCmd::Disconnect) | None => {
                        return;
                    },
                }
                continue;
            }

            // Auto-reconnect with exponential backoff.
            let attempt = reconnect_attempts.fetch_add(1, Ordering::SeqCst);
            if let Some(max) = options.max_reconnect_attempts {
                if attempt >= max {
                    log::warn!(
                        "[reink-cable] Max reconnection attempts ({}) reached, giving up",
                        max
                    );
                    // Subscriptions already saw on_disconnected when the
                    // connection dropped.
                    subs.clear();
                    // Drain remaining commands.
                    loop {
                        match cmd_rx.recv().await {
                            Some(ConsumerCmd::Subscribe { result_tx, .. }) => {
                                let _ = result_tx.send(Err(CableError::WebSocketError(
                                    "Max reconnection attempts reached".to_string(),
                                )));
                            },
                            Some(ConsumerCmd::Unsubscribe { .. }) => {},
                            Some(ConsumerCmd::Disconnect) | None => return,
                        }
                    }
                }
            }

            let delay = std::cmp::min(
                options.reconnect_delay_ms.saturating_mul(2u64.saturating_pow(attempt)),
                options.max_reconnect_delay_ms,
            );
            log::info!(
                "[reink-cable] Attempting reconnection in {}ms (attempt {})",
                delay,
                attempt + 1
            );

            // Wait for the backoff delay while still serving commands.
            let sleep_fut = tokio::time::sleep(Duration::from_millis(delay));
            tokio::pin!(sleep_fut);

            let mut got_shutdown = false;
            loop {
                tokio::select! {
                    biased;
                    cmd = cmd_rx.recv() => {
                        match cmd {
                            Some(ConsumerCmd::Subscribe { identifier, callbacks, result_tx }) => {
                                // Queue the subscription; the resubscribe
                                // pass sends it once the connection returns.
                                let key = identifier.key();
                                if subs.contains_key(&key) {
                                    log::debug!(
                                        "[reink-cable] Replacing queued subscription '{}' during reconnect",
                                        key
                                    );
                                }
                                subs.insert(key, ChannelEntry { callbacks, confirmed: false });
                                let _ = result_tx.send(Ok(()));
                            },
                            Some(ConsumerCmd::Unsubscribe { key }) => {
                                subs.remove(&key);
                            },
                            Some(ConsumerCmd::Disconnect) | None => {
                                got_shutdown = true;
                                break;
                            },
                        }
                    }
                    _ = &mut sleep_fut => {
                        break;
                    }
                }
            }

            if got_shutdown {
                shutdown_requested = true;
                continue;
            }

            // Attempt reconnection.
            match establish_cable(&url, &timeouts).await {
                Ok(mut stream) => {
                    log::info!("[reink-cable] Reconnection successful");
                    reconnect_attempts.store(0, Ordering::SeqCst);
                    connected.store(true, Ordering::SeqCst);

                    // Re-subscribe all active channels; their confirmations
                    // re-fire on_connected.
                    resubscribe_all(&mut stream, &subs).await;

                    ws_stream = Some(stream);
                    stale_deadline = TokioInstant::now() + stale_dur;
                },
                Err(e) => {
                    log::warn!(
                        "[reink-cable] Reconnection attempt {} failed: {}",
                        attempt + 1,
                        e
                    );
                    // Loop back to try again; the next iteration computes a
                    // new delay from the incremented attempt counter.
                },
            }
        }
    }
}
