//! Shared test doubles for the cable client test suite.
//!
//! `MockTransport` implements [`Transport`] without opening sockets: every
//! `create_consumer` call is recorded and hands out a `MockConsumer` that
//! records subscribe/unsubscribe/disconnect calls and lets tests drive the
//! lifecycle events (confirmations, broadcasts, disconnects) by hand.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use url::Url;

use reink_cable::{
    CableError, ChannelCallbacks, ChannelIdentifier, Consumer, DisconnectReason, Result, Transport,
};

/// Transport double. Records every `create_consumer` call and the URL it was
/// given; optionally delays creation so tests can race concurrent callers.
#[derive(Default)]
pub struct MockTransport {
    create_delay: Option<Duration>,
    fail_creates: AtomicBool,
    creates: AtomicUsize,
    urls: Mutex<Vec<Url>>,
    consumers: Mutex<Vec<Arc<MockConsumer>>>,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// A transport whose creations take `delay` to complete, exposing any
    /// missing single-flight guard in the caller.
    pub fn with_create_delay(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            create_delay: Some(delay),
            ..Self::default()
        })
    }

    /// Make subsequent `create_consumer` calls fail.
    pub fn fail_creates(&self, fail: bool) {
        self.fail_creates.store(fail, Ordering::SeqCst);
    }

    /// Number of consumers created so far.
    pub fn create_count(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    /// The URL passed to the most recent `create_consumer` call.
    pub fn last_url(&self) -> Option<Url> {
        self.urls.lock().unwrap().last().cloned()
    }

    /// The consumer created by the `n`th `create_consumer` call.
    pub fn consumer(&self, n: usize) -> Arc<MockConsumer> {
        self.consumers.lock().unwrap()[n].clone()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn create_consumer(&self, url: Url) -> Result<Arc<dyn Consumer>> {
        if let Some(delay) = self.create_delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_creates.load(Ordering::SeqCst) {
            return Err(CableError::WebSocketError(
                "mock transport refused the connection".to_string(),
            ));
        }
        self.creates.fetch_add(1, Ordering::SeqCst);
        self.urls.lock().unwrap().push(url);

        let consumer = Arc::new(MockConsumer::default());
        self.consumers.lock().unwrap().push(consumer.clone());
        Ok(consumer)
    }
}

/// Consumer double. Holds the registered callbacks per identifier key and
/// counts every call so tests can assert exact transport-level traffic.
#[derive(Default)]
pub struct MockConsumer {
    subscriptions: Mutex<HashMap<String, ChannelCallbacks>>,
    subscribe_calls: AtomicUsize,
    unsubscribe_calls: AtomicUsize,
    disconnect_calls: AtomicUsize,
    /// How many subscribes replaced an existing binding under the same key.
    replaced: AtomicUsize,
    disconnected: AtomicBool,
}

impl std::fmt::Debug for MockConsumer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockConsumer")
            .field("subscribe_calls", &self.subscribe_calls)
            .field("unsubscribe_calls", &self.unsubscribe_calls)
            .field("disconnect_calls", &self.disconnect_calls)
            .field("replaced", &self.replaced)
            .field("disconnected", &self.disconnected)
            .finish_non_exhaustive()
    }
}

impl MockConsumer {
    pub fn subscribe_count(&self) -> usize {
        self.subscribe_calls.load(Ordering::SeqCst)
    }

    pub fn unsubscribe_count(&self) -> usize {
        self.unsubscribe_calls.load(Ordering::SeqCst)
    }

    pub fn disconnect_count(&self) -> usize {
        self.disconnect_calls.load(Ordering::SeqCst)
    }

    pub fn replaced_count(&self) -> usize {
        self.replaced.load(Ordering::SeqCst)
    }

    /// Identifier keys currently held, sorted.
    pub fn subscription_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> =
            self.subscriptions.lock().unwrap().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Drive the server-confirmed event for `key`.
    pub fn emit_connected(&self, key: &str) {
        if let Some(callbacks) = self.subscriptions.lock().unwrap().get(key) {
            callbacks.emit_connected();
        }
    }

    /// Drive a disconnect event for every held subscription.
    pub fn emit_disconnected_all(&self, reason: &str) {
        for callbacks in self.subscriptions.lock().unwrap().values() {
            callbacks.emit_disconnected(DisconnectReason::new(reason));
        }
    }

    /// Route a broadcast payload to the subscription under `key`. Returns
    /// whether a subscription was found.
    pub fn route_message(&self, key: &str, payload: JsonValue) -> bool {
        match self.subscriptions.lock().unwrap().get(key) {
            Some(callbacks) => {
                callbacks.emit_message(payload);
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl Consumer for MockConsumer {
    async fn subscribe(
        &self,
        identifier: ChannelIdentifier,
        callbacks: ChannelCallbacks,
    ) -> Result<()> {
        self.subscribe_calls.fetch_add(1, Ordering::SeqCst);
        let mut subs = self.subscriptions.lock().unwrap();
        if subs.insert(identifier.key(), callbacks).is_some() {
            self.replaced.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }

    async fn unsubscribe(&self, identifier: &ChannelIdentifier) -> Result<()> {
        self.unsubscribe_calls.fetch_add(1, Ordering::SeqCst);
        self.subscriptions.lock().unwrap().remove(&identifier.key());
        Ok(())
    }

    async fn disconnect(&self) {
        self.disconnect_calls.fetch_add(1, Ordering::SeqCst);
        self.disconnected.store(true, Ordering::SeqCst);
        self.subscriptions.lock().unwrap().clear();
    }

    fn is_connected(&self) -> bool {
        !self.disconnected.load(Ordering::SeqCst)
    }
}

/// Poll `condition` until it holds or `deadline` elapses.
pub async fn wait_until(deadline: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let start = tokio::time::Instant::now();
    while start.elapsed() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}
