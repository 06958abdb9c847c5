//! Reactive value container.
//!
//! [`Observable`] wraps `tokio::sync::watch` so state holders expose
//! "current value plus change notification" without hand-rolled listener
//! lists. Readers either poll with [`get`](Observable::get) or call
//! [`subscribe`](Observable::subscribe) for a receiver and await changes.

use std::fmt;

use tokio::sync::watch;

/// A single observable value.
///
/// Setting a value notifies every subscribed receiver, even when the new
/// value equals the old one. Receivers that only care about distinct values
/// can filter with `watch::Receiver::wait_for`.
pub struct Observable<T> {
    tx: watch::Sender<T>,
}

impl<T: Clone> Observable<T> {
    /// Create an observable holding `initial`.
    pub fn new(initial: T) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx }
    }

    /// Clone of the current value.
    pub fn get(&self) -> T {
        self.tx.borrow().clone()
    }

    /// Replace the value and notify subscribers.
    pub fn set(&self, value: T) {
        self.tx.send_replace(value);
    }

    /// Modify the value in place and notify subscribers.
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        self.tx.send_modify(f);
    }

    /// New receiver observing this value.
    ///
    /// The receiver sees the current value immediately and every change
    /// afterwards.
    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.tx.subscribe()
    }
}

impl<T: Clone + Default> Default for Observable<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: fmt::Debug> fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Observable").field(&*self.tx.borrow()).finish()
    }
}
