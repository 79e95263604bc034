//! Observer registry for status changes
//!
//! Decouples UI indicators (badges, toasts) from connectivity and queue
//! internals: interested parties register a callback and are notified on
//! every change. An explicit registry rather than a single overwritable
//! slot, so any number of indicators can coexist.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

type Subscriber<T> = Arc<dyn Fn(T) + Send + Sync>;

/// Handle returned by [`StatusPublisher::subscribe`], used to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionToken(u64);

/// A registry of interested callbacks
///
/// `notify` delivers the value to every current subscriber. Callbacks run
/// synchronously on the notifying task and must not block; anything
/// long-running should be spawned by the callback itself.
pub struct StatusPublisher<T> {
    subscribers: std::sync::Mutex<Vec<(u64, Subscriber<T>)>>,
    next_token: AtomicU64,
}

impl<T: Clone> Default for StatusPublisher<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> StatusPublisher<T> {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            subscribers: std::sync::Mutex::new(Vec::new()),
            next_token: AtomicU64::new(1),
        }
    }

    /// Register a callback; returns a token for unsubscription
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionToken
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        let token = self.next_token.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut subscribers) = self.subscribers.lock() {
            subscribers.push((token, Arc::new(callback)));
        }
        SubscriptionToken(token)
    }

    /// Remove a subscriber
    ///
    /// Unsubscribing an already-removed token is a no-op.
    pub fn unsubscribe(&self, token: SubscriptionToken) {
        if let Ok(mut subscribers) = self.subscribers.lock() {
            subscribers.retain(|(id, _)| *id != token.0);
        }
    }

    /// Deliver a value to every current subscriber
    pub fn notify(&self, value: T) {
        // Snapshot outside the lock so a callback may subscribe/unsubscribe
        let snapshot: Vec<Subscriber<T>> = match self.subscribers.lock() {
            Ok(subscribers) => subscribers.iter().map(|(_, cb)| cb.clone()).collect(),
            Err(_) => return,
        };
        for callback in snapshot {
            callback(value.clone());
        }
    }

    /// Number of registered subscribers
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().map(|s| s.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;

    #[test]
    fn test_subscribers_receive_notifications() {
        let publisher = StatusPublisher::new();
        let seen = Arc::new(AtomicUsize::new(0));

        let seen_a = seen.clone();
        publisher.subscribe(move |online: bool| {
            if online {
                seen_a.fetch_add(1, Ordering::SeqCst);
            }
        });
        let seen_b = seen.clone();
        publisher.subscribe(move |online: bool| {
            if online {
                seen_b.fetch_add(1, Ordering::SeqCst);
            }
        });

        publisher.notify(true);
        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_unsubscribe_is_idempotent() {
        let publisher = StatusPublisher::new();
        let seen = Arc::new(AtomicUsize::new(0));

        let seen_clone = seen.clone();
        let token = publisher.subscribe(move |_: bool| {
            seen_clone.fetch_add(1, Ordering::SeqCst);
        });

        publisher.unsubscribe(token);
        publisher.unsubscribe(token);

        publisher.notify(true);
        assert_eq!(seen.load(Ordering::SeqCst), 0);
        assert_eq!(publisher.subscriber_count(), 0);
    }

    #[test]
    fn test_unsubscribe_leaves_other_subscribers() {
        let publisher = StatusPublisher::new();
        let seen = Arc::new(AtomicUsize::new(0));

        let seen_clone = seen.clone();
        let token = publisher.subscribe(move |_: bool| {});
        publisher.subscribe(move |_: bool| {
            seen_clone.fetch_add(1, Ordering::SeqCst);
        });

        publisher.unsubscribe(token);
        publisher.notify(false);

        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }
}
