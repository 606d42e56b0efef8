//! In-process fan-out of push events.
//!
//! A `ChangeFeed` hands every emitted `PushEvent` to each registered
//! `mpsc::Sender`. Stores emit into it after a mutation commits; remote
//! realtime adapters emit into a store's relay feed.

use super::PushEvent;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

struct FeedInner {
    next_id: AtomicU64,
    subscribers: Mutex<Vec<(u64, Sender<PushEvent>)>>,
}

impl FeedInner {
    fn subscribers(&self) -> MutexGuard<'_, Vec<(u64, Sender<PushEvent>)>> {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Cloneable handle; clones share the same subscriber set.
#[derive(Clone)]
pub struct ChangeFeed {
    inner: Arc<FeedInner>,
}

impl ChangeFeed {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(FeedInner {
                next_id: AtomicU64::new(1),
                subscribers: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Registers a sink until the returned subscription is cancelled.
    pub fn subscribe(&self, sink: Sender<PushEvent>) -> Subscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner.subscribers().push((id, sink));
        Subscription {
            id,
            feed: Arc::downgrade(&self.inner),
            active: true,
        }
    }

    /// Delivers `event` to every live subscriber and returns how many
    /// received it. Subscribers whose receiver is gone are dropped.
    pub fn emit(&self, event: PushEvent) -> usize {
        let mut subscribers = self.inner.subscribers();
        subscribers.retain(|(_, sink)| sink.send(event.clone()).is_ok());
        subscribers.len()
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers().len()
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new()
    }
}

/// Registration handle returned by `Store::subscribe`.
///
/// Cancelled on drop, so a disposed consumer never keeps receiving.
pub struct Subscription {
    id: u64,
    feed: Weak<FeedInner>,
    active: bool,
}

impl Subscription {
    /// Stops delivery. Cancelling twice is a no-op.
    pub fn cancel(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;
        if let Some(feed) = self.feed.upgrade() {
            feed.subscribers().retain(|(id, _)| *id != self.id);
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.active)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::ChangeFeed;
    use crate::store::PushEvent;
    use std::sync::mpsc;

    #[test]
    fn emit_reaches_every_subscriber() {
        let feed = ChangeFeed::new();
        let (tx_a, rx_a) = mpsc::channel();
        let (tx_b, rx_b) = mpsc::channel();
        let _sub_a = feed.subscribe(tx_a);
        let _sub_b = feed.subscribe(tx_b);

        assert_eq!(feed.emit(PushEvent::Deleted("x".to_string())), 2);
        assert_eq!(rx_a.try_recv().unwrap(), PushEvent::Deleted("x".to_string()));
        assert_eq!(rx_b.try_recv().unwrap(), PushEvent::Deleted("x".to_string()));
    }

    #[test]
    fn cancelled_or_dropped_subscriptions_stop_delivery() {
        let feed = ChangeFeed::new();
        let (tx_a, rx_a) = mpsc::channel();
        let (tx_b, _rx_b) = mpsc::channel();
        let mut sub_a = feed.subscribe(tx_a);
        let sub_b = feed.subscribe(tx_b);

        sub_a.cancel();
        sub_a.cancel();
        assert!(!sub_a.is_active());
        drop(sub_b);
        assert_eq!(feed.subscriber_count(), 0);

        assert_eq!(feed.emit(PushEvent::Deleted("y".to_string())), 0);
        assert!(rx_a.try_recv().is_err());
    }

    #[test]
    fn disconnected_receivers_are_pruned_on_emit() {
        let feed = ChangeFeed::new();
        let (tx, rx) = mpsc::channel();
        let _sub = feed.subscribe(tx);
        drop(rx);

        assert_eq!(feed.emit(PushEvent::Deleted("z".to_string())), 0);
        assert_eq!(feed.subscriber_count(), 0);
    }

    #[test]
    fn subscription_outliving_feed_cancels_quietly() {
        let feed = ChangeFeed::new();
        let (tx, _rx) = mpsc::channel();
        let mut sub = feed.subscribe(tx);
        drop(feed);
        sub.cancel();
        assert!(!sub.is_active());
    }
}
