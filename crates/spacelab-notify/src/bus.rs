//! Topic-based publish/subscribe for change events.
//!
//! Delivery is synchronous: [`EventBus::publish`] invokes every callback
//! registered on the event's topic, in registration order, before it
//! returns. The registry lock is released before the first callback runs, so
//! a callback may subscribe or unsubscribe (itself included) without
//! deadlocking; such changes take effect from the next publish.
//!
//! Callbacks run on the engine's task and must not block. A callback that
//! panics is logged and skipped; the remaining subscribers still receive the
//! event and the engine keeps running.

use std::collections::BTreeMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use spacelab_types::{Event, Topic};
use tracing::warn;
use uuid::Uuid;

/// A subscriber callback.
pub type Callback = Arc<dyn Fn(&Event) + Send + Sync>;

/// Unique identifier for one subscription (UUID v7, time-ordered).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(pub Uuid);

impl SubscriptionId {
    /// Create a new identifier using UUID v7.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for SubscriptionId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Returned by [`EventBus::subscribe`]; pass it back to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle {
    id: SubscriptionId,
    topic: Topic,
}

impl SubscriptionHandle {
    /// The subscription's id.
    pub const fn id(&self) -> SubscriptionId {
        self.id
    }

    /// The topic the subscription listens on.
    pub const fn topic(&self) -> Topic {
        self.topic
    }
}

struct Subscriber {
    id: SubscriptionId,
    callback: Callback,
}

/// Subscriber registry keyed by topic.
pub struct EventBus {
    topics: RwLock<BTreeMap<Topic, Vec<Subscriber>>>,
    slow_threshold: Duration,
}

impl EventBus {
    /// A bus that warns about callbacks slower than `slow_threshold`.
    pub fn new(slow_threshold: Duration) -> Self {
        Self {
            topics: RwLock::new(BTreeMap::new()),
            slow_threshold,
        }
    }

    /// Register `callback` for every future event on `topic`.
    pub fn subscribe<F>(&self, topic: Topic, callback: F) -> SubscriptionHandle
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        let id = SubscriptionId::new();
        self.topics
            .write()
            .entry(topic)
            .or_default()
            .push(Subscriber {
                id,
                callback: Arc::new(callback),
            });
        SubscriptionHandle { id, topic }
    }

    /// Remove a subscription. Returns `false` if it was already gone.
    ///
    /// Other subscriptions, including others on the same topic, are
    /// unaffected.
    pub fn unsubscribe(&self, handle: &SubscriptionHandle) -> bool {
        let mut topics = self.topics.write();
        let Some(subscribers) = topics.get_mut(&handle.topic) else {
            return false;
        };
        let before = subscribers.len();
        subscribers.retain(|s| s.id != handle.id);
        subscribers.len() != before
    }

    /// Number of live subscriptions on `topic`.
    pub fn subscriber_count(&self, topic: Topic) -> usize {
        self.topics.read().get(&topic).map_or(0, Vec::len)
    }

    /// Deliver `event` to every subscriber of its topic.
    ///
    /// Returns the number of callbacks invoked (a callback that panicked
    /// still counts as invoked).
    pub fn publish(&self, event: &Event) -> usize {
        let topic = event.topic();
        let callbacks: Vec<(SubscriptionId, Callback)> = self
            .topics
            .read()
            .get(&topic)
            .map(|subscribers| {
                subscribers
                    .iter()
                    .map(|s| (s.id, Arc::clone(&s.callback)))
                    .collect()
            })
            .unwrap_or_default();

        for (id, callback) in &callbacks {
            let started = Instant::now();
            let outcome = catch_unwind(AssertUnwindSafe(|| callback(event)));
            let elapsed = started.elapsed();

            if outcome.is_err() {
                warn!(%topic, subscription = %id, "Subscriber panicked; skipped");
            }
            if elapsed > self.slow_threshold {
                warn!(
                    %topic,
                    subscription = %id,
                    elapsed = ?elapsed,
                    threshold = ?self.slow_threshold,
                    "Slow subscriber; callbacks must not block"
                );
            }
        }
        callbacks.len()
    }
}

impl core::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let topics = self.topics.read();
        let mut map = f.debug_map();
        for (topic, subscribers) in topics.iter() {
            map.entry(topic, &subscribers.len());
        }
        map.finish()
    }
}
