//! Topic-keyed publish/subscribe channels.
//!
//! `SessionChannels` is the in-process bus that couples the out-of-band email
//! click handler with the long-lived client connection waiting on the same
//! session: topics are named by session id and carry raw signed token
//! strings. It uses tokio's broadcast channel per topic for multi-producer,
//! multi-consumer messaging.
//!
//! Publishing to a topic nobody subscribes to is a no-op (the click arrived
//! before - or after - the connection; the caller does not care). Topic
//! entries are removed when the last receiver goes away so an abandoned
//! session does not pin a sender forever.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::broadcast;

/// Default buffer size per topic. A topic normally sees a single message
/// (the validation token) so a small buffer is plenty.
const TOPIC_BUFFER_SIZE: usize = 16;

/// Topic-keyed broadcaster.
///
/// Cheap to clone; all clones share the same topic registry.
///
/// # Example
///
/// ```
/// use fidovault_core::pubsub::SessionChannels;
///
/// # tokio_test::block_on(async {
/// let channels = SessionChannels::new();
/// let mut rx = channels.subscribe("session-1");
/// channels.publish("session-1", "signed-token");
/// assert_eq!(rx.recv().await.unwrap(), "signed-token");
/// # });
/// ```
#[derive(Clone, Default)]
pub struct SessionChannels {
    topics: Arc<DashMap<String, broadcast::Sender<String>>>,
}

impl SessionChannels {
    /// Creates an empty channel registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Publishes a payload on the named topic.
    ///
    /// Returns the number of subscribers that received it; 0 if the topic has
    /// no active subscribers.
    pub fn publish(&self, topic: &str, payload: impl Into<String>) -> usize {
        match self.topics.get(topic) {
            Some(sender) => sender.send(payload.into()).unwrap_or_default(),
            None => 0,
        }
    }

    /// Subscribes to the named topic, creating it on first use.
    ///
    /// Only payloads published after subscription are received.
    pub fn subscribe(&self, topic: &str) -> broadcast::Receiver<String> {
        self.topics
            .entry(topic.to_string())
            .or_insert_with(|| broadcast::channel(TOPIC_BUFFER_SIZE).0)
            .subscribe()
    }

    /// Drops the topic entry if no receivers remain.
    ///
    /// Called by subscribers when they stop listening; keeps the registry
    /// from accumulating senders for finished sessions.
    pub fn release(&self, topic: &str) {
        self.topics
            .remove_if(topic, |_, sender| sender.receiver_count() == 0);
    }

    /// Number of active subscribers on a topic.
    #[must_use]
    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.topics
            .get(topic)
            .map_or(0, |sender| sender.receiver_count())
    }

    /// Number of live topics (mostly useful in tests).
    #[must_use]
    pub fn topic_count(&self) -> usize {
        self.topics.len()
    }
}

impl std::fmt::Debug for SessionChannels {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionChannels")
            .field("topics", &self.topics.len())
            .finish()
    }
}
