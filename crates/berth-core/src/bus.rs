use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tracing::{debug, warn};

/// Topic carrying every status mutation.
pub const STATUS_TOPIC: &str = "container-status";

const DEFAULT_CAPACITY: usize = 256;

/// Per-container status topic: `container-status/<name>-<env>`.
pub fn status_topic(name: &str, environment: &str) -> String {
    format!("{STATUS_TOPIC}/{name}-{environment}")
}

/// Log topic: `<name>-<discriminator>`.
pub fn log_topic(name: &str, discriminator: &str) -> String {
    format!("{name}-{discriminator}")
}

struct Topic<T> {
    id: u64,
    sender: broadcast::Sender<T>,
}

type TopicMap<T> = Mutex<HashMap<String, Topic<T>>>;

// A panic while holding the map cannot leave it half-updated.
fn lock_topics<T>(topics: &TopicMap<T>) -> MutexGuard<'_, HashMap<String, Topic<T>>> {
    topics.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Topic-addressed, fire-and-forget broadcast.
///
/// Topics are created lazily by the first subscriber and forgotten when the
/// last one goes away. Publishing to a topic nobody listens to drops the
/// message.
pub struct EventBus<T> {
    capacity: usize,
    next_id: AtomicU64,
    topics: Arc<TopicMap<T>>,
}

impl<T: Clone + Send + 'static> Default for EventBus<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Send + 'static> EventBus<T> {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// `capacity` bounds how far a subscriber may fall behind before it
    /// starts losing messages.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            next_id: AtomicU64::new(0),
            topics: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn topics(&self) -> MutexGuard<'_, HashMap<String, Topic<T>>> {
        lock_topics(&self.topics)
    }

    /// Deliver `message` to the current subscribers of `topic`.
    ///
    /// Returns the number of subscribers reached.
    pub fn publish(&self, topic: &str, message: T) -> usize {
        let topics = self.topics();
        let Some(entry) = topics.get(topic) else {
            debug!("no subscribers on {topic}; message dropped");
            return 0;
        };
        let reached = entry.sender.send(message).unwrap_or(0);
        debug!("published on {topic} to {reached} subscriber(s)");
        reached
    }

    pub fn subscribe(&self, topic: &str) -> Subscription<T> {
        let mut topics = self.topics();
        let (id, receiver) = match topics.get(topic) {
            Some(entry) => (entry.id, entry.sender.subscribe()),
            None => {
                let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                let (sender, receiver) = broadcast::channel(self.capacity);
                topics.insert(topic.to_owned(), Topic { id, sender });
                (id, receiver)
            }
        };
        debug!("subscribed to {topic}");
        Subscription {
            topic: topic.to_owned(),
            topic_id: id,
            receiver,
            topics: Arc::downgrade(&self.topics),
        }
    }

    /// Drop the topic. Subscribers drain what was already published and then
    /// observe the end of the stream.
    pub fn close(&self, topic: &str) {
        if self.topics().remove(topic).is_some() {
            debug!("closed topic {topic}");
        }
    }

    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.topics()
            .get(topic)
            .map_or(0, |entry| entry.sender.receiver_count())
    }

    pub fn topics_snapshot(&self) -> Vec<String> {
        let mut names: Vec<String> = self.topics().keys().cloned().collect();
        names.sort();
        names
    }
}

/// Receiving end of one topic. Dropping it cancels the subscription, and
/// dropping the last one forgets the topic.
pub struct Subscription<T> {
    topic: String,
    topic_id: u64,
    receiver: broadcast::Receiver<T>,
    topics: Weak<TopicMap<T>>,
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        let Some(topics) = self.topics.upgrade() else {
            return;
        };
        let mut topics = lock_topics(&topics);
        // Our own receiver is still alive here. A topic that was closed and
        // re-created under the same name has a different id.
        let last = topics.get(&self.topic).is_some_and(|entry| {
            entry.id == self.topic_id && entry.sender.receiver_count() <= 1
        });
        if last {
            topics.remove(&self.topic);
            debug!("last subscriber left {}; topic removed", self.topic);
        }
    }
}

impl<T: Clone> Subscription<T> {
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Next message, or `None` once the topic is closed and drained.
    pub async fn recv(&mut self) -> Option<T> {
        loop {
            match self.receiver.recv().await {
                Ok(message) => return Some(message),
                Err(RecvError::Lagged(missed)) => {
                    warn!("subscriber on {} lagged; skipped {missed} message(s)", self.topic);
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Next message if one is already buffered.
    pub fn try_recv(&mut self) -> Option<T> {
        loop {
            match self.receiver.try_recv() {
                Ok(message) => return Some(message),
                Err(TryRecvError::Lagged(missed)) => {
                    warn!("subscriber on {} lagged; skipped {missed} message(s)", self.topic);
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => return None,
            }
        }
    }

    /// Everything currently buffered, in publish order.
    pub fn drain(&mut self) -> Vec<T> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }
}
