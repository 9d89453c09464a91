use dashmap::DashMap;
use tokio::sync::broadcast;

use crate::model::{Event, Topic};

const CHANNEL_CAPACITY: usize = 256;

/// Broadcast hub for live change feeds, one channel per topic.
pub struct NotifyHub {
    channels: DashMap<Topic, broadcast::Sender<Event>>,
}

impl Default for NotifyHub {
    fn default() -> Self {
        Self::new()
    }
}

impl NotifyHub {
    pub fn new() -> Self {
        Self {
            channels: DashMap::new(),
        }
    }

    /// Subscribe to a topic. Creates the channel if needed.
    pub fn subscribe(&self, topic: Topic) -> broadcast::Receiver<Event> {
        self.channels
            .entry(topic)
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe()
    }

    /// Send a notification. No-op if nobody is listening; a channel whose
    /// last receiver has gone is dropped.
    pub fn send(&self, topic: Topic, event: &Event) {
        let closed = match self.channels.get(&topic) {
            Some(sender) => sender.send(event.clone()).is_err(),
            None => return,
        };
        if closed {
            self.channels
                .remove_if(&topic, |_, sender| sender.receiver_count() == 0);
        }
    }

    pub fn subscriber_count(&self, topic: Topic) -> usize {
        self.channels
            .get(&topic)
            .map(|s| s.receiver_count())
            .unwrap_or(0)
    }
}
