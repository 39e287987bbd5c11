//! Topic-based publish/subscribe bus for behavior events.
//!
//! Uses [`tokio::sync::broadcast`] channels so every subscriber receives
//! every message and a slow subscriber never blocks the poll loop.
//!
//! | Topic | Traffic |
//! |---|---|
//! | [`Topic::Behavior`] | mode armed/cleared, turn completions, proximity breaches |
//! | [`Topic::Alerts`] | rejected directives and hard faults |
//!
//! Publishing is fire-and-forget: having no subscriber is the normal case on
//! the robot and is not reported as an error.

use fetchbot_types::{Event, EventPayload};
use tokio::sync::broadcast;
use tracing::trace;

/// Number of buffered events before the oldest are dropped for a lagging
/// subscriber.
const DEFAULT_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    Behavior,
    Alerts,
}

impl Topic {
    /// The lane an event belongs on, judged by its payload.
    pub fn of(payload: &EventPayload) -> Topic {
        match payload {
            EventPayload::DirectiveRejected { .. } | EventPayload::Fault { .. } => Topic::Alerts,
            _ => Topic::Behavior,
        }
    }
}

/// Shared event bus.  Clones share the same underlying channels.
#[derive(Clone, Debug)]
pub struct EventBus {
    behavior: broadcast::Sender<Event>,
    alerts: broadcast::Sender<Event>,
}

impl EventBus {
    /// `capacity` is applied to every topic channel independently.
    pub fn new(capacity: usize) -> Self {
        let (behavior, _) = broadcast::channel(capacity);
        let (alerts, _) = broadcast::channel(capacity);
        Self { behavior, alerts }
    }

    /// Publish `event` on the topic chosen by [`Topic::of`].
    ///
    /// Returns the number of subscribers that were handed the event.
    pub fn publish(&self, event: Event) -> usize {
        let topic = Topic::of(&event.payload);
        self.publish_to(topic, event)
    }

    pub fn publish_to(&self, topic: Topic, event: Event) -> usize {
        trace!(?topic, source = %event.source, "publishing event");
        // SendError only means nobody is listening.
        self.sender(topic).send(event).unwrap_or(0)
    }

    pub fn subscribe_to(&self, topic: Topic) -> TopicReceiver {
        TopicReceiver {
            topic,
            receiver: self.sender(topic).subscribe(),
        }
    }

    fn sender(&self, topic: Topic) -> &broadcast::Sender<Event> {
        match topic {
            Topic::Behavior => &self.behavior,
            Topic::Alerts => &self.alerts,
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// Receiver bound to a single [`Topic`].
pub struct TopicReceiver {
    topic: Topic,
    receiver: broadcast::Receiver<Event>,
}

impl TopicReceiver {
    /// Wait for the next event on this topic.
    pub async fn recv(&mut self) -> Result<Event, broadcast::error::RecvError> {
        self.receiver.recv().await
    }

    /// Non-blocking receive, for synchronous callers.
    pub fn try_recv(&mut self) -> Result<Event, broadcast::error::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Drain every event currently buffered, skipping over any lag gap.
    pub fn drain(&mut self) -> Vec<Event> {
        let mut events = Vec::new();
        loop {
            match self.receiver.try_recv() {
                Ok(event) => events.push(event),
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                Err(_) => break,
            }
        }
        events
    }

    pub fn topic(&self) -> Topic {
        self.topic
    }
}
