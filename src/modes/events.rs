//! Lifecycle Event Bus
//!
//! Broadcasts mode lifecycle events to whoever is listening (UI, analytics).
//! Publishing never requires a subscriber. Subscribers can narrow what they
//! receive with topic patterns; `mode:*` matches every `mode:` topic and `*`
//! matches everything.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};

use crate::error::ErrorResponse;
use crate::models::mode::{ModeData, ModeOptions, ModeUsage};

pub const TOPIC_REGISTERED: &str = "mode:registered";
pub const TOPIC_UNREGISTERED: &str = "mode:unregistered";
pub const TOPIC_STARTED: &str = "mode:started";
pub const TOPIC_STOPPED: &str = "mode:stopped";
pub const TOPIC_ERROR: &str = "mode:error";
pub const TOPIC_SESSION_ENDED: &str = "session:ended";

/// Lifecycle events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ModeEvent {
    ModeRegistered {
        mode_id: String,
    },
    ModeUnregistered {
        mode_id: String,
    },
    ModeStarted {
        mode_id: String,
        data: ModeData,
        options: ModeOptions,
    },
    ModeStopped {
        mode_id: String,
    },
    ModeError {
        mode_id: String,
        error: ErrorResponse,
    },
    /// Emitted by a mode itself when it runs out of items
    SessionEnded {
        mode: String,
        state: Value,
        metrics: ModeUsage,
    },
}

impl ModeEvent {
    pub fn topic(&self) -> &'static str {
        match self {
            ModeEvent::ModeRegistered { .. } => TOPIC_REGISTERED,
            ModeEvent::ModeUnregistered { .. } => TOPIC_UNREGISTERED,
            ModeEvent::ModeStarted { .. } => TOPIC_STARTED,
            ModeEvent::ModeStopped { .. } => TOPIC_STOPPED,
            ModeEvent::ModeError { .. } => TOPIC_ERROR,
            ModeEvent::SessionEnded { .. } => TOPIC_SESSION_ENDED,
        }
    }

    pub fn mode_id(&self) -> &str {
        match self {
            ModeEvent::ModeRegistered { mode_id }
            | ModeEvent::ModeUnregistered { mode_id }
            | ModeEvent::ModeStarted { mode_id, .. }
            | ModeEvent::ModeStopped { mode_id }
            | ModeEvent::ModeError { mode_id, .. } => mode_id,
            ModeEvent::SessionEnded { mode, .. } => mode,
        }
    }
}

/// Subscription topic with wildcard support
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct SubscriptionTopic {
    topic: String,
    is_wildcard: bool,
    prefix: String,
}

impl SubscriptionTopic {
    pub fn new(topic: &str) -> Self {
        let is_wildcard = topic == "*" || topic.ends_with(":*");
        let prefix = if topic == "*" {
            String::new()
        } else if is_wildcard {
            topic[..topic.len() - 2].to_string()
        } else {
            topic.to_string()
        };

        Self {
            topic: topic.to_string(),
            is_wildcard,
            prefix,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.topic
    }

    pub fn matches(&self, topic: &str) -> bool {
        if !self.is_wildcard {
            return self.topic == topic;
        }
        if self.prefix.is_empty() {
            return true;
        }
        topic.starts_with(&self.prefix)
            && topic.len() > self.prefix.len()
            && topic.as_bytes()[self.prefix.len()] == b':'
    }
}

/// Shared event bus; cheap to clone
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<ModeEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Returns how many subscribers received the event
    pub fn publish(&self, event: ModeEvent) -> usize {
        let topic = event.topic();
        match self.sender.send(event) {
            Ok(receivers) => receivers,
            Err(_) => {
                tracing::trace!("No subscribers for {}", topic);
                0
            }
        }
    }

    /// Receive every event
    pub fn subscribe(&self) -> EventSubscriber {
        self.subscribe_to(&["*"])
    }

    /// Receive events matching any of `topics`
    pub fn subscribe_to(&self, topics: &[&str]) -> EventSubscriber {
        EventSubscriber {
            rx: self.sender.subscribe(),
            topics: topics.iter().map(|t| SubscriptionTopic::new(t)).collect(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(64)
    }
}

/// Filtered receiver
#[derive(Debug)]
pub struct EventSubscriber {
    rx: broadcast::Receiver<ModeEvent>,
    topics: Vec<SubscriptionTopic>,
}

impl EventSubscriber {
    fn wants(&self, event: &ModeEvent) -> bool {
        let topic = event.topic();
        self.topics.iter().any(|t| t.matches(topic))
    }

    /// Wait for the next matching event; `None` once the bus is gone
    pub async fn recv(&mut self) -> Option<ModeEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) if self.wants(&event) => return Some(event),
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!("Event subscriber lagged, {} events dropped", skipped);
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Next matching event already queued, without waiting
    pub fn try_recv(&mut self) -> Option<ModeEvent> {
        loop {
            match self.rx.try_recv() {
                Ok(event) if self.wants(&event) => return Some(event),
                Ok(_) => continue,
                Err(TryRecvError::Lagged(skipped)) => {
                    tracing::warn!("Event subscriber lagged, {} events dropped", skipped);
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return None,
            }
        }
    }

    /// All matching events already queued
    pub fn drain(&mut self) -> Vec<ModeEvent> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topic_matching() {
        let exact = SubscriptionTopic::new("mode:started");
        assert!(exact.matches("mode:started"));
        assert!(!exact.matches("mode:stopped"));

        let wildcard = SubscriptionTopic::new("mode:*");
        assert!(wildcard.matches("mode:started"));
        assert!(wildcard.matches("mode:error"));
        assert!(!wildcard.matches("session:ended"));
        assert!(!wildcard.matches("modeish:started"));

        assert!(SubscriptionTopic::new("*").matches("session:ended"));
    }

    #[test]
    fn test_publish_without_subscribers() {
        let bus = EventBus::new(8);
        let delivered = bus.publish(ModeEvent::ModeStopped {
            mode_id: "quiz".into(),
        });
        assert_eq!(delivered, 0);
    }

    #[tokio::test]
    async fn test_filtered_subscriber() {
        let bus = EventBus::new(8);
        let mut errors = bus.subscribe_to(&["mode:error"]);
        let mut everything = bus.subscribe();

        bus.publish(ModeEvent::ModeStopped {
            mode_id: "quiz".into(),
        });
        bus.publish(ModeEvent::ModeError {
            mode_id: "quiz".into(),
            error: ErrorResponse::new("NOT_FOUND", "gone"),
        });

        let event = errors.recv().await.unwrap();
        assert_eq!(event.topic(), TOPIC_ERROR);
        assert!(errors.try_recv().is_none());
        assert_eq!(everything.drain().len(), 2);
    }

    #[test]
    fn test_event_wire_format() {
        let event = ModeEvent::ModeStopped {
            mode_id: "flashcard".into(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "modeStopped");
        assert_eq!(json["modeId"], "flashcard");
    }
}
