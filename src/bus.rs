/// In-process domain event bus
///
/// Typed broadcast topics for decoupled notification between components;
/// subscribers hold an explicit receiver for their lifetime.
use serde::Serialize;
use tokio::sync::broadcast;

/// Domain events published by the service
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum DomainEvent {
    MemberJoined { event_id: String, user_id: String },
    MemberLeft { event_id: String, user_id: String },
    ReportFiled { report_id: i64, event_id: String },
    ReportResolved { report_id: i64, event_id: String, approved: bool },
    EventBlocked { event_id: String, moderator_id: String },
    EventRestored { event_id: String, moderator_id: String },
    EventDeleted { event_id: String, actor_id: String },
    UserBlocked { user_id: String, admin_id: String },
    UserUnblocked { user_id: String, admin_id: String },
}

/// Broadcast bus; cloning shares the underlying channel
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<DomainEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Publish an event; delivery is best-effort when nobody listens
    pub fn publish(&self, event: DomainEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DomainEvent> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscribers_receive_published_events() {
        let bus = EventBus::new(8);
        let mut rx = bus.subscribe();

        bus.publish(DomainEvent::MemberJoined {
            event_id: "ev-1".to_string(),
            user_id: "alice".to_string(),
        });

        match rx.recv().await.unwrap() {
            DomainEvent::MemberJoined { event_id, user_id } => {
                assert_eq!(event_id, "ev-1");
                assert_eq!(user_id, "alice");
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_publish_without_subscribers_is_silent() {
        let bus = EventBus::new(8);
        bus.publish(DomainEvent::EventDeleted {
            event_id: "ev-1".to_string(),
            actor_id: "alice".to_string(),
        });
    }
}
