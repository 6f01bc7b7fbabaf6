//! Domain event publishing over NATS.

use crate::domain::events::DomainEvent;

pub const SUBJECT_PREFIX: &str = "storefront";

/// Publishes drained aggregate events. Without a NATS client the events are
/// only traced. Failures never propagate to the operation that raised them.
#[derive(Clone, Default)]
pub struct EventPublisher {
    nats: Option<async_nats::Client>,
}

impl EventPublisher {
    pub fn new(nats: Option<async_nats::Client>) -> Self { Self { nats } }

    pub fn subject(event: &DomainEvent) -> String { format!("{SUBJECT_PREFIX}.{}", event.name()) }

    pub async fn publish_all(&self, events: Vec<DomainEvent>) {
        for event in events {
            self.publish(&event).await;
        }
    }

    async fn publish(&self, event: &DomainEvent) {
        let subject = Self::subject(event);
        let Some(nats) = &self.nats else {
            tracing::debug!(%subject, ?event, "event raised");
            return;
        };
        let payload = match serde_json::to_vec(event) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(%subject, error = %e, "failed to encode event");
                return;
            }
        };
        if let Err(e) = nats.publish(subject.clone(), payload.into()).await {
            tracing::warn!(%subject, error = %e, "failed to publish event");
        }
    }
}
