//! Domain event fan-out.
//!
//! Every event is logged. When a NATS connection is configured it is also
//! published as JSON on [`DomainEvent::subject`]. Publishing is best effort:
//! a failure is logged and the request that caused the event still succeeds.

use crate::domain::events::DomainEvent;

#[derive(Clone, Default)]
pub struct EventPublisher {
    nats: Option<async_nats::Client>,
}

impl EventPublisher {
    pub fn new(nats: Option<async_nats::Client>) -> Self { Self { nats } }

    /// Log-only publisher.
    pub fn disabled() -> Self { Self::default() }

    pub fn is_connected(&self) -> bool { self.nats.is_some() }

    pub async fn publish(&self, event: impl Into<DomainEvent>) {
        let event = event.into();
        let subject = event.subject();
        tracing::info!(subject, ?event, "domain event");

        let Some(client) = &self.nats else { return };
        let payload = match serde_json::to_vec(&event) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(subject, error = %e, "failed to encode event");
                return;
            }
        };
        if let Err(e) = client.publish(subject.to_string(), payload.into()).await {
            tracing::warn!(subject, error = %e, "failed to publish event");
        }
    }
}
