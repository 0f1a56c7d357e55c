//! `EventPublisher`: the abstract outbound event sink every adapter and the
//! step-event bridge publish through (§4.7).

use std::time::Instant;

use async_trait::async_trait;

use crate::metrics::{incr, MetricsRegistry};

use super::envelope::DomainEventEnvelope;
use super::registry::AdapterRegistry;

/// Raised when an adapter fails to publish; propagated to the publisher's
/// caller unchanged, never swallowed (testable property #9).
#[derive(Debug, Clone, thiserror::Error)]
pub enum PublisherError {
    #[error("{0}")]
    Envelope(#[from] super::envelope::EnvelopeError),
    #[error("adapter {adapter} rejected publish: {reason}")]
    AdapterRejected { adapter: String, reason: String },
    #[error("no adapter available")]
    NoAdapterAvailable,
}

/// Abstract outbound event sink: `publish(envelope) -> ok|err`.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, envelope: DomainEventEnvelope) -> Result<(), PublisherError>;
}

/// Decorates an [`AdapterRegistry`] with the `events.published.total` /
/// `events.publish.duration` metrics named in §6. Kept separate from the
/// registry itself so adapter selection stays testable without a metrics
/// sink in the loop.
pub struct MetricsPublisher {
    registry: AdapterRegistry,
    metrics: std::sync::Arc<dyn MetricsRegistry>,
}

impl MetricsPublisher {
    pub fn new(registry: AdapterRegistry, metrics: std::sync::Arc<dyn MetricsRegistry>) -> Self {
        Self { registry, metrics }
    }
}

#[async_trait]
impl EventPublisher for MetricsPublisher {
    async fn publish(&self, envelope: DomainEventEnvelope) -> Result<(), PublisherError> {
        let adapter_name = self.registry.resolve().await.map(|adapter| adapter.name().to_string()).unwrap_or_else(|| "none".to_string());
        let topic = envelope.topic.clone();
        let event_type = envelope.event_type.clone();
        let started = Instant::now();

        let result = self.registry.publish(envelope).await;

        let tags = vec![
            ("adapter", adapter_name.clone()),
            ("topic", topic.clone()),
            ("type", event_type.clone()),
            ("result", if result.is_ok() { "success".to_string() } else { "failure".to_string() }),
        ];
        incr(self.metrics.as_ref(), "events.published.total", &tags);
        self.metrics.timer("events.publish.duration", &vec![("adapter", adapter_name), ("topic", topic), ("type", event_type)], started.elapsed());

        result
    }
}
