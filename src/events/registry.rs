//! `AdapterRegistry`: selects which registered [`Adapter`] publishes go
//! through (§4.7).

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::AdapterSelection;

use super::adapter::{Adapter, AdapterKind};
use super::envelope::DomainEventEnvelope;
use super::publisher::{EventPublisher, PublisherError};

/// Holds every adapter made available to the process and selects one to
/// publish through: the explicitly configured kind if set, otherwise the
/// first available adapter in priority order
/// (`KAFKA > AMQP > SQS > KINESIS > IN_PROCESS > NOOP`).
pub struct AdapterRegistry {
    adapters: Vec<Arc<dyn Adapter>>,
    selection: AdapterSelection,
}

fn selection_to_kind(selection: &AdapterSelection) -> Option<AdapterKind> {
    match selection {
        AdapterSelection::Auto => None,
        AdapterSelection::InProcess => Some(AdapterKind::InProcess),
        AdapterSelection::Kafka => Some(AdapterKind::Kafka),
        AdapterSelection::Amqp => Some(AdapterKind::Amqp),
        AdapterSelection::Sqs => Some(AdapterKind::Sqs),
        AdapterSelection::Kinesis => Some(AdapterKind::Kinesis),
        AdapterSelection::Noop => Some(AdapterKind::Noop),
    }
}

impl AdapterRegistry {
    pub fn new(adapters: Vec<Arc<dyn Adapter>>, selection: AdapterSelection) -> Self {
        Self { adapters, selection }
    }

    /// Resolves the adapter to publish through: the explicitly configured
    /// kind if `selection` names one, else the highest-priority available
    /// adapter.
    pub async fn resolve(&self) -> Option<Arc<dyn Adapter>> {
        if let Some(wanted) = selection_to_kind(&self.selection) {
            return self.adapters.iter().find(|adapter| adapter.kind() == wanted).cloned();
        }

        let mut candidates: Vec<&Arc<dyn Adapter>> = self.adapters.iter().collect();
        candidates.sort_by_key(|adapter| adapter.kind().priority());

        for adapter in candidates {
            if adapter.is_available().await {
                return Some(adapter.clone());
            }
        }
        None
    }

    pub fn adapters(&self) -> &[Arc<dyn Adapter>] {
        &self.adapters
    }
}

#[async_trait]
impl EventPublisher for AdapterRegistry {
    async fn publish(&self, envelope: DomainEventEnvelope) -> Result<(), PublisherError> {
        let adapter = self.resolve().await.ok_or(PublisherError::NoAdapterAvailable)?;
        adapter.publish(envelope).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;
    use serde_json::Value;

    use crate::health::HealthStatus;

    use super::*;

    struct FakeAdapter {
        kind: AdapterKind,
        available: bool,
        publishes: AtomicU32,
    }

    #[async_trait]
    impl Adapter for FakeAdapter {
        fn kind(&self) -> AdapterKind {
            self.kind
        }

        async fn is_available(&self) -> bool {
            self.available
        }

        async fn publish(&self, _envelope: DomainEventEnvelope) -> Result<(), PublisherError> {
            self.publishes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn health_probe(&self) -> HealthStatus {
            HealthStatus::up()
        }
    }

    #[tokio::test]
    async fn auto_selection_prefers_higher_priority_kind() {
        let kafka = Arc::new(FakeAdapter { kind: AdapterKind::Kafka, available: true, publishes: AtomicU32::new(0) });
        let in_process = Arc::new(FakeAdapter { kind: AdapterKind::InProcess, available: true, publishes: AtomicU32::new(0) });

        let registry = AdapterRegistry::new(vec![in_process, kafka.clone()], AdapterSelection::Auto);
        let resolved = registry.resolve().await.unwrap();
        assert_eq!(resolved.kind(), AdapterKind::Kafka);
    }

    #[tokio::test]
    async fn auto_selection_skips_unavailable_adapter() {
        let kafka = Arc::new(FakeAdapter { kind: AdapterKind::Kafka, available: false, publishes: AtomicU32::new(0) });
        let in_process = Arc::new(FakeAdapter { kind: AdapterKind::InProcess, available: true, publishes: AtomicU32::new(0) });

        let registry = AdapterRegistry::new(vec![kafka, in_process], AdapterSelection::Auto);
        let resolved = registry.resolve().await.unwrap();
        assert_eq!(resolved.kind(), AdapterKind::InProcess);
    }

    #[tokio::test]
    async fn explicit_selection_overrides_priority_order() {
        let kafka = Arc::new(FakeAdapter { kind: AdapterKind::Kafka, available: true, publishes: AtomicU32::new(0) });
        let in_process = Arc::new(FakeAdapter { kind: AdapterKind::InProcess, available: true, publishes: AtomicU32::new(0) });

        let registry = AdapterRegistry::new(vec![kafka, in_process], AdapterSelection::InProcess);
        let resolved = registry.resolve().await.unwrap();
        assert_eq!(resolved.kind(), AdapterKind::InProcess);
    }

    #[tokio::test]
    async fn publish_routes_through_resolved_adapter() {
        let in_process = Arc::new(FakeAdapter { kind: AdapterKind::InProcess, available: true, publishes: AtomicU32::new(0) });
        let registry = AdapterRegistry::new(vec![in_process.clone()], AdapterSelection::Auto);

        registry.publish(DomainEventEnvelope::new("banking.accounts", "account.opened", Value::Null)).await.unwrap();
        assert_eq!(in_process.publishes.load(Ordering::SeqCst), 1);
    }
}
