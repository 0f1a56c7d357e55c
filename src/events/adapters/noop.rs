//! `NOOP` adapter: discards every envelope. Lowest selection priority;
//! exists so a platform with no configured transport still boots (§4.7).

use async_trait::async_trait;
use tracing::debug;

use crate::health::HealthStatus;

use crate::events::adapter::{Adapter, AdapterKind};
use crate::events::envelope::DomainEventEnvelope;
use crate::events::publisher::PublisherError;

pub struct NoopAdapter;

#[async_trait]
impl Adapter for NoopAdapter {
    fn kind(&self) -> AdapterKind {
        AdapterKind::Noop
    }

    async fn is_available(&self) -> bool {
        true
    }

    async fn publish(&self, envelope: DomainEventEnvelope) -> Result<(), PublisherError> {
        envelope.validate()?;
        debug!(topic = %envelope.topic, event_type = %envelope.event_type, "event discarded (noop adapter)");
        Ok(())
    }

    async fn health_probe(&self) -> HealthStatus {
        HealthStatus::up()
    }
}
