//! `IN_PROCESS` adapter: delivers to the local listener registry
//! synchronously on the caller's task (§4.7), no transport of its own.

use std::sync::Arc;

use async_trait::async_trait;

use crate::health::HealthStatus;

use crate::events::adapter::{Adapter, AdapterKind};
use crate::events::envelope::DomainEventEnvelope;
use crate::events::listener::EventListenerRegistry;
use crate::events::publisher::PublisherError;

pub struct InProcessAdapter {
    listeners: Arc<EventListenerRegistry>,
}

impl InProcessAdapter {
    pub fn new(listeners: Arc<EventListenerRegistry>) -> Self {
        Self { listeners }
    }
}

#[async_trait]
impl Adapter for InProcessAdapter {
    fn kind(&self) -> AdapterKind {
        AdapterKind::InProcess
    }

    async fn is_available(&self) -> bool {
        true
    }

    async fn publish(&self, envelope: DomainEventEnvelope) -> Result<(), PublisherError> {
        envelope.validate()?;
        self.listeners.dispatch(&envelope).await;
        Ok(())
    }

    async fn health_probe(&self) -> HealthStatus {
        HealthStatus::up()
    }
}
