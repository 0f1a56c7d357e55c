//! Broker-backed adapter family (`KAFKA`/`AMQP`/`SQS`/`KINESIS`-like), modeled
//! as an abstract publish channel rather than a concrete client (§1: "the
//! concrete network protocols of each messaging broker" are out of scope,
//! "treated as abstract publish/consume channels").
//!
//! [`ChannelAdapter`] wraps anything that can accept an envelope and report
//! availability/health; a real deployment plugs in a broker-specific
//! `EnvelopeSink` built from its own client crate behind this same shape.

use async_trait::async_trait;

use crate::health::HealthStatus;

use super::super::adapter::{Adapter, AdapterKind};
use super::super::envelope::DomainEventEnvelope;
use super::super::publisher::PublisherError;

/// The broker-facing half a `ChannelAdapter` delegates to: enqueue an
/// envelope onto the transport, and report whether the transport is
/// reachable. A concrete broker integration implements this directly; this
/// crate ships no concrete broker client since the wire protocol is out of
/// scope.
#[async_trait]
pub trait EnvelopeSink: Send + Sync {
    async fn send(&self, envelope: &DomainEventEnvelope) -> Result<(), String>;

    async fn is_reachable(&self) -> bool;
}

pub struct ChannelAdapter {
    kind: AdapterKind,
    sink: Box<dyn EnvelopeSink>,
}

impl ChannelAdapter {
    /// `kind` must be one of the broker-like kinds; `InProcess`/`Noop` have
    /// their own dedicated adapters.
    pub fn new(kind: AdapterKind, sink: Box<dyn EnvelopeSink>) -> Self {
        Self { kind, sink }
    }
}

#[async_trait]
impl Adapter for ChannelAdapter {
    fn kind(&self) -> AdapterKind {
        self.kind
    }

    async fn is_available(&self) -> bool {
        self.sink.is_reachable().await
    }

    async fn publish(&self, envelope: DomainEventEnvelope) -> Result<(), PublisherError> {
        envelope.validate()?;
        self.sink.send(&envelope).await.map_err(|reason| PublisherError::AdapterRejected { adapter: self.name().to_string(), reason })
    }

    async fn health_probe(&self) -> HealthStatus {
        if self.sink.is_reachable().await {
            HealthStatus::up()
        } else {
            HealthStatus::down(format!("{} transport unreachable", self.name()))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
    use std::sync::Arc;

    use serde_json::Value;

    use super::*;

    struct FakeSink {
        sent: Arc<AtomicU32>,
        reachable: AtomicBool,
    }

    #[async_trait]
    impl EnvelopeSink for FakeSink {
        async fn send(&self, _envelope: &DomainEventEnvelope) -> Result<(), String> {
            if !self.reachable.load(Ordering::SeqCst) {
                return Err("broker unreachable".to_string());
            }
            self.sent.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn is_reachable(&self) -> bool {
            self.reachable.load(Ordering::SeqCst)
        }
    }

    #[tokio::test]
    async fn publish_delegates_to_sink() {
        let sent = Arc::new(AtomicU32::new(0));
        let adapter = ChannelAdapter::new(AdapterKind::Kafka, Box::new(FakeSink { sent: sent.clone(), reachable: AtomicBool::new(true) }));

        adapter.publish(DomainEventEnvelope::new("banking.accounts", "account.opened", Value::Null)).await.unwrap();
        assert_eq!(sent.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unreachable_sink_reports_down_health() {
        let adapter =
            ChannelAdapter::new(AdapterKind::Amqp, Box::new(FakeSink { sent: Arc::new(AtomicU32::new(0)), reachable: AtomicBool::new(false) }));
        assert!(!adapter.health_probe().await.is_up());
    }
}
