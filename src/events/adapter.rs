//! `Adapter` capability (§4.7, §9 Design Notes "Polymorphism over concrete
//! adapter types"): `{name, priority, available, publish, probe}`, selected
//! by [`super::registry::AdapterRegistry`] rather than by matching on a
//! concrete type.

use async_trait::async_trait;

use crate::health::HealthStatus;

use super::envelope::DomainEventEnvelope;
use super::publisher::PublisherError;

/// The transport family an adapter speaks. Only `IN_PROCESS` and `NOOP` are
/// implemented by this crate; the broker-backed kinds are out of scope
/// (§1) and modeled by [`super::adapters::channel::ChannelAdapter`] as an
/// abstract publish/consume channel rather than a concrete client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum AdapterKind {
    Kafka,
    Amqp,
    Sqs,
    Kinesis,
    InProcess,
    Noop,
}

impl AdapterKind {
    /// Selection priority: `KAFKA > AMQP > SQS > KINESIS > IN_PROCESS > NOOP`
    /// (§4.7). Lower is preferred; derived from declaration order above via
    /// `Ord` rather than hand-maintained in two places.
    pub fn priority(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            AdapterKind::Kafka => "kafka",
            AdapterKind::Amqp => "amqp",
            AdapterKind::Sqs => "sqs",
            AdapterKind::Kinesis => "kinesis",
            AdapterKind::InProcess => "in_process",
            AdapterKind::Noop => "noop",
        }
    }
}

/// A concrete publish/consume transport. `publish` and `probe` take `&self`
/// so one adapter instance is shared by every publisher call naming it.
#[async_trait]
pub trait Adapter: Send + Sync {
    fn kind(&self) -> AdapterKind;

    fn name(&self) -> &str {
        self.kind().name()
    }

    /// Whether this adapter's transport is currently usable; checked once
    /// at registry build time, not on every publish.
    async fn is_available(&self) -> bool;

    async fn publish(&self, envelope: DomainEventEnvelope) -> Result<(), PublisherError>;

    async fn health_probe(&self) -> HealthStatus;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_order_matches_spec_ordering() {
        let mut kinds = vec![AdapterKind::Noop, AdapterKind::Kafka, AdapterKind::InProcess, AdapterKind::Sqs, AdapterKind::Amqp, AdapterKind::Kinesis];
        kinds.sort_by_key(|kind| kind.priority());
        assert_eq!(
            kinds,
            vec![AdapterKind::Kafka, AdapterKind::Amqp, AdapterKind::Sqs, AdapterKind::Kinesis, AdapterKind::InProcess, AdapterKind::Noop]
        );
    }
}
