//! Event dispatch core: a multi-adapter outbound publisher with
//! auto-selection, health probing, and metrics, plus an inbound listener
//! registry (§4.7).

pub mod adapter;
pub mod adapters;
pub mod envelope;
pub mod listener;
pub mod publisher;
pub mod registry;

pub use adapter::{Adapter, AdapterKind};
pub use envelope::{DomainEventEnvelope, EnvelopeError};
pub use listener::{EventListener, EventListenerRegistry};
pub use publisher::{EventPublisher, MetricsPublisher, PublisherError};
pub use registry::AdapterRegistry;
