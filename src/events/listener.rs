//! `EventListenerRegistry`: inbound side of event dispatch (§4.7). Listeners
//! for the exact event type run concurrently; individual failures are
//! logged and counted, never propagated back to the publisher.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use futures::future::join_all;
use tracing::warn;

use super::envelope::DomainEventEnvelope;

/// A subscriber invoked with every envelope matching its bound event type
/// (or every unmatched envelope, if bound to the default bucket).
#[async_trait]
pub trait EventListener: Send + Sync {
    async fn on_event(&self, envelope: &DomainEventEnvelope) -> Result<(), String>;
}

/// `map<eventType, list<listener>>`, plus a default bucket for types with
/// no specific subscriber.
#[derive(Default)]
pub struct EventListenerRegistry {
    by_type: RwLock<HashMap<String, Vec<Arc<dyn EventListener>>>>,
    default_bucket: RwLock<Vec<Arc<dyn EventListener>>>,
    dispatched: AtomicU64,
    failures: AtomicU64,
}

impl EventListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, event_type: impl Into<String>, listener: Arc<dyn EventListener>) {
        self.by_type.write().expect("listener registry lock poisoned").entry(event_type.into()).or_default().push(listener);
    }

    pub fn subscribe_default(&self, listener: Arc<dyn EventListener>) {
        self.default_bucket.write().expect("listener registry lock poisoned").push(listener);
    }

    /// Dispatches `envelope` to every listener bound to its exact type, or
    /// to the default bucket if none are bound. Listeners run concurrently;
    /// a failing listener is logged and counted, and never surfaces here.
    pub async fn dispatch(&self, envelope: &DomainEventEnvelope) {
        let listeners = {
            let by_type = self.by_type.read().expect("listener registry lock poisoned");
            match by_type.get(&envelope.event_type) {
                Some(listeners) if !listeners.is_empty() => listeners.clone(),
                _ => self.default_bucket.read().expect("listener registry lock poisoned").clone(),
            }
        };

        self.dispatched.fetch_add(1, Ordering::SeqCst);

        let outcomes = join_all(listeners.iter().map(|listener| listener.on_event(envelope))).await;
        for outcome in outcomes {
            if let Err(reason) = outcome {
                self.failures.fetch_add(1, Ordering::SeqCst);
                warn!(event_type = %envelope.event_type, %reason, "event listener failed");
            }
        }
    }

    pub fn dispatched_count(&self) -> u64 {
        self.dispatched.load(Ordering::SeqCst)
    }

    pub fn failure_count(&self) -> u64 {
        self.failures.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicU32;

    use serde_json::Value;

    use super::*;

    struct CountingListener {
        count: Arc<AtomicU32>,
    }

    #[async_trait]
    impl EventListener for CountingListener {
        async fn on_event(&self, _envelope: &DomainEventEnvelope) -> Result<(), String> {
            self.count.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct FailingListener;

    #[async_trait]
    impl EventListener for FailingListener {
        async fn on_event(&self, _envelope: &DomainEventEnvelope) -> Result<(), String> {
            Err("boom".to_string())
        }
    }

    #[tokio::test]
    async fn listeners_for_exact_type_are_invoked() {
        let registry = EventListenerRegistry::new();
        let count = Arc::new(AtomicU32::new(0));
        registry.subscribe("account.opened", Arc::new(CountingListener { count: count.clone() }));

        let envelope = DomainEventEnvelope::new("banking.accounts", "account.opened", Value::Null);
        registry.dispatch(&envelope).await;

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unmatched_type_falls_back_to_default_bucket() {
        let registry = EventListenerRegistry::new();
        let count = Arc::new(AtomicU32::new(0));
        registry.subscribe_default(Arc::new(CountingListener { count: count.clone() }));

        let envelope = DomainEventEnvelope::new("banking.accounts", "account.unmapped", Value::Null);
        registry.dispatch(&envelope).await;

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failing_listener_is_counted_not_propagated() {
        let registry = EventListenerRegistry::new();
        registry.subscribe("account.opened", Arc::new(FailingListener));
        registry.subscribe("account.opened", Arc::new(FailingListener));

        let envelope = DomainEventEnvelope::new("banking.accounts", "account.opened", Value::Null);
        registry.dispatch(&envelope).await;

        assert_eq!(registry.failure_count(), 2);
        assert_eq!(registry.dispatched_count(), 1);
    }
}
