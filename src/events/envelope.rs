//! `DomainEventEnvelope`: the wire-level record an [`EventPublisher`] sends
//! to an adapter (§3, §6).
//!
//! [`EventPublisher`]: super::publisher::EventPublisher

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A domain event ready to publish. `topic` and `type` are required
/// non-empty at publish time; `headers`/`metadata` are never null, empty is
/// allowed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainEventEnvelope {
    pub topic: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub key: Option<String>,
    pub payload: Value,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
    pub timestamp: DateTime<Utc>,
}

/// Raised building or validating an envelope before it reaches an adapter.
#[derive(Debug, Clone, thiserror::Error)]
pub enum EnvelopeError {
    #[error("envelope topic must not be empty")]
    EmptyTopic,
    #[error("envelope type must not be empty")]
    EmptyType,
}

impl DomainEventEnvelope {
    pub fn new(topic: impl Into<String>, event_type: impl Into<String>, payload: Value) -> Self {
        Self {
            topic: topic.into(),
            event_type: event_type.into(),
            key: None,
            payload,
            headers: HashMap::new(),
            metadata: HashMap::new(),
            timestamp: Utc::now(),
        }
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// The non-empty-topic/non-empty-type invariant every adapter may rely on.
    pub fn validate(&self) -> Result<(), EnvelopeError> {
        if self.topic.is_empty() {
            return Err(EnvelopeError::EmptyTopic);
        }
        if self.event_type.is_empty() {
            return Err(EnvelopeError::EmptyType);
        }
        Ok(())
    }
}
