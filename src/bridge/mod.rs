//! `StepEventBridge`: transforms saga step lifecycle events into domain
//! events and re-publishes them through [`EventPublisher`] (§4.8).

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::events::{DomainEventEnvelope, EventPublisher, PublisherError};

/// Which way a step execution went; carried into the published envelope's
/// metadata verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepResult {
    Success,
    Failure,
}

impl StepResult {
    fn as_str(self) -> &'static str {
        match self {
            StepResult::Success => "SUCCESS",
            StepResult::Failure => "FAILURE",
        }
    }
}

/// Lifecycle notification emitted by the saga engine for one step
/// execution (§3, §GLOSSARY).
#[derive(Debug, Clone)]
pub struct StepEventEnvelope {
    pub saga_name: String,
    pub saga_id: String,
    pub step_id: String,
    pub topic: Option<String>,
    pub event_type: String,
    pub key: Option<String>,
    pub payload: Value,
    pub headers: HashMap<String, String>,
    pub attempts: u32,
    pub latency_ms: u64,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub result_type: StepResult,
    pub timestamp: Option<DateTime<Utc>>,
}

impl StepEventEnvelope {
    pub fn new(saga_name: impl Into<String>, saga_id: impl Into<String>, step_id: impl Into<String>, event_type: impl Into<String>, result_type: StepResult) -> Self {
        Self {
            saga_name: saga_name.into(),
            saga_id: saga_id.into(),
            step_id: step_id.into(),
            topic: None,
            event_type: event_type.into(),
            key: None,
            payload: Value::Null,
            headers: HashMap::new(),
            attempts: 0,
            latency_ms: 0,
            started_at: None,
            completed_at: None,
            result_type,
            timestamp: None,
        }
    }

    fn default_key(&self) -> String {
        format!("{}:{}", self.saga_name, self.saga_id)
    }
}

/// Raised constructing a `StepEventBridge` from invalid configuration.
#[derive(Debug, Clone, thiserror::Error)]
pub enum BridgeError {
    #[error("default topic must not be empty")]
    EmptyDefaultTopic,
}

/// Transforms a [`StepEventEnvelope`] into a [`DomainEventEnvelope`] and
/// publishes it through `publisher`. Publisher errors propagate unchanged.
pub struct StepEventBridge<P: EventPublisher> {
    default_topic: String,
    publisher: P,
}

impl<P: EventPublisher> StepEventBridge<P> {
    pub fn new(default_topic: impl Into<String>, publisher: P) -> Result<Self, BridgeError> {
        let default_topic = default_topic.into();
        if default_topic.is_empty() {
            return Err(BridgeError::EmptyDefaultTopic);
        }
        Ok(Self { default_topic, publisher })
    }

    /// Pure transformation, split out from `publish` so the transformation
    /// rules (§4.8) can be asserted directly without a publisher in the loop.
    pub fn transform(&self, step: &StepEventEnvelope) -> DomainEventEnvelope {
        let topic = step.topic.clone().unwrap_or_else(|| self.default_topic.clone());
        let key = step.key.clone().unwrap_or_else(|| step.default_key());
        let timestamp = step.timestamp.unwrap_or_else(Utc::now);

        let mut metadata = HashMap::new();
        metadata.insert("step.attempts".to_string(), Value::from(step.attempts));
        metadata.insert("step.latency_ms".to_string(), Value::from(step.latency_ms));
        if let Some(started_at) = step.started_at {
            metadata.insert("step.started_at".to_string(), Value::from(started_at.to_rfc3339()));
        }
        if let Some(completed_at) = step.completed_at {
            metadata.insert("step.completed_at".to_string(), Value::from(completed_at.to_rfc3339()));
        }
        metadata.insert("step.result_type".to_string(), Value::from(step.result_type.as_str()));

        DomainEventEnvelope {
            topic,
            event_type: step.event_type.clone(),
            key: Some(key),
            payload: serde_json::to_value(StepEnvelopePayload::from(step)).unwrap_or(Value::Null),
            headers: step.headers.clone(),
            metadata,
            timestamp,
        }
    }

    pub async fn publish(&self, step: &StepEventEnvelope) -> Result<(), PublisherError> {
        self.publisher.publish(self.transform(step)).await
    }
}

/// JSON mirror of [`StepEventEnvelope`], used as the domain envelope's
/// payload so downstream consumers can inspect the full step context
/// (§4.8: "payload = the entire step envelope").
#[derive(serde::Serialize)]
struct StepEnvelopePayload {
    saga_name: String,
    saga_id: String,
    step_id: String,
    #[serde(rename = "type")]
    event_type: String,
    payload: Value,
    attempts: u32,
    latency_ms: u64,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    result_type: &'static str,
}

impl From<&StepEventEnvelope> for StepEnvelopePayload {
    fn from(step: &StepEventEnvelope) -> Self {
        Self {
            saga_name: step.saga_name.clone(),
            saga_id: step.saga_id.clone(),
            step_id: step.step_id.clone(),
            event_type: step.event_type.clone(),
            payload: step.payload.clone(),
            attempts: step.attempts,
            latency_ms: step.latency_ms,
            started_at: step.started_at,
            completed_at: step.completed_at,
            result_type: step.result_type.as_str(),
        }
    }
}
