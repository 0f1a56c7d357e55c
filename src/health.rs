//! Health probe contract shared by adapters, service clients, and caches.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Tri-state health signal, matching the wire shape in the external
/// interfaces section: `{status, details}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    Up,
    Degraded,
    Down,
}

/// Result of a single health probe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: Status,
    pub details: HashMap<String, Value>,
}

impl HealthStatus {
    pub fn up() -> Self {
        Self { status: Status::Up, details: HashMap::new() }
    }

    pub fn degraded(reason: impl Into<String>) -> Self {
        let mut details = HashMap::new();
        details.insert("reason".to_string(), Value::String(reason.into()));
        Self { status: Status::Degraded, details }
    }

    pub fn down(reason: impl Into<String>) -> Self {
        let mut details = HashMap::new();
        details.insert("reason".to_string(), Value::String(reason.into()));
        Self { status: Status::Down, details }
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }

    pub fn is_up(&self) -> bool {
        self.status == Status::Up
    }
}

/// Anything that can report its own health: adapters, service clients,
/// caches, and composite components alike.
#[async_trait]
pub trait HealthIndicator: Send + Sync {
    /// Stable name this indicator reports under.
    fn name(&self) -> &str;

    /// Probe current health. Must not panic; degrade to `Status::Down` on
    /// probe failure instead.
    async fn health(&self) -> HealthStatus;
}
