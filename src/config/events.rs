//! Event dispatch configuration: `events.*` settings.

use std::collections::HashMap;

use serde::Deserialize;

/// Explicit adapter choice, or `Auto` to use the priority order documented
/// on `AdapterRegistry`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdapterSelection {
    #[default]
    Auto,
    InProcess,
    Kafka,
    Amqp,
    Sqs,
    Kinesis,
    Noop,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EventsConfig {
    pub enabled: bool,
    pub adapter: AdapterSelection,
    /// Per-adapter settings (topics, exchanges, keys, bootstrap endpoints),
    /// kept as an open string map since concrete broker wire protocols are
    /// out of this crate's scope.
    pub adapter_settings: HashMap<String, String>,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            adapter: AdapterSelection::Auto,
            adapter_settings: HashMap::new(),
        }
    }
}
