//! Step-event bridge configuration: `stepevents.*` settings.

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StepEventsConfig {
    pub enabled: bool,
    pub default_topic: String,
}

impl Default for StepEventsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            default_topic: "banking-step-events".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_topic_matches_banking_step_events() {
        assert_eq!(StepEventsConfig::default().default_topic, "banking-step-events");
    }
}
