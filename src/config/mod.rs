//! Application configuration.
//!
//! Aggregates configuration from all four subsystems into a single `Config`
//! struct that can be loaded from a YAML file or environment variables,
//! mirroring the teacher crate's layered `Config::load`.

mod cqrs;
pub(crate) mod duration_secs;
mod events;
mod service_client;
mod stepevents;

pub use cqrs::{AuthorizationMode, CacheBackend, CqrsConfig};
pub use events::{AdapterSelection, EventsConfig};
pub use service_client::{CircuitBreakerSettings, HttpClientSettings, RetrySettings, RpcClientSettings, ServiceClientConfig};
pub use stepevents::StepEventsConfig;

use serde::Deserialize;

/// Environment variable naming this crate's config file path override.
pub const CONFIG_ENV_VAR: &str = "LEDGERCORE_CONFIG";
/// Prefix for configuration environment variables (double-underscore separated).
pub const CONFIG_ENV_PREFIX: &str = "LEDGERCORE";
/// Default configuration file name, looked for in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "ledgercore.yaml";

/// Top-level configuration aggregate.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub cqrs: CqrsConfig,
    pub service_client: ServiceClientConfig,
    pub events: EventsConfig,
    pub stepevents: StepEventsConfig,
}

/// Fatal configuration problems, surfaced at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] ::config::ConfigError),
    #[error("duplicate handler registered for message type {0}")]
    DuplicateHandler(String),
    #[error("no adapter available to satisfy events.adapter={0}")]
    NoAdapterAvailable(String),
}

impl Config {
    /// Load configuration from file and environment, in order of increasing
    /// priority:
    /// 1. `ledgercore.yaml` in the current directory (if present)
    /// 2. the file named by `path`, if given
    /// 3. the file named by the `LEDGERCORE_CONFIG` environment variable, if set
    /// 4. environment variables prefixed `LEDGERCORE__`
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        use ::config::{Config as ConfigLib, Environment, File, FileFormat};

        let mut builder = ConfigLib::builder()
            .add_source(File::new(DEFAULT_CONFIG_FILE, FileFormat::Yaml).required(false));

        if let Some(config_path) = path {
            builder = builder.add_source(File::new(config_path, FileFormat::Yaml).required(true));
        }

        if let Ok(config_path) = std::env::var(CONFIG_ENV_VAR) {
            builder = builder.add_source(File::new(&config_path, FileFormat::Yaml).required(true));
        }

        let built = builder
            .add_source(
                Environment::with_prefix(CONFIG_ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(built.try_deserialize()?)
    }

    /// Configuration with every subsystem's defaults, for tests and embedding.
    pub fn for_test() -> Self {
        Self::default()
    }
}
