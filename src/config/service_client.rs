//! Service client configuration: `service-client.*` settings.

use std::time::Duration;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpClientSettings {
    pub max_connections: usize,
    #[serde(with = "super::duration_secs")]
    pub max_idle_time: Duration,
    #[serde(with = "super::duration_secs")]
    pub max_life_time: Duration,
    #[serde(with = "super::duration_secs")]
    pub pending_acquire_timeout: Duration,
    #[serde(with = "super::duration_secs")]
    pub response_timeout: Duration,
    pub max_in_memory_size: usize,
}

impl Default for HttpClientSettings {
    fn default() -> Self {
        Self {
            max_connections: 64,
            max_idle_time: Duration::from_secs(30),
            max_life_time: Duration::from_secs(300),
            pending_acquire_timeout: Duration::from_secs(2),
            response_timeout: Duration::from_secs(10),
            max_in_memory_size: 16 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RpcClientSettings {
    #[serde(with = "super::duration_secs")]
    pub keep_alive_interval: Duration,
    #[serde(with = "super::duration_secs")]
    pub keep_alive_timeout: Duration,
    pub max_inbound_message_size: usize,
    pub max_inbound_metadata_size: usize,
}

impl Default for RpcClientSettings {
    fn default() -> Self {
        Self {
            keep_alive_interval: Duration::from_secs(30),
            keep_alive_timeout: Duration::from_secs(10),
            max_inbound_message_size: 4 * 1024 * 1024,
            max_inbound_metadata_size: 8 * 1024,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CircuitBreakerSettings {
    /// Fraction in [0, 1]. Spec example uses 50%.
    pub failure_rate_threshold: f64,
    pub sliding_window_size: u32,
    pub minimum_calls: u32,
    #[serde(with = "super::duration_secs")]
    pub wait_duration_in_open_state: Duration,
    pub permitted_calls_in_half_open: u32,
    #[serde(with = "super::duration_secs")]
    pub slow_call_duration_threshold: Duration,
}

impl Default for CircuitBreakerSettings {
    fn default() -> Self {
        Self {
            failure_rate_threshold: 0.5,
            sliding_window_size: 10,
            minimum_calls: 5,
            wait_duration_in_open_state: Duration::from_secs(30),
            permitted_calls_in_half_open: 3,
            slow_call_duration_threshold: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: u32,
    #[serde(with = "super::duration_secs")]
    pub base_delay: Duration,
    pub multiplier: f64,
    pub jitter: f64,
    #[serde(with = "super::duration_secs")]
    pub max_delay: Duration,
    pub retry_on_timeout: bool,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(50),
            multiplier: 2.0,
            jitter: 0.25,
            max_delay: Duration::from_secs(2),
            retry_on_timeout: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceClientConfig {
    pub enabled: bool,
    pub http: HttpClientSettings,
    pub rpc: RpcClientSettings,
    pub circuit_breaker: CircuitBreakerSettings,
    pub retry: RetrySettings,
}

impl Default for ServiceClientConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            http: HttpClientSettings::default(),
            rpc: RpcClientSettings::default(),
            circuit_breaker: CircuitBreakerSettings::default(),
            retry: RetrySettings::default(),
        }
    }
}
