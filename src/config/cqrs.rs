//! CQRS bus configuration: `cqrs.*` settings.

use std::time::Duration;

use serde::Deserialize;

/// Authorization combination policy, see the AuthorizationService component design.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuthorizationMode {
    StandardOnly,
    CustomOnly,
    #[default]
    RequireBoth,
    Override,
}

/// Where query cache entries live.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    #[default]
    Local,
    Shared,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QueryCachingConfig {
    pub enabled: bool,
    #[serde(with = "super::duration_secs")]
    pub ttl: Duration,
    pub backend: CacheBackend,
}

impl Default for QueryCachingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl: Duration::from_secs(60),
            backend: CacheBackend::Local,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthorizationConfig {
    pub enabled: bool,
    pub mode: AuthorizationMode,
}

impl Default for AuthorizationConfig {
    fn default() -> Self {
        Self { enabled: true, mode: AuthorizationMode::RequireBoth }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CqrsConfig {
    pub enabled: bool,
    #[serde(with = "super::duration_secs")]
    pub command_timeout: Duration,
    pub query_caching: QueryCachingConfig,
    pub authorization: AuthorizationConfig,
}

impl Default for CqrsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            command_timeout: Duration::from_secs(5),
            query_caching: QueryCachingConfig::default(),
            authorization: AuthorizationConfig::default(),
        }
    }
}
