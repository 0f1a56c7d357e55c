//! `Command<R>` / `Query<R>` message shapes and the read-only execution
//! context handlers are invoked with.
//!
//! The teacher crate identifies message types through protobuf type URLs;
//! this crate has no codegen step to lean on, so message identity is the
//! Rust `TypeId` of the concrete message struct (per the Design Notes'
//! replacement for annotation-driven handler discovery: "the runtime map is
//! plain `map<TypeId, HandlerFn>`").

use std::collections::{HashMap, HashSet};
use std::hash::{Hash, Hasher};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

/// Read-only, by-reference execution context passed alongside every
/// command/query dispatch.
#[derive(Debug, Clone, Default)]
pub struct ExecutionContext {
    pub user_id: Option<String>,
    pub tenant_id: Option<String>,
    pub features: HashSet<String>,
    pub attributes: HashMap<String, Value>,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_tenant(mut self, tenant_id: impl Into<String>) -> Self {
        self.tenant_id = Some(tenant_id.into());
        self
    }

    pub fn has_feature(&self, feature: &str) -> bool {
        self.features.contains(feature)
    }
}

/// Per-message overrides a caller may set on a `Command`/`Query` envelope.
#[derive(Debug, Clone, Default)]
pub struct MessageOverrides {
    pub timeout: Option<Duration>,
    pub max_retries: Option<u32>,
    pub custom_auth: bool,
}

/// Common envelope fields shared by commands and queries: stable type
/// identity, stable id, optional correlation id, creation timestamp, and
/// per-message overrides. A command/query is consumed once by the bus and
/// never mutated after dispatch.
#[derive(Debug, Clone)]
pub struct Envelope {
    pub id: Uuid,
    pub correlation_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub overrides: MessageOverrides,
}

impl Envelope {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            correlation_id: None,
            created_at: Utc::now(),
            overrides: MessageOverrides::default(),
        }
    }

    pub fn with_correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }
}

impl Default for Envelope {
    fn default() -> Self {
        Self::new()
    }
}

/// A message requesting a state change. `Result` is the type produced by a
/// successful handler invocation.
pub trait Command: Send + Sync + 'static {
    type Result: Send + 'static;

    /// Stable type identity used for metrics tags and error messages;
    /// defaults to the Rust type name.
    fn type_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    fn envelope(&self) -> &Envelope;
}

/// A side-effect-free message requesting a read.
pub trait Query: Send + Sync + 'static {
    /// `Sync` is required (beyond `Command::Result`'s plain `Send`) because a
    /// cacheable result is stored behind `Arc<dyn Any + Send + Sync>` and may
    /// be read concurrently by callers sharing one cache entry.
    type Result: Send + Sync + Clone + 'static;

    fn type_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    fn envelope(&self) -> &Envelope;

    /// Whether this query's result may be served from / stored in the cache.
    fn cacheable(&self) -> bool {
        false
    }

    /// Cache key, defaulting to the type name plus a stable hash of the
    /// query's fields (via `cache_key_fields`).
    fn cache_key(&self) -> String {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        self.cache_key_fields().hash(&mut hasher);
        format!("{}:{:x}", self.type_name(), hasher.finish())
    }

    /// Fields folded into the default `cache_key` hash. Override alongside
    /// `cache_key` for queries with fields that aren't cleanly hashable.
    fn cache_key_fields(&self) -> Vec<String> {
        Vec::new()
    }

    /// TTL override for this specific query; falls back to the handler's
    /// declared TTL when absent.
    fn cache_ttl(&self) -> Option<Duration> {
        None
    }
}
