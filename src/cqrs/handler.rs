//! `HandlerRegistry`: discovers handler objects at startup and maps each
//! declared command/query type to exactly one handler.
//!
//! Realizes the Design Notes' replacement for annotation-driven discovery:
//! an explicit registration phase building a plain `map<TypeId, HandlerFn>`,
//! immutable after startup.

use std::any::TypeId;
use std::collections::HashMap;
use std::time::Duration;

use crate::config::AuthorizationMode;
use crate::metrics::Tags;

/// Static metadata about a registered handler, independent of the concrete
/// message/result types.
#[derive(Debug, Clone)]
pub struct HandlerDescriptor {
    pub message_type: &'static str,
    pub timeout: Duration,
    pub max_retries: u32,
    pub cacheable: bool,
    pub cache_ttl: Option<Duration>,
    pub authorization_mode: Option<AuthorizationMode>,
}

impl HandlerDescriptor {
    pub fn new(message_type: &'static str) -> Self {
        Self {
            message_type,
            timeout: Duration::from_secs(5),
            max_retries: 0,
            cacheable: false,
            cache_ttl: None,
            authorization_mode: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_cacheable(mut self, cacheable: bool) -> Self {
        self.cacheable = cacheable;
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = Some(ttl);
        self
    }

    pub fn with_authorization_mode(mut self, mode: AuthorizationMode) -> Self {
        self.authorization_mode = Some(mode);
        self
    }

    pub fn metrics_tags(&self) -> Tags {
        vec![("type", self.message_type.to_string())]
    }
}

/// Error raised when two handlers are registered for the same message type.
/// Fatal at startup, per the spec's "exactly one registration per type"
/// invariant and the Open Question resolving double-registration as a fatal
/// startup error.
#[derive(Debug, thiserror::Error)]
#[error("duplicate handler registered for message type {0}")]
pub struct DuplicateHandlerError(pub &'static str);

/// Generic `TypeId`-keyed registry, shared by the command bus and the query
/// bus (two instances of the same capability, per §2). `O(1)` lookup,
/// read-only once built.
#[derive(Debug)]
pub struct TypeRegistry<V> {
    entries: HashMap<TypeId, (&'static str, V)>,
}

impl<V> TypeRegistry<V> {
    pub fn new() -> Self {
        Self { entries: HashMap::new() }
    }

    /// Insert a registration for message type `C`. Fails if `C` is already
    /// registered.
    pub fn insert<C: 'static>(&mut self, message_type: &'static str, value: V) -> Result<(), DuplicateHandlerError> {
        let key = TypeId::of::<C>();
        if self.entries.contains_key(&key) {
            return Err(DuplicateHandlerError(message_type));
        }
        self.entries.insert(key, (message_type, value));
        Ok(())
    }

    pub fn get<C: 'static>(&self) -> Option<&V> {
        self.entries.get(&TypeId::of::<C>()).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<V> Default for TypeRegistry<V> {
    fn default() -> Self {
        Self::new()
    }
}
