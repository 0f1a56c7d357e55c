//! `ServiceClientSpec`: the declarative description shared by all three
//! client variants (§3).

use std::collections::HashMap;
use std::time::Duration;

/// Which transport a `ServiceClient` speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceKind {
    Http,
    Rpc,
    Sdk,
}

/// Declarative spec a client is built from: name, transport kind, endpoint,
/// deadline, and default headers merged under per-request ones.
#[derive(Debug, Clone)]
pub struct ServiceClientSpec {
    pub service_name: String,
    pub kind: ServiceKind,
    pub endpoint: String,
    pub timeout: Duration,
    pub default_headers: HashMap<String, String>,
}

impl ServiceClientSpec {
    pub fn new(service_name: impl Into<String>, kind: ServiceKind, endpoint: impl Into<String>, timeout: Duration) -> Self {
        Self { service_name: service_name.into(), kind, endpoint: endpoint.into(), timeout, default_headers: HashMap::new() }
    }

    pub fn with_default_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.insert(key.into(), value.into());
        self
    }
}
