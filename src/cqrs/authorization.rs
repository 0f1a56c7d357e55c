//! `AuthorizationService`: composes a standard (role/scope/ownership) and a
//! custom per-message authorizer under a configurable combination policy.

use crate::config::AuthorizationMode;
use crate::cqrs::message::ExecutionContext;

/// A single authorization failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub source: String,
    pub reason: String,
}

impl Violation {
    pub fn new(source: impl Into<String>, reason: impl Into<String>) -> Self {
        Self { source: source.into(), reason: reason.into() }
    }
}

/// Outcome of an authorization check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationResult {
    authorized: bool,
    violations: Vec<Violation>,
    /// Set when `override` mode let a custom-accept override a standard-deny,
    /// per scenario F ("authorization result recorded as override-applied").
    pub override_applied: bool,
}

impl AuthorizationResult {
    pub fn allow() -> Self {
        Self { authorized: true, violations: Vec::new(), override_applied: false }
    }

    pub fn deny(violation: Violation) -> Self {
        Self { authorized: false, violations: vec![violation], override_applied: false }
    }

    pub fn authorized(&self) -> bool {
        self.authorized
    }

    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    /// `combine(a, b) = { authorized: a.authorized AND b.authorized, violations: concat }`.
    pub fn combine(mut self, other: AuthorizationResult) -> AuthorizationResult {
        self.authorized = self.authorized && other.authorized;
        self.violations.extend(other.violations);
        self
    }
}

/// Inspects declarative metadata on the message (roles/scopes/ownership);
/// returns success when no metadata is present.
pub trait StandardAuthorizer<C>: Send + Sync {
    fn authorize(&self, message: &C, ctx: &ExecutionContext) -> AuthorizationResult;
}

/// Per-message programmatic authorizer; defaults to success.
pub trait CustomAuthorizer<C>: Send + Sync {
    fn authorize(&self, message: &C, ctx: &ExecutionContext) -> AuthorizationResult;
}

/// Default custom authorizer used when a message declares none: always allows.
pub struct AllowAll;

impl<C> StandardAuthorizer<C> for AllowAll {
    fn authorize(&self, _message: &C, _ctx: &ExecutionContext) -> AuthorizationResult {
        AuthorizationResult::allow()
    }
}

impl<C> CustomAuthorizer<C> for AllowAll {
    fn authorize(&self, _message: &C, _ctx: &ExecutionContext) -> AuthorizationResult {
        AuthorizationResult::allow()
    }
}

/// Composes a standard and a custom authorizer under a combination policy.
pub struct AuthorizationService<C> {
    enabled: bool,
    mode: AuthorizationMode,
    standard: Box<dyn StandardAuthorizer<C>>,
    custom: Box<dyn CustomAuthorizer<C>>,
}

impl<C> AuthorizationService<C> {
    pub fn new(
        enabled: bool,
        mode: AuthorizationMode,
        standard: Box<dyn StandardAuthorizer<C>>,
        custom: Box<dyn CustomAuthorizer<C>>,
    ) -> Self {
        Self { enabled, mode, standard, custom }
    }

    pub fn disabled() -> Self
    where
        C: 'static,
    {
        Self::new(false, AuthorizationMode::RequireBoth, Box::new(AllowAll), Box::new(AllowAll))
    }

    /// Zero-trust default: globally-disabled short-circuits to success;
    /// otherwise applies the configured (or require-both default) mode.
    pub fn authorize(&self, message: &C, ctx: &ExecutionContext) -> AuthorizationResult {
        if !self.enabled {
            return AuthorizationResult::allow();
        }

        match self.mode {
            AuthorizationMode::StandardOnly => self.standard.authorize(message, ctx),
            AuthorizationMode::CustomOnly => self.custom.authorize(message, ctx),
            AuthorizationMode::RequireBoth => {
                let standard = self.standard.authorize(message, ctx);
                let custom = self.custom.authorize(message, ctx);
                standard.combine(custom)
            }
            AuthorizationMode::Override => {
                let standard = self.standard.authorize(message, ctx);
                let custom = self.custom.authorize(message, ctx);
                if !standard.authorized() && custom.authorized() {
                    let mut result = AuthorizationResult::allow();
                    result.override_applied = true;
                    result
                } else {
                    standard.combine(custom)
                }
            }
        }
    }
}
