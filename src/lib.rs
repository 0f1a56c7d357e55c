//! Ledgercore - CQRS dispatch, resilient service clients, and event dispatch
//! middleware for banking microservice platforms.
//!
//! Four subsystems, leaves first:
//! - [`correlation`] / [`metrics`] / [`health`]: ambient plumbing shared by everything else.
//! - [`cqrs`]: command bus and query bus with validation, authorization, and caching.
//! - [`resilience`] / [`client`]: circuit breaker + retry + timeout + interceptors wrapped
//!   around HTTP, RPC, and SDK-wrapper outbound calls.
//! - [`events`]: multi-adapter outbound event publisher and inbound listener registry.
//! - [`bridge`]: re-publishes saga step lifecycle events through [`events`].

pub mod bridge;
pub mod client;
pub mod config;
pub mod correlation;
pub mod cqrs;
pub mod events;
pub mod health;
pub mod metrics;
pub mod resilience;

pub use correlation::CorrelationContext;
pub use health::{HealthIndicator, HealthStatus};
pub use metrics::MetricsRegistry;
