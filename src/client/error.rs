//! Closed error enum shared by every `ServiceClient` variant (§7).

use crate::resilience::ResilienceError;

#[derive(Debug, Clone, thiserror::Error)]
pub enum ClientError {
    #[error("circuit open for service {0}")]
    CircuitOpen(String),
    #[error("transport error: {0}")]
    TransportError(String),
    #[error("call exceeded its deadline")]
    TimeoutError,
    #[error("client has been shut down")]
    Shutdown,
    #[error("{0} does not support this operation")]
    Unsupported(&'static str),
}

impl ClientError {
    /// Flattens a resilience-pipeline failure into the client's own error
    /// enum, discarding the transport error's concrete type (only its
    /// `Display` survives, per the spec's "stable code, human-readable
    /// message" contract in §7).
    pub fn from_resilience<E: std::fmt::Display>(err: ResilienceError<E>) -> Self {
        match err {
            ResilienceError::CircuitOpen(service) => ClientError::CircuitOpen(service),
            ResilienceError::Timeout => ClientError::TimeoutError,
            ResilienceError::Transport(inner) => ClientError::TransportError(inner.to_string()),
        }
    }
}
