//! Composes breaker, retry, and timeout into the resilience half of the
//! outbound call pipeline: `retry.run(|attempt| breaker.guard(timeout.wrap(transport)))`.
//!
//! §4.5 states plainly that "retries wrap the breaker: each attempt is a
//! breaker call", which this composes literally; see the grounding ledger
//! for why that reading was chosen over the alternative parenthesization
//! in §4.6's one-line pipeline formula.

use std::future::Future;
use std::time::Duration;

use crate::resilience::breaker::{CircuitBreakerManager, GuardError};
use crate::resilience::retry::{run_with_retry, RetryPolicy};
use crate::resilience::timeout::{self, TimeoutError};

/// Error surfaced to a `ServiceClient` caller after the resilience pipeline
/// gives up: either the breaker was open, the deadline elapsed, or the
/// transport itself failed.
#[derive(Debug)]
pub enum ResilienceError<E> {
    CircuitOpen(String),
    Timeout,
    Transport(E),
}

impl<E: std::fmt::Display> std::fmt::Display for ResilienceError<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResilienceError::CircuitOpen(service) => write!(f, "circuit open for service {service}"),
            ResilienceError::Timeout => write!(f, "call exceeded its deadline"),
            ResilienceError::Transport(err) => err.fmt(f),
        }
    }
}

impl<E: std::fmt::Debug + std::fmt::Display> std::error::Error for ResilienceError<E> {}

/// Runs `transport` under the full breaker → retry → timeout composition
/// for a named service, retrying only errors `is_retryable` accepts.
pub async fn call<T, E, F, Fut>(
    breaker: &CircuitBreakerManager,
    service: &str,
    retry_policy: &RetryPolicy,
    timeout_duration: Duration,
    is_retryable: impl Fn(&E) -> bool,
    mut transport: F,
) -> Result<T, ResilienceError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let retry_on_timeout = retry_policy.retry_on_timeout;

    let result = run_with_retry(
        retry_policy,
        |guard_err: &GuardError<TimeoutError<E>>| match guard_err {
            GuardError::Open(_) => false,
            GuardError::Inner(timeout_err) => timeout::is_retryable(timeout_err, retry_on_timeout, &is_retryable),
        },
        |_attempt| breaker.guard(service, || timeout::with_timeout(timeout_duration, transport())),
    )
    .await;

    result.map_err(|guard_err| match guard_err {
        GuardError::Open(open) => ResilienceError::CircuitOpen(open.0),
        GuardError::Inner(TimeoutError::Elapsed) => ResilienceError::Timeout,
        GuardError::Inner(TimeoutError::Inner(err)) => ResilienceError::Transport(err),
    })
}
