//! Absolute deadline wrapper for a single outbound attempt (§4.5 "Timeout").

use std::future::Future;
use std::time::Duration;

/// Outcome of a deadline-wrapped call: either the inner future completed
/// (successfully or not), or the deadline elapsed first.
#[derive(Debug)]
pub enum TimeoutError<E> {
    Elapsed,
    Inner(E),
}

impl<E: std::fmt::Display> std::fmt::Display for TimeoutError<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimeoutError::Elapsed => write!(f, "call exceeded its deadline"),
            TimeoutError::Inner(err) => err.fmt(f),
        }
    }
}

impl<E: std::fmt::Debug + std::fmt::Display> std::error::Error for TimeoutError<E> {}

impl<E> TimeoutError<E> {
    pub fn is_elapsed(&self) -> bool {
        matches!(self, TimeoutError::Elapsed)
    }
}

/// Runs `fut` under an absolute deadline, cancelling it cooperatively if the
/// deadline is exceeded before it resolves.
pub async fn with_timeout<T, E, Fut>(duration: Duration, fut: Fut) -> Result<T, TimeoutError<E>>
where
    Fut: Future<Output = Result<T, E>>,
{
    match tokio::time::timeout(duration, fut).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(TimeoutError::Inner(err)),
        Err(_elapsed) => Err(TimeoutError::Elapsed),
    }
}

/// Whether a timed-out attempt should be retried, per `retryOnTimeout`
/// (§4.5); a non-elapsed error defers to the caller's own predicate.
pub fn is_retryable<E>(error: &TimeoutError<E>, retry_on_timeout: bool, inner_retryable: impl FnOnce(&E) -> bool) -> bool {
    match error {
        TimeoutError::Elapsed => retry_on_timeout,
        TimeoutError::Inner(err) => inner_retryable(err),
    }
}
