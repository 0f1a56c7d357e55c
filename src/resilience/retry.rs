//! Retry policy with exponential backoff, cap, and jitter.
//!
//! Built on the teacher's `backon`-based retry pattern (see
//! `handlers/projectors/cloudevents/http_sink.rs`'s `backoff()` and
//! `grpc.rs`'s connection retry): an `ExponentialBuilder` with a min/max
//! delay, a retry cap, and built-in jitter, driven through `Retryable::retry`.

use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};

use crate::config::RetrySettings;

/// Configuration for retry behavior: max attempts, base delay, exponential
/// multiplier, optional jitter, max delay, and whether a timeout counts as
/// retryable.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub multiplier: f64,
    pub max_delay: Duration,
    pub jitter: f64,
    pub retry_on_timeout: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(50),
            multiplier: 2.0,
            max_delay: Duration::from_secs(2),
            jitter: 0.25,
            retry_on_timeout: false,
        }
    }
}

impl From<&RetrySettings> for RetryPolicy {
    fn from(settings: &RetrySettings) -> Self {
        Self {
            max_attempts: settings.max_attempts,
            base_delay: settings.base_delay,
            multiplier: settings.multiplier,
            max_delay: settings.max_delay,
            jitter: settings.jitter,
            retry_on_timeout: settings.retry_on_timeout,
        }
    }
}

impl RetryPolicy {
    /// No retries: a single attempt only.
    pub fn none() -> Self {
        Self { max_attempts: 1, ..Default::default() }
    }

    /// `backon` backoff schedule for this policy, shaped like the teacher's
    /// `HttpSink::backoff()`: a min/max delay, a retry cap derived from
    /// `max_attempts`, and jitter enabled whenever `jitter > 0.0`.
    fn backoff(&self) -> ExponentialBuilder {
        let retries = self.max_attempts.saturating_sub(1) as usize;
        let mut builder = ExponentialBuilder::default()
            .with_min_delay(self.base_delay)
            .with_max_delay(self.max_delay)
            .with_factor(self.multiplier as f32)
            .with_max_times(retries);
        if self.jitter > 0.0 {
            builder = builder.with_jitter();
        }
        builder
    }
}

/// Runs `attempt_fn` under this retry policy, retrying only errors the
/// caller's `is_retryable` predicate accepts. Retries wrap whatever
/// `attempt_fn` itself does (e.g. a circuit breaker call), so every attempt
/// passes back through that guard.
pub async fn run_with_retry<T, E, F, Fut>(policy: &RetryPolicy, is_retryable: impl Fn(&E) -> bool, mut attempt_fn: F) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let next_attempt = AtomicU32::new(0);
    (|| {
        let attempt = next_attempt.fetch_add(1, Ordering::SeqCst);
        attempt_fn(attempt)
    })
    .retry(policy.backoff())
    .when(|err| is_retryable(err))
    .await
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    #[tokio::test]
    async fn invokes_transport_at_most_max_attempts_times() {
        let policy = RetryPolicy { max_attempts: 3, base_delay: Duration::from_millis(1), jitter: 0.0, multiplier: 1.0, max_delay: Duration::from_millis(5), retry_on_timeout: false };
        let calls = AtomicU32::new(0);
        let result: Result<(), &str> = run_with_retry(&policy, |_| true, |_attempt| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err("transport error") }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn non_retryable_error_stops_immediately() {
        let policy = RetryPolicy::default();
        let calls = AtomicU32::new(0);
        let result: Result<(), &str> = run_with_retry(&policy, |_| false, |_attempt| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err("fatal") }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn succeeds_without_exhausting_attempts() {
        let policy = RetryPolicy { max_attempts: 5, base_delay: Duration::from_millis(1), jitter: 0.0, multiplier: 1.0, max_delay: Duration::from_millis(5), retry_on_timeout: false };
        let calls = AtomicU32::new(0);
        let result: Result<i32, &str> = run_with_retry(&policy, |_| true, |attempt| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move { if attempt < 2 { Err("retry me") } else { Ok(7) } }
        })
        .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn no_retries_policy_calls_exactly_once() {
        let policy = RetryPolicy::none();
        let calls = AtomicU32::new(0);
        let result: Result<(), &str> = run_with_retry(&policy, |_| true, |_attempt| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err("boom") }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
