//! SDK-wrapper `ServiceClient` variant: wraps a caller-supplied instance of
//! a vendor SDK (no shared transport of its own) in the same
//! breaker/retry/timeout pipeline as the HTTP and RPC variants (§4.6 "SDK
//! specifics").
//!
//! The teacher relies on reflection to auto-detect a `close()`/`shutdown()`
//! method on an arbitrary bean; Rust has no such reflection, so shutdown is
//! an explicit opt-in capability ([`Shutdownable`]) rather than inferred.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::client::error::ClientError;
use crate::resilience::{call_with_resilience, CircuitBreakerManager, RetryPolicy};

/// Implemented by SDK instances that expose an explicit, idempotent
/// shutdown hook. Instances without one simply don't implement it; the
/// client's `shutdown()` becomes a no-op for those.
pub trait Shutdownable: Send + Sync {
    fn shutdown(&self);
}

/// Wraps `instance` with resilience; `F` is the caller-supplied invocation
/// closure that knows how to drive `instance` for one logical call.
pub struct SdkServiceClient<T> {
    service_name: String,
    instance: T,
    timeout: Duration,
    breaker: Arc<CircuitBreakerManager>,
    retry_policy: RetryPolicy,
    shut_down: AtomicBool,
}

impl<T: Send + Sync> SdkServiceClient<T> {
    pub fn new(service_name: impl Into<String>, instance: T, timeout: Duration, breaker: Arc<CircuitBreakerManager>, retry_policy: RetryPolicy) -> Self {
        Self { service_name: service_name.into(), instance, timeout, breaker, retry_policy, shut_down: AtomicBool::new(false) }
    }

    pub fn instance(&self) -> &T {
        &self.instance
    }

    /// Invokes `operation` against the wrapped instance under the same
    /// breaker/retry/timeout pipeline as the other client kinds.
    pub async fn call<R, E, F, Fut>(&self, is_retryable: impl Fn(&E) -> bool, operation: F) -> Result<R, ClientError>
    where
        F: Fn(&T) -> Fut,
        Fut: Future<Output = Result<R, E>>,
        E: std::fmt::Display,
    {
        if self.shut_down.load(Ordering::SeqCst) {
            return Err(ClientError::Shutdown);
        }

        call_with_resilience(&self.breaker, &self.service_name, &self.retry_policy, self.timeout, is_retryable, || operation(&self.instance))
            .await
            .map_err(ClientError::from_resilience)
    }

    pub async fn call_async<R, E, F, Fut>(&self, is_retryable: impl Fn(&E) -> bool, operation: F) -> Result<R, ClientError>
    where
        F: Fn(&T) -> Fut,
        Fut: Future<Output = Result<R, E>>,
        E: std::fmt::Display,
    {
        self.call(is_retryable, operation).await
    }

    /// Path-based convenience is an HTTP-only notion; SDK declines it.
    pub fn call_path(&self) -> Result<(), ClientError> {
        Err(ClientError::Unsupported("sdk service client"))
    }
}

impl<T: Shutdownable> SdkServiceClient<T> {
    /// Idempotent: the wrapped instance's `shutdown` runs at most once even
    /// across repeated calls.
    pub fn shutdown(&self) {
        if !self.shut_down.swap(true, Ordering::SeqCst) {
            self.instance.shutdown();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicU32;

    use super::*;
    use crate::config::CircuitBreakerSettings;

    struct CountingSdk {
        shutdown_calls: AtomicU32,
    }

    impl Shutdownable for CountingSdk {
        fn shutdown(&self) {
            self.shutdown_calls.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn client(instance: CountingSdk) -> SdkServiceClient<CountingSdk> {
        SdkServiceClient::new(
            "legacy-ledger-sdk",
            instance,
            Duration::from_secs(1),
            Arc::new(CircuitBreakerManager::new(CircuitBreakerSettings::default())),
            RetryPolicy::none(),
        )
    }

    #[tokio::test]
    async fn successful_call_invokes_wrapped_instance() {
        let client = client(CountingSdk { shutdown_calls: AtomicU32::new(0) });
        let result: Result<u32, ClientError> = client.call(|_: &String| false, |_instance| async { Ok::<u32, String>(42) }).await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn shutdown_invokes_hook_at_most_once() {
        let client = client(CountingSdk { shutdown_calls: AtomicU32::new(0) });
        client.shutdown();
        client.shutdown();
        assert_eq!(client.instance().shutdown_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn call_after_shutdown_fails_without_invoking_instance() {
        let client = client(CountingSdk { shutdown_calls: AtomicU32::new(0) });
        client.shutdown();
        let result: Result<u32, ClientError> = client.call(|_: &String| false, |_instance| async { Ok::<u32, String>(1) }).await;
        assert!(matches!(result, Err(ClientError::Shutdown)));
    }

    #[test]
    fn call_path_is_unsupported() {
        let err = ClientError::Unsupported("sdk service client");
        assert!(matches!(err, ClientError::Unsupported(_)));
    }
}
