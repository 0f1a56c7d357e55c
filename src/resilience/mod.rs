//! Resilience primitives shared by every `ServiceClient` variant: circuit
//! breaker, retry policy, deadline wrapping, and their composition (§4.5).

pub mod breaker;
pub mod pipeline;
pub mod retry;
pub mod timeout;

pub use breaker::{CircuitBreakerManager, CircuitOpen, GuardError, State as BreakerState};
pub use pipeline::{call as call_with_resilience, ResilienceError};
pub use retry::{run_with_retry, RetryPolicy};
pub use timeout::{with_timeout, TimeoutError};
