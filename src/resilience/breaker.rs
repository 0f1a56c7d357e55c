//! Circuit breaker state machine, one instance per `serviceName` (§4.5,
//! §3 `CircuitBreakerState`).
//!
//! A count-based sliding window of outcomes backs the failure-rate
//! evaluation; state transitions are serialized behind one `Mutex` per
//! breaker so concurrent callers observe a linearizable snapshot (§5).

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::config::CircuitBreakerSettings;

/// Observable breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Closed,
    Open,
    HalfOpen,
}

/// Raised by [`CircuitBreakerManager::guard`] when a call is rejected
/// without reaching transport.
#[derive(Debug, Clone, thiserror::Error)]
#[error("circuit open for service {0}")]
pub struct CircuitOpen(pub String);

/// Outcome of a guarded call: either the breaker rejected it fast, or the
/// wrapped attempt ran and failed with its own error type.
#[derive(Debug)]
pub enum GuardError<E> {
    Open(CircuitOpen),
    Inner(E),
}

impl<E: std::fmt::Display> std::fmt::Display for GuardError<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GuardError::Open(open) => open.fmt(f),
            GuardError::Inner(err) => err.fmt(f),
        }
    }
}

impl<E: std::fmt::Debug + std::fmt::Display> std::error::Error for GuardError<E> {}

struct Breaker {
    state: State,
    last_transition_at: Instant,
    /// Ring of recent outcomes, `true` = success; bounded to `sliding_window_size`.
    window: Vec<bool>,
    half_open_successes: u32,
    settings: CircuitBreakerSettings,
}

impl Breaker {
    fn new(settings: CircuitBreakerSettings) -> Self {
        Self { state: State::Closed, last_transition_at: Instant::now(), window: Vec::new(), half_open_successes: 0, settings }
    }

    fn transition(&mut self, state: State) {
        self.state = state;
        self.last_transition_at = Instant::now();
        if state != State::HalfOpen {
            self.half_open_successes = 0;
        }
        if state == State::Closed {
            self.window.clear();
        }
    }

    /// Called before a guarded call. Moves OPEN → HALF_OPEN once the wait
    /// duration has elapsed; otherwise reports whether the call may proceed.
    fn may_call(&mut self) -> bool {
        match self.state {
            State::Closed | State::HalfOpen => true,
            State::Open => {
                if self.last_transition_at.elapsed() >= self.settings.wait_duration_in_open_state {
                    self.transition(State::HalfOpen);
                    true
                } else {
                    false
                }
            }
        }
    }

    fn record(&mut self, success: bool) {
        match self.state {
            State::HalfOpen => {
                if success {
                    self.half_open_successes += 1;
                    if self.half_open_successes >= self.settings.permitted_calls_in_half_open {
                        self.transition(State::Closed);
                    }
                } else {
                    self.transition(State::Open);
                }
            }
            State::Closed => {
                self.window.push(success);
                if self.window.len() as u32 > self.settings.sliding_window_size {
                    self.window.remove(0);
                }
                if self.window.len() as u32 >= self.settings.minimum_calls {
                    let failures = self.window.iter().filter(|&&s| !s).count() as f64;
                    let failure_rate = failures / self.window.len() as f64;
                    if failure_rate >= self.settings.failure_rate_threshold {
                        self.transition(State::Open);
                    }
                }
            }
            State::Open => {}
        }
    }
}

/// One breaker per `serviceName`, created lazily and shared by every caller
/// naming that service (§3 ownership: "shares one breaker per serviceName").
pub struct CircuitBreakerManager {
    breakers: Mutex<HashMap<String, Breaker>>,
    default_settings: CircuitBreakerSettings,
}

impl CircuitBreakerManager {
    pub fn new(default_settings: CircuitBreakerSettings) -> Self {
        Self { breakers: Mutex::new(HashMap::new()), default_settings }
    }

    pub fn state_of(&self, service: &str) -> State {
        let mut breakers = self.breakers.lock().expect("breaker map lock poisoned");
        breakers.entry(service.to_string()).or_insert_with(|| Breaker::new(self.default_settings.clone())).state
    }

    /// Guards a single call: rejects with [`CircuitOpen`] without running
    /// `attempt` if the breaker for `service` is OPEN; otherwise runs
    /// `attempt` and records its outcome.
    pub async fn guard<T, E, F, Fut>(&self, service: &str, attempt: F) -> Result<T, GuardError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<T, E>>,
    {
        let (may_call, slow_call_duration_threshold) = {
            let mut breakers = self.breakers.lock().expect("breaker map lock poisoned");
            let breaker = breakers.entry(service.to_string()).or_insert_with(|| Breaker::new(self.default_settings.clone()));
            (breaker.may_call(), breaker.settings.slow_call_duration_threshold)
        };

        if !may_call {
            return Err(GuardError::Open(CircuitOpen(service.to_string())));
        }

        let started = Instant::now();
        let outcome = attempt().await;
        let slow = started.elapsed() >= slow_call_duration_threshold;
        let success = outcome.is_ok() && !slow;

        let mut breakers = self.breakers.lock().expect("breaker map lock poisoned");
        breakers.entry(service.to_string()).or_insert_with(|| Breaker::new(self.default_settings.clone())).record(success);
        drop(breakers);

        outcome.map_err(GuardError::Inner)
    }
}
