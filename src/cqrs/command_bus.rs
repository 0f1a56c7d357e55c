//! `CommandBus`: resolves a handler by command type, then runs
//! validate → authorize → metrics → handler (with timeout and
//! handler-declared retry) → metrics, per §4.1.
//!
//! Handler registration is type-erased because Rust has no runtime
//! reflection to derive a `messageType -> handler` map the way the teacher's
//! annotation-driven discovery does; each concrete [`Command`] is boxed as
//! `dyn Any` and recovered by a downcast the bus itself guarantees is sound
//! (the registry is keyed by the same `TypeId` used to look the handler up).

use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use tracing::Instrument;

use crate::correlation::CorrelationContext;
use crate::cqrs::authorization::{AuthorizationService, Violation};
use crate::cqrs::handler::{DuplicateHandlerError, HandlerDescriptor, TypeRegistry};
use crate::cqrs::message::{Command, ExecutionContext};
use crate::cqrs::validation::{FieldError, ValidationProcessor};
use crate::metrics::{incr, MetricsRegistry};
use crate::resilience::retry::{run_with_retry, RetryPolicy};

/// Failure taxonomy for `CommandBus::send`, per §7.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CommandError {
    #[error("no handler registered for command type {0}")]
    HandlerNotFound(&'static str),
    #[error("validation failed: {0:?}")]
    ValidationFailed(Vec<FieldError>),
    #[error("authorization denied: {0:?}")]
    AuthorizationDenied(Vec<Violation>),
    #[error("handler timed out")]
    HandlerTimeout,
    #[error("handler error: {0}")]
    HandlerError(String),
}

/// Outcome a handler may report beyond a plain result: whether the failure
/// is eligible for the bus's own retry loop (distinct from a service
/// client's transport retries).
#[derive(Debug, Clone, thiserror::Error)]
pub enum HandlerError {
    #[error("{0}")]
    Retryable(String),
    #[error("{0}")]
    Fatal(String),
}

/// A function bound to exactly one command type (§GLOSSARY).
#[async_trait]
pub trait CommandHandler<C: Command>: Send + Sync {
    async fn handle(&self, cmd: &C, ctx: &ExecutionContext) -> Result<C::Result, HandlerError>;
}

/// Object-safe dispatch surface every [`CommandRegistration`] implements,
/// letting the bus hold a `TypeRegistry<Box<dyn ErasedCommand>>` without a
/// type parameter per command.
#[async_trait]
trait ErasedCommand: Send + Sync {
    async fn dispatch(
        &self,
        command: Box<dyn Any + Send>,
        ctx: ExecutionContext,
        metrics: &dyn MetricsRegistry,
    ) -> Result<Box<dyn Any + Send>, CommandError>;
}

struct AttemptFailure {
    error: CommandError,
    retryable: bool,
}

struct CommandRegistration<C: Command> {
    handler: Arc<dyn CommandHandler<C>>,
    validation: ValidationProcessor<C>,
    authorization: AuthorizationService<C>,
    descriptor: HandlerDescriptor,
    retry_policy: RetryPolicy,
}

#[async_trait]
impl<C: Command> ErasedCommand for CommandRegistration<C> {
    async fn dispatch(
        &self,
        command: Box<dyn Any + Send>,
        ctx: ExecutionContext,
        metrics: &dyn MetricsRegistry,
    ) -> Result<Box<dyn Any + Send>, CommandError> {
        let cmd = *command
            .downcast::<C>()
            .expect("command_bus: type erasure invariant violated, registry key did not match boxed value");

        let mut tags = self.descriptor.metrics_tags();

        let correlation = match &cmd.envelope().correlation_id {
            Some(correlation_id) => {
                tags.push(("correlationId", correlation_id.clone()));
                CorrelationContext::with_id(correlation_id.clone())
            }
            None => CorrelationContext::new(),
        };

        let validation = self.validation.validate(&cmd);
        if !validation.valid() {
            return Err(CommandError::ValidationFailed(validation.errors().to_vec()));
        }

        let authorization = self.authorization.authorize(&cmd, &ctx);
        if !authorization.authorized() {
            return Err(CommandError::AuthorizationDenied(authorization.violations().to_vec()));
        }

        incr(metrics, "command.dispatch.started", &tags);
        let started = std::time::Instant::now();

        let effective_timeout = cmd
            .envelope()
            .overrides
            .timeout
            .map(|override_timeout| override_timeout.min(self.descriptor.timeout))
            .unwrap_or(self.descriptor.timeout);

        let result = run_with_retry(
            &self.retry_policy,
            |failure: &AttemptFailure| failure.retryable,
            |_attempt| {
                let cmd = &cmd;
                let ctx = &ctx;
                async move {
                    match tokio::time::timeout(effective_timeout, self.handler.handle(cmd, ctx)).await {
                        Ok(Ok(value)) => Ok(value),
                        Ok(Err(HandlerError::Retryable(message))) => {
                            Err(AttemptFailure { error: CommandError::HandlerError(message), retryable: true })
                        }
                        Ok(Err(HandlerError::Fatal(message))) => {
                            Err(AttemptFailure { error: CommandError::HandlerError(message), retryable: false })
                        }
                        Err(_elapsed) => Err(AttemptFailure { error: CommandError::HandlerTimeout, retryable: false }),
                    }
                }
            },
        )
        .instrument(correlation.span())
        .await;

        match result {
            Ok(value) => {
                let mut result_tags = tags.clone();
                result_tags.push(("result", "success".to_string()));
                incr(metrics, "command.sent.total", &result_tags);
                metrics.timer("command.duration", &tags, started.elapsed());
                Ok(Box::new(value))
            }
            Err(failure) => {
                let mut result_tags = tags.clone();
                result_tags.push(("result", "failure".to_string()));
                incr(metrics, "command.sent.total", &result_tags);
                Err(failure.error)
            }
        }
    }
}

/// Builds an immutable [`CommandBus`] from an explicit registration phase,
/// replacing the teacher's annotation-driven handler discovery (Design Notes).
pub struct CommandBusBuilder {
    registrations: TypeRegistry<Box<dyn ErasedCommand>>,
    metrics: Arc<dyn MetricsRegistry>,
    default_retry_policy: RetryPolicy,
}

impl CommandBusBuilder {
    pub fn new(metrics: Arc<dyn MetricsRegistry>) -> Self {
        Self { registrations: TypeRegistry::new(), metrics, default_retry_policy: RetryPolicy::default() }
    }

    /// Backoff shape applied between handler-declared retries; only
    /// `max_attempts` is overridden per registration, from
    /// `descriptor.max_retries`.
    pub fn with_default_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.default_retry_policy = policy;
        self
    }

    pub fn register<C: Command>(
        mut self,
        handler: impl CommandHandler<C> + 'static,
        descriptor: HandlerDescriptor,
        validation: ValidationProcessor<C>,
        authorization: AuthorizationService<C>,
    ) -> Result<Self, DuplicateHandlerError> {
        let retry_policy = RetryPolicy { max_attempts: descriptor.max_retries + 1, ..self.default_retry_policy.clone() };
        let registration =
            CommandRegistration { handler: Arc::new(handler), validation, authorization, descriptor: descriptor.clone(), retry_policy };
        self.registrations.insert::<C>(descriptor.message_type, Box::new(registration))?;
        Ok(self)
    }

    pub fn build(self) -> CommandBus {
        CommandBus { registrations: self.registrations, metrics: self.metrics }
    }
}

/// Dispatches commands to their registered handler. Immutable after
/// construction; safe for concurrent `send` calls.
pub struct CommandBus {
    registrations: TypeRegistry<Box<dyn ErasedCommand>>,
    metrics: Arc<dyn MetricsRegistry>,
}

impl CommandBus {
    pub fn builder(metrics: Arc<dyn MetricsRegistry>) -> CommandBusBuilder {
        CommandBusBuilder::new(metrics)
    }

    pub async fn send<C: Command>(&self, cmd: C, ctx: ExecutionContext) -> Result<C::Result, CommandError> {
        let type_name = cmd.type_name();
        let registration = self.registrations.get::<C>().ok_or(CommandError::HandlerNotFound(type_name))?;
        let boxed: Box<dyn Any + Send> = Box::new(cmd);
        let result = registration.dispatch(boxed, ctx, self.metrics.as_ref()).await?;
        Ok(*result
            .downcast::<C::Result>()
            .expect("command_bus: type erasure invariant violated, result type mismatch"))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;
    use crate::cqrs::message::Envelope;
    use crate::metrics::InMemoryMetricsRegistry;

    struct OpenAccount {
        envelope: Envelope,
        customer_id: String,
        initial_deposit: f64,
    }

    impl Command for OpenAccount {
        type Result = String;

        fn type_name(&self) -> &'static str {
            "OpenAccount"
        }

        fn envelope(&self) -> &Envelope {
            &self.envelope
        }
    }

    fn open_account_validation() -> ValidationProcessor<OpenAccount> {
        use crate::cqrs::validation::{FnValidator, ValidationResult};

        ValidationProcessor::new()
            .with_rule(Box::new(FnValidator::new(|cmd: &OpenAccount| {
                if cmd.customer_id.is_empty() {
                    ValidationResult::single(FieldError::new("customerId", "required", "must not be empty"))
                } else {
                    ValidationResult::ok()
                }
            })))
            .with_rule(Box::new(FnValidator::new(|cmd: &OpenAccount| {
                if cmd.initial_deposit < 0.0 {
                    ValidationResult::single(FieldError::new("initialDeposit", "range", "must be >= 0"))
                } else {
                    ValidationResult::ok()
                }
            })))
    }

    struct CountingHandler {
        calls: AtomicU32,
    }

    #[async_trait]
    impl CommandHandler<OpenAccount> for CountingHandler {
        async fn handle(&self, cmd: &OpenAccount, _ctx: &ExecutionContext) -> Result<String, HandlerError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(format!("ACC-{}", cmd.customer_id))
        }
    }

    fn test_metrics() -> Arc<InMemoryMetricsRegistry> {
        Arc::new(InMemoryMetricsRegistry::new())
    }

    #[tokio::test]
    async fn registered_handler_invoked_exactly_once_on_success() {
        let metrics = test_metrics();
        let bus = CommandBus::builder(metrics.clone())
            .register(
                CountingHandler { calls: AtomicU32::new(0) },
                HandlerDescriptor::new("OpenAccount"),
                open_account_validation(),
                AuthorizationService::disabled(),
            )
            .unwrap()
            .build();

        let cmd = OpenAccount { envelope: Envelope::new(), customer_id: "CUST-12345".into(), initial_deposit: 5000.0 };
        let result = bus.send(cmd, ExecutionContext::new()).await.unwrap();
        assert_eq!(result, "ACC-CUST-12345");
        assert_eq!(metrics.count_matching("command.dispatch.started"), 1);
    }

    struct UnregisteredCommand(Envelope);

    impl Command for UnregisteredCommand {
        type Result = ();

        fn envelope(&self) -> &Envelope {
            &self.0
        }
    }

    #[tokio::test]
    async fn unregistered_command_fails_with_handler_not_found() {
        let bus = CommandBus::builder(test_metrics()).build();
        let err = bus.send(UnregisteredCommand(Envelope::new()), ExecutionContext::new()).await.unwrap_err();
        assert!(matches!(err, CommandError::HandlerNotFound(_)));
    }

    #[tokio::test]
    async fn invalid_command_fails_with_validation_errors_and_skips_handler() {
        let metrics = test_metrics();
        let bus = CommandBus::builder(metrics)
            .register(
                CountingHandler { calls: AtomicU32::new(0) },
                HandlerDescriptor::new("OpenAccount"),
                open_account_validation(),
                AuthorizationService::disabled(),
            )
            .unwrap()
            .build();

        let cmd = OpenAccount { envelope: Envelope::new(), customer_id: String::new(), initial_deposit: -1.0 };
        let err = bus.send(cmd, ExecutionContext::new()).await.unwrap_err();
        match err {
            CommandError::ValidationFailed(errors) => {
                let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
                assert_eq!(fields, vec!["customerId", "initialDeposit"]);
            }
            other => panic!("expected ValidationFailed, got {other:?}"),
        }
    }

    struct FlakyHandler {
        failures_before_success: u32,
        attempts: AtomicU32,
    }

    #[async_trait]
    impl CommandHandler<OpenAccount> for FlakyHandler {
        async fn handle(&self, _cmd: &OpenAccount, _ctx: &ExecutionContext) -> Result<String, HandlerError> {
            let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
            if attempt < self.failures_before_success {
                Err(HandlerError::Retryable("transient".into()))
            } else {
                Ok("ok".into())
            }
        }
    }

    #[tokio::test]
    async fn retryable_handler_error_is_retried_up_to_max_retries() {
        let metrics = test_metrics();
        let bus = CommandBus::builder(metrics)
            .with_default_retry_policy(RetryPolicy { base_delay: Duration::from_millis(1), jitter: 0.0, max_delay: Duration::from_millis(5), ..RetryPolicy::default() })
            .register(
                FlakyHandler { failures_before_success: 2, attempts: AtomicU32::new(0) },
                HandlerDescriptor::new("OpenAccount").with_max_retries(2),
                open_account_validation(),
                AuthorizationService::disabled(),
            )
            .unwrap()
            .build();

        let cmd = OpenAccount { envelope: Envelope::new(), customer_id: "CUST-1".into(), initial_deposit: 10.0 };
        let result = bus.send(cmd, ExecutionContext::new()).await.unwrap();
        assert_eq!(result, "ok");
    }

    #[tokio::test]
    async fn fatal_handler_error_is_not_retried() {
        struct FatalHandler {
            calls: AtomicU32,
        }

        #[async_trait]
        impl CommandHandler<OpenAccount> for FatalHandler {
            async fn handle(&self, _cmd: &OpenAccount, _ctx: &ExecutionContext) -> Result<String, HandlerError> {
                self.calls.fetch_add(1, Ordering::SeqCst);
                Err(HandlerError::Fatal("unrecoverable".into()))
            }
        }

        let metrics = test_metrics();
        let bus = CommandBus::builder(metrics)
            .register(
                FatalHandler { calls: AtomicU32::new(0) },
                HandlerDescriptor::new("OpenAccount").with_max_retries(3),
                open_account_validation(),
                AuthorizationService::disabled(),
            )
            .unwrap()
            .build();

        let cmd = OpenAccount { envelope: Envelope::new(), customer_id: "CUST-1".into(), initial_deposit: 10.0 };
        let err = bus.send(cmd, ExecutionContext::new()).await.unwrap_err();
        assert!(matches!(err, CommandError::HandlerError(_)));
    }
}
