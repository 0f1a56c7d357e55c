//! `QueryBus`: same pipeline as [`crate::cqrs::command_bus::CommandBus`] plus
//! a cache lookup before handler dispatch, per §4.2. No event emission step;
//! queries are side-effect-free by contract.

use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use tracing::Instrument;

use crate::correlation::CorrelationContext;
use crate::cqrs::authorization::{AuthorizationService, Violation};
use crate::cqrs::cache::{CachedValue, QueryCache};
use crate::cqrs::handler::{DuplicateHandlerError, HandlerDescriptor, TypeRegistry};
use crate::cqrs::message::{ExecutionContext, Query};
use crate::cqrs::validation::{FieldError, ValidationProcessor};
use crate::metrics::{incr, MetricsRegistry};
use crate::resilience::retry::{run_with_retry, RetryPolicy};

/// Failure taxonomy for `QueryBus::query`, per §7.
#[derive(Debug, Clone, thiserror::Error)]
pub enum QueryError {
    #[error("no handler registered for query type {0}")]
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

/// Outcome a query handler may report beyond a plain result.
#[derive(Debug, Clone, thiserror::Error)]
pub enum HandlerError {
    #[error("{0}")]
    Retryable(String),
    #[error("{0}")]
    Fatal(String),
}

/// A function bound to exactly one query type.
#[async_trait]
pub trait QueryHandler<Q: Query>: Send + Sync {
    async fn handle(&self, query: &Q, ctx: &ExecutionContext) -> Result<Q::Result, HandlerError>;
}

#[async_trait]
trait ErasedQuery: Send + Sync {
    async fn dispatch(
        &self,
        query: Box<dyn Any + Send>,
        ctx: ExecutionContext,
        cache: &dyn QueryCache,
        metrics: &dyn MetricsRegistry,
    ) -> Result<Box<dyn Any + Send>, QueryError>;
}

struct AttemptFailure {
    error: QueryError,
    retryable: bool,
}

struct QueryRegistration<Q: Query> {
    handler: Arc<dyn QueryHandler<Q>>,
    validation: ValidationProcessor<Q>,
    authorization: AuthorizationService<Q>,
    descriptor: HandlerDescriptor,
    retry_policy: RetryPolicy,
}

#[async_trait]
impl<Q: Query> ErasedQuery for QueryRegistration<Q> {
    async fn dispatch(
        &self,
        query: Box<dyn Any + Send>,
        ctx: ExecutionContext,
        cache: &dyn QueryCache,
        metrics: &dyn MetricsRegistry,
    ) -> Result<Box<dyn Any + Send>, QueryError> {
        let query = *query
            .downcast::<Q>()
            .expect("query_bus: type erasure invariant violated, registry key did not match boxed value");

        let mut tags = self.descriptor.metrics_tags();

        let correlation = match &query.envelope().correlation_id {
            Some(correlation_id) => {
                tags.push(("correlationId", correlation_id.clone()));
                CorrelationContext::with_id(correlation_id.clone())
            }
            None => CorrelationContext::new(),
        };

        let validation = self.validation.validate(&query);
        if !validation.valid() {
            return Err(QueryError::ValidationFailed(validation.errors().to_vec()));
        }

        let authorization = self.authorization.authorize(&query, &ctx);
        if !authorization.authorized() {
            return Err(QueryError::AuthorizationDenied(authorization.violations().to_vec()));
        }

        let cache_key = query.cacheable().then(|| query.cache_key());
        if let Some(key) = &cache_key {
            if let Some(cached) = cache.get(key).await {
                incr(metrics, "query.cache.hit", &tags);
                return Ok(downcast_cached::<Q::Result>(cached));
            }
        }

        incr(metrics, "query.dispatch.started", &tags);
        let started = std::time::Instant::now();

        let effective_timeout = query
            .envelope()
            .overrides
            .timeout
            .map(|override_timeout| override_timeout.min(self.descriptor.timeout))
            .unwrap_or(self.descriptor.timeout);

        let result = run_with_retry(
            &self.retry_policy,
            |failure: &AttemptFailure| failure.retryable,
            |_attempt| {
                let query = &query;
                let ctx = &ctx;
                async move {
                    match tokio::time::timeout(effective_timeout, self.handler.handle(query, ctx)).await {
                        Ok(Ok(value)) => Ok(value),
                        Ok(Err(HandlerError::Retryable(message))) => {
                            Err(AttemptFailure { error: QueryError::HandlerError(message), retryable: true })
                        }
                        Ok(Err(HandlerError::Fatal(message))) => {
                            Err(AttemptFailure { error: QueryError::HandlerError(message), retryable: false })
                        }
                        Err(_elapsed) => Err(AttemptFailure { error: QueryError::HandlerTimeout, retryable: false }),
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
                incr(metrics, "query.sent.total", &result_tags);
                metrics.timer("query.duration", &tags, started.elapsed());

                if let Some(key) = cache_key {
                    incr(metrics, "query.cache.miss", &tags);
                    let ttl = query.cache_ttl().or(self.descriptor.cache_ttl);
                    if let Some(ttl) = ttl {
                        let erased: CachedValue = Arc::new(value.clone());
                        cache.put(key, erased, ttl).await;
                    }
                }

                Ok(Box::new(value))
            }
            Err(failure) => {
                let mut result_tags = tags.clone();
                result_tags.push(("result", "failure".to_string()));
                incr(metrics, "query.sent.total", &result_tags);
                Err(failure.error)
            }
        }
    }
}

fn downcast_cached<T: Clone + Send + Sync + 'static>(cached: CachedValue) -> Box<dyn Any + Send> {
    let value = cached
        .downcast_ref::<T>()
        .expect("query_bus: cached value type mismatch for cache key")
        .clone();
    Box::new(value)
}

/// Builds an immutable [`QueryBus`] from an explicit registration phase.
pub struct QueryBusBuilder {
    registrations: TypeRegistry<Box<dyn ErasedQuery>>,
    cache: Arc<dyn QueryCache>,
    metrics: Arc<dyn MetricsRegistry>,
    default_retry_policy: RetryPolicy,
}

impl QueryBusBuilder {
    pub fn new(cache: Arc<dyn QueryCache>, metrics: Arc<dyn MetricsRegistry>) -> Self {
        Self { registrations: TypeRegistry::new(), cache, metrics, default_retry_policy: RetryPolicy::default() }
    }

    pub fn with_default_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.default_retry_policy = policy;
        self
    }

    pub fn register<Q: Query>(
        mut self,
        handler: impl QueryHandler<Q> + 'static,
        descriptor: HandlerDescriptor,
        validation: ValidationProcessor<Q>,
        authorization: AuthorizationService<Q>,
    ) -> Result<Self, DuplicateHandlerError>
    where
        Q::Result: Clone,
    {
        let retry_policy = RetryPolicy { max_attempts: descriptor.max_retries + 1, ..self.default_retry_policy.clone() };
        let registration =
            QueryRegistration { handler: Arc::new(handler), validation, authorization, descriptor: descriptor.clone(), retry_policy };
        self.registrations.insert::<Q>(descriptor.message_type, Box::new(registration))?;
        Ok(self)
    }

    pub fn build(self) -> QueryBus {
        QueryBus { registrations: self.registrations, cache: self.cache, metrics: self.metrics }
    }
}

/// Dispatches queries to their registered handler, with a cache lookup
/// before invocation for cacheable queries. Immutable after construction.
pub struct QueryBus {
    registrations: TypeRegistry<Box<dyn ErasedQuery>>,
    cache: Arc<dyn QueryCache>,
    metrics: Arc<dyn MetricsRegistry>,
}

impl QueryBus {
    pub fn builder(cache: Arc<dyn QueryCache>, metrics: Arc<dyn MetricsRegistry>) -> QueryBusBuilder {
        QueryBusBuilder::new(cache, metrics)
    }

    pub async fn query<Q: Query>(&self, query: Q, ctx: ExecutionContext) -> Result<Q::Result, QueryError>
    where
        Q::Result: Clone,
    {
        let type_name = query.type_name();
        let registration = self.registrations.get::<Q>().ok_or(QueryError::HandlerNotFound(type_name))?;
        let boxed: Box<dyn Any + Send> = Box::new(query);
        let result = registration.dispatch(boxed, ctx, self.cache.as_ref(), self.metrics.as_ref()).await?;
        Ok(*result
            .downcast::<Q::Result>()
            .expect("query_bus: type erasure invariant violated, result type mismatch"))
    }
}
