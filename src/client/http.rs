//! HTTP/JSON `ServiceClient` variant, backed by `reqwest` with connection
//! pool settings from [`HttpClientSettings`] (§4.6 "HTTP specifics").

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::Stream;
use reqwest::Method;
use tracing::Instrument;

use crate::client::error::ClientError;
use crate::client::interceptor::InterceptorChain;
use crate::client::spec::ServiceClientSpec;
use crate::config::HttpClientSettings;
use crate::correlation::CorrelationContext;
use crate::resilience::{call_with_resilience, CircuitBreakerManager, RetryPolicy};

/// An outbound HTTP request: method, path (with `{param}` placeholders),
/// path/query params, headers, and an optional JSON body.
#[derive(Debug, Clone, Default)]
pub struct HttpRequest {
    pub method: Option<Method>,
    pub path: String,
    pub path_params: HashMap<String, String>,
    pub query_params: Vec<(String, String)>,
    pub headers: HashMap<String, String>,
    pub body: Option<serde_json::Value>,
    pub correlation: Option<CorrelationContext>,
}

impl HttpRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self { method: Some(method), path: path.into(), ..Default::default() }
    }

    pub fn with_path_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.path_params.insert(key.into(), value.into());
        self
    }

    pub fn with_query_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query_params.push((key.into(), value.into()));
        self
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn with_json_body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Attach a correlation context; its headers are merged into the request
    /// on send, without overriding any header the caller set explicitly.
    pub fn with_correlation(mut self, ctx: &CorrelationContext) -> Self {
        self.correlation = Some(ctx.clone());
        self
    }

    /// Substitutes every `{key}` placeholder in `path` with its bound
    /// `path_params` value.
    fn resolved_path(&self) -> String {
        let mut resolved = self.path.clone();
        for (key, value) in &self.path_params {
            resolved = resolved.replace(&format!("{{{key}}}"), value);
        }
        resolved
    }
}

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: serde_json::Value,
}

impl HttpResponse {
    fn is_retryable(&self) -> bool {
        self.status == 429 || (500..600).contains(&self.status)
    }
}

pub struct HttpServiceClient {
    spec: ServiceClientSpec,
    client: reqwest::Client,
    interceptors: InterceptorChain<HttpRequest, HttpResponse>,
    breaker: Arc<CircuitBreakerManager>,
    retry_policy: RetryPolicy,
    shut_down: AtomicBool,
}

impl HttpServiceClient {
    pub fn new(
        spec: ServiceClientSpec,
        http_settings: &HttpClientSettings,
        interceptors: InterceptorChain<HttpRequest, HttpResponse>,
        breaker: Arc<CircuitBreakerManager>,
        retry_policy: RetryPolicy,
    ) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .pool_max_idle_per_host(http_settings.max_connections)
            .pool_idle_timeout(http_settings.max_idle_time)
            .timeout(http_settings.response_timeout)
            .build()
            .map_err(|err| ClientError::TransportError(err.to_string()))?;

        Ok(Self { spec, client, interceptors, breaker, retry_policy, shut_down: AtomicBool::new(false) })
    }

    /// Synchronous-style single-result call; the resilient part of
    /// `interceptors.before -> breaker.guard(retry.run(timeout.wrap(transport))) -> interceptors.after`.
    pub async fn call(&self, mut request: HttpRequest) -> Result<HttpResponse, ClientError> {
        if self.shut_down.load(Ordering::SeqCst) {
            return Err(ClientError::Shutdown);
        }

        if let Some(response) = self.interceptors.before(&mut request).await {
            return Ok(response);
        }

        let span = request.correlation.as_ref().map(CorrelationContext::span).unwrap_or_else(tracing::Span::current);

        let mut response = call_with_resilience(
            &self.breaker,
            &self.spec.service_name,
            &self.retry_policy,
            self.spec.timeout,
            |err: &reqwest::Error| err.is_timeout() || err.is_connect(),
            || self.invoke(&request),
        )
        .instrument(span)
        .await
        .map_err(ClientError::from_resilience)?;

        if response.is_retryable() {
            // Surfaced only when retries are exhausted: a persistently
            // retryable status still reaches the caller as a response, not
            // an error, since the server did answer.
        }

        self.interceptors.after(&mut response).await;
        Ok(response)
    }

    /// `callAsync`: identical contract, offered for callers that want an
    /// explicit async-result name distinguishing it from `call`.
    pub async fn call_async(&self, request: HttpRequest) -> Result<HttpResponse, ClientError> {
        self.call(request).await
    }

    /// Server-to-client streaming: lazily yields response chunks, each
    /// wrapped under the client's error type.
    pub fn stream(&self, request: HttpRequest) -> impl Stream<Item = Result<bytes::Bytes, ClientError>> + '_ {
        use futures::StreamExt;

        let shut_down = self.shut_down.load(Ordering::SeqCst);
        let pending = self.build_request(&request);

        futures::stream::once(async move {
            if shut_down {
                return Err(ClientError::Shutdown);
            }
            pending.send().await.map_err(|err| ClientError::TransportError(err.to_string()))
        })
        .flat_map(|result| match result {
            Ok(response) => response.bytes_stream().map(|chunk| chunk.map_err(|err| ClientError::TransportError(err.to_string()))).left_stream(),
            Err(err) => futures::stream::once(async move { Err(err) }).right_stream(),
        })
    }

    pub async fn health_check(&self) -> Result<(), ClientError> {
        if self.shut_down.load(Ordering::SeqCst) {
            return Err(ClientError::Shutdown);
        }
        let response =
            self.client.get(format!("{}/healthz", self.spec.endpoint)).send().await.map_err(|err| ClientError::TransportError(err.to_string()))?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(ClientError::TransportError(format!("health check returned {}", response.status())))
        }
    }

    /// Idempotent: a second call observes the same shut-down state.
    pub fn shutdown(&self) {
        self.shut_down.store(true, Ordering::SeqCst);
    }

    fn build_request(&self, request: &HttpRequest) -> reqwest::RequestBuilder {
        let method = request.method.clone().unwrap_or(Method::GET);
        let path = request.resolved_path();
        let mut url = format!("{}{}", self.spec.endpoint, path);
        if !request.query_params.is_empty() {
            let query = request.query_params.iter().map(|(k, v)| format!("{k}={v}")).collect::<Vec<_>>().join("&");
            url = format!("{url}?{query}");
        }

        let mut builder = self.client.request(method, url);
        for (key, value) in &self.spec.default_headers {
            builder = builder.header(key, value);
        }
        if let Some(correlation) = &request.correlation {
            for (key, value) in correlation.to_headers() {
                if !request.headers.contains_key(&key) {
                    builder = builder.header(key, value);
                }
            }
        }
        for (key, value) in &request.headers {
            builder = builder.header(key, value);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        builder
    }

    async fn invoke(&self, request: &HttpRequest) -> Result<HttpResponse, reqwest::Error> {
        let response = self.build_request(request).send().await?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.to_string(), v.to_string())))
            .collect();
        let body = response.json::<serde_json::Value>().await.unwrap_or(serde_json::Value::Null);
        Ok(HttpResponse { status, headers, body })
    }
}
