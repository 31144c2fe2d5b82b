//! JSON request client with timeout, cancellation and GET-only retry.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use serde::Serialize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn, Instrument};
use uuid::Uuid;

use crate::api::envelope::{Envelope, REQUEST_FAILED};
use crate::api::retry::{AttemptFailure, RetryPolicy};
use crate::config::ApiConfig;
use crate::error::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    /// Only reads are safe to repeat without the caller knowing.
    pub fn is_idempotent_read(self) -> bool {
        matches!(self, Method::Get)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

/// Per-request overrides. Unset fields take the client defaults.
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub method: Method,
    pub body: Option<Value>,
    pub headers: Vec<(String, String)>,
    pub timeout: Option<Duration>,
    pub retries: Option<u32>,
    pub retry_delay: Option<Duration>,
    pub cancel: Option<CancellationToken>,
}

impl RequestOptions {
    pub fn new(method: Method) -> Self {
        Self {
            method,
            body: None,
            headers: Vec::new(),
            timeout: None,
            retries: None,
            retry_delay: None,
            cancel: None,
        }
    }

    pub fn get() -> Self {
        Self::new(Method::Get)
    }

    pub fn post() -> Self {
        Self::new(Method::Post)
    }

    /// Serialize `body` as the JSON request body.
    pub fn json<T: Serialize>(mut self, body: &T) -> Result<Self, ApiError> {
        let value = serde_json::to_value(body)
            .map_err(|e| ApiError::Validation(format!("Invalid request body: {}", e)))?;
        self.body = Some(value);
        Ok(self)
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn timeout_ms(self, ms: u64) -> Self {
        self.timeout(Duration::from_millis(ms))
    }

    pub fn retries(mut self, retries: u32) -> Self {
        self.retries = Some(retries);
        self
    }

    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = Some(delay);
        self
    }

    pub fn cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Attach `token` if one was given.
    pub fn with_cancel(self, token: Option<CancellationToken>) -> Self {
        match token {
            Some(token) => self.cancel(token),
            None => self,
        }
    }
}

/// Shared HTTP client bound to one API base URL.
///
/// Cloning is cheap; clones share the connection pool and cookie jar.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Arc<str>,
    timeout: Duration,
    policy: RetryPolicy,
}

impl ApiClient {
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .cookie_store(true)
            .connect_timeout(config.connect_timeout())
            .build()
            .map_err(|e| ApiError::Network {
                message: format!("Failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            http,
            base_url: Arc::from(config.base_url.trim_end_matches('/')),
            timeout: config.timeout(),
            policy: RetryPolicy::new(config.retries, config.retry_delay()),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for `path` (which may carry a query string).
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Underlying transport, shared with the upload client.
    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Issue a request and return the envelope on success.
    ///
    /// GET requests are retried on 5xx and network failures; everything
    /// else gets exactly one attempt. Timeouts and cancellation end the
    /// call immediately with `ApiError::Timeout`.
    pub async fn request(&self, path: &str, opts: RequestOptions) -> Result<Envelope, ApiError> {
        let url = self.url(path);
        let headers = build_headers(&opts)?;
        let timeout = opts.timeout.unwrap_or(self.timeout);
        let policy = RetryPolicy::new(
            opts.retries.unwrap_or(self.policy.retries),
            opts.retry_delay.unwrap_or(self.policy.delay),
        );
        let max_attempts = policy.max_attempts(opts.method);

        let request_id = Uuid::new_v4();
        let span = tracing::debug_span!(
            "api_request",
            %request_id,
            method = %opts.method,
            path = %path
        );

        async move {
            let mut last_err = None;

            for attempt in 1..=max_attempts {
                let started = Instant::now();
                let (err, failure) = match self.attempt(&url, &opts, &headers, timeout).await {
                    Ok(envelope) => {
                        debug!(attempt, elapsed_ms = started.elapsed().as_millis() as u64, "Request succeeded");
                        return Ok(envelope);
                    }
                    Err(failed) => failed,
                };

                let decision = policy.decide(opts.method, attempt, failure);
                if !decision.retry {
                    debug!(
                        attempt,
                        error_type = err.error_type(),
                        error = %err,
                        "Request failed"
                    );
                    return Err(err);
                }

                warn!(
                    attempt,
                    max_attempts,
                    delay_ms = decision.delay.as_millis() as u64,
                    error = %err,
                    "Retrying request"
                );
                last_err = Some(err);

                match &opts.cancel {
                    Some(token) => {
                        tokio::select! {
                            _ = token.cancelled() => return Err(ApiError::Timeout),
                            _ = tokio::time::sleep(decision.delay) => {}
                        }
                    }
                    None => tokio::time::sleep(decision.delay).await,
                }
            }

            Err(last_err.unwrap_or_else(|| ApiError::Server {
                status: None,
                message: REQUEST_FAILED.to_string(),
            }))
        }
        .instrument(span)
        .await
    }

    /// One transport round-trip raced against the timer and the caller's token.
    ///
    /// Both the timer and the token subscription are dropped when this
    /// returns, whatever the outcome.
    async fn attempt(
        &self,
        url: &str,
        opts: &RequestOptions,
        headers: &HeaderMap,
        timeout: Duration,
    ) -> Result<Envelope, (ApiError, AttemptFailure)> {
        let mut builder = self
            .http
            .request(opts.method.into(), url)
            .headers(headers.clone());

        if let Some(body) = &opts.body {
            builder = builder.body(body.to_string());
        }

        let exchange = async move {
            let resp = builder.send().await?;
            let status = resp.status().as_u16();
            let content_type = resp
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            let body = resp.bytes().await.unwrap_or_default();
            Ok::<_, reqwest::Error>((status, Envelope::parse(content_type.as_deref(), &body)))
        };

        let raced = match &opts.cancel {
            Some(token) => {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => None,
                    result = tokio::time::timeout(timeout, exchange) => result.ok(),
                }
            }
            None => tokio::time::timeout(timeout, exchange).await.ok(),
        };

        match raced {
            None => Err((ApiError::Timeout, AttemptFailure::Aborted)),
            Some(Err(e)) if e.is_timeout() => Err((ApiError::Timeout, AttemptFailure::Aborted)),
            Some(Err(e)) => Err((
                ApiError::Network {
                    message: format!("Network error: {}", e),
                },
                AttemptFailure::NoResponse,
            )),
            Some(Ok((status, envelope))) => envelope
                .into_result(status)
                .map_err(|e| (e, AttemptFailure::Status(status))),
        }
    }
}

/// JSON content type when there is a body, then caller headers on top.
fn build_headers(opts: &RequestOptions) -> Result<HeaderMap, ApiError> {
    let mut headers = HeaderMap::new();
    if opts.body.is_some() {
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    }

    for (name, value) in &opts.headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| ApiError::Validation(format!("Invalid header name '{}'", name)))?;
        let value = HeaderValue::from_str(value)
            .map_err(|_| ApiError::Validation(format!("Invalid value for header '{}'", name)))?;
        headers.insert(name, value);
    }

    Ok(headers)
}
