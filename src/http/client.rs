//! HTTP client for API regression scenarios
//!
//! Thin wrapper over reqwest with request timing and retry/backoff for rate
//! limited or unreachable targets.

use rand::Rng;
use reqwest::{Client, Method, Url};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, warn};

/// Error text of the synthetic response returned once 429 retries run out
pub const RATE_LIMIT_EXHAUSTED: &str = "Rate limit exceeded after maximum retries";

/// HTTP client errors
#[derive(Error, Debug)]
pub enum HttpError {
    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Timeout after {0} seconds")]
    Timeout(u64),

    #[error("Connection refused to {0}")]
    ConnectionRefused(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid HTTP method: {0}")]
    InvalidMethod(String),
}

impl HttpError {
    /// Transport failures worth another attempt
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            HttpError::RequestFailed(_) | HttpError::Timeout(_) | HttpError::ConnectionRefused(_)
        )
    }
}

/// Retry and backoff settings
#[derive(Clone, Debug, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub factor: f64,
    /// Upper bound of the random delay added to each backoff
    pub jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(60),
            factor: 2.0,
            jitter: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Single attempt, no waiting
    #[cfg(test)]
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
            factor: 1.0,
            jitter: Duration::ZERO,
        }
    }

    /// Deterministic part of the delay after the given zero-based retry
    pub fn base_backoff(&self, retry: u32) -> Duration {
        let secs = self.initial_backoff.as_secs_f64() * self.factor.powi(retry as i32);
        Duration::from_secs_f64(secs.min(self.max_backoff.as_secs_f64()))
    }

    /// Delay after the given zero-based retry, jitter included, capped at `max_backoff`
    pub fn backoff(&self, retry: u32) -> Duration {
        let jitter_ms = self.jitter.as_millis() as u64;
        let jitter = if jitter_ms == 0 {
            Duration::ZERO
        } else {
            Duration::from_millis(rand::rng().random_range(0..=jitter_ms))
        };
        (self.base_backoff(retry) + jitter).min(self.max_backoff)
    }
}

/// HTTP client for regression scenarios
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    timeout_secs: u64,
    retry: RetryPolicy,
}

impl HttpClient {
    /// Create a client with the given per-request timeout
    pub fn new(timeout_secs: u64) -> Result<Self, HttpError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(concat!("api-regression/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| HttpError::RequestFailed(e.to_string()))?;

        Ok(Self {
            client,
            timeout_secs,
            retry: RetryPolicy::default(),
        })
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Send a request once
    pub async fn send(&self, request: &HttpRequest) -> Result<HttpResponse, HttpError> {
        let url = Url::parse(&request.url).map_err(|_| HttpError::InvalidUrl(request.url.clone()))?;
        let method = Method::from_bytes(request.method.to_uppercase().as_bytes())
            .map_err(|_| HttpError::InvalidMethod(request.method.clone()))?;

        debug!("Sending {} request to {}", method, url);

        let mut req_builder = self.client.request(method, url);
        if !request.query.is_empty() {
            req_builder = req_builder.query(&request.query);
        }
        for (key, value) in &request.headers {
            req_builder = req_builder.header(key.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            req_builder = req_builder.body(body.clone());
        }

        let start = Instant::now();

        let response = req_builder.send().await.map_err(|e| {
            if e.is_timeout() {
                HttpError::Timeout(self.timeout_secs)
            } else if e.is_connect() {
                HttpError::ConnectionRefused(request.url.clone())
            } else if e.is_builder() {
                HttpError::InvalidUrl(request.url.clone())
            } else {
                HttpError::RequestFailed(e.to_string())
            }
        })?;

        let status = response.status();
        let mut headers = HashMap::new();
        for (key, value) in response.headers() {
            if let Ok(v) = value.to_str() {
                headers.insert(key.as_str().to_lowercase(), v.to_string());
            }
        }

        let body = response
            .text()
            .await
            .map_err(|e| HttpError::RequestFailed(format!("failed to read body: {e}")))?;
        let duration_ms = start.elapsed().as_millis() as u64;

        debug!(
            "Response: {} {} in {}ms",
            status.as_u16(),
            status.canonical_reason().unwrap_or(""),
            duration_ms
        );

        Ok(HttpResponse {
            status_code: status.as_u16(),
            headers,
            body,
            duration_ms,
            error: None,
        })
    }

    /// Send a request, retrying on 429 and transport failures
    ///
    /// A 429 that persists through every attempt yields a synthetic 429
    /// response carrying [`RATE_LIMIT_EXHAUSTED`]; transport failures that
    /// persist are returned as errors.
    pub async fn send_with_retry(&self, request: &HttpRequest) -> Result<HttpResponse, HttpError> {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut elapsed_ms = 0u64;
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            match self.send(request).await {
                Ok(response) if response.status_code == 429 => {
                    elapsed_ms += response.duration_ms;
                    if attempt >= max_attempts {
                        warn!(
                            "{} {} still rate limited after {} attempts",
                            request.method, request.url, attempt
                        );
                        return Ok(HttpResponse::rate_limited(elapsed_ms));
                    }
                    let wait = response
                        .retry_after()
                        .map(|d| d.min(self.retry.max_backoff))
                        .unwrap_or_else(|| self.retry.backoff(attempt - 1));
                    warn!(
                        "Rate limited on {} (attempt {}/{}), waiting {:?}",
                        request.url, attempt, max_attempts, wait
                    );
                    tokio::time::sleep(wait).await;
                }
                Ok(response) => return Ok(response),
                Err(e) if e.is_retryable() && attempt < max_attempts => {
                    let wait = self.retry.backoff(attempt - 1);
                    warn!(
                        "{} (attempt {}/{}), retrying in {:?}",
                        e, attempt, max_attempts, wait
                    );
                    tokio::time::sleep(wait).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Join a base URL and a request path; absolute URLs pass through unchanged
pub fn join_url(base: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        return path.to_string();
    }
    if path.is_empty() {
        return base.to_string();
    }
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// HTTP request builder
#[derive(Clone, Debug)]
pub struct HttpRequest {
    pub method: String,
    pub url: String,
    pub headers: HashMap<String, String>,
    pub query: Vec<(String, String)>,
    pub body: Option<String>,
}

impl HttpRequest {
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            headers: HashMap::new(),
            query: Vec::new(),
            body: None,
        }
    }

    #[cfg(test)]
    pub fn get(url: impl Into<String>) -> Self {
        Self::new("GET", url)
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Serialize `value` as the body and set the JSON content type
    pub fn json(self, value: &serde_json::Value) -> Self {
        self.header("Content-Type", "application/json")
            .body(value.to_string())
    }
}

/// HTTP response
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HttpResponse {
    pub status_code: u16,
    /// Header names are lowercase
    pub headers: HashMap<String, String>,
    pub body: String,
    pub duration_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl HttpResponse {
    fn rate_limited(duration_ms: u64) -> Self {
        Self {
            status_code: 429,
            headers: HashMap::new(),
            body: String::new(),
            duration_ms,
            error: Some(RATE_LIMIT_EXHAUSTED.to_string()),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }

    pub fn get_header(&self, name: &str) -> Option<&String> {
        self.headers.get(&name.to_lowercase())
    }

    pub fn body_contains(&self, text: &str) -> bool {
        self.body.contains(text)
    }

    /// Body parsed as JSON, if it is JSON
    pub fn json(&self) -> Option<serde_json::Value> {
        serde_json::from_str(&self.body).ok()
    }

    /// Numeric `Retry-After` header
    pub fn retry_after(&self) -> Option<Duration> {
        self.get_header("retry-after")
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_secs)
    }
}
