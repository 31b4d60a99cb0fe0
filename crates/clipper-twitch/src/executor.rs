//! Resilient request executor.
//!
//! Sends one HTTP request per attempt and classifies the outcome:
//! 2xx is returned, 500/502/503/504 and network failures are retried through
//! [`with_retry`], 429 becomes [`TwitchError::RateLimited`] with the wait
//! computed from the `Ratelimit-Reset` header, and anything else is a
//! non-retryable [`TwitchError::RequestFailed`].

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use reqwest::header::HeaderMap;
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{info, info_span, warn, Instrument};
use url::Url;

use crate::error::{TwitchError, TwitchResult};
use crate::metrics::{record_rate_limited, record_request};
use crate::retry::{with_retry, RetryPolicy, Sleeper, TokioSleeper};

/// Header carrying the epoch second at which the rate-limit bucket refills.
pub const RATELIMIT_RESET_HEADER: &str = "ratelimit-reset";

// =============================================================================
// Configuration
// =============================================================================

/// HTTP executor configuration.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Per-attempt request timeout
    pub timeout: Duration,
    /// Connect timeout
    pub connect_timeout: Duration,
    /// Retry configuration
    pub retry: RetryPolicy,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(5),
            retry: RetryPolicy::default(),
        }
    }
}

impl ExecutorConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let timeout_secs: u64 = std::env::var("CLIPPER_HTTP_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(30);
        let connect_timeout_secs: u64 = std::env::var("CLIPPER_HTTP_CONNECT_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(5);

        Self {
            timeout: Duration::from_secs(timeout_secs),
            connect_timeout: Duration::from_secs(connect_timeout_secs),
            retry: RetryPolicy::from_env(),
        }
    }
}

// =============================================================================
// Response
// =============================================================================

/// A successful API response with its body fully read.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: String,
    /// Number of attempts it took, starting at 1.
    pub attempts: u32,
}

impl ApiResponse {
    /// Decode the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> TwitchResult<T> {
        Ok(serde_json::from_str(&self.body)?)
    }
}

// =============================================================================
// Executor
// =============================================================================

/// Executes API requests with retry, rate-limit detection and metrics.
#[derive(Clone)]
pub struct RequestExecutor {
    http: Client,
    policy: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
}

impl std::fmt::Debug for RequestExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestExecutor")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl RequestExecutor {
    /// Create an executor with its own connection pool.
    pub fn new(config: ExecutorConfig) -> TwitchResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(10)
            .user_agent(concat!("clipper-twitch/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(TwitchError::Network)?;

        Ok(Self::with_client(http, config.retry))
    }

    /// Create an executor around an existing client.
    pub fn with_client(http: Client, policy: RetryPolicy) -> Self {
        Self {
            http,
            policy,
            sleeper: Arc::new(TokioSleeper),
        }
    }

    /// Replace the strategy used to wait between attempts.
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Execute a request, retrying transient failures per the retry policy.
    pub async fn execute(
        &self,
        method: Method,
        route: &str,
        url: &Url,
        headers: &HeaderMap,
    ) -> TwitchResult<ApiResponse> {
        let span = info_span!("twitch_request", method = %method, route = %route);
        let method = &method;

        with_retry(&self.policy, route, self.sleeper.as_ref(), |attempt| {
            self.send_once(method, route, url, headers, attempt + 1)
        })
        .instrument(span)
        .await
    }

    /// GET `url` and decode the JSON body.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        route: &str,
        url: &Url,
        headers: &HeaderMap,
    ) -> TwitchResult<T> {
        self.execute(Method::GET, route, url, headers).await?.json()
    }

    async fn send_once(
        &self,
        method: &Method,
        route: &str,
        url: &Url,
        headers: &HeaderMap,
        attempt: u32,
    ) -> TwitchResult<ApiResponse> {
        let start = Instant::now();
        let sent = self
            .http
            .request(method.clone(), url.clone())
            .headers(headers.clone())
            .send()
            .await;

        let response = match sent {
            Ok(response) => response,
            Err(e) => return Err(network_failure(method, route, attempt, start, e)),
        };

        let status = response.status();
        let response_headers = response.headers().clone();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => return Err(network_failure(method, route, attempt, start, e)),
        };
        let elapsed_ms = start.elapsed().as_millis() as u64;

        info!(
            method = %method,
            route = %route,
            status = status.as_u16(),
            elapsed_ms,
            attempt,
            "API request"
        );
        record_request(route, status.as_u16(), elapsed_ms as f64);

        if status.is_success() {
            return Ok(ApiResponse {
                status: status.as_u16(),
                headers: response_headers,
                body,
                attempts: attempt,
            });
        }

        if status == StatusCode::TOO_MANY_REQUESTS {
            let (reset_at, wait) = rate_limit_reset(&response_headers, Utc::now());
            warn!(
                route = %route,
                reset_at = ?reset_at,
                wait_secs = wait.as_secs(),
                "Rate limited until reset"
            );
            record_rate_limited(route);
            return Err(TwitchError::RateLimited { reset_at, wait });
        }

        Err(TwitchError::from_http_status(status.as_u16(), body))
    }
}

/// Log and count an attempt that failed before a full response was read.
fn network_failure(
    method: &Method,
    route: &str,
    attempt: u32,
    start: Instant,
    e: reqwest::Error,
) -> TwitchError {
    let elapsed_ms = start.elapsed().as_millis() as u64;
    warn!(
        method = %method,
        route = %route,
        error = %e,
        elapsed_ms,
        attempt,
        "API request failed"
    );
    record_request(route, 0, elapsed_ms as f64);
    TwitchError::Network(e)
}

/// Reset instant and remaining wait from the rate-limit headers.
///
/// A missing or unparseable header yields `(None, 0)`; a reset in the past
/// yields a zero wait.
pub fn rate_limit_reset(headers: &HeaderMap, now: DateTime<Utc>) -> (Option<DateTime<Utc>>, Duration) {
    let reset_at = headers
        .get(RATELIMIT_RESET_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<i64>().ok())
        .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0));

    let wait = reset_at
        .and_then(|reset| (reset - now).to_std().ok())
        .unwrap_or(Duration::ZERO);

    (reset_at, wait)
}
