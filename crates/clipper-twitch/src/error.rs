//! Twitch client error types.

use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Result type for Twitch client operations.
pub type TwitchResult<T> = Result<T, TwitchError>;

/// Status codes treated as transient server failures.
pub const TRANSIENT_STATUSES: [u16; 4] = [500, 502, 503, 504];

/// Errors that can occur while building or executing API requests.
#[derive(Debug, Error)]
pub enum TwitchError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Route not registered: {0}")]
    UnknownRoute(String),

    #[error("Missing required parameters for route {route}: {}", .missing.join(", "))]
    MissingParameters { route: String, missing: Vec<String> },

    #[error("Invalid route file: {0}")]
    RouteFile(String),

    #[error("Transient server error {status}: {body}")]
    Transient { status: u16, body: String },

    #[error("Retries exhausted after {attempts} attempts: {last}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        last: Box<TwitchError>,
    },

    #[error("Rate limited, wait {wait:?} until reset")]
    RateLimited {
        reset_at: Option<DateTime<Utc>>,
        wait: Duration,
    },

    #[error("Request failed with status {status}: {body}")]
    RequestFailed { status: u16, body: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl TwitchError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn route_file(msg: impl Into<String>) -> Self {
        Self::RouteFile(msg.into())
    }

    /// Classify a non-success HTTP status.
    ///
    /// 429 is handled by the executor because it needs the response headers.
    pub fn from_http_status(status: u16, body: impl Into<String>) -> Self {
        let body = body.into();
        if TRANSIENT_STATUSES.contains(&status) {
            Self::Transient { status, body }
        } else {
            Self::RequestFailed { status, body }
        }
    }

    /// Check if the error should be retried by the executor.
    ///
    /// Rate limiting is not retried here; the caller decides whether to wait
    /// for the reset or abort.
    pub fn is_retryable(&self) -> bool {
        match self {
            TwitchError::Transient { .. } => true,
            TwitchError::Network(e) => !e.is_builder() && !e.is_decode(),
            _ => false,
        }
    }

    /// True for a rate-limit condition.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, TwitchError::RateLimited { .. })
    }

    /// HTTP status associated with the error, if any.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            TwitchError::Transient { status, .. } | TwitchError::RequestFailed { status, .. } => {
                Some(*status)
            }
            TwitchError::RateLimited { .. } => Some(429),
            TwitchError::RetriesExhausted { last, .. } => last.http_status(),
            TwitchError::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
