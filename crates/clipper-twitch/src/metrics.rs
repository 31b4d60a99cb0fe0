//! Twitch API metrics collection.
//!
//! Provides standardized metrics for monitoring API traffic:
//! - Request counters by route and status
//! - Latency histograms
//! - Retry and rate-limit counters

use metrics::{counter, histogram};

// =============================================================================
// Metric Names
// =============================================================================

/// Metric name constants for consistency.
pub mod names {
    /// Total API requests by route and status.
    pub const REQUESTS_TOTAL: &str = "twitch_requests_total";

    /// Total retry attempts by route.
    pub const RETRIES_TOTAL: &str = "twitch_retries_total";

    /// Total 429 responses by route.
    pub const RATE_LIMITED_TOTAL: &str = "twitch_rate_limited_total";

    /// Request latency in seconds by route.
    pub const LATENCY_SECONDS: &str = "twitch_latency_seconds";

    /// Total pages fetched by the page walker.
    pub const PAGES_TOTAL: &str = "twitch_pages_total";
}

// =============================================================================
// Recording Functions
// =============================================================================

/// Record metrics for a completed request attempt.
pub fn record_request(route: &str, status: u16, latency_ms: f64) {
    counter!(
        names::REQUESTS_TOTAL,
        "route" => route.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    histogram!(
        names::LATENCY_SECONDS,
        "route" => route.to_string()
    )
    .record(latency_ms / 1000.0);
}

/// Record a retry attempt.
pub fn record_retry(route: &str) {
    counter!(
        names::RETRIES_TOTAL,
        "route" => route.to_string()
    )
    .increment(1);
}

/// Record a rate-limited response.
pub fn record_rate_limited(route: &str) {
    counter!(
        names::RATE_LIMITED_TOTAL,
        "route" => route.to_string()
    )
    .increment(1);
}

/// Record a page fetched by the walker.
pub fn record_page(route: &str) {
    counter!(
        names::PAGES_TOTAL,
        "route" => route.to_string()
    )
    .increment(1);
}

// =============================================================================
// Tests
// =============================================================================
