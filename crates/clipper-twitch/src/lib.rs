//! Twitch Helix REST client.
//!
//! This crate provides:
//! - A validated endpoint registry that builds request URLs
//! - Route tables loaded from JSON at startup
//! - A request executor with exponential backoff, jitter and rate-limit detection
//! - Cursor-driven pagination with caller-supplied stop predicates
//! - Game and clip lookups for the curation engine

pub mod client;
pub mod error;
pub mod executor;
pub mod metrics;
pub mod pagination;
pub mod retry;
pub mod routes;
pub mod routing;

pub use client::{clips_query, Credentials, TwitchClient, TwitchConfig};
pub use error::{TwitchError, TwitchResult};
pub use executor::{ApiResponse, ExecutorConfig, RequestExecutor};
pub use pagination::{
    PageControl, PageView, PageWalkError, PageWalker, StopReason, WalkError, WalkOutcome,
    WalkSummary,
};
pub use retry::{with_retry, RecordingSleeper, RetryPolicy, Sleeper, TokioSleeper};
pub use routes::DEFAULT_TWITCH_ROUTES;
pub use routing::{query, Endpoint, Query, RouteRegistry, TrailingSlash};
