//! Worker configuration.

use std::collections::BTreeSet;

use clipper_curation::{CurationCriteria, ReorderOptions};

/// Curation run configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Game (category) to curate, by exact name
    pub game_name: Option<String>,
    /// How many days back the clip creation window reaches
    pub period_days: u32,
    /// Clips requested per page
    pub page_size: u32,
    /// Filter criteria
    pub criteria: CurationCriteria,
    /// Diversity ordering options
    pub reorder: ReorderOptions,
    /// Return what was collected when rate limited after the first page
    pub keep_partial_on_error: bool,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            game_name: None,
            period_days: 7,
            page_size: 100,
            criteria: CurationCriteria::default(),
            reorder: ReorderOptions::default(),
            keep_partial_on_error: true,
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let criteria_defaults = defaults.criteria.clone();

        let criteria = CurationCriteria {
            min_views: env_or("CLIPPER_MIN_VIEWS", criteria_defaults.min_views),
            max_accepted: env_or("CLIPPER_MAX_CLIPS", criteria_defaults.max_accepted),
            min_duration: env_or("CLIPPER_MIN_DURATION", criteria_defaults.min_duration),
            max_duration: env_or("CLIPPER_MAX_DURATION", criteria_defaults.max_duration),
            language: std::env::var("CLIPPER_LANGUAGE")
                .ok()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            whitelist: env_list("CLIPPER_WHITELIST"),
            blacklist: env_list("CLIPPER_BLACKLIST"),
        };

        let reorder = ReorderOptions {
            anchor_first: std::env::var("CLIPPER_ANCHOR_FIRST")
                .map(|v| parse_flag(&v))
                .unwrap_or(defaults.reorder.anchor_first),
            max_exact_len: env_or("CLIPPER_MAX_EXACT_LEN", defaults.reorder.max_exact_len),
        };

        Self {
            game_name: std::env::var("CLIPPER_GAME_NAME")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            period_days: env_or("CLIPPER_PERIOD_DAYS", defaults.period_days),
            page_size: env_or("CLIPPER_PAGE_SIZE", defaults.page_size),
            criteria,
            reorder,
            keep_partial_on_error: std::env::var("CLIPPER_KEEP_PARTIAL")
                .map(|v| parse_flag(&v))
                .unwrap_or(defaults.keep_partial_on_error),
        }
    }
}

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

/// Comma-separated set, blank entries dropped.
fn env_list(name: &str) -> BTreeSet<String> {
    std::env::var(name)
        .map(|value| {
            value
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on")
}
