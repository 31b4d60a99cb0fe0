//! Inclusion criteria for candidate clips.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::{CurationError, CurationResult};

/// Configuration of the filter stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CurationCriteria {
    /// Minimum view count for a non-whitelisted clip.
    pub min_views: u64,
    /// Maximum number of accepted clips; `0` means unlimited.
    pub max_accepted: usize,
    /// Inclusive lower duration bound, in seconds.
    pub min_duration: f64,
    /// Exclusive upper duration bound, in seconds.
    pub max_duration: f64,
    /// ISO-639-1 language code; `None` accepts every language.
    pub language: Option<String>,
    /// Broadcaster ids accepted regardless of the other criteria.
    pub whitelist: BTreeSet<String>,
    /// Broadcaster ids always rejected.
    pub blacklist: BTreeSet<String>,
}

impl Default for CurationCriteria {
    fn default() -> Self {
        Self {
            min_views: 50,
            max_accepted: 20,
            min_duration: 5.0,
            max_duration: 40.0,
            language: None,
            whitelist: BTreeSet::new(),
            blacklist: BTreeSet::new(),
        }
    }
}

impl CurationCriteria {
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn with_max_accepted(mut self, max_accepted: usize) -> Self {
        self.max_accepted = max_accepted;
        self
    }

    pub fn with_min_views(mut self, min_views: u64) -> Self {
        self.min_views = min_views;
        self
    }

    pub fn with_duration(mut self, min_duration: f64, max_duration: f64) -> Self {
        self.min_duration = min_duration;
        self.max_duration = max_duration;
        self
    }

    pub fn whitelist<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.whitelist.extend(ids.into_iter().map(Into::into));
        self
    }

    pub fn blacklist<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.blacklist.extend(ids.into_iter().map(Into::into));
        self
    }

    /// Check the criteria are consistent.
    pub fn validate(&self) -> CurationResult<()> {
        for (name, value) in [
            ("min_duration", self.min_duration),
            ("max_duration", self.max_duration),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(CurationError::invalid_criteria(format!(
                    "{} must be a non-negative number, got {}",
                    name, value
                )));
            }
        }

        if self.min_duration > self.max_duration {
            return Err(CurationError::invalid_criteria(format!(
                "min_duration ({}) exceeds max_duration ({})",
                self.min_duration, self.max_duration
            )));
        }

        if let Some(id) = self.whitelist.intersection(&self.blacklist).next() {
            return Err(CurationError::invalid_criteria(format!(
                "broadcaster {} is both whitelisted and blacklisted",
                id
            )));
        }

        if matches!(&self.language, Some(language) if language.trim().is_empty()) {
            return Err(CurationError::invalid_criteria("language cannot be empty"));
        }

        Ok(())
    }

    /// True when the clip language satisfies the language filter.
    pub fn language_matches(&self, language: &str) -> bool {
        match &self.language {
            Some(wanted) => wanted.eq_ignore_ascii_case(language),
            None => true,
        }
    }

    /// True when `duration` lies in `[min_duration, max_duration)`.
    pub fn duration_in_range(&self, duration: f64) -> bool {
        self.min_duration <= duration && duration < self.max_duration
    }

    /// True when the accepted count has reached the cap.
    pub fn is_full(&self, accepted: usize) -> bool {
        self.max_accepted != 0 && accepted >= self.max_accepted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_criteria_are_valid() {
        let criteria = CurationCriteria::default();
        assert_eq!(criteria.min_views, 50);
        assert_eq!(criteria.max_accepted, 20);
        assert!(criteria.validate().is_ok());
    }

    #[test]
    fn test_inverted_durations_rejected() {
        let criteria = CurationCriteria::default().with_duration(30.0, 10.0);
        assert!(matches!(
            criteria.validate(),
            Err(CurationError::InvalidCriteria(_))
        ));
    }

    #[test]
    fn test_non_finite_duration_rejected() {
        assert!(CurationCriteria::default()
            .with_duration(f64::NAN, 10.0)
            .validate()
            .is_err());
        assert!(CurationCriteria::default()
            .with_duration(-1.0, 10.0)
            .validate()
            .is_err());
        assert!(CurationCriteria::default()
            .with_duration(0.0, f64::INFINITY)
            .validate()
            .is_err());
    }

    #[test]
    fn test_conflicting_lists_rejected() {
        let criteria = CurationCriteria::default()
            .whitelist(["1", "2"])
            .blacklist(["2", "3"]);
        let err = criteria.validate().unwrap_err();
        assert!(err.to_string().contains("broadcaster 2"));
    }

    #[test]
    fn test_duration_bounds() {
        let criteria = CurationCriteria::default().with_duration(5.0, 40.0);
        assert!(criteria.duration_in_range(5.0));
        assert!(criteria.duration_in_range(39.9));
        assert!(!criteria.duration_in_range(40.0));
        assert!(!criteria.duration_in_range(4.9));
    }

    #[test]
    fn test_language_filter() {
        assert!(CurationCriteria::default().language_matches("de"));
        let criteria = CurationCriteria::default().with_language("fr");
        assert!(criteria.language_matches("fr"));
        assert!(criteria.language_matches("FR"));
        assert!(!criteria.language_matches("en"));
    }

    #[test]
    fn test_cap() {
        let criteria = CurationCriteria::default().with_max_accepted(2);
        assert!(!criteria.is_full(1));
        assert!(criteria.is_full(2));
        assert!(!CurationCriteria::default().with_max_accepted(0).is_full(1_000));
    }
}
