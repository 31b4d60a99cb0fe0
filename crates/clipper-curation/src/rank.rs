//! Ranking of curated clips.

use std::cmp::Ordering;

use clipper_models::Clip;

/// Composite ranking order: most viewed first, newest first on equal views.
pub fn compare(a: &Clip, b: &Clip) -> Ordering {
    b.view_count
        .cmp(&a.view_count)
        .then_with(|| b.created_at.cmp(&a.created_at))
}

/// Sort clips by `(view_count, created_at)` descending.
///
/// The sort is stable: clips with equal keys keep their input order.
pub fn rank(mut clips: Vec<Clip>) -> Vec<Clip> {
    clips.sort_by(compare);
    clips
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};

    fn clip(id: &str, views: u64, created: &str) -> Clip {
        Clip {
            id: id.to_string(),
            broadcaster_id: "1".to_string(),
            broadcaster_name: "x".to_string(),
            video_id: None,
            vod_offset: None,
            duration: 10.0,
            view_count: views,
            created_at: format!("{}T00:00:00Z", created).parse::<DateTime<Utc>>().unwrap(),
            language: "en".to_string(),
            media_url: String::new(),
            thumbnail_url: String::new(),
            title: None,
            game_id: None,
            creator_name: None,
            clip_url: String::new(),
            broadcaster_url: String::new(),
        }
    }

    #[test]
    fn test_most_viewed_first() {
        let ranked = rank(vec![
            clip("older-views", 10, "2023-01-02"),
            clip("more-views", 50, "2023-01-01"),
        ]);
        assert_eq!(ranked[0].id, "more-views");
    }

    #[test]
    fn test_newer_first_on_equal_views() {
        let ranked = rank(vec![clip("old", 10, "2023-01-01"), clip("new", 10, "2023-01-05")]);
        assert_eq!(ranked[0].id, "new");
    }

    #[test]
    fn test_rank_is_stable() {
        let ranked = rank(vec![
            clip("a", 5, "2023-01-01"),
            clip("b", 7, "2023-01-01"),
            clip("c", 5, "2023-01-01"),
            clip("d", 5, "2023-01-01"),
        ]);
        let ids: Vec<&str> = ranked.iter().map(|clip| clip.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a", "c", "d"]);
    }

    #[test]
    fn test_rank_empty() {
        assert!(rank(Vec::new()).is_empty());
    }
}
