//! Clip models.
//!
//! [`RawClip`] mirrors one record of the Helix `GET /clips` payload. It is
//! converted into a [`Clip`] exactly once at ingestion, which is when the
//! derived `clip_url` and `broadcaster_url` fields are computed.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};

/// Public channel page prefix.
pub const BROADCASTER_BASE_URL: &str = "https://www.twitch.tv/";

/// Marker separating the media asset path from the preview suffix in a
/// clip thumbnail URL.
const PREVIEW_MARKER: &str = "-preview-";

// =============================================================================
// Raw API record
// =============================================================================

/// A clip record as returned by the API, before normalization.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawClip {
    pub id: String,
    /// Public clip page (`https://clips.twitch.tv/...`).
    #[serde(default)]
    pub url: String,
    pub broadcaster_id: String,
    pub broadcaster_name: String,
    #[serde(default)]
    pub creator_name: Option<String>,
    /// Empty string when the source VOD is unavailable.
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub video_id: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub game_id: Option<String>,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub title: Option<String>,
    pub view_count: u64,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub thumbnail_url: String,
    /// Clip length in seconds.
    pub duration: f64,
    /// Start of the clip within the source VOD, in seconds.
    #[serde(default)]
    pub vod_offset: Option<f64>,
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}

// =============================================================================
// Normalized clip
// =============================================================================

/// A normalized clip, immutable once ingested.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Clip {
    pub id: String,
    pub broadcaster_id: String,
    pub broadcaster_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_id: Option<String>,
    /// Start within the source VOD, in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vod_offset: Option<f64>,
    /// Length in seconds.
    pub duration: f64,
    pub view_count: u64,
    pub created_at: DateTime<Utc>,
    pub language: String,
    /// Public clip page URL reported by the API.
    pub media_url: String,
    pub thumbnail_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub game_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creator_name: Option<String>,
    /// Direct `.mp4` asset URL, derived from the thumbnail.
    pub clip_url: String,
    /// Channel page of the broadcaster.
    pub broadcaster_url: String,
}

impl From<RawClip> for Clip {
    fn from(raw: RawClip) -> Self {
        let clip_url = derive_clip_url(&raw.thumbnail_url).unwrap_or_else(|| raw.url.clone());
        let broadcaster_url = broadcaster_url(&raw.broadcaster_name);

        Self {
            id: raw.id,
            broadcaster_id: raw.broadcaster_id,
            broadcaster_name: raw.broadcaster_name,
            video_id: raw.video_id,
            vod_offset: raw.vod_offset,
            duration: raw.duration,
            view_count: raw.view_count,
            created_at: raw.created_at,
            language: raw.language,
            media_url: raw.url,
            thumbnail_url: raw.thumbnail_url,
            title: raw.title,
            game_id: raw.game_id,
            creator_name: raw.creator_name,
            clip_url,
            broadcaster_url,
        }
    }
}

impl Clip {
    /// Source VOD window `(video_id, start, duration)` if the clip has one.
    pub fn source_window(&self) -> Option<(&str, f64, f64)> {
        match (&self.video_id, self.vod_offset) {
            (Some(video_id), Some(offset)) => Some((video_id.as_str(), offset, self.duration)),
            _ => None,
        }
    }

    /// True when the clip references a source VOD with a known offset.
    pub fn has_source_video(&self) -> bool {
        self.source_window().is_some()
    }
}

/// Derive the direct media URL from a clip thumbnail URL.
///
/// Thumbnails look like `.../vod-123-offset-456-preview-480x272.jpg`; the
/// matching asset is the same path up to the preview marker with `.mp4`.
pub fn derive_clip_url(thumbnail_url: &str) -> Option<String> {
    thumbnail_url
        .find(PREVIEW_MARKER)
        .map(|index| format!("{}.mp4", &thumbnail_url[..index]))
}

/// Channel page URL for a broadcaster name.
pub fn broadcaster_url(broadcaster_name: &str) -> String {
    format!("{}{}", BROADCASTER_BASE_URL, broadcaster_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_json() -> serde_json::Value {
        serde_json::json!({
            "id": "AwkwardHelplessSalamanderSwiftRage",
            "url": "https://clips.twitch.tv/AwkwardHelplessSalamanderSwiftRage",
            "embed_url": "https://clips.twitch.tv/embed?clip=AwkwardHelplessSalamanderSwiftRage",
            "broadcaster_id": "67955580",
            "broadcaster_name": "ChewieMelodies",
            "creator_id": "53834192",
            "creator_name": "BlackNova03",
            "video_id": "205586603",
            "game_id": "488191",
            "language": "en",
            "title": "babymetal",
            "view_count": 10,
            "created_at": "2017-11-30T22:34:18Z",
            "thumbnail_url": "https://clips-media-assets.twitch.tv/157589949-preview-480x272.jpg",
            "duration": 60.0,
            "vod_offset": 480
        })
    }

    #[test]
    fn test_clip_from_raw_derives_urls() {
        let raw: RawClip = serde_json::from_value(raw_json()).unwrap();
        let clip = Clip::from(raw);

        assert_eq!(clip.clip_url, "https://clips-media-assets.twitch.tv/157589949.mp4");
        assert_eq!(clip.broadcaster_url, "https://www.twitch.tv/ChewieMelodies");
        assert_eq!(clip.media_url, "https://clips.twitch.tv/AwkwardHelplessSalamanderSwiftRage");
        assert_eq!(clip.source_window(), Some(("205586603", 480.0, 60.0)));
    }

    #[test]
    fn test_empty_video_id_is_none() {
        let mut value = raw_json();
        value["video_id"] = serde_json::json!("");
        value["vod_offset"] = serde_json::Value::Null;

        let clip = Clip::from(serde_json::from_value::<RawClip>(value).unwrap());
        assert!(clip.video_id.is_none());
        assert!(!clip.has_source_video());
    }

    #[test]
    fn test_clip_url_falls_back_to_media_url() {
        let mut value = raw_json();
        value["thumbnail_url"] = serde_json::json!("https://static.example/thumb.jpg");

        let clip = Clip::from(serde_json::from_value::<RawClip>(value).unwrap());
        assert_eq!(clip.clip_url, clip.media_url);
    }

    #[test]
    fn test_derive_clip_url_without_marker() {
        assert_eq!(derive_clip_url("https://x/y.jpg"), None);
    }
}
