//! Route table loading.
//!
//! Route tables are JSON objects mapping a route name to
//! `{ "base_url": ..., "slug": ..., "req": [...], "opt": [...] }`. Unknown
//! fields, duplicate parameter names and invalid endpoints are rejected when
//! the table is loaded, so a bad table fails at startup rather than on first
//! use.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use serde::Deserialize;
use tracing::info;

use crate::error::{TwitchError, TwitchResult};
use crate::routing::{Endpoint, RouteRegistry, TrailingSlash};

/// Default Helix route table shipped with the crate.
pub const DEFAULT_TWITCH_ROUTES: &str = include_str!("../routes/twitch.json");

/// One entry of a route table file.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RouteEntry {
    pub base_url: String,
    pub slug: String,
    #[serde(default)]
    pub req: Vec<String>,
    #[serde(default)]
    pub opt: Vec<String>,
}

impl RouteEntry {
    fn into_endpoint(self, name: &str) -> TwitchResult<Endpoint> {
        ensure_unique(name, "req", &self.req)?;
        ensure_unique(name, "opt", &self.opt)?;

        Endpoint::builder(self.base_url, self.slug)
            .required(self.req)
            .optional(self.opt)
            .build()
            .map_err(|e| TwitchError::route_file(format!("route {}: {}", name, e)))
    }
}

fn ensure_unique(route: &str, field: &str, items: &[String]) -> TwitchResult<()> {
    let mut seen = HashSet::new();
    for item in items {
        if !seen.insert(item.as_str()) {
            return Err(TwitchError::route_file(format!(
                "route {}: duplicate entry {:?} in {}",
                route, item, field
            )));
        }
    }
    Ok(())
}

impl RouteRegistry {
    /// Build a registry from a JSON route table.
    pub fn from_json_str(json: &str, trailing_slash: TrailingSlash) -> TwitchResult<Self> {
        Self::from_table(parse_table(json)?, trailing_slash)
    }

    fn from_table(
        table: BTreeMap<String, RouteEntry>,
        trailing_slash: TrailingSlash,
    ) -> TwitchResult<Self> {
        let mut registry = RouteRegistry::new(trailing_slash);
        for (name, entry) in table {
            let endpoint = entry.into_endpoint(&name)?;
            registry.register(name, endpoint)?;
        }

        info!(routes = ?registry.names(), "Registered API routes");
        Ok(registry)
    }

    /// Build a registry from a JSON route table on disk.
    pub fn from_file(path: impl AsRef<Path>, trailing_slash: TrailingSlash) -> TwitchResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            TwitchError::route_file(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&content, trailing_slash)
    }

    /// Registry for the default Helix route table.
    pub fn twitch_default(trailing_slash: TrailingSlash) -> TwitchResult<Self> {
        Self::from_json_str(DEFAULT_TWITCH_ROUTES, trailing_slash)
    }

    /// Registry for the default route table with every base address
    /// replaced by `base_url` (used to point the client at a proxy or a
    /// test server).
    pub fn twitch_with_base(base_url: &str, trailing_slash: TrailingSlash) -> TwitchResult<Self> {
        let mut table = parse_table(DEFAULT_TWITCH_ROUTES)?;
        for entry in table.values_mut() {
            entry.base_url = base_url.to_string();
        }
        Self::from_table(table, trailing_slash)
    }
}

fn parse_table(json: &str) -> TwitchResult<BTreeMap<String, RouteEntry>> {
    serde_json::from_str(json)
        .map_err(|e| TwitchError::route_file(format!("malformed route table: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::query;

    #[test]
    fn test_default_table_loads() {
        let registry = RouteRegistry::twitch_default(TrailingSlash::Strip).unwrap();
        assert_eq!(registry.names(), vec!["clip", "clips", "game", "games"]);

        let clips = registry.get("clips").unwrap();
        assert!(clips.required_params().contains("game_id"));
        assert!(clips.optional_params().contains("after"));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let json = r#"{"clips": {"base_url": "https://a.b", "slug": "/c", "extra": 1}}"#;
        let err = RouteRegistry::from_json_str(json, TrailingSlash::Strip).unwrap_err();
        assert!(matches!(err, TwitchError::RouteFile(_)));
    }

    #[test]
    fn test_missing_slug_rejected() {
        let json = r#"{"clips": {"base_url": "https://a.b"}}"#;
        assert!(RouteRegistry::from_json_str(json, TrailingSlash::Strip).is_err());
    }

    #[test]
    fn test_duplicate_items_rejected() {
        let json = r#"{"clips": {"base_url": "https://a.b", "slug": "/c", "req": ["x", "x"]}}"#;
        let err = RouteRegistry::from_json_str(json, TrailingSlash::Strip).unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn test_overlap_rejected_at_load() {
        let json = r#"{"clips": {"base_url": "https://a.b", "slug": "/c", "req": ["x"], "opt": ["x"]}}"#;
        let err = RouteRegistry::from_json_str(json, TrailingSlash::Strip).unwrap_err();
        assert!(err.to_string().contains("disjoint"));
    }

    #[test]
    fn test_base_override() {
        let registry =
            RouteRegistry::twitch_with_base("http://127.0.0.1:9000/helix", TrailingSlash::Strip)
                .unwrap();
        let url = registry
            .build_url("clip", &query([("id", "AwkwardHelplessSalamander")]))
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://127.0.0.1:9000/helix/clips?id=AwkwardHelplessSalamander"
        );
    }
}
