//! Twitch Helix client.
//!
//! Ties together the route registry, the request executor and the page
//! walker, and exposes the handful of Helix operations the curation engine
//! needs. Token acquisition is not handled here: callers supply a ready
//! [`Credentials`] value.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Duration as ChronoDuration, SecondsFormat, Utc};
use clipper_models::{Clip, Game, Page, RawClip};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use tracing::{debug, info};

use crate::error::{TwitchError, TwitchResult};
use crate::executor::{ExecutorConfig, RequestExecutor};
use crate::pagination::{
    PageControl, PageView, PageWalkError, PageWalker, WalkError, WalkOutcome, WalkSummary,
    DEFAULT_PAGE_CAP,
};
use crate::routing::{query, Query, RouteRegistry, TrailingSlash};

/// `Accept` value sent with every request.
pub const ACCEPT_VALUE: &str = "application/vnd.twitchtv.v5+json";

/// Header carrying the application client id.
pub const CLIENT_ID_HEADER: &str = "client-id";

/// Largest page size the API accepts.
pub const MAX_PAGE_SIZE: u32 = 100;

pub const ROUTE_GAMES: &str = "games";
pub const ROUTE_GAME: &str = "game";
pub const ROUTE_CLIPS: &str = "clips";
pub const ROUTE_CLIP: &str = "clip";

// =============================================================================
// Credentials
// =============================================================================

/// Application credentials attached to authenticated calls.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub client_id: String,
    pub access_token: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("access_token", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    pub fn new(client_id: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            access_token: access_token.into(),
        }
    }

    /// Headers for an authenticated request.
    pub fn headers(&self) -> TwitchResult<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_VALUE));

        let mut bearer = HeaderValue::from_str(&format!("Bearer {}", self.access_token))
            .map_err(|_| TwitchError::configuration("access token contains invalid characters"))?;
        bearer.set_sensitive(true);
        headers.insert(AUTHORIZATION, bearer);

        let client_id = HeaderValue::from_str(&self.client_id)
            .map_err(|_| TwitchError::configuration("client id contains invalid characters"))?;
        headers.insert(CLIENT_ID_HEADER, client_id);

        Ok(headers)
    }
}

// =============================================================================
// Configuration
// =============================================================================

/// Twitch client configuration.
#[derive(Debug, Clone)]
pub struct TwitchConfig {
    pub credentials: Credentials,
    /// Overrides the base address of every default route.
    pub api_base_url: Option<String>,
    /// Route table to load instead of the embedded one.
    pub routes_file: Option<PathBuf>,
    pub trailing_slash: TrailingSlash,
    /// Hard ceiling on pages fetched by one walk.
    pub page_cap: usize,
    pub executor: ExecutorConfig,
}

impl TwitchConfig {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            api_base_url: None,
            routes_file: None,
            trailing_slash: TrailingSlash::default(),
            page_cap: DEFAULT_PAGE_CAP,
            executor: ExecutorConfig::default(),
        }
    }

    /// Create config from environment variables.
    pub fn from_env() -> TwitchResult<Self> {
        let client_id = required_env("TWITCH_APP_CLIENT_ID")?;
        let access_token = required_env("TWITCH_ACCESS_TOKEN")?;

        Ok(Self {
            credentials: Credentials::new(client_id, access_token),
            api_base_url: std::env::var("TWITCH_API_BASE_URL")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            routes_file: std::env::var("CLIPPER_ROUTES_FILE")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from),
            trailing_slash: std::env::var("CLIPPER_TRAILING_SLASH")
                .map(|s| TrailingSlash::from_str_or_default(&s))
                .unwrap_or_default(),
            page_cap: std::env::var("CLIPPER_PAGE_CAP")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_PAGE_CAP),
            executor: ExecutorConfig::from_env(),
        })
    }

    /// Load the route registry this configuration points at.
    pub fn load_registry(&self) -> TwitchResult<RouteRegistry> {
        match (&self.routes_file, &self.api_base_url) {
            (Some(path), _) => RouteRegistry::from_file(path, self.trailing_slash),
            (None, Some(base)) => RouteRegistry::twitch_with_base(base, self.trailing_slash),
            (None, None) => RouteRegistry::twitch_default(self.trailing_slash),
        }
    }
}

fn required_env(name: &str) -> TwitchResult<String> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        Ok(_) => Err(TwitchError::configuration(format!("{} cannot be empty", name))),
        Err(_) => Err(TwitchError::configuration(format!("{} must be set", name))),
    }
}

// =============================================================================
// Client
// =============================================================================

/// Twitch Helix API client.
#[derive(Debug, Clone)]
pub struct TwitchClient {
    registry: Arc<RouteRegistry>,
    executor: RequestExecutor,
    headers: HeaderMap,
    page_cap: usize,
}

impl TwitchClient {
    /// Create a new client.
    pub fn new(config: TwitchConfig) -> TwitchResult<Self> {
        let registry = Arc::new(config.load_registry()?);
        let executor = RequestExecutor::new(config.executor.clone())?;
        Self::from_parts(registry, executor, &config.credentials, config.page_cap)
    }

    /// Create from environment variables.
    pub fn from_env() -> TwitchResult<Self> {
        Self::new(TwitchConfig::from_env()?)
    }

    /// Assemble a client from an existing registry and executor.
    pub fn from_parts(
        registry: Arc<RouteRegistry>,
        executor: RequestExecutor,
        credentials: &Credentials,
        page_cap: usize,
    ) -> TwitchResult<Self> {
        Ok(Self {
            registry,
            executor,
            headers: credentials.headers()?,
            page_cap: page_cap.max(1),
        })
    }

    pub fn registry(&self) -> &Arc<RouteRegistry> {
        &self.registry
    }

    pub fn executor(&self) -> &RequestExecutor {
        &self.executor
    }

    /// A page walker carrying this client's credentials and page cap.
    pub fn walker(&self) -> PageWalker<'_> {
        PageWalker::new(&self.registry, &self.executor, self.headers.clone())
            .with_page_cap(self.page_cap)
    }

    /// Look up a game by its exact name.
    pub async fn get_game_by_name(&self, name: &str) -> TwitchResult<Option<Game>> {
        let page: Page<Game> = self.get(ROUTE_GAME, &query([("name", name)])).await?;
        let game = page.data.into_iter().next();
        debug!(name = %name, found = game.is_some(), "Resolved game");
        Ok(game)
    }

    /// Most watched games right now.
    pub async fn get_top_games(&self, limit: u32) -> TwitchResult<Vec<Game>> {
        let first = limit.clamp(1, MAX_PAGE_SIZE).to_string();
        let page: Page<Game> = self.get(ROUTE_GAMES, &query([("first", first)])).await?;
        Ok(page.data)
    }

    /// Fetch a single clip by id.
    pub async fn get_clip(&self, id: &str) -> TwitchResult<Option<Clip>> {
        let page: Page<RawClip> = self.get(ROUTE_CLIP, &query([("id", id)])).await?;
        Ok(page.data.into_iter().next().map(Clip::from))
    }

    /// Walk the clips of a game created within the last `period_days` days.
    pub async fn walk_game_clips<F>(
        &self,
        game_id: &str,
        period_days: u32,
        page_size: u32,
        predicate: F,
    ) -> Result<WalkOutcome<RawClip>, WalkError<RawClip>>
    where
        F: FnMut(&PageView<'_, RawClip>) -> PageControl,
    {
        let base_query = clips_query(game_id, period_days, page_size, Utc::now());
        self.walker().walk(ROUTE_CLIPS, &base_query, predicate).await
    }

    /// Like [`TwitchClient::walk_game_clips`], but hands every page over by
    /// value instead of collecting the records.
    pub async fn for_each_game_clip_page<F>(
        &self,
        game_id: &str,
        period_days: u32,
        page_size: u32,
        on_page: F,
    ) -> Result<WalkSummary, PageWalkError>
    where
        F: FnMut(usize, Vec<RawClip>) -> PageControl,
    {
        let base_query = clips_query(game_id, period_days, page_size, Utc::now());
        self.walker().for_each_page(ROUTE_CLIPS, &base_query, on_page).await
    }

    /// All clips of a game within the period, up to the page cap.
    pub async fn get_game_clips(
        &self,
        game_id: &str,
        period_days: u32,
        page_size: u32,
    ) -> TwitchResult<Vec<Clip>> {
        let outcome = self
            .walk_game_clips(game_id, period_days, page_size, |_| PageControl::Continue)
            .await
            .map_err(|e| e.source)?;

        info!(
            game_id = %game_id,
            pages = outcome.pages,
            clips = outcome.items.len(),
            "Fetched game clips"
        );
        Ok(outcome.items.into_iter().map(Clip::from).collect())
    }

    async fn get<T: serde::de::DeserializeOwned>(&self, route: &str, query: &Query) -> TwitchResult<T> {
        let url = self.registry.build_url(route, query)?;
        self.executor.get_json(route, &url, &self.headers).await
    }
}

/// Base query for the clips route: the creation window ends at `now` and
/// starts `max(1, period_days)` days earlier; the page size is clamped to
/// the API range.
pub fn clips_query(game_id: &str, period_days: u32, page_size: u32, now: DateTime<Utc>) -> Query {
    let started_at = now - ChronoDuration::days(i64::from(period_days.max(1)));
    query([
        ("game_id", game_id.to_string()),
        ("first", page_size.clamp(1, MAX_PAGE_SIZE).to_string()),
        ("started_at", started_at.to_rfc3339_opts(SecondsFormat::Secs, true)),
        ("ended_at", now.to_rfc3339_opts(SecondsFormat::Secs, true)),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retry::{RecordingSleeper, RetryPolicy};
    use serde_json::json;
    use serial_test::serial;
    use std::time::Duration;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client(server: &MockServer) -> TwitchClient {
        let base = format!("{}/helix", server.uri());
        let registry = Arc::new(RouteRegistry::twitch_with_base(&base, TrailingSlash::Strip).unwrap());
        let executor = RequestExecutor::with_client(
            reqwest::Client::new(),
            RetryPolicy::default().with_jitter(Duration::ZERO),
        )
        .with_sleeper(Arc::new(RecordingSleeper::new()));
        TwitchClient::from_parts(registry, executor, &Credentials::new("cid", "tok"), 5).unwrap()
    }

    fn clip_json(id: &str, views: u64) -> serde_json::Value {
        json!({
            "id": id,
            "url": format!("https://clips.twitch.tv/{}", id),
            "broadcaster_id": "1",
            "broadcaster_name": "alpha",
            "video_id": "v1",
            "language": "en",
            "view_count": views,
            "created_at": "2024-01-01T00:00:00Z",
            "thumbnail_url": format!("https://clips-media-assets2.twitch.tv/{}-preview-480x272.jpg", id),
            "duration": 30.0,
            "vod_offset": 100
        })
    }

    #[test]
    #[serial]
    fn test_config_from_env_requires_credentials() {
        std::env::remove_var("TWITCH_APP_CLIENT_ID");
        std::env::remove_var("TWITCH_ACCESS_TOKEN");
        let err = TwitchConfig::from_env().unwrap_err();
        assert!(matches!(err, TwitchError::Configuration(_)));

        std::env::set_var("TWITCH_APP_CLIENT_ID", "cid");
        std::env::set_var("TWITCH_ACCESS_TOKEN", "  ");
        assert!(TwitchConfig::from_env().is_err());
        std::env::remove_var("TWITCH_APP_CLIENT_ID");
        std::env::remove_var("TWITCH_ACCESS_TOKEN");
    }

    #[test]
    #[serial]
    fn test_config_default_values() {
        std::env::set_var("TWITCH_APP_CLIENT_ID", "cid");
        std::env::set_var("TWITCH_ACCESS_TOKEN", "tok");
        std::env::remove_var("CLIPPER_PAGE_CAP");
        std::env::remove_var("CLIPPER_TRAILING_SLASH");
        std::env::remove_var("CLIPPER_ROUTES_FILE");
        std::env::remove_var("TWITCH_API_BASE_URL");

        let config = TwitchConfig::from_env().unwrap();
        assert_eq!(config.page_cap, DEFAULT_PAGE_CAP);
        assert_eq!(config.trailing_slash, TrailingSlash::Strip);
        assert!(config.routes_file.is_none());
        assert_eq!(config.load_registry().unwrap().len(), 4);

        std::env::remove_var("TWITCH_APP_CLIENT_ID");
        std::env::remove_var("TWITCH_ACCESS_TOKEN");
    }

    #[test]
    fn test_trailing_slash_applies_without_routes_file() {
        let mut config = TwitchConfig::new(Credentials::new("cid", "tok"));
        config.trailing_slash = TrailingSlash::Append;

        let registry = config.load_registry().unwrap();
        assert_eq!(registry.trailing_slash(), TrailingSlash::Append);
        let url = registry.build_url("game", &query([("name", "Chess")])).unwrap();
        assert_eq!(url.path(), "/helix/games/");

        config.api_base_url = Some("http://127.0.0.1:9000/helix".to_string());
        let registry = config.load_registry().unwrap();
        assert_eq!(registry.trailing_slash(), TrailingSlash::Append);
        let url = registry.build_url("clip", &query([("id", "abc")])).unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:9000/helix/clips/?id=abc");
    }

    #[test]
    fn test_credentials_debug_redacts_token() {
        let credentials = Credentials::new("cid", "super-secret");
        let debug = format!("{:?}", credentials);
        assert!(debug.contains("cid"));
        assert!(!debug.contains("super-secret"));
    }

    #[test]
    fn test_credentials_headers() {
        let headers = Credentials::new("cid", "tok").headers().unwrap();
        assert_eq!(headers.get(ACCEPT).unwrap(), ACCEPT_VALUE);
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer tok");
        assert_eq!(headers.get(CLIENT_ID_HEADER).unwrap(), "cid");

        assert!(Credentials::new("cid", "bad\ntoken").headers().is_err());
    }

    #[test]
    fn test_clips_query_window() {
        let now = DateTime::parse_from_rfc3339("2024-03-10T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);

        let q = clips_query("516575", 7, 500, now);
        assert_eq!(q["game_id"], "516575");
        assert_eq!(q["first"], "100");
        assert_eq!(q["started_at"], "2024-03-03T12:00:00Z");
        assert_eq!(q["ended_at"], "2024-03-10T12:00:00Z");

        let q = clips_query("516575", 0, 0, now);
        assert_eq!(q["first"], "1");
        assert_eq!(q["started_at"], "2024-03-09T12:00:00Z");
    }

    #[tokio::test]
    async fn test_get_game_by_name() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/helix/games"))
            .and(query_param("name", "Rocket League"))
            .and(header("authorization", "Bearer tok"))
            .and(header("client-id", "cid"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{"id": "30921", "name": "Rocket League", "box_art_url": "x", "igdb_id": "11198"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let game = test_client(&server)
            .get_game_by_name("Rocket League")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(game.id, "30921");
    }

    #[tokio::test]
    async fn test_get_game_by_name_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/helix/games"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
            .mount(&server)
            .await;

        let game = test_client(&server).get_game_by_name("Nope").await.unwrap();
        assert!(game.is_none());
    }

    #[tokio::test]
    async fn test_get_top_games_clamps_limit() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/helix/games/top"))
            .and(query_param("first", "100"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{"id": "1", "name": "A"}, {"id": "2", "name": "B"}],
                "pagination": {"cursor": "abc"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let games = test_client(&server).get_top_games(250).await.unwrap();
        assert_eq!(games.len(), 2);
        assert_eq!(games[1].name, "B");
    }

    #[tokio::test]
    async fn test_get_clip_derives_urls() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/helix/clips"))
            .and(query_param("id", "Abc"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"data": [clip_json("Abc", 10)]})),
            )
            .mount(&server)
            .await;

        let clip = test_client(&server).get_clip("Abc").await.unwrap().unwrap();
        assert_eq!(clip.clip_url, "https://clips-media-assets2.twitch.tv/Abc.mp4");
        assert_eq!(clip.broadcaster_url, "https://www.twitch.tv/alpha");
    }

    #[tokio::test]
    async fn test_get_game_clips_walks_pages() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/helix/clips"))
            .and(query_param("after", "next"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [clip_json("c", 50)],
                "pagination": {}
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/helix/clips"))
            .and(query_param("game_id", "42"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [clip_json("a", 90), clip_json("b", 70)],
                "pagination": {"cursor": "next"}
            })))
            .mount(&server)
            .await;

        let clips = test_client(&server).get_game_clips("42", 7, 2).await.unwrap();
        let ids: Vec<&str> = clips.iter().map(|clip| clip.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }
}
