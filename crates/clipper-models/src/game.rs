//! Game (category) model.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A Twitch category as returned by `GET /games` and `GET /games/top`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Game {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub box_art_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub igdb_id: Option<String>,
}

impl Game {
    /// IGDB page for the game, when the API links one.
    pub fn igdb_url(&self) -> Option<String> {
        self.igdb_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .map(|id| format!("https://www.igdb.com/g/{}", id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_igdb_url() {
        let game: Game = serde_json::from_str(
            r#"{"id":"516575","name":"VALORANT","box_art_url":"x","igdb_id":"126459"}"#,
        )
        .unwrap();
        assert_eq!(game.igdb_url().as_deref(), Some("https://www.igdb.com/g/126459"));

        let no_igdb = Game {
            igdb_id: Some(String::new()),
            ..game
        };
        assert_eq!(no_igdb.igdb_url(), None);
    }
}
