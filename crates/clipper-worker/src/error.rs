//! Engine error types.
//!
//! Every failure names the stage it happened in so a failed run can be
//! traced to a route definition, an API call or the curation setup.

use clipper_curation::CurationError;
use clipper_twitch::TwitchError;
use thiserror::Error;

pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Routing failed: {0}")]
    Routing(#[source] TwitchError),

    #[error("Acquisition failed: {0}")]
    Acquisition(#[source] TwitchError),

    #[error("Curation failed: {0}")]
    Curation(#[from] CurationError),

    #[error("Game not found: {0}")]
    GameNotFound(String),
}

impl EngineError {
    /// Attribute a client error to the routing or acquisition stage.
    pub fn from_twitch(err: TwitchError) -> Self {
        match err {
            TwitchError::UnknownRoute(_)
            | TwitchError::MissingParameters { .. }
            | TwitchError::RouteFile(_)
            | TwitchError::Configuration(_) => Self::Routing(err),
            _ => Self::Acquisition(err),
        }
    }

    /// Name of the stage that failed.
    pub fn stage(&self) -> &'static str {
        match self {
            EngineError::Routing(_) => "routing",
            EngineError::Acquisition(_) | EngineError::GameNotFound(_) => "acquisition",
            EngineError::Curation(_) => "curation",
        }
    }

    /// True when the run stopped because the API rate limit was hit.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, EngineError::Acquisition(e) if e.is_rate_limited())
    }
}

impl From<TwitchError> for EngineError {
    fn from(err: TwitchError) -> Self {
        Self::from_twitch(err)
    }
}
