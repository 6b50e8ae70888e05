//! External services used by intent handlers
//!
//! Each service sits behind a trait so the session can be wired with real
//! backends in production and fakes in tests.

mod browser;
mod clock;
mod jokes;
mod media;
mod search;
mod wikipedia;

use async_trait::async_trait;
use thiserror::Error;

pub use browser::{SystemOpener, UrlOpener, fill_template};
pub use clock::{Clock, SystemClock};
pub use jokes::{BuiltinJokes, JokeApi};
pub use media::YouTubePlayer;
pub use search::BrowserSearch;
pub use wikipedia::{Wikipedia, clip_sentences};

use crate::config::{Config, JokeSourceKind};
use crate::Result;

/// Why a knowledge lookup produced no summary
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    /// The topic maps to several articles
    #[error("topic is ambiguous")]
    Ambiguous,

    /// No article for the topic
    #[error("topic not found")]
    NotFound,

    /// Anything else the backend reported
    #[error("knowledge backend error: {0}")]
    Backend(String),
}

/// Starts playback of media matching a free-text query
#[async_trait(?Send)]
pub trait MediaPlayer {
    /// Begin playback; returns once playback has been handed off
    async fn play(&self, query: &str) -> Result<()>;
}

/// Short encyclopedic summaries
#[async_trait(?Send)]
pub trait KnowledgeSource {
    /// Summary of `topic`, at most `sentences` sentences long
    async fn summary(
        &self,
        topic: &str,
        sentences: usize,
    ) -> std::result::Result<String, LookupError>;
}

/// One joke per call
#[async_trait(?Send)]
pub trait JokeSource {
    async fn joke(&self) -> Result<String>;
}

/// Generic web search, fire-and-forget
#[async_trait(?Send)]
pub trait WebSearch {
    async fn search(&self, query: &str) -> Result<()>;
}

/// External collaborators for the intent handlers
pub struct Services {
    pub media: Box<dyn MediaPlayer>,
    pub knowledge: Box<dyn KnowledgeSource>,
    pub jokes: Box<dyn JokeSource>,
    pub search: Box<dyn WebSearch>,
    pub clock: Box<dyn Clock>,
}

impl Services {
    /// Production services selected by configuration
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        let jokes: Box<dyn JokeSource> = match config.services.joke_source {
            JokeSourceKind::JokeApi => Box::new(JokeApi::new()),
            JokeSourceKind::Builtin => Box::new(BuiltinJokes),
        };

        Self {
            media: Box::new(YouTubePlayer::new(
                &config.services.media_url,
                Box::new(SystemOpener),
            )),
            knowledge: Box::new(Wikipedia::new(&config.services.wikipedia_language)),
            jokes,
            search: Box::new(BrowserSearch::new(
                &config.services.search_url,
                Box::new(SystemOpener),
            )),
            clock: Box::new(SystemClock),
        }
    }
}
