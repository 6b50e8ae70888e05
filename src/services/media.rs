//! Media playback via YouTube in the browser

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;

use super::MediaPlayer;
use super::browser::{UrlOpener, fill_template};
use crate::Result;

static VIDEO_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""videoId":"([A-Za-z0-9_-]{11})""#).expect("valid regex")
});

const WATCH_URL: &str = "https://www.youtube.com/watch?v=";

/// Browser-like user agent; the results page is thinner for unknown clients
const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

/// Plays the top YouTube result for a query
///
/// Falls back to opening the results page when no video can be picked out.
pub struct YouTubePlayer {
    client: reqwest::Client,
    results_template: String,
    opener: Box<dyn UrlOpener>,
}

impl YouTubePlayer {
    /// Create a player from a results URL template with a `{query}` placeholder
    #[must_use]
    pub fn new(results_template: &str, opener: Box<dyn UrlOpener>) -> Self {
        Self {
            client: reqwest::Client::new(),
            results_template: results_template.to_string(),
            opener,
        }
    }

    async fn first_video(&self, results_url: &str) -> Result<Option<String>> {
        let body = self
            .client
            .get(results_url)
            .header("User-Agent", USER_AGENT)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        Ok(VIDEO_ID
            .captures(&body)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string()))
    }
}

#[async_trait(?Send)]
impl MediaPlayer for YouTubePlayer {
    async fn play(&self, query: &str) -> Result<()> {
        let results_url = fill_template(&self.results_template, query);

        let target = match self.first_video(&results_url).await {
            Ok(Some(id)) => format!("{WATCH_URL}{id}"),
            Ok(None) => {
                tracing::debug!(query, "no video id in results, opening result list");
                results_url
            }
            Err(e) => {
                tracing::warn!(error = %e, query, "video lookup failed, opening result list");
                results_url
            }
        };

        tracing::info!(query, url = %target, "starting playback");
        self.opener.open(&target)
    }
}
