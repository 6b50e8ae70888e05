//! Joke sources

use async_trait::async_trait;
use rand::seq::SliceRandom;
use serde::Deserialize;

use super::JokeSource;
use crate::{Error, Result};

const JOKEAPI_URL: &str = "https://v2.jokeapi.dev/joke/Programming?type=single&safe-mode";

/// Offline jokes for the builtin source
const JOKES: &[&str] = &[
    "There are only 10 kinds of people in this world: those who know binary and those who don't.",
    "Why do programmers prefer dark mode? Because light attracts bugs.",
    "A SQL query walks into a bar, walks up to two tables and asks: can I join you?",
    "How many programmers does it take to change a light bulb? None, that's a hardware problem.",
    "I would tell you a UDP joke, but you might not get it.",
    "Debugging is like being the detective in a crime movie where you are also the murderer.",
    "To understand recursion, you must first understand recursion.",
    "Why did the programmer quit his job? Because he didn't get arrays.",
    "A byte walks into a bar looking miserable. The bartender asks what's wrong. Parity error, it says.",
    "Knock knock. Race condition. Who's there?",
];

#[derive(Debug, Deserialize)]
struct JokeApiResponse {
    #[serde(default)]
    error: bool,
    joke: Option<String>,
    message: Option<String>,
}

/// Jokes from v2.jokeapi.dev
pub struct JokeApi {
    client: reqwest::Client,
    url: String,
}

impl JokeApi {
    #[must_use]
    pub fn new() -> Self {
        Self::with_url(JOKEAPI_URL)
    }

    /// Use a JokeAPI-compatible endpoint
    #[must_use]
    pub fn with_url(url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.to_string(),
        }
    }
}

impl Default for JokeApi {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait(?Send)]
impl JokeSource for JokeApi {
    async fn joke(&self) -> Result<String> {
        let response: JokeApiResponse = self
            .client
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if response.error {
            return Err(Error::Service(format!(
                "jokeapi: {}",
                response.message.unwrap_or_default()
            )));
        }

        response
            .joke
            .filter(|j| !j.trim().is_empty())
            .ok_or_else(|| Error::Service("jokeapi returned no joke".to_string()))
    }
}

/// Picks from a fixed list, no network needed
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinJokes;

#[async_trait(?Send)]
impl JokeSource for BuiltinJokes {
    async fn joke(&self) -> Result<String> {
        JOKES
            .choose(&mut rand::thread_rng())
            .map(ToString::to_string)
            .ok_or_else(|| Error::Service("no jokes available".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    #[tokio::test]
    async fn test_builtin_joke_comes_from_list() {
        let joke = BuiltinJokes.joke().await.unwrap();
        assert!(JOKES.contains(&joke.as_str()));
    }

    #[tokio::test]
    async fn test_jokeapi_single_joke() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "error": false,
                "type": "single",
                "joke": "Java is to JavaScript what car is to carpet."
            })))
            .mount(&server)
            .await;

        let api = JokeApi::with_url(&server.uri());
        assert_eq!(
            api.joke().await.unwrap(),
            "Java is to JavaScript what car is to carpet."
        );
    }

    #[tokio::test]
    async fn test_jokeapi_error_flag() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "error": true,
                "message": "No matching joke found"
            })))
            .mount(&server)
            .await;

        let api = JokeApi::with_url(&server.uri());
        assert!(matches!(api.joke().await, Err(Error::Service(_))));
    }
}
