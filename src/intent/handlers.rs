//! Intent handlers
//!
//! Every handler produces exactly one [`Response`]. Service failures are
//! turned into spoken apologies here and never leave the handler.

use super::{IntentKind, Match};
use crate::services::{LookupError, Services};

const DEFLECTION: &str = "Sorry, I am focused on helping you right now";
const GOODBYE: &str = "Goodbye! Have a great day!";
const ASK_WHAT_TO_PLAY: &str = "What would you like me to play?";
const ASK_TOPIC: &str = "Please tell me what you want to know about";
const LOOKUP_FAILED: &str = "Sorry, there was an error looking that up";
const NO_JOKE: &str = "Sorry, I couldn't think of a joke right now";
const SEARCHING: &str = "Let me search that for you";
const PROMPT: &str = "Yes? What can I do for you?";

/// Whether the session keeps going after a response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Continue,
    Stop,
}

/// External call to make after the response has been spoken
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FollowUp {
    /// Start media playback for the query
    Play(String),
    /// Open a web search for the query
    Search(String),
}

/// A handler's answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub spoken_text: String,
    pub control: Control,
    pub follow_up: Option<FollowUp>,
}

impl Response {
    /// Speak and keep going
    #[must_use]
    pub fn say(text: impl Into<String>) -> Self {
        Self {
            spoken_text: text.into(),
            control: Control::Continue,
            follow_up: None,
        }
    }

    /// Speak and end the session
    #[must_use]
    pub fn stop(text: impl Into<String>) -> Self {
        Self {
            spoken_text: text.into(),
            control: Control::Stop,
            follow_up: None,
        }
    }

    /// Attach an external call made after speaking
    #[must_use]
    pub fn then(mut self, follow_up: FollowUp) -> Self {
        self.follow_up = Some(follow_up);
        self
    }
}

/// Dispatches matched intents to their handlers
pub struct IntentHandlers {
    services: Services,
    knowledge_sentences: usize,
}

impl IntentHandlers {
    #[must_use]
    pub const fn new(services: Services, knowledge_sentences: usize) -> Self {
        Self {
            services,
            knowledge_sentences,
        }
    }

    /// Produce the response for a matched intent
    pub async fn handle(&self, matched: &Match) -> Response {
        let argument = matched.argument.as_str();

        match matched.kind {
            IntentKind::Time => self.time(),
            IntentKind::Play => play(argument),
            IntentKind::Knowledge => self.knowledge(argument).await,
            IntentKind::Joke => self.joke().await,
            IntentKind::Deflection => Response::say(DEFLECTION),
            IntentKind::Shutdown => Response::stop(GOODBYE),
            IntentKind::Search => search(argument),
        }
    }

    /// Run a follow-up call; failures are logged and swallowed
    pub async fn run_follow_up(&self, follow_up: &FollowUp) {
        let result = match follow_up {
            FollowUp::Play(query) => self.services.media.play(query).await,
            FollowUp::Search(query) => self.services.search.search(query).await,
        };

        if let Err(e) = result {
            tracing::warn!(error = %e, ?follow_up, "follow-up call failed");
        }
    }

    fn time(&self) -> Response {
        let now = self.services.clock.now().format("%I:%M %p").to_string();
        tracing::debug!(time = %now, "time requested");
        Response::say(format!("Current time is {now}"))
    }

    async fn knowledge(&self, topic: &str) -> Response {
        if topic.is_empty() {
            return Response::say(ASK_TOPIC);
        }

        match self
            .services
            .knowledge
            .summary(topic, self.knowledge_sentences)
            .await
        {
            Ok(summary) => {
                tracing::debug!(topic, summary = %summary, "knowledge lookup");
                Response::say(summary)
            }
            Err(LookupError::Ambiguous) => Response::say(format!(
                "There are multiple results for {topic}. Please be more specific."
            )),
            Err(LookupError::NotFound) => {
                Response::say(format!("Sorry, I couldn't find information about {topic}"))
            }
            Err(e @ LookupError::Backend(_)) => {
                tracing::warn!(error = %e, topic, "knowledge lookup failed");
                Response::say(LOOKUP_FAILED)
            }
        }
    }

    async fn joke(&self) -> Response {
        match self.services.jokes.joke().await {
            Ok(joke) => Response::say(joke),
            Err(e) => {
                tracing::warn!(error = %e, "joke source unavailable");
                Response::say(NO_JOKE)
            }
        }
    }
}

fn play(song: &str) -> Response {
    if song.is_empty() {
        return Response::say(ASK_WHAT_TO_PLAY);
    }
    Response::say(format!("Playing {song}")).then(FollowUp::Play(song.to_string()))
}

fn search(command: &str) -> Response {
    if command.is_empty() {
        return Response::say(PROMPT);
    }
    Response::say(SEARCHING).then(FollowUp::Search(command.to_string()))
}
