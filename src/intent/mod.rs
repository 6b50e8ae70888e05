//! Intent matching
//!
//! Intents are an ordered table of keyword predicates. The first predicate
//! that matches wins; a catch-all search intent always sits at the end, so
//! every command resolves to exactly one intent.

mod handlers;

pub use handlers::{Control, FollowUp, IntentHandlers, Response};

use crate::config::IntentConfig;
use crate::wake_word::Command;

/// What the user asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntentKind {
    /// Current time
    Time,
    /// Play media by name
    Play,
    /// Encyclopedic lookup
    Knowledge,
    /// Tell a joke
    Joke,
    /// Social small talk the assistant declines
    Deflection,
    /// End the session
    Shutdown,
    /// Fallback web search
    Search,
}

/// Keyword test over the normalized command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// Any keyword appears anywhere; the argument is the whole command
    ContainsAny(Vec<String>),
    /// Command begins with the token; the argument is what follows it
    Prefix(String),
    /// Any lead phrase appears; the argument is the command with the first
    /// listed phrase that occurs removed
    LeadPhrase(Vec<String>),
    /// Matches everything; the argument is the whole command
    Always,
}

impl Predicate {
    /// Whether the command satisfies this predicate
    #[must_use]
    pub fn matches(&self, command: &str) -> bool {
        match self {
            Self::ContainsAny(words) | Self::LeadPhrase(words) => {
                words.iter().any(|w| command.contains(w.as_str()))
            }
            Self::Prefix(token) => !token.is_empty() && command.starts_with(token.as_str()),
            Self::Always => true,
        }
    }

    /// Extract the handler argument from a command this predicate matched
    #[must_use]
    pub fn argument(&self, command: &str) -> String {
        match self {
            Self::ContainsAny(_) | Self::Always => command.to_string(),
            Self::Prefix(token) => command
                .strip_prefix(token.as_str())
                .unwrap_or(command)
                .trim()
                .to_string(),
            Self::LeadPhrase(phrases) => phrases
                .iter()
                .find(|p| command.contains(p.as_str()))
                .map_or_else(|| command.to_string(), |p| command.replace(p.as_str(), ""))
                .trim()
                .to_string(),
        }
    }
}

/// One row of the intent table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Intent {
    pub kind: IntentKind,
    pub predicate: Predicate,
}

impl Intent {
    #[must_use]
    pub const fn new(kind: IntentKind, predicate: Predicate) -> Self {
        Self { kind, predicate }
    }
}

/// The intent chosen for a command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    pub kind: IntentKind,
    /// Argument extracted by the predicate
    pub argument: String,
}

/// Ordered intent table with a guaranteed fallback
#[derive(Debug, Clone)]
pub struct IntentMatcher {
    intents: Vec<Intent>,
}

impl IntentMatcher {
    /// Build a matcher from intents in priority order
    ///
    /// The fallback search intent is appended after them.
    #[must_use]
    pub fn new(mut intents: Vec<Intent>) -> Self {
        if let Some(pos) = intents.iter().position(|i| i.predicate == Predicate::Always) {
            tracing::warn!(
                shadowed = intents.len() - pos - 1,
                "catch-all intent declared early, later intents are unreachable"
            );
            intents.truncate(pos);
        }
        intents.push(Intent::new(IntentKind::Search, Predicate::Always));
        Self { intents }
    }

    /// The standard table: time, play, knowledge, joke, deflection, shutdown, search
    #[must_use]
    pub fn from_config(config: &IntentConfig) -> Self {
        Self::new(vec![
            Intent::new(IntentKind::Time, Predicate::ContainsAny(config.time.clone())),
            Intent::new(IntentKind::Play, Predicate::Prefix(config.play.clone())),
            Intent::new(
                IntentKind::Knowledge,
                Predicate::LeadPhrase(config.knowledge.clone()),
            ),
            Intent::new(IntentKind::Joke, Predicate::ContainsAny(config.joke.clone())),
            Intent::new(
                IntentKind::Deflection,
                Predicate::ContainsAny(config.deflection.clone()),
            ),
            Intent::new(
                IntentKind::Shutdown,
                Predicate::ContainsAny(config.shutdown.clone()),
            ),
        ])
    }

    /// Intents in evaluation order, fallback last
    #[must_use]
    pub fn intents(&self) -> &[Intent] {
        &self.intents
    }

    /// Resolve a command to exactly one intent
    #[must_use]
    pub fn match_command(&self, command: &Command) -> Match {
        let text = command.as_str();
        let intent = self
            .intents
            .iter()
            .find(|i| i.predicate.matches(text))
            .unwrap_or_else(|| &self.intents[self.intents.len() - 1]);

        let matched = Match {
            kind: intent.kind,
            argument: intent.predicate.argument(text),
        };
        tracing::debug!(kind = ?matched.kind, argument = %matched.argument, "intent matched");
        matched
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matcher() -> IntentMatcher {
        IntentMatcher::from_config(&IntentConfig::default())
    }

    fn resolve(text: &str) -> Match {
        matcher().match_command(&Command::new(text))
    }

    #[test]
    fn test_declaration_order() {
        let kinds: Vec<IntentKind> = matcher().intents().iter().map(|i| i.kind).collect();
        assert_eq!(
            kinds,
            vec![
                IntentKind::Time,
                IntentKind::Play,
                IntentKind::Knowledge,
                IntentKind::Joke,
                IntentKind::Deflection,
                IntentKind::Shutdown,
                IntentKind::Search,
            ]
        );
    }

    #[test]
    fn test_earlier_intent_wins() {
        assert_eq!(
            resolve("what is the time and tell me a joke").kind,
            IntentKind::Time
        );
        // "what is" would be a knowledge lookup, but time comes first
        assert_eq!(resolve("what is the current time").kind, IntentKind::Time);
    }

    #[test]
    fn test_play_argument() {
        let matched = resolve("play believer");
        assert_eq!(matched.kind, IntentKind::Play);
        assert_eq!(matched.argument, "believer");

        let matched = resolve("play the song play that funky music");
        assert_eq!(matched.argument, "the song play that funky music");
    }

    #[test]
    fn test_play_must_lead() {
        assert_eq!(resolve("can you play believer").kind, IntentKind::Search);
    }

    #[test]
    fn test_bare_play_has_empty_argument() {
        let matched = resolve("play");
        assert_eq!(matched.kind, IntentKind::Play);
        assert_eq!(matched.argument, "");
    }

    #[test]
    fn test_knowledge_removes_exact_phrase() {
        let matched = resolve("tell me about the roman empire");
        assert_eq!(matched.kind, IntentKind::Knowledge);
        assert_eq!(matched.argument, "the roman empire");

        // "is" elsewhere in the topic survives
        assert_eq!(resolve("who is isaac newton").argument, "isaac newton");
        assert_eq!(resolve("what is rust").argument, "rust");
    }

    #[test]
    fn test_knowledge_phrase_priority() {
        // "tell me about" is listed first, so it is the phrase removed
        assert_eq!(
            resolve("tell me about what is called gravity").argument,
            "what is called gravity"
        );
    }

    #[test]
    fn test_keyword_intents() {
        assert_eq!(resolve("make me laugh").kind, IntentKind::Joke);
        assert_eq!(resolve("will you go out with me").kind, IntentKind::Deflection);
        assert_eq!(resolve("goodbye").kind, IntentKind::Shutdown);
        assert_eq!(resolve("please quit now").kind, IntentKind::Shutdown);
    }

    #[test]
    fn test_fallback_gets_full_command() {
        let matched = resolve("weather in paris");
        assert_eq!(matched.kind, IntentKind::Search);
        assert_eq!(matched.argument, "weather in paris");
    }

    #[test]
    fn test_empty_command_falls_through() {
        let matched = resolve("");
        assert_eq!(matched.kind, IntentKind::Search);
        assert_eq!(matched.argument, "");
    }

    #[test]
    fn test_matching_is_deterministic() {
        let m = matcher();
        let command = Command::new("tell me a joke about time");
        let first = m.match_command(&command);
        for _ in 0..10 {
            assert_eq!(m.match_command(&command), first);
        }
    }

    #[test]
    fn test_early_catch_all_is_replaced_by_fallback() {
        let m = IntentMatcher::new(vec![
            Intent::new(IntentKind::Joke, Predicate::ContainsAny(vec!["joke".into()])),
            Intent::new(IntentKind::Deflection, Predicate::Always),
            Intent::new(IntentKind::Shutdown, Predicate::ContainsAny(vec!["stop".into()])),
        ]);

        assert_eq!(m.intents().len(), 2);
        assert_eq!(m.match_command(&Command::new("stop")).kind, IntentKind::Search);
        assert_eq!(m.match_command(&Command::new("joke")).kind, IntentKind::Joke);
    }
}
