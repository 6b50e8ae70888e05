//! Wake word gating
//!
//! An utterance is directed at the assistant only when it contains the wake
//! token. The token is cut out once and the rest becomes the [`Command`].

use std::fmt;

use crate::transcript::Utterance;

/// Characters stripped from the edges of a command besides whitespace
const EDGE_PUNCTUATION: &[char] = &[',', '.', '!', '?', ';', ':'];

/// Utterance text with the wake token removed
///
/// May be empty when only the wake word was spoken.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command(String);

impl Command {
    /// Build a command from already-normalized text
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    /// Command text
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when the wake word was spoken with nothing after it
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Outcome of gating an utterance
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateResult {
    /// The utterance addressed the assistant
    Accepted(Command),
    /// No wake token; not directed at the assistant
    Rejected,
}

/// Accepts utterances that contain the wake token
#[derive(Debug, Clone)]
pub struct WakeWordGate {
    token: String,
}

impl WakeWordGate {
    /// Create a gate for a wake token (matched case-insensitively)
    #[must_use]
    pub fn new(token: &str) -> Self {
        let token = token.trim().to_lowercase();
        tracing::debug!(token, "wake word gate initialized");
        Self { token }
    }

    /// The lower-cased wake token
    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Gate an utterance
    #[must_use]
    pub fn gate(&self, utterance: &Utterance) -> GateResult {
        let normalized = utterance.normalized();

        let Some(pos) = normalized.find(&self.token) else {
            tracing::debug!(utterance = normalized, "wake word not detected");
            return GateResult::Rejected;
        };

        let mut remainder = String::with_capacity(normalized.len() - self.token.len());
        remainder.push_str(&normalized[..pos]);
        remainder.push_str(&normalized[pos + self.token.len()..]);

        let command = remainder
            .trim_matches(|c: char| c.is_whitespace() || EDGE_PUNCTUATION.contains(&c))
            .to_string();

        tracing::info!(command, "wake word detected");
        GateResult::Accepted(Command(command))
    }
}
