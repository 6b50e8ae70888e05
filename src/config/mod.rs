//! Configuration for the assistant
//!
//! Built once at startup with priority env > TOML file > default, then
//! treated as immutable for the life of the process.

pub mod file;

use std::path::Path;
use std::time::Duration;

use secrecy::SecretString;
use serde::Deserialize;

pub use file::{AssistantConfigFile, config_file_path, load_config_file};

use crate::Result;

/// Default activation token
pub const DEFAULT_WAKE_WORD: &str = "alexa";

/// Assistant configuration
#[derive(Debug)]
pub struct Config {
    /// Activation token, stored lower-cased
    pub wake_word: String,

    /// Display name used in the greeting and transcript log
    pub assistant_name: String,

    /// Microphone and endpointing
    pub listen: ListenConfig,

    /// Speech recognition backend
    pub stt: SttConfig,

    /// Speech output backend
    pub voice: VoiceConfig,

    /// Loop timing and recovery policy
    pub session: SessionConfig,

    /// Intent keyword tables
    pub intents: IntentConfig,

    /// External service selection
    pub services: ServicesConfig,

    /// API keys
    pub api_keys: ApiKeys,

    /// Whether `assistant_name` was configured rather than derived
    name_configured: bool,
}

/// Listening configuration
#[derive(Debug, Clone)]
pub struct ListenConfig {
    /// Ambient noise calibration window before each listen
    pub calibration: Duration,
    /// How long to wait for speech to begin
    pub start_timeout: Duration,
    /// Longest phrase accepted
    pub phrase_limit: Duration,
    /// Trailing silence that ends a phrase
    pub pause: Duration,
    /// RMS floor for speech detection
    pub energy_threshold: f32,
    /// Raise the threshold to match calibrated ambient noise
    pub dynamic_energy: bool,
    /// Recognition language tag (e.g. "en-US")
    pub language: String,
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            calibration: Duration::from_secs(1),
            start_timeout: Duration::from_secs(3),
            phrase_limit: Duration::from_secs(5),
            pause: Duration::from_millis(800),
            energy_threshold: 0.01,
            dynamic_energy: true,
            language: "en-US".to_string(),
        }
    }
}

/// STT provider backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SttProvider {
    /// `OpenAI` Whisper
    Whisper,
    /// Deepgram
    Deepgram,
}

/// Speech recognition configuration
#[derive(Debug, Clone)]
pub struct SttConfig {
    pub provider: SttProvider,
    pub model: String,
}

/// TTS provider backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TtsProvider {
    /// `OpenAI` speech API
    OpenAi,
    /// `ElevenLabs`
    ElevenLabs,
    /// Print to stdout only
    Console,
}

/// Speech output configuration
#[derive(Debug, Clone)]
pub struct VoiceConfig {
    pub provider: TtsProvider,
    pub model: String,
    pub voice: String,
    /// Speed multiplier (0.25 to 4.0)
    pub speed: f32,
}

/// Session loop configuration
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Pause at the end of every cycle
    pub cycle_delay: Duration,
    /// Extra pause after a dispatched command
    pub command_delay: Duration,
    /// Pause between the restart apology and the new greeting
    pub restart_delay: Duration,
    /// Consecutive restarts allowed before giving up, 0 for no limit
    pub max_restarts: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cycle_delay: Duration::from_secs(1),
            command_delay: Duration::from_secs(2),
            restart_delay: Duration::from_secs(2),
            max_restarts: 0,
        }
    }
}

/// Keyword tables for the intent matcher
///
/// Lists are matched as lower-case substrings of the command.
#[derive(Debug, Clone)]
pub struct IntentConfig {
    pub time: Vec<String>,
    /// Prefix token for media playback
    pub play: String,
    /// Lead phrases for knowledge lookups, in removal priority order
    pub knowledge: Vec<String>,
    pub joke: Vec<String>,
    pub deflection: Vec<String>,
    pub shutdown: Vec<String>,
    /// Sentence bound for knowledge summaries
    pub knowledge_sentences: usize,
}

impl Default for IntentConfig {
    fn default() -> Self {
        Self {
            time: words(&["time", "what time", "current time"]),
            play: "play".to_string(),
            knowledge: words(&["tell me about", "who is", "what is"]),
            joke: words(&["joke", "tell joke", "make me laugh"]),
            deflection: words(&["date", "go out", "relationship"]),
            shutdown: words(&["stop", "exit", "quit", "goodbye"]),
            knowledge_sentences: 2,
        }
    }
}

/// Joke backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JokeSourceKind {
    /// v2.jokeapi.dev
    JokeApi,
    /// Offline list shipped with the binary
    Builtin,
}

/// External service configuration
#[derive(Debug, Clone)]
pub struct ServicesConfig {
    pub joke_source: JokeSourceKind,
    pub wikipedia_language: String,
    /// Search URL template with a `{query}` placeholder
    pub search_url: String,
    /// Media URL template with a `{query}` placeholder
    pub media_url: String,
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            joke_source: JokeSourceKind::JokeApi,
            wikipedia_language: "en".to_string(),
            search_url: "https://www.google.com/search?q={query}".to_string(),
            media_url: "https://www.youtube.com/results?search_query={query}".to_string(),
        }
    }
}

/// API keys for external services
#[derive(Debug, Default)]
pub struct ApiKeys {
    pub openai: Option<SecretString>,
    pub elevenlabs: Option<SecretString>,
    pub deepgram: Option<SecretString>,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_sources(AssistantConfigFile::default(), |_| None)
    }
}

impl Config {
    /// Load configuration from the environment and the config file
    ///
    /// # Errors
    ///
    /// Returns error if an explicit config file cannot be loaded
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let fc = load_config_file(path)?;
        Ok(Self::from_sources(fc, |key| std::env::var(key).ok()))
    }

    /// Build configuration from a parsed file and an environment lookup
    #[must_use]
    pub fn from_sources(fc: AssistantConfigFile, env: impl Fn(&str) -> Option<String>) -> Self {
        let wake_word = env("ASSISTANT_WAKE_WORD")
            .or(fc.wake_word)
            .map(|w| w.trim().to_lowercase())
            .filter(|w| !w.is_empty())
            .unwrap_or_else(|| DEFAULT_WAKE_WORD.to_string());

        let name_configured = fc.assistant_name.is_some();
        let assistant_name = fc
            .assistant_name
            .unwrap_or_else(|| capitalize(&wake_word));

        let listen_defaults = ListenConfig::default();
        let listen = ListenConfig {
            calibration: fc
                .listen
                .calibration_ms
                .map_or(listen_defaults.calibration, Duration::from_millis),
            start_timeout: fc
                .listen
                .start_timeout_ms
                .map_or(listen_defaults.start_timeout, Duration::from_millis),
            phrase_limit: fc
                .listen
                .phrase_limit_ms
                .map_or(listen_defaults.phrase_limit, Duration::from_millis),
            pause: fc
                .listen
                .pause_ms
                .map_or(listen_defaults.pause, Duration::from_millis),
            energy_threshold: fc
                .listen
                .energy_threshold
                .unwrap_or(listen_defaults.energy_threshold),
            dynamic_energy: fc
                .listen
                .dynamic_energy
                .unwrap_or(listen_defaults.dynamic_energy),
            language: env("ASSISTANT_LANGUAGE")
                .or(fc.listen.language)
                .unwrap_or(listen_defaults.language),
        };

        let stt_provider = fc.stt.provider.unwrap_or(SttProvider::Whisper);
        let stt = SttConfig {
            provider: stt_provider,
            model: env("ASSISTANT_STT_MODEL")
                .or(fc.stt.model)
                .unwrap_or_else(|| match stt_provider {
                    SttProvider::Whisper => "whisper-1".to_string(),
                    SttProvider::Deepgram => "nova-2".to_string(),
                }),
        };

        let tts_provider = fc.voice.provider.unwrap_or(TtsProvider::OpenAi);
        let voice = VoiceConfig {
            provider: tts_provider,
            model: env("ASSISTANT_TTS_MODEL")
                .or(fc.voice.model)
                .unwrap_or_else(|| match tts_provider {
                    TtsProvider::ElevenLabs => "eleven_monolingual_v1".to_string(),
                    TtsProvider::OpenAi | TtsProvider::Console => "tts-1".to_string(),
                }),
            voice: env("ASSISTANT_TTS_VOICE")
                .or(fc.voice.voice)
                .unwrap_or_else(|| "nova".to_string()),
            speed: fc.voice.speed.unwrap_or(1.0).clamp(0.25, 4.0),
        };

        let session_defaults = SessionConfig::default();
        let session = SessionConfig {
            cycle_delay: fc
                .session
                .cycle_delay_ms
                .map_or(session_defaults.cycle_delay, Duration::from_millis),
            command_delay: fc
                .session
                .command_delay_ms
                .map_or(session_defaults.command_delay, Duration::from_millis),
            restart_delay: fc
                .session
                .restart_delay_ms
                .map_or(session_defaults.restart_delay, Duration::from_millis),
            max_restarts: env("ASSISTANT_MAX_RESTARTS")
                .and_then(|s| s.parse().ok())
                .or(fc.session.max_restarts)
                .unwrap_or(session_defaults.max_restarts),
        };

        let intent_defaults = IntentConfig::default();
        let intents = IntentConfig {
            time: fc.intents.time.map_or(intent_defaults.time, lowercase_all),
            play: fc
                .intents
                .play
                .map_or(intent_defaults.play, |p| p.trim().to_lowercase()),
            knowledge: fc
                .intents
                .knowledge
                .map_or(intent_defaults.knowledge, lowercase_all),
            joke: fc.intents.joke.map_or(intent_defaults.joke, lowercase_all),
            deflection: fc
                .intents
                .deflection
                .map_or(intent_defaults.deflection, lowercase_all),
            shutdown: fc
                .intents
                .shutdown
                .map_or(intent_defaults.shutdown, lowercase_all),
            knowledge_sentences: fc
                .intents
                .knowledge_sentences
                .unwrap_or(intent_defaults.knowledge_sentences)
                .max(1),
        };

        let service_defaults = ServicesConfig::default();
        let services = ServicesConfig {
            joke_source: fc
                .services
                .joke_source
                .unwrap_or(service_defaults.joke_source),
            wikipedia_language: fc
                .services
                .wikipedia_language
                .unwrap_or(service_defaults.wikipedia_language),
            search_url: fc
                .services
                .search_url
                .unwrap_or(service_defaults.search_url),
            media_url: fc.services.media_url.unwrap_or(service_defaults.media_url),
        };

        // API keys (env > toml > None)
        let api_keys = ApiKeys {
            openai: env("OPENAI_API_KEY")
                .or(fc.api_keys.openai)
                .map(SecretString::from),
            elevenlabs: env("ELEVENLABS_API_KEY")
                .or(fc.api_keys.elevenlabs)
                .map(SecretString::from),
            deepgram: env("DEEPGRAM_API_KEY")
                .or(fc.api_keys.deepgram)
                .map(SecretString::from),
        };

        Self {
            wake_word,
            assistant_name,
            listen,
            stt,
            voice,
            session,
            intents,
            services,
            api_keys,
            name_configured,
        }
    }

    /// Override the wake word, e.g. from the command line
    ///
    /// Blank values are ignored. A derived assistant name follows the new
    /// wake word; a configured one is kept.
    pub fn set_wake_word(&mut self, wake_word: &str) {
        let wake_word = wake_word.trim().to_lowercase();
        if wake_word.is_empty() {
            return;
        }
        if !self.name_configured {
            self.assistant_name = capitalize(&wake_word);
        }
        self.wake_word = wake_word;
    }

    /// Spoken at the start of every session
    #[must_use]
    pub fn greeting(&self) -> String {
        format!(
            "Hello! I'm {}, your voice assistant. Say '{}' followed by your command.",
            self.assistant_name,
            capitalize(&self.wake_word)
        )
    }
}

fn words(list: &[&str]) -> Vec<String> {
    list.iter().map(ToString::to_string).collect()
}

fn lowercase_all(list: Vec<String>) -> Vec<String> {
    list.into_iter()
        .map(|w| w.trim().to_lowercase())
        .filter(|w| !w.is_empty())
        .collect()
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}
