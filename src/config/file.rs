//! TOML configuration file loading
//!
//! Supports `~/.config/wake-assistant/config.toml` as a persistent config source.
//! All fields are optional; the file is a partial overlay on top of defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::{JokeSourceKind, SttProvider, TtsProvider};
use crate::{Error, Result};

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AssistantConfigFile {
    /// Activation token (e.g. "alexa")
    pub wake_word: Option<String>,

    /// Name used in the greeting and transcript log
    pub assistant_name: Option<String>,

    /// Microphone and endpointing settings
    #[serde(default)]
    pub listen: ListenFileConfig,

    /// Speech recognition settings
    #[serde(default)]
    pub stt: SttFileConfig,

    /// Speech output settings
    #[serde(default)]
    pub voice: VoiceFileConfig,

    /// Session loop timing and recovery
    #[serde(default)]
    pub session: SessionFileConfig,

    /// Intent keyword tables
    #[serde(default)]
    pub intents: IntentsFileConfig,

    /// External service selection
    #[serde(default)]
    pub services: ServicesFileConfig,

    /// API keys for external services
    #[serde(default)]
    pub api_keys: ApiKeysFileConfig,
}

/// Listening configuration
#[derive(Debug, Default, Deserialize)]
pub struct ListenFileConfig {
    /// Ambient noise calibration before each listen
    pub calibration_ms: Option<u64>,
    /// How long to wait for speech to begin
    pub start_timeout_ms: Option<u64>,
    /// Longest phrase accepted
    pub phrase_limit_ms: Option<u64>,
    /// Trailing silence that ends a phrase
    pub pause_ms: Option<u64>,
    /// RMS floor for speech detection
    pub energy_threshold: Option<f32>,
    /// Raise the threshold to match calibrated ambient noise
    pub dynamic_energy: Option<bool>,
    /// Recognition language tag (e.g. "en-US")
    pub language: Option<String>,
}

/// Speech recognition configuration
#[derive(Debug, Default, Deserialize)]
pub struct SttFileConfig {
    pub provider: Option<SttProvider>,
    pub model: Option<String>,
}

/// Speech output configuration
#[derive(Debug, Default, Deserialize)]
pub struct VoiceFileConfig {
    pub provider: Option<TtsProvider>,
    pub model: Option<String>,
    pub voice: Option<String>,
    pub speed: Option<f32>,
}

/// Session loop configuration
#[derive(Debug, Default, Deserialize)]
pub struct SessionFileConfig {
    pub cycle_delay_ms: Option<u64>,
    pub command_delay_ms: Option<u64>,
    pub restart_delay_ms: Option<u64>,
    /// 0 restarts forever
    pub max_restarts: Option<u32>,
}

/// Intent keyword tables
#[derive(Debug, Default, Deserialize)]
pub struct IntentsFileConfig {
    pub time: Option<Vec<String>>,
    pub play: Option<String>,
    pub knowledge: Option<Vec<String>>,
    pub joke: Option<Vec<String>>,
    pub deflection: Option<Vec<String>>,
    pub shutdown: Option<Vec<String>>,
    pub knowledge_sentences: Option<usize>,
}

/// External service configuration
#[derive(Debug, Default, Deserialize)]
pub struct ServicesFileConfig {
    pub joke_source: Option<JokeSourceKind>,
    pub wikipedia_language: Option<String>,
    /// Search URL template, `{query}` is replaced with the encoded query
    pub search_url: Option<String>,
    /// Media URL template, `{query}` is replaced with the encoded query
    pub media_url: Option<String>,
}

/// API keys configuration
#[derive(Debug, Default, Deserialize)]
pub struct ApiKeysFileConfig {
    pub openai: Option<String>,
    pub elevenlabs: Option<String>,
    pub deepgram: Option<String>,
}

/// Load the TOML config file
///
/// With an explicit path the file must exist and parse. Without one, the
/// standard path is tried and any problem falls back to defaults.
///
/// # Errors
///
/// Returns error if an explicitly requested file cannot be read or parsed
pub fn load_config_file(explicit: Option<&Path>) -> Result<AssistantConfigFile> {
    if let Some(path) = explicit {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        let config = toml::from_str(&content)?;
        tracing::info!(path = %path.display(), "loaded config file");
        return Ok(config);
    }

    let Some(path) = config_file_path() else {
        return Ok(AssistantConfigFile::default());
    };

    if !path.exists() {
        return Ok(AssistantConfigFile::default());
    }

    let config = match std::fs::read_to_string(&path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                config
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                AssistantConfigFile::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            AssistantConfigFile::default()
        }
    };

    Ok(config)
}

/// Return the config file path: `~/.config/wake-assistant/config.toml`
#[must_use]
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("wake-assistant").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_partial_file_parses() {
        let config: AssistantConfigFile = toml::from_str(
            r#"
            wake_word = "jarvis"

            [listen]
            start_timeout_ms = 4000

            [voice]
            provider = "console"
            "#,
        )
        .unwrap();

        assert_eq!(config.wake_word.as_deref(), Some("jarvis"));
        assert_eq!(config.listen.start_timeout_ms, Some(4000));
        assert_eq!(config.voice.provider, Some(TtsProvider::Console));
        assert!(config.intents.time.is_none());
    }

    #[test]
    fn test_unknown_top_level_key_rejected() {
        let parsed: std::result::Result<AssistantConfigFile, _> =
            toml::from_str("wakeword = \"x\"");
        assert!(parsed.is_err());
    }

    #[test]
    fn test_explicit_path_loads() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "assistant_name = \"Jarvis\"\n[session]\nmax_restarts = 3").unwrap();

        let config = load_config_file(Some(file.path())).unwrap();
        assert_eq!(config.assistant_name.as_deref(), Some("Jarvis"));
        assert_eq!(config.session.max_restarts, Some(3));
    }

    #[test]
    fn test_explicit_path_missing_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_config_file(Some(&dir.path().join("absent.toml")));
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_explicit_path_malformed_is_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "wake_word = [").unwrap();

        assert!(matches!(load_config_file(Some(file.path())), Err(Error::Toml(_))));
    }
}
