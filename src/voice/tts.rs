//! Text-to-speech (TTS) processing

use secrecy::{ExposeSecret, SecretString};

use crate::config::{ApiKeys, TtsProvider, VoiceConfig};
use crate::{Error, Result};

const OPENAI_URL: &str = "https://api.openai.com/v1/audio/speech";
const ELEVENLABS_URL: &str = "https://api.elevenlabs.io/v1/text-to-speech";

/// Synthesizes speech from text as MP3
pub struct TextToSpeech {
    client: reqwest::Client,
    api_key: SecretString,
    voice: String,
    speed: f32,
    model: String,
    provider: TtsProvider,
    endpoint: String,
}

impl TextToSpeech {
    /// Create the configured TTS backend
    ///
    /// # Errors
    ///
    /// Returns error if the provider needs a missing API key, or the
    /// provider is console-only
    pub fn from_config(config: &VoiceConfig, keys: &ApiKeys) -> Result<Self> {
        let (key, endpoint) = match config.provider {
            TtsProvider::OpenAi => (
                keys.openai.as_ref().ok_or_else(|| {
                    Error::Config("OpenAI API key required for TTS".to_string())
                })?,
                OPENAI_URL,
            ),
            TtsProvider::ElevenLabs => (
                keys.elevenlabs.as_ref().ok_or_else(|| {
                    Error::Config("ElevenLabs API key required for TTS".to_string())
                })?,
                ELEVENLABS_URL,
            ),
            TtsProvider::Console => {
                return Err(Error::Config(
                    "console voice provider has no speech backend".to_string(),
                ));
            }
        };

        Ok(Self {
            client: reqwest::Client::new(),
            api_key: SecretString::from(key.expose_secret().to_string()),
            voice: config.voice.clone(),
            speed: config.speed,
            model: config.model.clone(),
            provider: config.provider,
            endpoint: endpoint.to_string(),
        })
    }

    /// Point requests at a different endpoint (proxies, tests)
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Synthesize text to MP3 bytes
    ///
    /// # Errors
    ///
    /// Returns error if synthesis fails
    pub async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        match self.provider {
            TtsProvider::OpenAi => self.synthesize_openai(text).await,
            TtsProvider::ElevenLabs => self.synthesize_elevenlabs(text).await,
            TtsProvider::Console => Err(Error::Tts(
                "console provider cannot synthesize".to_string(),
            )),
        }
    }

    async fn synthesize_openai(&self, text: &str) -> Result<Vec<u8>> {
        #[derive(serde::Serialize)]
        struct TtsRequest<'a> {
            model: &'a str,
            input: &'a str,
            voice: &'a str,
            speed: f32,
        }

        let request = TtsRequest {
            model: &self.model,
            input: text,
            voice: &self.voice,
            speed: self.speed,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .header(
                "Authorization",
                format!("Bearer {}", self.api_key.expose_secret()),
            )
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Tts(format!("OpenAI TTS error {status}: {body}")));
        }

        Ok(response.bytes().await?.to_vec())
    }

    async fn synthesize_elevenlabs(&self, text: &str) -> Result<Vec<u8>> {
        #[derive(serde::Serialize)]
        struct ElevenLabsRequest<'a> {
            text: &'a str,
            model_id: &'a str,
        }

        let url = format!("{}/{}", self.endpoint.trim_end_matches('/'), self.voice);

        let request = ElevenLabsRequest {
            text,
            model_id: &self.model,
        };

        let response = self
            .client
            .post(&url)
            .header("xi-api-key", self.api_key.expose_secret())
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Tts(format!("ElevenLabs TTS error {status}: {body}")));
        }

        Ok(response.bytes().await?.to_vec())
    }
}
