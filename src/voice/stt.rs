//! Speech-to-text (STT) processing

use secrecy::{ExposeSecret, SecretString};

use crate::config::{ApiKeys, SttConfig, SttProvider};
use crate::{Error, Result};

const WHISPER_URL: &str = "https://api.openai.com/v1/audio/transcriptions";
const DEEPGRAM_URL: &str = "https://api.deepgram.com/v1/listen";

/// Response from OpenAI Whisper transcription API
#[derive(serde::Deserialize)]
struct WhisperResponse {
    text: String,
}

/// Response from Deepgram transcription API
#[derive(serde::Deserialize)]
struct DeepgramResponse {
    results: DeepgramResults,
}

#[derive(serde::Deserialize)]
struct DeepgramResults {
    channels: Vec<DeepgramChannel>,
}

#[derive(serde::Deserialize)]
struct DeepgramChannel {
    alternatives: Vec<DeepgramAlternative>,
}

#[derive(serde::Deserialize)]
struct DeepgramAlternative {
    transcript: String,
}

/// Transcribes speech to text
///
/// An empty transcript means the backend heard nothing it could understand;
/// transport and API failures come back as errors.
pub struct SpeechToText {
    client: reqwest::Client,
    api_key: SecretString,
    model: String,
    provider: SttProvider,
    endpoint: String,
}

impl SpeechToText {
    /// Create the configured STT backend
    ///
    /// # Errors
    ///
    /// Returns error if the provider's API key is missing
    pub fn from_config(config: &SttConfig, keys: &ApiKeys) -> Result<Self> {
        match config.provider {
            SttProvider::Whisper => {
                let key = keys.openai.as_ref().ok_or_else(|| {
                    Error::Config("OpenAI API key required for Whisper".to_string())
                })?;
                Ok(Self::new_whisper(key.expose_secret(), &config.model))
            }
            SttProvider::Deepgram => {
                let key = keys
                    .deepgram
                    .as_ref()
                    .ok_or_else(|| Error::Config("Deepgram API key required".to_string()))?;
                Ok(Self::new_deepgram(key.expose_secret(), &config.model))
            }
        }
    }

    /// Create a new STT instance using `OpenAI` Whisper
    #[must_use]
    pub fn new_whisper(api_key: &str, model: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: SecretString::from(api_key.to_string()),
            model: model.to_string(),
            provider: SttProvider::Whisper,
            endpoint: WHISPER_URL.to_string(),
        }
    }

    /// Create a new STT instance using Deepgram
    #[must_use]
    pub fn new_deepgram(api_key: &str, model: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: SecretString::from(api_key.to_string()),
            model: model.to_string(),
            provider: SttProvider::Deepgram,
            endpoint: DEEPGRAM_URL.to_string(),
        }
    }

    /// Point requests at a different endpoint (proxies, tests)
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Transcribe WAV audio in the given language (e.g. "en-US")
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the API rejects it
    pub async fn transcribe(&self, audio: &[u8], language: &str) -> Result<String> {
        let text = match self.provider {
            SttProvider::Whisper => self.transcribe_whisper(audio, language).await?,
            SttProvider::Deepgram => self.transcribe_deepgram(audio, language).await?,
        };
        Ok(text.trim().to_string())
    }

    async fn transcribe_whisper(&self, audio: &[u8], language: &str) -> Result<String> {
        tracing::debug!(audio_bytes = audio.len(), "starting Whisper transcription");

        // Whisper wants ISO-639-1, not a full tag
        let language = language.split(['-', '_']).next().unwrap_or(language);

        let form = reqwest::multipart::Form::new()
            .part(
                "file",
                reqwest::multipart::Part::bytes(audio.to_vec())
                    .file_name("audio.wav")
                    .mime_str("audio/wav")
                    .map_err(|e| Error::Stt(e.to_string()))?,
            )
            .text("model", self.model.clone())
            .text("language", language.to_lowercase());

        let response = self
            .client
            .post(&self.endpoint)
            .header(
                "Authorization",
                format!("Bearer {}", self.api_key.expose_secret()),
            )
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Whisper API error");
            return Err(Error::Stt(format!("Whisper API error {status}: {body}")));
        }

        let result: WhisperResponse = response.json().await?;
        tracing::debug!(transcript = %result.text, "transcription complete");
        Ok(result.text)
    }

    async fn transcribe_deepgram(&self, audio: &[u8], language: &str) -> Result<String> {
        tracing::debug!(audio_bytes = audio.len(), "starting Deepgram transcription");

        let response = self
            .client
            .post(&self.endpoint)
            .query(&[
                ("model", self.model.as_str()),
                ("language", language),
                ("punctuate", "true"),
            ])
            .header(
                "Authorization",
                format!("Token {}", self.api_key.expose_secret()),
            )
            .header("Content-Type", "audio/wav")
            .body(audio.to_vec())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Deepgram API error");
            return Err(Error::Stt(format!("Deepgram API error {status}: {body}")));
        }

        let result: DeepgramResponse = response.json().await?;

        let transcript = result
            .results
            .channels
            .first()
            .and_then(|c| c.alternatives.first())
            .map(|a| a.transcript.clone())
            .unwrap_or_default();

        tracing::debug!(transcript = %transcript, "transcription complete");
        Ok(transcript)
    }
}
