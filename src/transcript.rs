//! Transcript sources
//!
//! A [`TranscriptSource`] yields one utterance per call, or a typed
//! [`CaptureFailure`] that the session treats as "nothing this cycle".

use std::time::{Duration, Instant};

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::config::ListenConfig;
use crate::shutdown::ShutdownTrigger;
use crate::voice::{
    AudioCapture, EndpointEvent, Endpointer, SAMPLE_RATE, SpeechToText, samples_to_wav,
};

/// Interval between microphone buffer polls
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Slack on top of the listen budget before the stream is considered stalled
const STALL_GRACE: Duration = Duration::from_secs(2);

/// Recognized speech for one listen cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Utterance {
    raw: String,
    normalized: String,
}

impl Utterance {
    /// Wrap a raw transcript, computing its normalized form
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let normalized = raw.trim().to_lowercase();
        Self { raw, normalized }
    }

    /// Transcript as returned by the recognizer
    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Lower-cased, trimmed transcript
    #[must_use]
    pub fn normalized(&self) -> &str {
        &self.normalized
    }
}

/// Why a listen cycle produced no utterance
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptureFailure {
    /// Nothing was said before the start timeout
    #[error("no speech detected within timeout")]
    NoSpeechTimeout,

    /// The recognizer could not make out any words
    #[error("could not understand audio")]
    UnintelligibleAudio,

    /// The recognition service failed (network, quota, API error)
    #[error("speech recognition service error: {0}")]
    BackendUnavailable(String),

    /// Any other fault from the audio layer
    #[error("unexpected capture error: {0}")]
    UnexpectedCaptureError(String),
}

/// Produces utterances for the session loop
#[async_trait(?Send)]
pub trait TranscriptSource {
    /// Listen for one utterance
    async fn capture(&mut self) -> Result<Utterance, CaptureFailure>;
}

/// Microphone + endpointer + cloud STT
pub struct MicrophoneSource {
    audio: AudioCapture,
    stt: SpeechToText,
    listen: ListenConfig,
}

impl MicrophoneSource {
    /// Create a microphone source
    #[must_use]
    pub const fn new(audio: AudioCapture, stt: SpeechToText, listen: ListenConfig) -> Self {
        Self { audio, stt, listen }
    }

    /// Calibrate, then record one phrase
    ///
    /// # Errors
    ///
    /// Returns a failure on start timeout or a stalled/unavailable device
    pub async fn record_phrase(&mut self) -> Result<Vec<f32>, CaptureFailure> {
        self.audio
            .start()
            .map_err(|e| CaptureFailure::UnexpectedCaptureError(e.to_string()))?;

        let mut endpointer = Endpointer::new(&self.listen, SAMPLE_RATE);

        tracing::debug!(
            duration = ?self.listen.calibration,
            "calibrating microphone for ambient noise"
        );
        self.audio.clear_buffer();
        tokio::time::sleep(self.listen.calibration).await;
        endpointer.calibrate(&self.audio.take_buffer());

        tracing::info!("listening");
        let budget = self.listen.start_timeout + self.listen.phrase_limit + STALL_GRACE;
        let started = Instant::now();

        loop {
            tokio::time::sleep(POLL_INTERVAL).await;

            match endpointer.push(&self.audio.take_buffer()) {
                EndpointEvent::Pending => {}
                EndpointEvent::NoSpeech => return Err(CaptureFailure::NoSpeechTimeout),
                EndpointEvent::Complete(phrase) => return Ok(phrase),
            }

            if started.elapsed() > budget {
                return Err(CaptureFailure::UnexpectedCaptureError(
                    "audio stream stalled".to_string(),
                ));
            }
        }
    }
}

#[async_trait(?Send)]
impl TranscriptSource for MicrophoneSource {
    async fn capture(&mut self) -> Result<Utterance, CaptureFailure> {
        let phrase = self.record_phrase().await?;

        let wav = samples_to_wav(&phrase, SAMPLE_RATE)
            .map_err(|e| CaptureFailure::UnexpectedCaptureError(e.to_string()))?;

        let text = self
            .stt
            .transcribe(&wav, &self.listen.language)
            .await
            .map_err(|e| CaptureFailure::BackendUnavailable(e.to_string()))?;

        if text.is_empty() {
            return Err(CaptureFailure::UnintelligibleAudio);
        }

        Ok(Utterance::new(text))
    }
}

/// Reads one utterance per line, for text mode and scripted runs
///
/// End of input fires the shutdown trigger when one is attached.
pub struct LineSource<R> {
    reader: R,
    on_eof: Option<ShutdownTrigger>,
}

impl<R: AsyncBufRead + Unpin> LineSource<R> {
    /// Wrap a buffered reader
    pub const fn new(reader: R) -> Self {
        Self {
            reader,
            on_eof: None,
        }
    }

    /// Request shutdown when the input is exhausted
    #[must_use]
    pub fn shutdown_on_eof(mut self, trigger: ShutdownTrigger) -> Self {
        self.on_eof = Some(trigger);
        self
    }
}

#[async_trait(?Send)]
impl<R: AsyncBufRead + Unpin> TranscriptSource for LineSource<R> {
    async fn capture(&mut self) -> Result<Utterance, CaptureFailure> {
        let mut line = String::new();
        let read = self
            .reader
            .read_line(&mut line)
            .await
            .map_err(|e| CaptureFailure::UnexpectedCaptureError(e.to_string()))?;

        if read == 0 {
            if let Some(trigger) = &self.on_eof {
                trigger.trigger();
            }
            return Err(CaptureFailure::UnexpectedCaptureError(
                "input closed".to_string(),
            ));
        }

        if line.trim().is_empty() {
            return Err(CaptureFailure::NoSpeechTimeout);
        }

        Ok(Utterance::new(line))
    }
}
