//! Speech output
//!
//! Every line the assistant says goes through a [`Narrator`], which also
//! echoes it to the console as a transcript.

use async_trait::async_trait;

use crate::Result;
use crate::voice::{AudioPlayback, TextToSpeech};

/// Speaks text to the user
#[async_trait(?Send)]
pub trait Narrator {
    /// Speak `text`, returning once it has been said
    async fn speak(&mut self, text: &str) -> Result<()>;
}

/// Cloud TTS rendered through the default output device
pub struct VoiceNarrator {
    name: String,
    tts: TextToSpeech,
    playback: AudioPlayback,
}

impl VoiceNarrator {
    #[must_use]
    pub fn new(name: impl Into<String>, tts: TextToSpeech, playback: AudioPlayback) -> Self {
        Self {
            name: name.into(),
            tts,
            playback,
        }
    }
}

#[async_trait(?Send)]
impl Narrator for VoiceNarrator {
    async fn speak(&mut self, text: &str) -> Result<()> {
        tracing::debug!(text, "speaking");
        println!("{}: {text}", self.name);

        let audio = self.tts.synthesize(text).await?;
        self.playback.play_mp3(&audio).await
    }
}

/// Prints to stdout only
pub struct ConsoleNarrator {
    name: String,
}

impl ConsoleNarrator {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait(?Send)]
impl Narrator for ConsoleNarrator {
    async fn speak(&mut self, text: &str) -> Result<()> {
        tracing::debug!(text, "speaking");
        println!("{}: {text}", self.name);
        Ok(())
    }
}
