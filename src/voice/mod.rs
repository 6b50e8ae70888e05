//! Voice processing module
//!
//! Handles audio capture, phrase endpointing, speech recognition,
//! speech synthesis and playback.

mod capture;
mod endpoint;
mod playback;
mod stt;
mod tts;

pub use capture::{AudioCapture, SAMPLE_RATE, rms, samples_to_wav};
pub use endpoint::{EndpointEvent, EndpointState, Endpointer};
pub use playback::{AudioPlayback, PLAYBACK_SAMPLE_RATE, decode_mp3};
pub use stt::SpeechToText;
pub use tts::TextToSpeech;
