//! Phrase endpointing
//!
//! Energy-based detection of where a spoken phrase starts and ends, fed with
//! chunks of microphone samples. Mirrors a recognizer's listen contract:
//! calibrate against ambient noise, wait up to a start timeout for speech,
//! then collect until a pause or the phrase limit.

use std::time::Duration;

use super::capture::rms;
use crate::config::ListenConfig;

/// Ambient RMS is multiplied by this to get the dynamic threshold
const DYNAMIC_RATIO: f32 = 1.5;

/// Phrases shorter than this are treated as clicks and ignored (0.25s at 16kHz)
const MIN_SPEECH_SAMPLES: usize = 4000;

/// Endpointer state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointState {
    /// Waiting for speech to begin
    Waiting,
    /// Speech started, accumulating the phrase
    Speaking,
}

/// Outcome of feeding a chunk
#[derive(Debug, Clone, PartialEq)]
pub enum EndpointEvent {
    /// Keep feeding
    Pending,
    /// Start timeout elapsed without speech
    NoSpeech,
    /// Phrase ended by a pause or the phrase limit
    Complete(Vec<f32>),
}

/// Detects the boundaries of one spoken phrase
#[derive(Debug)]
pub struct Endpointer {
    floor: f32,
    dynamic: bool,
    threshold: f32,
    start_timeout: usize,
    phrase_limit: usize,
    pause: usize,
    state: EndpointState,
    waited: usize,
    phrase: Vec<f32>,
    silence: usize,
}

impl Endpointer {
    /// Create an endpointer for the given listen settings
    #[must_use]
    pub fn new(listen: &ListenConfig, sample_rate: u32) -> Self {
        Self {
            floor: listen.energy_threshold,
            dynamic: listen.dynamic_energy,
            threshold: listen.energy_threshold,
            start_timeout: samples_for(listen.start_timeout, sample_rate),
            phrase_limit: samples_for(listen.phrase_limit, sample_rate),
            pause: samples_for(listen.pause, sample_rate),
            state: EndpointState::Waiting,
            waited: 0,
            phrase: Vec::new(),
            silence: 0,
        }
    }

    /// Adjust the speech threshold to the ambient noise level
    pub fn calibrate(&mut self, ambient: &[f32]) {
        if !self.dynamic {
            return;
        }

        let ambient_rms = rms(ambient);
        self.threshold = (ambient_rms * DYNAMIC_RATIO).max(self.floor);
        tracing::debug!(ambient_rms, threshold = self.threshold, "calibrated for ambient noise");
    }

    /// Feed the next chunk of samples
    pub fn push(&mut self, samples: &[f32]) -> EndpointEvent {
        if samples.is_empty() {
            return EndpointEvent::Pending;
        }

        let energy = rms(samples);
        let is_speech = energy > self.threshold;

        match self.state {
            EndpointState::Waiting => {
                if is_speech {
                    tracing::trace!(energy, "speech started");
                    self.state = EndpointState::Speaking;
                    self.phrase.extend_from_slice(samples);
                    self.silence = 0;
                } else {
                    self.waited += samples.len();
                    if self.waited >= self.start_timeout {
                        tracing::debug!(waited = self.waited, "no speech before timeout");
                        return EndpointEvent::NoSpeech;
                    }
                }
            }
            EndpointState::Speaking => {
                self.phrase.extend_from_slice(samples);

                if is_speech {
                    self.silence = 0;
                } else {
                    self.silence += samples.len();
                }

                if self.phrase.len() >= self.phrase_limit {
                    tracing::debug!(samples = self.phrase.len(), "phrase limit reached");
                    let mut phrase = self.take_phrase();
                    phrase.truncate(self.phrase_limit);
                    return EndpointEvent::Complete(phrase);
                }

                if self.silence >= self.pause {
                    let voiced = self.phrase.len().saturating_sub(self.silence);
                    if voiced < MIN_SPEECH_SAMPLES {
                        // Too short to be speech; count it against the start timeout
                        tracing::trace!(voiced, "discarding short noise burst");
                        self.waited += self.phrase.len();
                        self.phrase.clear();
                        self.silence = 0;
                        self.state = EndpointState::Waiting;
                        if self.waited >= self.start_timeout {
                            return EndpointEvent::NoSpeech;
                        }
                    } else {
                        tracing::debug!(samples = self.phrase.len(), "phrase complete");
                        return EndpointEvent::Complete(self.take_phrase());
                    }
                }
            }
        }

        EndpointEvent::Pending
    }

    /// Reset to waiting, keeping the calibrated threshold
    pub fn reset(&mut self) {
        self.state = EndpointState::Waiting;
        self.waited = 0;
        self.phrase.clear();
        self.silence = 0;
    }

    /// Current speech threshold
    #[must_use]
    pub const fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Current state
    #[must_use]
    pub const fn state(&self) -> EndpointState {
        self.state
    }

    fn take_phrase(&mut self) -> Vec<f32> {
        let phrase = std::mem::take(&mut self.phrase);
        self.reset();
        phrase
    }
}

#[allow(clippy::cast_possible_truncation)]
fn samples_for(duration: Duration, sample_rate: u32) -> usize {
    (duration.as_millis() * u128::from(sample_rate) / 1000) as usize
}
