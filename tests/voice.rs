//! Voice pipeline integration tests
//!
//! Tests voice components without requiring audio hardware

use std::io::Cursor;
use std::time::Duration;

use wake_assistant::config::ListenConfig;
use wake_assistant::voice::{
    EndpointEvent, EndpointState, Endpointer, SAMPLE_RATE, rms, samples_to_wav,
};

/// Generate sine wave audio samples
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn generate_sine_samples(frequency: f32, duration_secs: f32, amplitude: f32) -> Vec<f32> {
    let num_samples = (SAMPLE_RATE as f32 * duration_secs) as usize;
    (0..num_samples)
        .map(|i| {
            let t = i as f32 / SAMPLE_RATE as f32;
            amplitude * (2.0 * std::f32::consts::PI * frequency * t).sin()
        })
        .collect()
}

/// Generate silence
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn generate_silence(duration_secs: f32) -> Vec<f32> {
    let num_samples = (SAMPLE_RATE as f32 * duration_secs) as usize;
    vec![0.0; num_samples]
}

fn listen_config() -> ListenConfig {
    ListenConfig {
        start_timeout: Duration::from_secs(1),
        phrase_limit: Duration::from_secs(2),
        pause: Duration::from_millis(500),
        energy_threshold: 0.01,
        dynamic_energy: true,
        ..ListenConfig::default()
    }
}

/// Feed audio in 100ms chunks like the microphone poll loop
fn feed(endpointer: &mut Endpointer, audio: &[f32]) -> EndpointEvent {
    for chunk in audio.chunks(1600) {
        let event = endpointer.push(chunk);
        if event != EndpointEvent::Pending {
            return event;
        }
    }
    EndpointEvent::Pending
}

#[test]
fn test_phrase_then_pause_completes() {
    let mut endpointer = Endpointer::new(&listen_config(), SAMPLE_RATE);

    let speech = generate_sine_samples(440.0, 0.6, 0.3);
    assert_eq!(feed(&mut endpointer, &speech), EndpointEvent::Pending);
    assert_eq!(endpointer.state(), EndpointState::Speaking);

    let EndpointEvent::Complete(phrase) = feed(&mut endpointer, &generate_silence(0.6)) else {
        panic!("expected the pause to end the phrase");
    };
    assert!(phrase.len() >= speech.len());
}

#[test]
fn test_silence_times_out() {
    let mut endpointer = Endpointer::new(&listen_config(), SAMPLE_RATE);

    assert_eq!(
        feed(&mut endpointer, &generate_silence(1.5)),
        EndpointEvent::NoSpeech
    );
}

#[test]
fn test_phrase_limit_caps_length() {
    let mut endpointer = Endpointer::new(&listen_config(), SAMPLE_RATE);

    let EndpointEvent::Complete(phrase) =
        feed(&mut endpointer, &generate_sine_samples(440.0, 3.0, 0.3))
    else {
        panic!("expected the phrase limit to end the phrase");
    };
    assert_eq!(phrase.len(), SAMPLE_RATE as usize * 2);
}

#[test]
fn test_click_is_not_a_phrase() {
    let mut endpointer = Endpointer::new(&listen_config(), SAMPLE_RATE);

    let mut audio = generate_sine_samples(440.0, 0.1, 0.3);
    audio.extend(generate_silence(0.6));
    assert_eq!(feed(&mut endpointer, &audio), EndpointEvent::Pending);
    assert_eq!(endpointer.state(), EndpointState::Waiting);
}

#[test]
fn test_calibration_raises_threshold_in_noise() {
    let mut endpointer = Endpointer::new(&listen_config(), SAMPLE_RATE);

    let hum = generate_sine_samples(60.0, 1.0, 0.1);
    endpointer.calibrate(&hum);
    assert!(endpointer.threshold() > rms(&hum));

    // The same hum no longer counts as speech
    assert_eq!(feed(&mut endpointer, &hum), EndpointEvent::NoSpeech);
}

#[test]
fn test_samples_to_wav() {
    let samples = generate_sine_samples(440.0, 0.1, 0.5);
    let wav_data = samples_to_wav(&samples, SAMPLE_RATE).unwrap();

    // Check WAV header magic
    assert_eq!(&wav_data[0..4], b"RIFF");
    assert_eq!(&wav_data[8..12], b"WAVE");
    assert!(wav_data.len() > 44);
}

#[test]
fn test_wav_roundtrip() {
    let original_samples: Vec<f32> = vec![0.0, 0.5, -0.5, 1.0, -1.0, 0.25];
    let wav_data = samples_to_wav(&original_samples, SAMPLE_RATE).unwrap();

    let cursor = Cursor::new(wav_data);
    let reader = hound::WavReader::new(cursor).unwrap();

    let spec = reader.spec();
    assert_eq!(spec.sample_rate, SAMPLE_RATE);
    assert_eq!(spec.channels, 1);
    assert_eq!(reader.len() as usize, original_samples.len());
}
