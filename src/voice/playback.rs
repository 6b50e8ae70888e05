//! Audio playback to speakers

use std::io::Cursor;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleRate, StreamConfig};

use crate::{Error, Result};

/// Sample rate for playback (matches common TTS output)
pub const PLAYBACK_SAMPLE_RATE: u32 = 24000;

/// Plays audio to the default output device
///
/// Rendering happens on a blocking worker; the returned future completes
/// when the last sample has been played. Dropping the future stops the
/// stream, and the next render waits until the stopped one has released
/// the device.
pub struct AudioPlayback {
    config: StreamConfig,
    lane: RenderLane,
}

impl AudioPlayback {
    /// Open the default output device
    ///
    /// # Errors
    ///
    /// Returns error if audio device cannot be opened
    pub fn new() -> Result<Self> {
        let host = cpal::default_host();

        let device = host
            .default_output_device()
            .ok_or_else(|| Error::Audio("no output device available".to_string()))?;

        let rate_ok = |c: &cpal::SupportedStreamConfigRange| {
            c.min_sample_rate() <= SampleRate(PLAYBACK_SAMPLE_RATE)
                && c.max_sample_rate() >= SampleRate(PLAYBACK_SAMPLE_RATE)
        };

        let supported_config = device
            .supported_output_configs()
            .map_err(|e| Error::Audio(e.to_string()))?
            .find(|c| c.channels() == 1 && rate_ok(c))
            .or_else(|| {
                // Fallback: try stereo
                device
                    .supported_output_configs()
                    .ok()?
                    .find(|c| c.channels() == 2 && rate_ok(c))
            })
            .ok_or_else(|| Error::Audio("no suitable output config found".to_string()))?;

        let config = supported_config
            .with_sample_rate(SampleRate(PLAYBACK_SAMPLE_RATE))
            .config();

        tracing::debug!(
            device = device.name().unwrap_or_default(),
            sample_rate = PLAYBACK_SAMPLE_RATE,
            channels = config.channels,
            "audio playback initialized"
        );

        Ok(Self {
            config,
            lane: RenderLane::default(),
        })
    }

    /// Play mono f32 samples at [`PLAYBACK_SAMPLE_RATE`]
    ///
    /// # Errors
    ///
    /// Returns error if playback fails
    pub async fn play(&self, samples: Vec<f32>) -> Result<()> {
        if samples.is_empty() {
            return Ok(());
        }

        let config = self.config.clone();
        self.lane
            .run(move |stop| play_blocking(&config, &samples, &stop))
            .await
    }

    /// Decode and play MP3 bytes
    ///
    /// # Errors
    ///
    /// Returns error if decoding or playback fails
    pub async fn play_mp3(&self, mp3_data: &[u8]) -> Result<()> {
        let samples = decode_mp3(mp3_data)?;
        self.play(samples).await
    }
}

/// One render at a time on the output device
///
/// A render whose future is dropped sees its stop flag raised. The next
/// render starts only after the stopped worker has returned.
#[derive(Debug, Clone, Default)]
struct RenderLane {
    device: Arc<tokio::sync::Mutex<()>>,
}

impl RenderLane {
    /// Run `render` on a blocking worker once the previous render is done
    ///
    /// # Errors
    ///
    /// Returns the render's error, or an audio error if the worker panicked
    async fn run<F>(&self, render: F) -> Result<()>
    where
        F: FnOnce(Arc<AtomicBool>) -> Result<()> + Send + 'static,
    {
        let held = Arc::clone(&self.device).lock_owned().await;
        let stop = StopOnDrop::default();
        let flag = Arc::clone(&stop.0);

        let result = tokio::task::spawn_blocking(move || {
            let _held = held;
            render(flag)
        })
        .await
        .map_err(|e| Error::Audio(format!("playback worker failed: {e}")))?;

        drop(stop);
        result
    }
}

/// Raises the stop flag when the owning future goes away
#[derive(Default)]
struct StopOnDrop(Arc<AtomicBool>);

impl Drop for StopOnDrop {
    fn drop(&mut self) {
        self.0.store(true, Ordering::Release);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Drain {
    Finished,
    Stopped,
    TimedOut,
}

fn wait_for_drain(finished: &AtomicBool, stop: &AtomicBool, deadline: Instant) -> Drain {
    loop {
        if stop.load(Ordering::Acquire) {
            return Drain::Stopped;
        }
        if finished.load(Ordering::Acquire) {
            return Drain::Finished;
        }
        if Instant::now() > deadline {
            return Drain::TimedOut;
        }
        std::thread::sleep(Duration::from_millis(20));
    }
}

fn play_blocking(config: &StreamConfig, samples: &[f32], stop: &Arc<AtomicBool>) -> Result<()> {
    let device = cpal::default_host()
        .default_output_device()
        .ok_or_else(|| Error::Audio("no output device".to_string()))?;

    let channels = usize::from(config.channels);
    let samples: Arc<[f32]> = Arc::from(samples);
    let position = Arc::new(AtomicUsize::new(0));
    let finished = Arc::new(AtomicBool::new(false));

    let stream = {
        let samples = Arc::clone(&samples);
        let position = Arc::clone(&position);
        let finished = Arc::clone(&finished);
        let stop = Arc::clone(stop);

        device
            .build_output_stream(
                config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    if stop.load(Ordering::Relaxed) {
                        data.fill(0.0);
                        return;
                    }
                    for frame in data.chunks_mut(channels) {
                        let pos = position.load(Ordering::Relaxed);
                        let sample = samples.get(pos).copied().unwrap_or_else(|| {
                            finished.store(true, Ordering::Release);
                            0.0
                        });
                        frame.fill(sample);
                        if pos < samples.len() {
                            position.store(pos + 1, Ordering::Relaxed);
                        }
                    }
                },
                |err| {
                    tracing::error!(error = %err, "audio playback error");
                },
                None,
            )
            .map_err(|e| Error::Audio(e.to_string()))?
    };

    stream.play().map_err(|e| Error::Audio(e.to_string()))?;

    let duration_ms = (samples.len() as u64 * 1000) / u64::from(PLAYBACK_SAMPLE_RATE);
    let deadline = Instant::now() + Duration::from_millis(duration_ms + 500);

    match wait_for_drain(&finished, stop, deadline) {
        Drain::Finished => {
            // Let the device flush its last period
            std::thread::sleep(Duration::from_millis(100));
            tracing::debug!(samples = samples.len(), "playback complete");
        }
        Drain::Stopped => tracing::debug!("playback stopped early"),
        Drain::TimedOut => tracing::warn!("playback did not drain before deadline"),
    }

    drop(stream);

    Ok(())
}

/// Decode MP3 bytes to mono f32 samples
///
/// # Errors
///
/// Returns error if the stream is not valid MP3
pub fn decode_mp3(mp3_data: &[u8]) -> Result<Vec<f32>> {
    let mut decoder = minimp3::Decoder::new(Cursor::new(mp3_data));
    let mut samples = Vec::new();

    loop {
        match decoder.next_frame() {
            Ok(frame) => {
                if frame.channels == 2 {
                    samples.extend(frame.data.chunks(2).map(|chunk| {
                        let left = f32::from(chunk[0]) / 32768.0;
                        let right = f32::from(chunk.get(1).copied().unwrap_or(chunk[0])) / 32768.0;
                        f32::midpoint(left, right)
                    }));
                } else {
                    samples.extend(frame.data.iter().map(|&s| f32::from(s) / 32768.0));
                }
            }
            Err(minimp3::Error::Eof) => break,
            Err(e) => return Err(Error::Audio(format!("MP3 decode error: {e}"))),
        }
    }

    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Mutex;

    #[test]
    fn test_decode_empty_is_empty() {
        assert!(decode_mp3(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_drain_returns_on_stop_before_finish() {
        let far = Instant::now() + Duration::from_secs(60);
        let started = Instant::now();

        let drain = wait_for_drain(&AtomicBool::new(false), &AtomicBool::new(true), far);
        assert_eq!(drain, Drain::Stopped);
        assert!(started.elapsed() < Duration::from_secs(1));

        let drain = wait_for_drain(&AtomicBool::new(true), &AtomicBool::new(false), far);
        assert_eq!(drain, Drain::Finished);

        let past = Instant::now();
        let drain = wait_for_drain(&AtomicBool::new(false), &AtomicBool::new(false), past);
        assert_eq!(drain, Drain::TimedOut);
    }

    #[tokio::test]
    async fn test_dropped_render_stops_before_next_starts() {
        let lane = RenderLane::default();
        let events = Arc::new(Mutex::new(Vec::new()));

        let first = {
            let events = Arc::clone(&events);
            lane.run(move |stop| {
                events.lock().unwrap().push("first started");
                let limit = Instant::now() + Duration::from_secs(5);
                while !stop.load(Ordering::Acquire) && Instant::now() < limit {
                    std::thread::sleep(Duration::from_millis(5));
                }
                let outcome = if stop.load(Ordering::Acquire) {
                    "first stopped"
                } else {
                    "first ran out"
                };
                events.lock().unwrap().push(outcome);
                Ok(())
            })
        };

        // An interrupt abandons the render partway through
        let abandoned = tokio::time::timeout(Duration::from_millis(50), first).await;
        assert!(abandoned.is_err());

        let started = Instant::now();
        {
            let events = Arc::clone(&events);
            lane.run(move |_| {
                events.lock().unwrap().push("second");
                Ok(())
            })
            .await
            .unwrap();
        }

        assert_eq!(
            *events.lock().unwrap(),
            ["first started", "first stopped", "second"]
        );
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_render_error_is_returned() {
        let lane = RenderLane::default();
        let err = lane
            .run(|_| Err(Error::Audio("device lost".to_string())))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("device lost"));
    }
}
